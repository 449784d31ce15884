use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::model::{CellValue, Column, ColumnType, Dataset, Table};
use crate::error::TransformError;

// ---------------------------------------------------------------------------
// TransformStep – one user-selected cleaning operation
// ---------------------------------------------------------------------------

/// Comparison operator for row filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
        };
        write!(f, "{sym}")
    }
}

/// One ordered cleaning operation. Re-applying the same ordered list to the
/// same base dataset is deterministic and idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransformStep {
    /// Drop rows with a missing value in any of `columns` (all columns
    /// when the list is empty).
    DropMissing { columns: Vec<String> },
    /// Fill missing values in the named numeric columns with the column
    /// median (all numeric columns when the list is empty).
    ImputeMissing { columns: Vec<String> },
    /// Re-type a column. Numeric targets understand financial strings
    /// such as `"$1.2B"` or `"3,000"`.
    Cast { column: String, target: ColumnType },
    /// Keep rows whose `column` value satisfies `op value`. Rows with a
    /// missing value never match.
    Filter {
        column: String,
        op: FilterOp,
        value: CellValue,
    },
}

impl fmt::Display for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformStep::DropMissing { columns } if columns.is_empty() => {
                write!(f, "drop-missing(*)")
            }
            TransformStep::DropMissing { columns } => {
                write!(f, "drop-missing([{}])", columns.join(", "))
            }
            TransformStep::ImputeMissing { columns } if columns.is_empty() => {
                write!(f, "impute-missing(*)")
            }
            TransformStep::ImputeMissing { columns } => {
                write!(f, "impute-missing([{}])", columns.join(", "))
            }
            TransformStep::Cast { column, target } => write!(f, "cast({column} -> {target})"),
            TransformStep::Filter { column, op, value } => {
                write!(f, "filter({column} {op} {value})")
            }
        }
    }
}

/// Stable hash of an ordered step list, used in cache keys.
pub fn steps_hash(steps: &[TransformStep]) -> u64 {
    let mut hasher = DefaultHasher::new();
    steps.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Pipeline application
// ---------------------------------------------------------------------------

/// Outcome of a pipeline run that tolerates a failing step: the last good
/// table, how many steps made it in, and the error that stopped the run.
#[derive(Debug)]
pub struct PipelineRun {
    pub table: Table,
    pub applied: usize,
    pub error: Option<TransformError>,
}

/// Apply `steps` in order to the dataset's table. Aborts on the first
/// failing step with a [`TransformError`] naming the step; the input
/// dataset is never touched.
pub fn apply(dataset: &Dataset, steps: &[TransformStep]) -> Result<Table, TransformError> {
    let run = run(dataset, steps);
    match run.error {
        Some(err) => Err(err),
        None => Ok(run.table),
    }
}

/// Like [`apply`], but also hands back the last successfully produced
/// table when a step fails partway through.
pub fn run(dataset: &Dataset, steps: &[TransformStep]) -> PipelineRun {
    let mut table = dataset.table.clone();
    for (index, step) in steps.iter().enumerate() {
        log::debug!("applying step {index}: {step}");
        match apply_step(&table, step) {
            Ok(next) => table = next,
            Err(reason) => {
                return PipelineRun {
                    table,
                    applied: index,
                    error: Some(TransformError {
                        index,
                        step: step.clone(),
                        version: dataset.version,
                        reason,
                    }),
                };
            }
        }
    }
    PipelineRun {
        applied: steps.len(),
        table,
        error: None,
    }
}

fn apply_step(table: &Table, step: &TransformStep) -> Result<Table, String> {
    match step {
        TransformStep::DropMissing { columns } => drop_missing(table, columns),
        TransformStep::ImputeMissing { columns } => impute_missing(table, columns),
        TransformStep::Cast { column, target } => cast(table, column, *target),
        TransformStep::Filter { column, op, value } => filter(table, column, *op, value),
    }
}

// -- drop-missing --

fn resolve_columns<'a>(table: &'a Table, requested: &'a [String]) -> Result<Vec<&'a str>, String> {
    if requested.is_empty() {
        return Ok(table.column_names());
    }
    requested
        .iter()
        .map(|name| {
            table
                .column(name)
                .map(|c| c.name.as_str())
                .ok_or_else(|| format!("unknown column '{name}'"))
        })
        .collect()
}

fn drop_missing(table: &Table, columns: &[String]) -> Result<Table, String> {
    let targets = resolve_columns(table, columns)?;
    let keep: Vec<usize> = (0..table.len())
        .filter(|&row| {
            targets.iter().all(|name| {
                table
                    .column(name)
                    .map(|c| !c.values[row].is_null())
                    .unwrap_or(false)
            })
        })
        .collect();
    Ok(table.take_rows(&keep))
}

// -- impute-missing --

/// Median of a sorted slice; for even lengths the lower middle element,
/// so the filled value is always one that could appear in the column.
fn low_median(sorted: &[f64]) -> f64 {
    sorted[(sorted.len() - 1) / 2]
}

fn impute_missing(table: &Table, columns: &[String]) -> Result<Table, String> {
    let targets: Vec<&str> = if columns.is_empty() {
        table
            .columns()
            .iter()
            .filter(|c| c.dtype.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    } else {
        resolve_columns(table, columns)?
    };

    let mut out = table.clone();
    for name in targets {
        let col = out
            .column(name)
            .ok_or_else(|| format!("unknown column '{name}'"))?;
        if !col.dtype.is_numeric() {
            return Err(format!(
                "cannot impute column '{name}': type {} is not numeric",
                col.dtype
            ));
        }
        if col.null_count() == 0 {
            continue;
        }
        let mut present = col.numeric_values();
        if present.is_empty() {
            return Err(format!("cannot impute column '{name}': all values missing"));
        }
        present.sort_by(f64::total_cmp);
        let median = low_median(&present);

        let fill = match col.dtype {
            ColumnType::Integer => CellValue::Integer(median as i64),
            _ => CellValue::Float(median),
        };
        let values = col
            .values
            .iter()
            .map(|v| if v.is_null() { fill.clone() } else { v.clone() })
            .collect();
        out = out.with_column(Column::new(name, col.dtype, values));
    }
    Ok(out)
}

// -- cast --

/// Parse a numeric string, tolerating the financial notation found in
/// real-world company datasets: `"$1.2B"`, `"500M"`, `"3,000"`.
fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = s.trim().to_ascii_uppercase().replace(['$', ','], "");
    if cleaned.is_empty() {
        return None;
    }
    let (body, multiplier) = match cleaned.strip_suffix(['K', 'M', 'B']) {
        Some(body) => {
            let mult = match cleaned.as_bytes()[cleaned.len() - 1] {
                b'K' => 1e3,
                b'M' => 1e6,
                _ => 1e9,
            };
            (body, mult)
        }
        None => (cleaned.as_str(), 1.0),
    };
    body.parse::<f64>().ok().map(|v| v * multiplier)
}

fn cast_cell(value: &CellValue, target: ColumnType) -> Result<CellValue, String> {
    if value.is_null() {
        return Ok(CellValue::Null);
    }
    match target {
        ColumnType::Float => match value {
            CellValue::Float(f) => Ok(CellValue::Float(*f)),
            CellValue::Integer(i) => Ok(CellValue::Float(*i as f64)),
            CellValue::String(s) => parse_numeric_string(s)
                .map(CellValue::Float)
                .ok_or_else(|| format!("cannot cast '{s}' to float")),
            other => Err(format!("cannot cast '{other}' to float")),
        },
        ColumnType::Integer => match value {
            CellValue::Integer(i) => Ok(CellValue::Integer(*i)),
            CellValue::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                Ok(CellValue::Integer(*f as i64))
            }
            CellValue::Float(f) => Err(format!("cannot cast non-integral {f} to integer")),
            CellValue::String(s) => match parse_numeric_string(s) {
                Some(f) if f.fract() == 0.0 => Ok(CellValue::Integer(f as i64)),
                _ => Err(format!("cannot cast '{s}' to integer")),
            },
            other => Err(format!("cannot cast '{other}' to integer")),
        },
        ColumnType::Bool => match value {
            CellValue::Bool(b) => Ok(CellValue::Bool(*b)),
            CellValue::String(s) if s == "true" || s == "false" => {
                Ok(CellValue::Bool(s == "true"))
            }
            other => Err(format!("cannot cast '{other}' to bool")),
        },
        ColumnType::Date => match value {
            CellValue::Date(d) => Ok(CellValue::Date(d.clone())),
            CellValue::String(s) if looks_like_date(s) => Ok(CellValue::Date(s.clone())),
            other => Err(format!("cannot cast '{other}' to date")),
        },
        ColumnType::String => Ok(CellValue::String(value.to_string())),
    }
}

/// Rough ISO-8601 check: `YYYY-MM-DD` prefix with digit/dash shape.
pub(crate) fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[0..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

fn cast(table: &Table, column: &str, target: ColumnType) -> Result<Table, String> {
    let col = table
        .column(column)
        .ok_or_else(|| format!("unknown column '{column}'"))?;

    let mut values = Vec::with_capacity(col.values.len());
    for (row, value) in col.values.iter().enumerate() {
        let cell = cast_cell(value, target).map_err(|e| format!("row {row}: {e}"))?;
        values.push(cell);
    }
    Ok(table.with_column(Column::new(column, target, values)))
}

// -- filter --

/// Compare a cell against the filter operand. Numeric values compare
/// numerically across Integer/Float; otherwise both sides must have the
/// same type.
fn compare(cell: &CellValue, operand: &CellValue) -> Result<std::cmp::Ordering, String> {
    if let (Some(a), Some(b)) = (cell.as_f64(), operand.as_f64()) {
        return Ok(a.total_cmp(&b));
    }
    match (cell, operand) {
        (CellValue::String(a), CellValue::String(b)) => Ok(a.cmp(b)),
        (CellValue::Date(a), CellValue::Date(b)) => Ok(a.cmp(b)),
        (CellValue::Bool(a), CellValue::Bool(b)) => Ok(a.cmp(b)),
        _ => Err(format!(
            "cannot compare {cell:?} with filter operand {operand:?}"
        )),
    }
}

fn filter(table: &Table, column: &str, op: FilterOp, value: &CellValue) -> Result<Table, String> {
    let col = table
        .column(column)
        .ok_or_else(|| format!("unknown column '{column}'"))?;

    // Validate operand type against the schema up front, so a bad filter
    // fails even on an empty table.
    if let Some(operand_type) = value.column_type() {
        if col.dtype.unify(operand_type).is_none() {
            return Err(format!(
                "filter operand {value} ({operand_type}) does not match column '{column}' ({})",
                col.dtype
            ));
        }
    } else {
        return Err("filter operand must not be null".to_string());
    }

    let mut keep = Vec::new();
    for (row, cell) in col.values.iter().enumerate() {
        if cell.is_null() {
            continue;
        }
        let ord = compare(cell, value).map_err(|e| format!("row {row}: {e}"))?;
        let pass = match op {
            FilterOp::Eq => ord.is_eq(),
            FilterOp::Ne => ord.is_ne(),
            FilterOp::Lt => ord.is_lt(),
            FilterOp::Le => ord.is_le(),
            FilterOp::Gt => ord.is_gt(),
            FilterOp::Ge => ord.is_ge(),
        };
        if pass {
            keep.push(row);
        }
    }
    Ok(table.take_rows(&keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(columns: Vec<Column>) -> Dataset {
        Dataset {
            id: "test".into(),
            version: 1,
            table: Table::new(columns).unwrap(),
        }
    }

    fn ages() -> Column {
        Column::infer(
            "age",
            vec![
                CellValue::Integer(30),
                CellValue::Null,
                CellValue::Integer(40),
                CellValue::Integer(50),
            ],
        )
    }

    #[test]
    fn drop_missing_removes_null_rows() {
        let ds = dataset(vec![ages()]);
        let out = apply(&ds, &[TransformStep::DropMissing { columns: vec![] }]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.column("age").unwrap().null_count(), 0);
    }

    #[test]
    fn drop_missing_unknown_column_fails() {
        let ds = dataset(vec![ages()]);
        let err = apply(
            &ds,
            &[TransformStep::DropMissing {
                columns: vec!["income".into()],
            }],
        )
        .unwrap_err();
        assert_eq!(err.index, 0);
        assert!(err.reason.contains("income"));
    }

    #[test]
    fn impute_fills_with_median() {
        let ds = dataset(vec![ages()]);
        let out = apply(&ds, &[TransformStep::ImputeMissing { columns: vec![] }]).unwrap();
        // low median of [30, 40, 50] is 40
        assert_eq!(
            out.column("age").unwrap().values[1],
            CellValue::Integer(40)
        );
    }

    #[test]
    fn cast_financial_strings_to_float() {
        let col = Column::infer(
            "valuation",
            vec![
                CellValue::String("$1.2B".into()),
                CellValue::String("500M".into()),
                CellValue::String("3,000".into()),
            ],
        );
        let ds = dataset(vec![col]);
        let out = apply(
            &ds,
            &[TransformStep::Cast {
                column: "valuation".into(),
                target: ColumnType::Float,
            }],
        )
        .unwrap();
        let values = &out.column("valuation").unwrap().values;
        assert_eq!(values[0], CellValue::Float(1.2e9));
        assert_eq!(values[1], CellValue::Float(5.0e8));
        assert_eq!(values[2], CellValue::Float(3000.0));
    }

    #[test]
    fn cast_failure_names_the_step_and_aborts() {
        let col = Column::infer(
            "age",
            vec![CellValue::String("30".into()), CellValue::String("N/A".into())],
        );
        let ds = dataset(vec![col]);
        let steps = vec![TransformStep::Cast {
            column: "age".into(),
            target: ColumnType::Integer,
        }];
        let err = apply(&ds, &steps).unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.version, 1);
        assert!(err.reason.contains("N/A"));

        // The tolerant runner hands back the untouched input table.
        let run = run(&ds, &steps);
        assert_eq!(run.applied, 0);
        assert_eq!(run.table, ds.table);
    }

    #[test]
    fn filter_excludes_nulls_and_respects_op() {
        let ds = dataset(vec![ages()]);
        let out = apply(
            &ds,
            &[TransformStep::Filter {
                column: "age".into(),
                op: FilterOp::Ge,
                value: CellValue::Integer(40),
            }],
        )
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn filter_type_mismatch_fails_fast() {
        let ds = dataset(vec![ages()]);
        let err = apply(
            &ds,
            &[TransformStep::Filter {
                column: "age".into(),
                op: FilterOp::Eq,
                value: CellValue::String("forty".into()),
            }],
        )
        .unwrap_err();
        assert!(err.reason.contains("does not match"));
    }

    #[test]
    fn reapplication_is_deterministic() {
        let ds = dataset(vec![ages()]);
        let steps = vec![
            TransformStep::DropMissing { columns: vec![] },
            TransformStep::Filter {
                column: "age".into(),
                op: FilterOp::Gt,
                value: CellValue::Integer(30),
            },
        ];
        let first = apply(&ds, &steps).unwrap();
        let second = apply(&ds, &steps).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn steps_hash_is_order_sensitive() {
        let a = TransformStep::DropMissing { columns: vec![] };
        let b = TransformStep::ImputeMissing { columns: vec![] };
        assert_ne!(
            steps_hash(&[a.clone(), b.clone()]),
            steps_hash(&[b, a])
        );
    }
}
