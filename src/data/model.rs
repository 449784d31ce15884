use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a tabular column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common inferred dtypes.
/// Used in `BTreeSet` / hashed cache keys downstream, so `CellValue`
/// must be `Ord` and `Hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet and cache keys --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) | CellValue::Date(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for numeric views.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Whether the cell counts as missing.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The inferred type of this single cell, `None` for nulls.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            CellValue::String(_) => Some(ColumnType::String),
            CellValue::Integer(_) => Some(ColumnType::Integer),
            CellValue::Float(_) => Some(ColumnType::Float),
            CellValue::Bool(_) => Some(ColumnType::Bool),
            CellValue::Date(_) => Some(ColumnType::Date),
            CellValue::Null => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnType – inferred schema type of a column
// ---------------------------------------------------------------------------

/// Declared type of a column, inferred once at load time.
/// Nulls are permitted in any column; nullability is tracked via counts,
/// not via the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Bool,
    Date,
    String,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// The widened type holding both `self` and `other`, if any.
    /// Integer widens to Float; everything else must match exactly.
    pub fn unify(self, other: ColumnType) -> Option<ColumnType> {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Integer, Float) | (Float, Integer) => Some(Float),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Date => "date",
            ColumnType::String => "string",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Column – one named, typed column
// ---------------------------------------------------------------------------

/// A single column: name, inferred type, and cells in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Infer the column type from the cells themselves. Integer widens to
    /// Float, any other mix falls back to String; an all-null column is
    /// typed String.
    pub fn infer(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let mut dtype: Option<ColumnType> = None;
        for v in &values {
            let Some(t) = v.column_type() else { continue };
            dtype = Some(match dtype {
                None => t,
                Some(prev) => prev.unify(t).unwrap_or(ColumnType::String),
            });
        }
        Column {
            name: name.into(),
            dtype: dtype.unwrap_or(ColumnType::String),
            values,
        }
    }

    /// Number of missing cells.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Sorted set of distinct non-null values.
    pub fn unique_values(&self) -> BTreeSet<CellValue> {
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .cloned()
            .collect()
    }

    /// Non-null cells as `f64`, in row order. Empty for non-numeric columns.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(CellValue::as_f64).collect()
    }
}

// ---------------------------------------------------------------------------
// Table – the immutable tabular payload
// ---------------------------------------------------------------------------

/// Ordered columns of uniform length. Tables are never mutated in place:
/// transforms build a new `Table` from an existing one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table from columns, checking uniform row counts.
    pub fn new(columns: Vec<Column>) -> Result<Self, String> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        for col in &columns {
            if col.values.len() != row_count {
                return Err(format!(
                    "column '{}' has {} rows, expected {row_count}",
                    col.name,
                    col.values.len()
                ));
            }
        }
        Ok(Table { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.row_count
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// New table keeping only the rows at `indices`, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                name: col.name.clone(),
                dtype: col.dtype,
                values: indices.iter().map(|&i| col.values[i].clone()).collect(),
            })
            .collect();
        Table {
            columns,
            row_count: indices.len(),
        }
    }

    /// New table with one column replaced (matched by name).
    pub fn with_column(&self, replacement: Column) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                if col.name == replacement.name {
                    replacement.clone()
                } else {
                    col.clone()
                }
            })
            .collect();
        Table {
            columns,
            row_count: self.row_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – a versioned, immutable table
// ---------------------------------------------------------------------------

/// A table plus its identity and version marker. Versions are assigned by
/// the [`DatasetStore`](crate::store::DatasetStore) and strictly increase;
/// the payload is immutable once versioned.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: String,
    pub version: u64,
    pub table: Table,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> CellValue {
        CellValue::Integer(v)
    }

    #[test]
    fn infer_widens_integer_to_float() {
        let col = Column::infer("x", vec![int(1), CellValue::Float(2.5), CellValue::Null]);
        assert_eq!(col.dtype, ColumnType::Float);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn infer_mixed_falls_back_to_string() {
        let col = Column::infer("x", vec![int(1), CellValue::String("a".into())]);
        assert_eq!(col.dtype, ColumnType::String);
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let a = Column::new("a", ColumnType::Integer, vec![int(1), int(2)]);
        let b = Column::new("b", ColumnType::Integer, vec![int(1)]);
        assert!(Table::new(vec![a, b]).is_err());
    }

    #[test]
    fn take_rows_preserves_order() {
        let a = Column::new("a", ColumnType::Integer, vec![int(10), int(20), int(30)]);
        let table = Table::new(vec![a]).unwrap();
        let picked = table.take_rows(&[2, 0]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.column("a").unwrap().values, vec![int(30), int(10)]);
    }

    #[test]
    fn unique_values_excludes_nulls() {
        let col = Column::infer("x", vec![int(1), int(1), CellValue::Null, int(2)]);
        let uniq = col.unique_values();
        assert_eq!(uniq.len(), 2);
        assert!(!uniq.contains(&CellValue::Null));
    }

    #[test]
    fn cell_value_ordering_is_total() {
        let mut vals = vec![
            CellValue::Float(1.0),
            CellValue::Null,
            CellValue::Integer(3),
            CellValue::Float(f64::NAN),
        ];
        vals.sort(); // must not panic
        assert_eq!(vals[0], CellValue::Null);
    }
}
