use std::collections::BTreeMap;

use super::artifact::{
    Artifact, CategoricalSummary, ColumnSummary, CorrelationMatrix, Histogram, MissingCount,
    MissingReport, NumericSummary, SummaryTable,
};
use super::request::ViewRequest;
use crate::data::model::{Column, Table};
use crate::error::ViewComputeError;

// ---------------------------------------------------------------------------
// Artifact computation
// ---------------------------------------------------------------------------

/// Compute the artifact for one view request against a table. Pure: no
/// caching, no state; the cache layer wraps this.
pub fn compute(table: &Table, request: &ViewRequest) -> Result<Artifact, ViewComputeError> {
    log::debug!("computing {request}");
    match request {
        ViewRequest::Summary { columns } => summary(table, columns).map(Artifact::Summary),
        ViewRequest::MissingReport => Ok(Artifact::MissingReport(missing_report(table))),
        ViewRequest::DistributionPlot { column, buckets } => {
            histogram(table, column, *buckets).map(Artifact::Distribution)
        }
        ViewRequest::CorrelationMatrix { columns } => {
            correlation(table, columns).map(Artifact::Correlation)
        }
    }
}

fn resolve<'a>(
    table: &'a Table,
    requested: &[String],
    numeric_only: bool,
) -> Result<Vec<&'a Column>, ViewComputeError> {
    if requested.is_empty() {
        let cols: Vec<&Column> = table
            .columns()
            .iter()
            .filter(|c| !numeric_only || c.dtype.is_numeric())
            .collect();
        return Ok(cols);
    }
    requested
        .iter()
        .map(|name| {
            let col = table
                .column(name)
                .ok_or_else(|| ViewComputeError::UnknownColumn(name.clone()))?;
            if numeric_only && !col.dtype.is_numeric() {
                return Err(ViewComputeError::NotNumeric {
                    column: name.clone(),
                    dtype: col.dtype,
                });
            }
            Ok(col)
        })
        .collect()
}

// -- summary statistics --

/// Linear-interpolation quantile over a sorted, non-empty slice
/// (numpy's default method).
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = pos - lo as f64;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

fn numeric_summary(col: &Column) -> Result<NumericSummary, ViewComputeError> {
    let mut values = col.numeric_values();
    if values.is_empty() {
        return Err(ViewComputeError::EmptySelection(col.name.clone()));
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        Some(var.sqrt())
    } else {
        None
    };

    Ok(NumericSummary {
        name: col.name.clone(),
        count,
        missing: col.null_count(),
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[count - 1],
    })
}

fn categorical_summary(col: &Column) -> CategoricalSummary {
    let mut frequencies: BTreeMap<String, usize> = BTreeMap::new();
    for v in col.values.iter().filter(|v| !v.is_null()) {
        *frequencies.entry(v.to_string()).or_default() += 1;
    }
    let top = frequencies
        .iter()
        .max_by_key(|(_, &n)| n)
        .map(|(value, &n)| (value.clone(), n));

    CategoricalSummary {
        name: col.name.clone(),
        count: col.values.len() - col.null_count(),
        missing: col.null_count(),
        unique: col.unique_values().len(),
        top,
    }
}

fn summary(table: &Table, requested: &[String]) -> Result<SummaryTable, ViewComputeError> {
    let columns = resolve(table, requested, false)?;
    if table.is_empty() {
        let name = columns
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "*".to_string());
        return Err(ViewComputeError::EmptySelection(name));
    }

    let summaries = columns
        .into_iter()
        .map(|col| {
            if col.dtype.is_numeric() {
                numeric_summary(col).map(ColumnSummary::Numeric)
            } else {
                Ok(ColumnSummary::Categorical(categorical_summary(col)))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SummaryTable {
        rows: table.len(),
        columns: summaries,
    })
}

// -- missing-value report --

fn missing_report(table: &Table) -> MissingReport {
    let rows = table.len();
    let columns = table
        .columns()
        .iter()
        .map(|col| {
            let missing = col.null_count();
            MissingCount {
                column: col.name.clone(),
                missing,
                fraction: if rows == 0 {
                    0.0
                } else {
                    missing as f64 / rows as f64
                },
            }
        })
        .collect();
    MissingReport { rows, columns }
}

// -- distribution plot --

fn histogram(table: &Table, column: &str, buckets: usize) -> Result<Histogram, ViewComputeError> {
    if buckets == 0 {
        return Err(ViewComputeError::ZeroBuckets);
    }
    let col = resolve(table, &[column.to_string()], true)?
        .pop()
        .unwrap_or_else(|| unreachable!());

    // Non-finite cells (a CSV `NaN` token parses as a float) cannot be
    // binned; they are dropped and counted alongside nulls.
    let all = col.numeric_values();
    let values: Vec<f64> = all.iter().copied().filter(|v| v.is_finite()).collect();
    let non_finite = all.len() - values.len();
    if values.is_empty() {
        return Err(ViewComputeError::EmptySelection(column.to_string()));
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    // Degenerate single-value distribution still gets a visible bucket.
    let width = if max > min {
        (max - min) / buckets as f64
    } else {
        1.0
    };

    let edges: Vec<f64> = (0..=buckets).map(|i| min + width * i as f64).collect();
    let mut counts = vec![0usize; buckets];
    for v in &values {
        let idx = (((v - min) / width) as usize).min(buckets - 1);
        counts[idx] += 1;
    }

    Ok(Histogram {
        column: column.to_string(),
        edges,
        counts,
        missing: col.null_count() + non_finite,
    })
}

// -- correlation matrix --

/// Pearson correlation over rows where both cells are present; NaN when
/// fewer than two shared points or either side is constant.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

fn correlation(table: &Table, requested: &[String]) -> Result<CorrelationMatrix, ViewComputeError> {
    let columns = resolve(table, requested, true)?;
    if columns.is_empty() {
        return Err(ViewComputeError::EmptySelection("*".to_string()));
    }

    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|col| col.values.iter().map(|v| v.as_f64()).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        values,
    })
}
