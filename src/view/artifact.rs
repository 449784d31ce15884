use serde::Serialize;

// ---------------------------------------------------------------------------
// Artifact – a computed, displayable result
// ---------------------------------------------------------------------------

/// A computed view: a table or a chart specification. Serialized to JSON
/// for the external presentation layer; the engine never renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Artifact {
    Summary(SummaryTable),
    MissingReport(MissingReport),
    Distribution(Histogram),
    Correlation(CorrelationMatrix),
}

// -- summary statistics --

/// Descriptive statistics for a set of columns, in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    /// Row count of the table the summary was computed on.
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
}

/// `describe()`-style statistics of one numeric column, nulls excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub name: String,
    /// Non-null cells.
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Count / unique / top for a non-numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub name: String,
    pub count: usize,
    pub missing: usize,
    pub unique: usize,
    /// Most frequent value and its frequency, ties broken by value order.
    pub top: Option<(String, usize)>,
}

// -- missing-value report --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingReport {
    pub rows: usize,
    pub columns: Vec<MissingCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
    /// Fraction of rows missing, 0.0 for an empty table.
    pub fraction: f64,
}

// -- distribution plot --

/// Equal-width histogram chart spec: `edges` has one more element than
/// `counts`; bucket `i` covers `[edges[i], edges[i+1])`, the last bucket
/// is closed on the right.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    /// Cells left out of the buckets: nulls and non-finite values.
    pub missing: usize,
}

// -- correlation matrix --

/// Symmetric Pearson correlation matrix; `values[i][j]` pairs
/// `columns[i]` with `columns[j]`. Undefined correlations (constant or
/// near-empty columns) are NaN, which serializes to JSON null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}
