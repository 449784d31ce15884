use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ViewRequest – identifies a desired artifact
// ---------------------------------------------------------------------------

/// A request for one derived view. Part of the cache key, so it must be
/// `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ViewRequest {
    /// Descriptive statistics per column (all columns when empty).
    Summary { columns: Vec<String> },
    /// Missing-value counts per column.
    MissingReport,
    /// Equal-width histogram of one numeric column.
    DistributionPlot { column: String, buckets: usize },
    /// Pairwise Pearson correlation (all numeric columns when empty).
    CorrelationMatrix { columns: Vec<String> },
}

impl fmt::Display for ViewRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewRequest::Summary { columns } if columns.is_empty() => write!(f, "summary(*)"),
            ViewRequest::Summary { columns } => write!(f, "summary([{}])", columns.join(", ")),
            ViewRequest::MissingReport => write!(f, "missing-report"),
            ViewRequest::DistributionPlot { column, buckets } => {
                write!(f, "distribution({column}, {buckets} buckets)")
            }
            ViewRequest::CorrelationMatrix { columns } if columns.is_empty() => {
                write!(f, "correlation(*)")
            }
            ViewRequest::CorrelationMatrix { columns } => {
                write!(f, "correlation([{}])", columns.join(", "))
            }
        }
    }
}
