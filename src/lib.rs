//! Session engine for an EDA and data-cleaning dashboard.
//!
//! The crate owns the dataset state of one interactive session and decides,
//! on every event, which derived views must be recomputed versus reused:
//!
//! * [`store::DatasetStore`] – versioned holder of the loaded dataset
//! * [`data::transform`] – ordered, deterministic cleaning steps
//! * [`cache::ViewCache`] – memoized artifacts with LRU eviction
//! * [`session::Session`] – event-driven interaction controller
//!
//! Rendering is not done here: artifacts are serializable tables and chart
//! specs consumed by an external presentation layer.

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod session;
pub mod store;
pub mod view;

pub use config::{MissingValuePolicy, SessionConfig};
pub use data::model::{CellValue, Column, ColumnType, Dataset, Table};
pub use data::transform::{FilterOp, TransformStep};
pub use error::{LoadError, SessionError, TransformError, ViewComputeError};
pub use session::{Event, Session, SessionState};
pub use view::{Artifact, ViewRequest};
