/// Data layer: core types, loading, and transforms.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (schema inferred once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  ordered typed columns, immutable payload
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ transform  │  apply ordered cleaning steps → new Table
///   └───────────┘
/// ```

pub mod loader;
pub mod model;
pub mod transform;
