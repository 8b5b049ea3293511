/// Data layer: core types, loading, caching, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .parquet
///        │
///        ▼
///   ┌──────────┐     ┌─────────┐
///   │  loader   │◄────│  cache  │  keyed by path + mtime + size
///   └──────────┘     └─────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  Vec<Record>, immutable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌─────────────┐
///   │  filter   │──►│ aggregate │──►│ derived │──►│ correlation │
///   └──────────┘   └───────────┘   └─────────┘   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ pipeline  │  DashboardParams → DashboardView
///   └──────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod correlation;
pub mod derived;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
