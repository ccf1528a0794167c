/// Data layer: metadata cells and the metadata table.
///
/// Architecture:
/// ```text
///   loaders (external)         Vec<Spectrum> / JSON records
///        │
///        ▼
///   ┌───────────────┐
///   │ MetadataTable │  row index + named columns of MetadataValue
///   └───────────────┘
///        │
///        ▼
///   rows_where / take          metadata predicates → row positions → subset
/// ```
pub mod model;
pub mod table;
