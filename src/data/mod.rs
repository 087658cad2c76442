/// Measurement input: core type and file loading.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<Measurement>
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ Measurement  │  x, y, optional label / fwhm
///   └─────────────┘
/// ```

pub mod loader;
pub mod model;

pub use model::Measurement;
