/// Reference compound library: types and loading.
///
/// Architecture:
/// ```text
///   compounds.json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse "Compounds" → drop Ignore records
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Library  │  name → Compound (sorted, immutable)
///   └──────────┘
/// ```

pub mod loader;
pub mod model;

pub use model::{Compound, Library, Peak};
