//! Error types re-exported from `solstis-core`

pub use solstis_core::error::{SolstisError, SolstisResult};
