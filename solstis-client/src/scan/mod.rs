//! TeraScan flow control

pub mod auto_output;
pub mod controller;
pub mod state;

pub use auto_output::{AutoOutputEvent, AutoOutputSettings, AutoOutputStatus};
pub use controller::{ObservationSummary, ScanController, ScanProgress, ScanSession};
pub use state::ScanState;
