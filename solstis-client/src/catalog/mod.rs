//! Command catalog
//!
//! Each command validates and maps its domain inputs to wire parameters,
//! runs one request/reply exchange and decodes the reply status through
//! the command's own [`descriptor::CommandDescriptor`].
//!
//! Commands are grouped by instrument subsystem:
//! - [`link`]: link setup
//! - [`wavelength`]: wavelength-meter and table tuning
//! - [`terascan`]: stitched wide-range scans
//! - [`fast_scan`]: short scans around the current wavelength
//! - [`tuning`]: etalon and resonator settings
//! - [`locking`]: etalon, cavity and ECD locks
//! - [`status`]: the full telemetry record

pub mod descriptor;
pub mod fast_scan;
pub mod link;
pub mod locking;
pub mod status;
pub mod terascan;
pub mod tuning;
pub mod types;
pub mod wavelength;

pub use descriptor::{CommandDescriptor, Outcome, StatusShape, CATALOG};
pub use fast_scan::FastScanPoll;
pub use locking::LockCondition;
pub use status::SystemStatus;
pub use terascan::{ScanActivity, ScanStatus};
pub use types::{FastScanType, RateUnit, ScanOperation, ScanRate, ScanType};
pub use wavelength::{TableTuningPoll, TableTuningState, WavemeterPoll, WavemeterState};

use solstis_session::Envelope;
use solstis_session::envelope::first_scalar;
use serde_json::Value;

/// Read an optional numeric reply field, unwrapping one-element arrays
pub(crate) fn optional_number(reply: &Envelope, name: &str) -> Option<f64> {
    reply
        .parameter(name)
        .and_then(first_scalar)
        .and_then(Value::as_f64)
}
