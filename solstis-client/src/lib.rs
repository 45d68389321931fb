//! SolsTiS laser client
//!
//! Typed access to the SolsTiS control protocol on top of
//! [`solstis_session::Session`]:
//!
//! - [`SolstisClient`]: one controller connection and its transmission IDs
//! - [`catalog`]: every command, with per-command status decoding
//! - [`scan`]: the TeraScan state machine, including automatic output and
//!   pause/continue flow control
//! - [`ClientConfig`] and [`ClientBuilder`]: connection settings

pub mod builder;
pub mod catalog;
pub mod client;
pub mod config;
pub mod scan;

#[cfg(test)]
mod testing;

pub use builder::ClientBuilder;
pub use catalog::{
    FastScanPoll, FastScanType, LockCondition, RateUnit, ScanActivity, ScanOperation, ScanRate,
    ScanStatus, ScanType, SystemStatus, TableTuningPoll, TableTuningState, WavemeterPoll,
    WavemeterState,
};
pub use client::SolstisClient;
pub use config::ClientConfig;
pub use scan::{
    AutoOutputEvent, AutoOutputSettings, AutoOutputStatus, ObservationSummary, ScanController,
    ScanProgress, ScanSession, ScanState,
};
pub use solstis_core::{SolstisError, SolstisResult};
