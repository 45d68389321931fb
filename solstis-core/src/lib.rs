//! Core types and utilities for the SolsTiS control protocol
//!
//! This crate provides the error taxonomy and protocol constants shared by
//! the transport, session and client crates.

pub mod error;

pub use error::{SolstisError, SolstisResult};

/// Default TCP port of the SolsTiS controller
pub const DEFAULT_PORT: u16 = 39933;

/// Smallest transmission ID accepted by the controller
pub const MIN_TRANSMISSION_ID: u32 = 1;

/// Largest transmission ID accepted by the controller
pub const MAX_TRANSMISSION_ID: u32 = 16383;
