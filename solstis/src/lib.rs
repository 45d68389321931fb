//! Rust client for the SolsTiS laser control protocol
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `solstis-core`: error taxonomy and protocol constants
//! - `solstis-transport`: byte streams (TCP, scripted mock)
//! - `solstis-session`: brace-delimited JSON framing, envelopes, request/reply correlation
//! - `solstis-client`: command catalog, TeraScan flow control, configuration
//!
//! # Usage
//!
//! ```no_run
//! use solstis::client::ClientBuilder;
//! ```

// Re-export core types
pub use solstis_core::{SolstisError, SolstisResult, DEFAULT_PORT};

// Re-export client API
pub mod client {
    pub use solstis_client::*;
}

// Re-export session layer
pub mod session {
    pub use solstis_session::*;
}

// Re-export transports
pub mod transport {
    pub use solstis_transport::*;
}
