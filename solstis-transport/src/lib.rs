//! Transport layer module for the SolsTiS control protocol
//!
//! This crate provides the byte-stream abstraction used by the session layer,
//! a TCP implementation and a scripted in-memory implementation for tests.

pub mod error;
pub mod mock;
pub mod stream;
pub mod tcp;

pub use error::{SolstisError, SolstisResult};
pub use mock::{MockTransport, WriteLog};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport};
