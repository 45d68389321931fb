//! Session layer module for the SolsTiS control protocol
//!
//! The controller speaks brace-delimited JSON over a persistent TCP stream
//! with no length prefix. This crate provides:
//!
//! - [`FrameExtractor`]: splits the byte stream into complete JSON documents
//! - [`Envelope`]: the `{"message": {...}}` wrapper around every op
//! - [`Session`]: send, receive and request/reply correlation over one
//!   connection, including queueing of unsolicited `automatic_output` pushes

pub mod envelope;
pub mod error;
pub mod framer;
pub mod session;
pub mod statistics;

pub use envelope::{Envelope, AUTOMATIC_OUTPUT_OP, PARSE_FAIL_OP, REPLY_SUFFIX};
pub use error::{SolstisError, SolstisResult};
pub use framer::FrameExtractor;
pub use session::{PendingRequest, Session, DEFAULT_READ_TIMEOUT};
pub use statistics::SessionStatistics;
