//! Length-prefixed frame codec shared by every socket in the system.
//!
//! Wire format per frame:
//!
//! ```text
//! [4 bytes]  header length (i32, big-endian)
//! [N bytes]  UTF-8 JSON header, N = header length
//! [M bytes]  optional raw body, M = `bodyLength` read from the header
//! ```
//!
//! The codec is a pure framing layer with no knowledge of message
//! semantics; both the coordinator and node roles (and their clients)
//! reuse it unchanged.

pub mod error;
pub mod framing;

pub use error::{TransportError, TransportResult};
pub use framing::{FrameReader, FrameWriter};
