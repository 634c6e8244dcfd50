//! ER7 support for lab result ingestion.
//!
//! ER7 is the pipe-and-caret plain-text encoding used by legacy clinical messages. A message is
//! a list of segments (one per line), each segment a list of fields, each field a list of
//! repetitions, components and subcomponents.
//!
//! This crate provides:
//! - tokenisation of raw text into segments, fields and components ([`Message`], [`Segment`],
//!   [`Field`]) using the delimiters declared in the header segment
//! - the header model and parser ([`Header`])
//! - acknowledgement construction, the inverse of header parsing ([`ack`])
//! - escape-sequence handling for text values ([`escape`])
//!
//! Nothing here knows about patients or observations; that mapping belongs in `labflow-core`.

pub mod ack;
pub mod delimiters;
pub mod escape;
pub mod header;
pub mod message;

pub use ack::AckCode;
pub use delimiters::Delimiters;
pub use header::Header;
pub use message::{Field, Message, Segment};

/// Segment terminator used for every constructed message.
pub const SEGMENT_TERMINATOR: char = '\r';

/// Name of the header segment that must open every message.
pub const HEADER_SEGMENT: &str = "MSH";

/// Errors returned by the `er7` crate.
#[derive(Debug, thiserror::Error)]
pub enum Er7Error {
    /// The first segment is missing, is not a header segment, or is too short to declare a
    /// field separator.
    #[error("malformed header: {0}")]
    MalformedHeader(String),
}

/// Type alias for Results that can fail with an [`Er7Error`].
pub type Er7Result<T> = Result<T, Er7Error>;
