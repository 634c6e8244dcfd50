//! Minimal lower layer protocol (MLLP) transport.
//!
//! Frames are `0x0B` + message bytes + `0x1C 0x0D`. Each accepted connection gets its own task
//! that reads one frame, hands the message to a [`MessageHandler`], and writes the
//! acknowledgement before reading the next frame. Connections share nothing but the handler.
//!
//! - [`codec::MllpCodec`] implements the framing for `tokio_util::codec::Framed`
//! - [`handler`] decides the acknowledgement for each message
//! - [`server`] accepts connections and runs the per-connection loop
//! - [`client`] sends one message and waits for its acknowledgement

pub mod client;
pub mod codec;
pub mod handler;
pub mod server;

pub use codec::MllpCodec;
pub use handler::{respond, MessageHandler, PipelineHandler};
pub use server::{serve, MllpConfig, Server};

/// Start-of-block byte.
pub const START_BLOCK: u8 = 0x0B;

/// End-of-block byte.
pub const END_BLOCK: u8 = 0x1C;

/// Carriage return that follows the end-of-block byte.
pub const CARRIAGE_RETURN: u8 = 0x0D;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:2575";

/// Environment variable naming the listen address.
pub const ADDR_ENV: &str = "LABFLOW_MLLP_ADDR";

/// Environment variable naming the per-connection idle timeout in seconds.
pub const IDLE_TIMEOUT_ENV: &str = "LABFLOW_MLLP_IDLE_TIMEOUT_SECS";

/// Maximum length of the error description carried in a reject acknowledgement.
pub const MAX_ACK_TEXT_CHARS: usize = 200;

/// Errors returned by the `mllp` crate.
#[derive(Debug, thiserror::Error)]
pub enum MllpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("connection closed before an acknowledgement was received")]
    ConnectionClosed,
    #[error("timed out waiting for the peer")]
    Timeout,
}

/// Type alias for Results that can fail with an [`MllpError`].
pub type MllpResult<T> = Result<T, MllpError>;
