//! One-shot sender.

use crate::codec::MllpCodec;
use crate::{MllpError, MllpResult};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

/// Send one message to `addr` and return the acknowledgement text.
///
/// # Errors
///
/// Returns [`MllpError::Io`] on connection or write failure, [`MllpError::ConnectionClosed`]
/// if the peer closes before replying, and [`MllpError::Timeout`] if `timeout` elapses first.
pub async fn send<A: ToSocketAddrs>(
    addr: A,
    message: &str,
    timeout: Option<Duration>,
) -> MllpResult<String> {
    let stream = TcpStream::connect(addr).await?;
    let mut framed = Framed::new(stream, MllpCodec::new());

    framed.send(er7::message::normalize(message)).await?;
    tracing::debug!(bytes = message.len(), "message sent, awaiting acknowledgement");

    let reply = match timeout {
        Some(limit) => tokio::time::timeout(limit, framed.next())
            .await
            .map_err(|_| MllpError::Timeout)?,
        None => framed.next().await,
    };

    reply.ok_or(MllpError::ConnectionClosed)?
}
