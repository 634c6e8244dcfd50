//! Listener and per-connection worker.
//!
//! Each connection is a two-state loop: await a frame, then process it and write the
//! acknowledgement. The next frame is not read until the acknowledgement is written, so
//! per-connection order is preserved end to end.

use crate::codec::MllpCodec;
use crate::handler::{respond, MessageHandler};
use crate::{MllpError, MllpResult, DEFAULT_ADDR};
use futures::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

/// Pause after an accept failure that is not specific to one peer (e.g. fd exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Transport configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MllpConfig {
    addr: SocketAddr,
    idle_timeout: Option<Duration>,
}

impl MllpConfig {
    pub fn new(addr: SocketAddr, idle_timeout: Option<Duration>) -> Self {
        Self { addr, idle_timeout }
    }

    /// Resolve configuration from raw environment values.
    ///
    /// # Arguments
    ///
    /// * `addr` - Value of `LABFLOW_MLLP_ADDR`; unset means [`DEFAULT_ADDR`].
    /// * `idle_timeout_secs` - Value of `LABFLOW_MLLP_IDLE_TIMEOUT_SECS`; unset, blank or `0`
    ///   means no timeout.
    ///
    /// # Errors
    ///
    /// Returns [`MllpError::Config`] if either value does not parse.
    pub fn from_env_values(
        addr: Option<String>,
        idle_timeout_secs: Option<String>,
    ) -> MllpResult<Self> {
        let addr = addr.unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr
            .trim()
            .parse()
            .map_err(|e| MllpError::Config(format!("invalid listen address '{addr}': {e}")))?;

        let idle_timeout = match idle_timeout_secs.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e| {
                    MllpError::Config(format!("invalid idle timeout '{raw}': {e}"))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        Ok(Self::new(addr, idle_timeout))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }
}

/// A bound listener ready to accept connections.
pub struct Server<H> {
    listener: TcpListener,
    handler: Arc<H>,
    idle_timeout: Option<Duration>,
}

impl<H: MessageHandler> Server<H> {
    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`MllpError::Io`] if the address cannot be bound.
    pub async fn bind(config: &MllpConfig, handler: Arc<H>) -> MllpResult<Self> {
        let listener = TcpListener::bind(config.addr()).await?;
        Ok(Self {
            listener,
            handler,
            idle_timeout: config.idle_timeout(),
        })
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> MllpResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per connection.
    ///
    /// Accept failures are logged and the listener keeps going.
    pub async fn run(self) -> MllpResult<()> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "MLLP listener started");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    let pause = accept_backoff(&err);
                    tracing::warn!(error = %err, ?pause, "accept failed");
                    if let Some(pause) = pause {
                        tokio::time::sleep(pause).await;
                    }
                    continue;
                }
            };
            let handler = Arc::clone(&self.handler);
            let idle_timeout = self.idle_timeout;

            tokio::spawn(async move {
                tracing::info!(%peer, "connection opened");
                if let Err(err) = handle_connection(stream, handler, idle_timeout).await {
                    tracing::warn!(%peer, error = %err, "connection failed");
                }
                tracing::info!(%peer, "connection closed");
            });
        }
    }
}

/// Bind `config.addr()` and serve forever.
///
/// # Errors
///
/// Returns [`MllpError::Io`] if binding fails.
pub async fn serve<H: MessageHandler>(config: MllpConfig, handler: Arc<H>) -> MllpResult<()> {
    Server::bind(&config, handler).await?.run().await
}

/// Delay before the next accept, or `None` when the failure concerned a single peer.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

async fn handle_connection<H: MessageHandler>(
    stream: TcpStream,
    handler: Arc<H>,
    idle_timeout: Option<Duration>,
) -> MllpResult<()> {
    let mut framed = Framed::new(stream, MllpCodec::new());

    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, framed.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(?limit, "closing idle connection");
                    return Ok(());
                }
            },
            None => framed.next().await,
        };

        let message = match next {
            Some(frame) => frame?,
            None => return Ok(()),
        };

        let reply = respond(handler.as_ref(), &message);
        framed.send(reply).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client;
    use labflow_core::{PipelineError, PipelineResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl MessageHandler for Counting {
        fn handle(&self, message: &str) -> PipelineResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if message.contains("FAIL") {
                return Err(PipelineError::InvalidInput("refused".into()));
            }
            Ok(())
        }
    }

    async fn start(handler: Arc<Counting>, idle_timeout: Option<Duration>) -> SocketAddr {
        let config = MllpConfig::new(
            "127.0.0.1:0".parse().expect("addr"),
            idle_timeout,
        );
        let server = Server::bind(&config, handler).await.expect("bind");
        let addr = server.local_addr().expect("local addr");
        tokio::spawn(server.run());
        addr
    }

    #[test]
    fn config_defaults_and_overrides() {
        let cfg = MllpConfig::from_env_values(None, None).expect("defaults");
        assert_eq!(cfg.addr().port(), 2575);
        assert_eq!(cfg.idle_timeout(), None);

        let cfg = MllpConfig::from_env_values(Some("127.0.0.1:9000".into()), Some("30".into()))
            .expect("overrides");
        assert_eq!(cfg.addr().port(), 9000);
        assert_eq!(cfg.idle_timeout(), Some(Duration::from_secs(30)));

        let cfg = MllpConfig::from_env_values(None, Some("0".into())).expect("zero");
        assert_eq!(cfg.idle_timeout(), None);

        let err = MllpConfig::from_env_values(Some("nowhere".into()), None).expect_err("bad addr");
        assert!(matches!(err, MllpError::Config(_)));
    }

    #[test]
    fn accept_failures_never_stop_the_listener() {
        let aborted = io::Error::from(io::ErrorKind::ConnectionAborted);
        assert_eq!(accept_backoff(&aborted), None);

        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(accept_backoff(&reset), None);

        // EMFILE surfaces as an uncategorised OS error.
        let too_many_files = io::Error::from_raw_os_error(24);
        assert_eq!(accept_backoff(&too_many_files), Some(ACCEPT_BACKOFF));
    }

    #[tokio::test]
    async fn acknowledges_frames_in_order_on_one_connection() {
        let handler = Arc::new(Counting::default());
        let addr = start(Arc::clone(&handler), None).await;

        let stream = TcpStream::connect(addr).await.expect("connect");
        let mut framed = Framed::new(stream, MllpCodec::new());

        for id in ["A1", "A2", "FAIL3"] {
            framed
                .send(format!("MSH|^~\\&|S|SF|R|RF|||ORU^R01|{id}|P|2.5\r"))
                .await
                .expect("send");
            let ack = framed.next().await.expect("frame").expect("decode");
            assert!(ack.starts_with("MSH|^~\\&|R|RF|S|SF|||ACK|"));
            if id.starts_with("FAIL") {
                assert!(ack.contains("MSA|AE|FAIL3|"));
            } else {
                assert!(ack.ends_with(&format!("MSA|AA|{id}\r")));
            }
        }
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_control_id_never_reaches_handler() {
        let handler = Arc::new(Counting::default());
        let addr = start(Arc::clone(&handler), None).await;

        let ack = client::send(addr, "MSH|^~\\&|S|SF|R|RF|||ORU^R01||P|2.5\r", None)
            .await
            .expect("ack");
        assert_eq!(ack, "MSH|^~\\&|||||||ACK||P|2.5.1\rMSA|AE|\r");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_failed_connection_does_not_affect_others() {
        let handler = Arc::new(Counting::default());
        let addr = start(Arc::clone(&handler), None).await;

        let mut broken = TcpStream::connect(addr).await.expect("connect");
        broken.write_all(b"\x0bMSH|^~\\&|half a fr").await.expect("write");
        drop(broken);

        let ack = client::send(addr, "MSH|^~\\&|S|SF|R|RF|||ORU^R01|OK1|P|2.5\r", None)
            .await
            .expect("ack");
        assert!(ack.ends_with("MSA|AA|OK1\r"));
    }

    #[tokio::test]
    async fn idle_connections_are_closed_when_configured() {
        let handler = Arc::new(Counting::default());
        let addr = start(handler, Some(Duration::from_millis(50))).await;

        let mut stream = TcpStream::connect(addr).await.expect("connect");
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("server closes before the test timeout")
            .expect("read");
        assert_eq!(read, 0);
    }
}
