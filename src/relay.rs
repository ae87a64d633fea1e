//! Fetch-by-id against an upstream relay.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_socks::tcp::Socks5Stream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{client_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use crate::event::Event;

const SUBSCRIPTION_ID: &str = "jongbot-fetch";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid relay url: {0}")]
    Url(#[from] url::ParseError),
    #[error("relay url has no host or port: {0}")]
    Address(String),
    #[error("timed out connecting to {0}")]
    Timeout(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("socks proxy: {0}")]
    Socks(#[from] tokio_socks::Error),
    #[error("websocket: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Source of previously published events.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Newest event with the given id, if the relay knows it.
    async fn fetch_latest(&self, id: &str) -> Result<Option<Event>, RelayError>;
}

/// Relay reached over a fresh WebSocket per request.
#[derive(Debug, Clone)]
pub struct WsRelayClient {
    pub url: String,
    /// Bound on connecting and on waiting for EOSE.
    pub timeout: Duration,
    /// Optional SOCKS5 proxy (host:port).
    pub tor_socks: Option<String>,
}

impl WsRelayClient {
    pub fn new(url: impl Into<String>, timeout: Duration, tor_socks: Option<String>) -> Self {
        Self {
            url: url.into(),
            timeout,
            tor_socks,
        }
    }
}

#[async_trait]
impl RelayClient for WsRelayClient {
    async fn fetch_latest(&self, id: &str) -> Result<Option<Event>, RelayError> {
        let connecting = connect_ws(&self.url, self.tor_socks.as_deref());
        let mut ws = timeout(self.timeout, connecting)
            .await
            .map_err(|_| RelayError::Timeout(self.url.clone()))??;
        debug!(relay = %self.url, id, "fetching event");

        let req = serde_json::json!(["REQ", SUBSCRIPTION_ID, { "ids": [id] }]);
        let collected = match ws.send(Message::Text(req.to_string())).await {
            Ok(()) => collect_until_eose(&mut ws, self.timeout).await,
            Err(e) => Err(e.into()),
        };

        // The subscription is closed even when collecting failed.
        let close = serde_json::json!(["CLOSE", SUBSCRIPTION_ID]);
        if let Err(e) = ws.send(Message::Text(close.to_string())).await {
            debug!(relay = %self.url, "sending CLOSE failed: {e}");
        }
        if let Err(e) = ws.close(None).await {
            debug!(relay = %self.url, "closing socket failed: {e}");
        }

        let events = collected?;
        debug!(relay = %self.url, count = events.len(), "fetch finished");
        Ok(events
            .into_iter()
            .filter(|ev| ev.id == id)
            .max_by_key(|ev| ev.created_at))
    }
}

/// Read `EVENT`s for our subscription until `EOSE`, the socket closes or
/// `limit` elapses. On timeout the events seen so far are returned.
async fn collect_until_eose<S>(
    ws: &mut WebSocketStream<S>,
    limit: Duration,
) -> Result<Vec<Event>, RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let deadline = Instant::now() + limit;
    let mut events = Vec::new();
    loop {
        let msg = match tokio::time::timeout_at(deadline, ws.next()).await {
            Ok(Some(msg)) => msg?,
            Ok(None) => break,
            Err(_) => {
                warn!("no EOSE before timeout; using {} collected events", events.len());
                break;
            }
        };
        match msg {
            Message::Text(txt) => {
                let Ok(Value::Array(arr)) = serde_json::from_str::<Value>(&txt) else {
                    continue;
                };
                match arr.first().and_then(|v| v.as_str()) {
                    Some("EVENT") if arr.len() >= 3 => {
                        if arr.get(1).and_then(|v| v.as_str()) != Some(SUBSCRIPTION_ID) {
                            continue;
                        }
                        match serde_json::from_value::<Event>(arr[2].clone()) {
                            Ok(ev) => events.push(ev),
                            Err(e) => debug!("skipping unparseable event: {e}"),
                        }
                    }
                    Some("EOSE") => break,
                    Some("CLOSED") => {
                        debug!("subscription refused: {txt}");
                        break;
                    }
                    Some("NOTICE") => debug!("relay notice: {txt}"),
                    _ => {}
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(events)
}

/// Establish a WebSocket connection, optionally via a SOCKS5 proxy.
async fn connect_ws(
    relay: &str,
    tor_socks: Option<&str>,
) -> Result<WebSocketStream<Box<dyn AsyncReadWrite + Unpin + Send>>, RelayError> {
    let url = Url::parse(relay)?;
    let host = url
        .host_str()
        .ok_or_else(|| RelayError::Address(relay.to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| RelayError::Address(relay.to_string()))?;
    let req = relay.into_client_request()?;
    let stream: Box<dyn AsyncReadWrite + Unpin + Send> = if let Some(proxy) = tor_socks {
        Box::new(Socks5Stream::connect(proxy, (host, port)).await?)
    } else {
        Box::new(TcpStream::connect((host, port)).await?)
    };
    let (ws, _) = client_async(req, stream).await?;
    Ok(ws)
}

/// Blanket trait for boxed async read/write streams.
trait AsyncReadWrite: AsyncRead + AsyncWrite {}
impl<T: AsyncRead + AsyncWrite> AsyncReadWrite for T {}
