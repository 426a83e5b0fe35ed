//! Transport seam between the session and the broker bridge.
//!
//! The session is generic over [`Connector`] so tests can inject scripted
//! transports; [`StompConnector`] is the real WebSocket implementation.

use crate::error::{FeedError, Result};
use crate::stomp::{self, Command, Frame};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

/// One inbound broker delivery on a subscribed topic.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Subscription id echoed by the broker, when it provides one.
    pub subscription: Option<String>,
    /// Opaque message text.
    pub body: String,
}

/// An open, authenticated broker connection.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Register `topic` under the subscription id `id`.
    async fn subscribe(&mut self, id: &str, topic: &str) -> Result<()>;

    /// Drop the subscription registered under `id`.
    async fn unsubscribe(&mut self, id: &str) -> Result<()>;

    /// Send `body` to `destination`, fire-and-forget.
    async fn publish(&mut self, destination: &str, body: &str) -> Result<()>;

    /// Wait for the next inbound message. Errors are terminal for the
    /// connection.
    async fn recv(&mut self) -> Result<TransportMessage>;

    /// Close the connection. Best effort.
    async fn close(&mut self);
}

/// Opens broker connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    async fn connect(&self) -> Result<Self::Conn>;
}

/// Default timeout for the WebSocket + STOMP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connector speaking STOMP 1.2 over a WebSocket bridge.
#[derive(Debug, Clone)]
pub struct StompConnector {
    url: String,
    connect_timeout: Duration,
}

impl StompConnector {
    /// Create a connector for the given `ws://` or `wss://` endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the handshake timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn handshake(&self) -> Result<StompConnection> {
        let url = Url::parse(&self.url)?;
        let host = url.host_str().unwrap_or("localhost").to_string();

        debug!("connecting to broker at {}", self.url);
        let (mut ws, response) = connect_async(self.url.as_str()).await?;
        debug!("WebSocket handshake complete, status: {:?}", response.status());

        ws.send(Message::Text(stomp::connect_frame(&host).encode()))
            .await?;

        // The broker answers CONNECTED (or ERROR) before any deliveries.
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    if is_heartbeat(&text) {
                        continue;
                    }
                    let frame = Frame::parse(&text)?;
                    match frame.command {
                        Command::Connected => {
                            debug!(
                                "broker session established, version {}",
                                frame.get_header("version").unwrap_or("?")
                            );
                            return Ok(StompConnection { ws });
                        }
                        Command::Error => {
                            return Err(FeedError::Broker(
                                frame
                                    .get_header("message")
                                    .unwrap_or("connect rejected")
                                    .to_string(),
                            ));
                        }
                        other => {
                            return Err(FeedError::Frame(format!(
                                "unexpected frame during handshake: {other:?}"
                            )));
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    ws.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(_))) | None => return Err(FeedError::ConnectionClosed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Connector for StompConnector {
    type Conn = StompConnection;

    async fn connect(&self) -> Result<StompConnection> {
        tokio::time::timeout(self.connect_timeout, self.handshake())
            .await
            .map_err(|_| FeedError::ConnectTimeout)?
    }
}

/// An established STOMP-over-WebSocket connection.
pub struct StompConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for StompConnection {
    async fn subscribe(&mut self, id: &str, topic: &str) -> Result<()> {
        self.ws
            .send(Message::Text(stomp::subscribe_frame(id, topic).encode()))
            .await?;
        Ok(())
    }

    async fn unsubscribe(&mut self, id: &str) -> Result<()> {
        self.ws
            .send(Message::Text(stomp::unsubscribe_frame(id).encode()))
            .await?;
        Ok(())
    }

    async fn publish(&mut self, destination: &str, body: &str) -> Result<()> {
        self.ws
            .send(Message::Text(stomp::send_frame(destination, body).encode()))
            .await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<TransportMessage> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    if is_heartbeat(&text) {
                        continue;
                    }
                    let frame = Frame::parse(&text)?;
                    match frame.command {
                        Command::Message => {
                            return Ok(TransportMessage {
                                topic: frame
                                    .get_header("destination")
                                    .unwrap_or_default()
                                    .to_string(),
                                subscription: frame
                                    .get_header("subscription")
                                    .map(str::to_string),
                                body: frame.body,
                            });
                        }
                        Command::Error => {
                            return Err(FeedError::Broker(
                                frame
                                    .get_header("message")
                                    .unwrap_or("broker error")
                                    .to_string(),
                            ));
                        }
                        Command::Receipt => continue,
                        other => {
                            warn!("ignoring unexpected {other:?} frame");
                            continue;
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    self.ws.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("broker sent close frame: {frame:?}");
                    return Err(FeedError::ConnectionClosed);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(FeedError::ConnectionClosed),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self
            .ws
            .send(Message::Text(stomp::disconnect_frame().encode()))
            .await;
        let _ = self
            .ws
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            })))
            .await;
    }
}

/// STOMP heart-beats are bare EOLs on the wire.
fn is_heartbeat(text: &str) -> bool {
    text.trim_matches(['\n', '\r']).is_empty()
}
