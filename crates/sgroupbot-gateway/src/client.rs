//! Gateway client
//!
//! Drives one gateway session: connect, identify, heartbeat and dispatch.
//! The session ends on cancellation (`Ok`) or on the first connection-level
//! failure (`Err`); there is no automatic reconnect.

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::handler::HandlerTable;
use crate::protocol::{Envelope, Hello, Identify, Intents, OpCode};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SharedSink = Arc<Mutex<SplitSink<WsStream, Message>>>;

/// Resolves the WebSocket URL to connect to.
#[async_trait]
pub trait GatewayResolver: Send + Sync {
    async fn resolve(&self) -> GatewayResult<String>;
}

/// A fixed gateway URL.
#[derive(Debug, Clone)]
pub struct StaticResolver(pub String);

#[async_trait]
impl GatewayResolver for StaticResolver {
    async fn resolve(&self) -> GatewayResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Identifying,
    Online,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identify token, see [`bot_token`](crate::bot_token)
    pub token: String,
    pub intents: Intents,
    /// `[index, total]`
    pub shard: [u32; 2],
    pub heartbeat_interval: Duration,
    /// Abort the session on the first undecodable frame instead of skipping it
    pub strict_decode: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            intents: Intents::GROUP_AND_C2C_EVENT | Intents::PUBLIC_GUILD_MESSAGES,
            shard: [0, 1],
            heartbeat_interval: Duration::from_secs(30),
            strict_decode: false,
        }
    }
}

pub struct GatewayClient {
    config: ClientConfig,
    resolver: Arc<dyn GatewayResolver>,
    handlers: Arc<HandlerTable>,
    last_seq: Arc<AtomicU32>,
    state: watch::Sender<ConnectionState>,
}

impl GatewayClient {
    pub fn new(
        config: ClientConfig,
        resolver: Arc<dyn GatewayResolver>,
        handlers: Arc<HandlerTable>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            resolver,
            handlers,
            last_seq: Arc::new(AtomicU32::new(0)),
            state,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Last dispatch sequence seen, 0 before any.
    pub fn last_seq(&self) -> u32 {
        self.last_seq.load(Ordering::Acquire)
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Gateway state {:?} -> {:?}", previous, state);
        }
    }

    /// Run one session until `cancel` fires or the connection fails.
    pub async fn run(&self, cancel: CancellationToken) -> GatewayResult<()> {
        let result = self.session(&cancel).await;
        self.set_state(ConnectionState::Disconnected);
        match &result {
            Ok(()) => info!("Gateway session stopped"),
            Err(e) => warn!("Gateway session ended: {}", e),
        }
        result
    }

    async fn session(&self, cancel: &CancellationToken) -> GatewayResult<()> {
        let mut ws = self.connect().await?;
        self.identify(&mut ws).await?;

        let (sink, mut stream) = ws.split();
        let sink: SharedSink = Arc::new(Mutex::new(sink));

        let heartbeat_cancel = cancel.child_token();
        let mut heartbeat = self.spawn_heartbeat(Arc::clone(&sink), heartbeat_cancel.clone());
        let mut heartbeat_done = false;

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                joined = &mut heartbeat, if !heartbeat_done => {
                    heartbeat_done = true;
                    break match joined {
                        Ok(result) => result,
                        Err(e) => Err(GatewayError::Task(e.to_string())),
                    };
                }
                frame = stream.next() => {
                    if let Err(e) = self.on_frame(frame, &sink).await {
                        break Err(e);
                    }
                }
            }
        };

        heartbeat_cancel.cancel();
        if !heartbeat_done {
            match heartbeat.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Heartbeat ended with error during teardown: {}", e),
                Err(e) => warn!("Heartbeat task failed: {}", e),
            }
        }

        if let Err(e) = sink.lock().await.close().await {
            debug!("Closing gateway sink: {}", e);
        }

        result
    }

    async fn connect(&self) -> GatewayResult<WsStream> {
        self.set_state(ConnectionState::Connecting);
        let url = self.resolver.resolve().await?;
        info!(%url, "Connecting to gateway");

        let (ws, _) = connect_async(url.as_str()).await?;
        self.set_state(ConnectionState::Identifying);
        Ok(ws)
    }

    async fn identify(&self, ws: &mut WsStream) -> GatewayResult<()> {
        let frame = Envelope::identify(&Identify {
            token: self.config.token.clone(),
            intents: self.config.intents,
            shard: self.config.shard,
        })?
        .encode()?;
        ws.send(Message::Text(frame)).await?;

        self.set_state(ConnectionState::Online);
        info!(
            intents = %self.config.intents,
            shard = ?self.config.shard,
            "Identified with gateway"
        );
        Ok(())
    }

    fn spawn_heartbeat(
        &self,
        sink: SharedSink,
        cancel: CancellationToken,
    ) -> JoinHandle<GatewayResult<()>> {
        tokio::spawn(heartbeat_loop(
            sink,
            self.config.heartbeat_interval,
            Arc::clone(&self.last_seq),
            cancel,
        ))
    }

    async fn on_frame(
        &self,
        frame: Option<Result<Message, WsError>>,
        sink: &SharedSink,
    ) -> GatewayResult<()> {
        let message = match frame {
            Some(message) => message?,
            None => return Err(GatewayError::Closed("stream ended".to_string())),
        };

        match message {
            Message::Text(text) => self.on_text(&text).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.on_text(text).await,
                Err(e) => {
                    warn!("Skipping non UTF-8 binary frame: {}", e);
                    Ok(())
                }
            },
            Message::Ping(data) => {
                sink.lock().await.send(Message::Pong(data)).await?;
                Ok(())
            }
            Message::Close(frame) => {
                let reason = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| "no close frame".to_string());
                Err(GatewayError::Closed(reason))
            }
            _ => Ok(()),
        }
    }

    async fn on_text(&self, text: &str) -> GatewayResult<()> {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) if self.config.strict_decode => return Err(e),
            Err(e) => {
                warn!("Skipping undecodable frame: {}", e);
                return Ok(());
            }
        };

        if let Some(seq) = envelope.s.filter(|seq| *seq > 0) {
            self.last_seq.store(seq, Ordering::Release);
        }

        match envelope.opcode() {
            Some(OpCode::Dispatch) => self.dispatch(envelope).await,
            Some(OpCode::Reconnect) => return Err(GatewayError::ReconnectRequested),
            Some(OpCode::InvalidSession) => return Err(GatewayError::InvalidSession),
            Some(OpCode::Hello) => match serde_json::from_value::<Hello>(envelope.d) {
                Ok(hello) => info!(
                    heartbeat_interval_ms = hello.heartbeat_interval,
                    "Gateway hello"
                ),
                Err(e) => debug!("Hello without interval: {}", e),
            },
            Some(OpCode::HeartbeatAck) => debug!("Heartbeat acknowledged"),
            _ => debug!(op = envelope.op, "Ignoring frame"),
        }
        Ok(())
    }

    async fn dispatch(&self, envelope: Envelope) {
        let handler = match envelope.event_type() {
            Some(event_type) => match self.handlers.get(event_type) {
                Some(handler) => handler,
                None => {
                    debug!(event_type, "No handler registered");
                    return;
                }
            },
            None => {
                debug!("Dispatch frame without event type");
                return;
            }
        };
        handler.handle(envelope).await;
    }
}

/// Sends `{op:1, d:<last seq>}` every `period`, first tick immediately.
/// Returns on cancellation or on the first failed send.
async fn heartbeat_loop<S>(
    sink: Arc<Mutex<S>>,
    period: Duration,
    last_seq: Arc<AtomicU32>,
    cancel: CancellationToken,
) -> GatewayResult<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let mut ticker = interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {
                let seq = last_seq.load(Ordering::Acquire);
                let frame = Envelope::heartbeat((seq > 0).then_some(seq)).encode()?;
                sink.lock()
                    .await
                    .send(Message::Text(frame))
                    .await
                    .map_err(GatewayError::Heartbeat)?;
                debug!(seq, "Heartbeat sent");
            }
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("intents", &self.config.intents)
            .field("shard", &self.config.shard)
            .field("handlers", &self.handlers)
            .field("state", &self.state())
            .field("last_seq", &self.last_seq())
            .finish()
    }
}
