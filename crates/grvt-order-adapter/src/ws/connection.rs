/*
[INPUT]:  Stream URL, shared subscription registry, optional session credential
[OUTPUT]: One supervised socket per slot with reconnect, resubscribe and typed events
[POS]:    WebSocket layer - connection worker (handshake, read loop, backoff)
[UPDATE]: When changing reconnect policy or connection handling
*/

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use rand::Rng;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{ACCOUNT_ID_HEADER, SessionManager};
use crate::http::{GrvtError, Result};
use crate::ws::events::{ConnectionKind, EventSender, OverflowPolicy, StreamEvent};
use crate::ws::message::{InboundFrame, RpcMethod, RpcRequest, parse_frame, truncate_for_log};
use crate::ws::registry::{SubscriptionKey, SubscriptionRegistry};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;

/// Stream behaviour shared by both connection slots
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Bound on the opening handshake; expiry counts as a failed attempt
    pub handshake_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Fraction of the delay randomised in both directions
    pub backoff_jitter: f64,
    /// `None` retries forever
    pub max_reconnect_attempts: Option<u32>,
    pub event_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(30),
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
            backoff_jitter: 0.2,
            max_reconnect_attempts: None,
            event_capacity: 1024,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

impl StreamConfig {
    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base_ms = self.backoff_base.as_millis() as f64 * f64::from(1u32 << exponent);
        let capped = base_ms.min(self.backoff_max.as_millis() as f64);

        let jitter = self.backoff_jitter.clamp(0.0, 1.0);
        let final_ms = if jitter > 0.0 {
            let spread = capped * jitter;
            (capped + rand::thread_rng().gen_range(-spread..=spread)).max(0.0)
        } else {
            capped
        };
        Duration::from_millis(final_ms as u64)
    }
}

/// Credential source for the private slot
#[derive(Clone)]
pub struct PrivateAuth {
    pub sessions: Arc<SessionManager>,
    pub account: String,
}

impl std::fmt::Debug for PrivateAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateAuth")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Subscribe(SubscriptionKey),
    Unsubscribe(SubscriptionKey),
    /// Drop the socket and go through the reconnect path
    Reconnect,
}

/// Why the read loop ended
enum Exit {
    Cancelled,
    Dropped(GrvtError),
}

pub(crate) struct ConnectionWorker {
    pub(crate) kind: ConnectionKind,
    pub(crate) url: String,
    pub(crate) config: StreamConfig,
    pub(crate) registry: Arc<RwLock<SubscriptionRegistry>>,
    pub(crate) auth: Option<PrivateAuth>,
    pub(crate) events: EventSender,
    pub(crate) cancel: CancellationToken,
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
}

impl ConnectionWorker {
    /// Supervise the slot until cancelled or attempts run out
    pub(crate) async fn run(mut self) {
        let mut failures = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let opened = tokio::select! {
                opened = self.open() => opened,
                () = self.cancel.cancelled() => break,
            };

            match opened {
                Ok(socket) => {
                    failures = 0;
                    info!(connection = %self.kind, url = %self.url, "stream connected");
                    self.emit(StreamEvent::Connected { connection: self.kind }).await;

                    match self.serve(socket).await {
                        // Shutdown already marked every entry stale
                        Exit::Cancelled => break,
                        Exit::Dropped(err) => {
                            self.registry.write().revert(self.kind);
                            warn!(connection = %self.kind, error = %err, "stream disconnected");
                            self.emit(StreamEvent::Disconnected {
                                connection: self.kind,
                                reason: err.to_string(),
                            })
                            .await;
                        }
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(connection = %self.kind, attempt = failures, error = %err, "stream connect failed");
                    self.emit(StreamEvent::Error {
                        connection: self.kind,
                        message: err.to_string(),
                    })
                    .await;

                    if self
                        .config
                        .max_reconnect_attempts
                        .is_some_and(|max| failures >= max)
                    {
                        warn!(connection = %self.kind, attempts = failures, "reconnect attempts exhausted");
                        self.emit(StreamEvent::ConnectionFailed {
                            connection: self.kind,
                            attempts: failures,
                            message: err.to_string(),
                        })
                        .await;
                        break;
                    }
                }
            }

            let delay = self.config.backoff_delay(failures.max(1));
            debug!(connection = %self.kind, delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancel.cancelled() => break,
            }
        }

        info!(connection = %self.kind, "stream worker stopped");
    }

    async fn open(&self) -> Result<WsStream> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|err| GrvtError::Connection(format!("invalid stream url {}: {err}", self.url)))?;

        if let Some(auth) = &self.auth {
            let session = auth.sessions.get_credential(&auth.account).await?;
            let headers = request.headers_mut();
            headers.insert("Cookie", header_value(&session.cookie_header())?);
            if let Some(account_id) = &session.grvt_account_id {
                headers.insert(ACCOUNT_ID_HEADER, header_value(account_id)?);
            }
        }

        let timeout = self.config.handshake_timeout;
        let handshake = tokio::time::timeout(timeout, connect_async(request))
            .await
            .map_err(|_| GrvtError::timeout("stream handshake", timeout))?;

        match handshake {
            Ok((socket, _response)) => Ok(socket),
            Err(WsError::Http(response))
                if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) =>
            {
                // The next attempt logs in again instead of replaying a revoked cookie
                if let Some(auth) = &self.auth {
                    auth.sessions.invalidate(&auth.account);
                }
                Err(GrvtError::auth(format!(
                    "stream handshake rejected with {}",
                    response.status()
                )))
            }
            Err(err) => Err(GrvtError::Connection(err.to_string())),
        }
    }

    async fn serve(&mut self, socket: WsStream) -> Exit {
        let (mut write, mut read) = socket.split();

        // Queued commands predate this socket; the registry already holds their effect
        while self.commands.try_recv().is_ok() {}

        if let Err(err) = self.resubscribe_all(&mut write).await {
            return Exit::Dropped(err);
        }

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Exit::Cancelled;
                }

                command = self.commands.recv() => {
                    let result = match command {
                        Some(Command::Subscribe(key)) => self.send_subscribe(&mut write, &key).await,
                        Some(Command::Unsubscribe(key)) => self.send_unsubscribe(&mut write, &key).await,
                        Some(Command::Reconnect) => {
                            let _ = write.send(Message::Close(None)).await;
                            Err(GrvtError::Connection("reconnect requested".to_string()))
                        }
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            return Exit::Cancelled;
                        }
                    };
                    if let Err(err) = result {
                        return Exit::Dropped(err);
                    }
                }

                incoming = read.next() => {
                    if let Err(err) = self.handle_incoming(&mut write, incoming).await {
                        return Exit::Dropped(err);
                    }
                }
            }
        }
    }

    async fn handle_incoming(
        &self,
        write: &mut WsWrite,
        incoming: Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> Result<()> {
        match incoming {
            Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
            Some(Ok(Message::Binary(bytes))) => {
                let text = std::str::from_utf8(&bytes)
                    .map_err(|err| GrvtError::Protocol(format!("binary frame is not UTF-8: {err}")))?;
                self.handle_text(text).await
            }
            Some(Ok(Message::Ping(payload))) => write
                .send(Message::Pong(payload))
                .await
                .map_err(|err| GrvtError::Connection(err.to_string())),
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|frame| format!("{} {}", u16::from(frame.code), frame.reason.as_str()))
                    .unwrap_or_else(|| "no close frame".to_string());
                Err(GrvtError::Connection(format!("closed by server: {reason}")))
            }
            Some(Ok(_)) => Ok(()),
            Some(Err(err)) => Err(GrvtError::Connection(err.to_string())),
            None => Err(GrvtError::Connection("stream ended".to_string())),
        }
    }

    async fn handle_text(&self, text: &str) -> Result<()> {
        let frame = match parse_frame(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(connection = %self.kind, error = %err, "malformed stream frame, forcing reconnect");
                self.emit(StreamEvent::Error {
                    connection: self.kind,
                    message: err.to_string(),
                })
                .await;
                return Err(err);
            }
        };

        match frame {
            InboundFrame::Ack { id, .. } => {
                let acknowledged = self.registry.write().acknowledge(id);
                if let Some(key) = acknowledged {
                    debug!(connection = %self.kind, subscription = %key, "subscription active");
                    self.emit(StreamEvent::Subscribed {
                        connection: self.kind,
                        channel: key.channel,
                        selectors: key.selectors,
                    })
                    .await;
                }
            }
            InboundFrame::RpcError { id, error } => {
                let rejected = id.and_then(|id| self.registry.write().reject(id));
                let message = format!(
                    "{} (code {})",
                    error.message.unwrap_or_else(|| "unknown error".to_string()),
                    error.code.unwrap_or_default()
                );
                warn!(connection = %self.kind, subscription = ?rejected.as_ref().map(ToString::to_string), %message, "stream request rejected");
                self.emit(StreamEvent::Error {
                    connection: self.kind,
                    message,
                })
                .await;
            }
            InboundFrame::Feed(frame) => {
                self.emit(StreamEvent::Feed {
                    connection: self.kind,
                    frame,
                })
                .await;
            }
        }
        Ok(())
    }

    async fn resubscribe_all(&self, write: &mut WsWrite) -> Result<()> {
        let claimed = self.registry.write().claim_all(self.kind);
        if !claimed.is_empty() {
            info!(connection = %self.kind, count = claimed.len(), "restoring subscriptions");
        }
        for (key, id) in claimed {
            self.send_frame(write, RpcMethod::Subscribe, &key, id).await?;
        }
        Ok(())
    }

    async fn send_subscribe(&self, write: &mut WsWrite, key: &SubscriptionKey) -> Result<()> {
        let claimed = self.registry.write().claim_send(key);
        match claimed {
            Some(id) => self.send_frame(write, RpcMethod::Subscribe, key, id).await,
            None => Ok(()),
        }
    }

    async fn send_unsubscribe(&self, write: &mut WsWrite, key: &SubscriptionKey) -> Result<()> {
        let id = self.registry.write().next_request_id();
        self.send_frame(write, RpcMethod::Unsubscribe, key, id).await
    }

    async fn send_frame(
        &self,
        write: &mut WsWrite,
        method: RpcMethod,
        key: &SubscriptionKey,
        id: u64,
    ) -> Result<()> {
        let text = RpcRequest::new(method, &key.channel, &key.selectors, id).to_text()?;
        debug!(connection = %self.kind, id, frame = %truncate_for_log(&text, 512), "stream frame sent");
        write
            .send(Message::Text(text.into()))
            .await
            .map_err(|err| GrvtError::Connection(err.to_string()))
    }

    async fn emit(&self, event: StreamEvent) {
        self.events.emit(event, &self.cancel).await;
    }
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|err| GrvtError::Connection(format!("invalid handshake header: {err}")))
}
