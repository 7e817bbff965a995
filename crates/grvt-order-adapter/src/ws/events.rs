/*
[INPUT]:  Connection lifecycle changes and parsed stream frames
[OUTPUT]: Typed StreamEvent values on a bounded channel
[POS]:    WebSocket layer - caller-facing event queue with overflow policy
[UPDATE]: When adding event kinds or overflow strategies
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::ws::message::FeedFrame;

/// Which physical connection an event or subscription belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionKind {
    /// Market-data stream, no credential
    Public,
    /// Trade-data stream, session cookie attached at handshake
    Private,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Public => "public",
            ConnectionKind::Private => "private",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected {
        connection: ConnectionKind,
    },
    Disconnected {
        connection: ConnectionKind,
        reason: String,
    },
    Subscribed {
        connection: ConnectionKind,
        channel: String,
        selectors: Vec<String>,
    },
    Feed {
        connection: ConnectionKind,
        frame: FeedFrame,
    },
    /// Non-fatal problem: rejected subscribe, protocol violation, failed attempt
    Error {
        connection: ConnectionKind,
        message: String,
    },
    /// Reconnect attempts exhausted; subscriptions stay pending until restart
    ConnectionFailed {
        connection: ConnectionKind,
        attempts: u32,
        message: String,
    },
}

/// What happens when the caller falls behind the buffer capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Oldest unread events are discarded; the reader is told how many
    #[default]
    DropOldest,
    /// Producers wait for space, stalling the socket read loop
    Block,
}

#[derive(Debug, Clone)]
pub(crate) enum EventSender {
    Broadcast(broadcast::Sender<StreamEvent>),
    Bounded(mpsc::Sender<StreamEvent>),
}

impl EventSender {
    /// Deliver `event` under the configured policy. Returns false once the reader is gone or on cancellation.
    pub(crate) async fn emit(&self, event: StreamEvent, cancel: &CancellationToken) -> bool {
        match self {
            // No receiver is fine: events are simply unobserved
            EventSender::Broadcast(tx) => {
                let _ = tx.send(event);
                true
            }
            EventSender::Bounded(tx) => {
                tokio::select! {
                    sent = tx.send(event) => sent.is_ok(),
                    () = cancel.cancelled() => false,
                }
            }
        }
    }
}

enum EventReceiver {
    Broadcast(broadcast::Receiver<StreamEvent>),
    Bounded(mpsc::Receiver<StreamEvent>),
}

/// Caller side of the event channel
pub struct EventStream {
    receiver: EventReceiver,
    dropped: u64,
}

impl EventStream {
    /// Next event, or `None` once every producer is gone
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        match &mut self.receiver {
            EventReceiver::Bounded(rx) => rx.recv().await,
            EventReceiver::Broadcast(rx) => loop {
                match rx.recv().await {
                    Ok(event) => return Some(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        self.dropped += skipped;
                        warn!(skipped, total_dropped = self.dropped, "stream events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
        }
    }

    /// Events discarded under `DropOldest` so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = match self.receiver {
            EventReceiver::Broadcast(_) => OverflowPolicy::DropOldest,
            EventReceiver::Bounded(_) => OverflowPolicy::Block,
        };
        f.debug_struct("EventStream")
            .field("policy", &policy)
            .field("dropped", &self.dropped)
            .finish()
    }
}

pub(crate) fn event_channel(capacity: usize, policy: OverflowPolicy) -> (EventSender, EventStream) {
    let capacity = capacity.max(1);
    let (sender, receiver) = match policy {
        OverflowPolicy::DropOldest => {
            let (tx, rx) = broadcast::channel(capacity);
            (EventSender::Broadcast(tx), EventReceiver::Broadcast(rx))
        }
        OverflowPolicy::Block => {
            let (tx, rx) = mpsc::channel(capacity);
            (EventSender::Bounded(tx), EventReceiver::Bounded(rx))
        }
    };
    (
        sender,
        EventStream {
            receiver,
            dropped: 0,
        },
    )
}
