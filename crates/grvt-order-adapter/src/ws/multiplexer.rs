/*
[INPUT]:  subscribe/unsubscribe calls, stream URLs, optional private credential
[OUTPUT]: Logical subscriptions kept alive across reconnects, typed event stream
[POS]:    WebSocket layer - public entry point owning both connection slots
[UPDATE]: When changing slot lifecycle or the subscription API
*/

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::{GrvtError, Result};
use crate::ws::connection::{Command, ConnectionWorker, PrivateAuth, StreamConfig};
use crate::ws::events::{ConnectionKind, EventSender, EventStream, event_channel};
use crate::ws::registry::{SubscriptionEntry, SubscriptionKey, SubscriptionRegistry, SubscriptionState};

struct Slot {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

struct Running {
    cancel: CancellationToken,
    public: Option<Slot>,
    private: Option<Slot>,
}

impl Running {
    fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            public: None,
            private: None,
        }
    }

    fn slot(&self, kind: ConnectionKind) -> Option<&Slot> {
        match kind {
            ConnectionKind::Public => self.public.as_ref(),
            ConnectionKind::Private => self.private.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: ConnectionKind) -> &mut Option<Slot> {
        match kind {
            ConnectionKind::Public => &mut self.public,
            ConnectionKind::Private => &mut self.private,
        }
    }
}

/// Keeps logical subscriptions independent of the sockets carrying them.
///
/// Each slot (public, private) is driven by its own worker task, spawned on
/// first use. Workers reconnect with backoff and resend every registered
/// subscription after each reconnect. Events arrive on one typed channel.
pub struct StreamMultiplexer {
    public_url: String,
    private_url: String,
    config: StreamConfig,
    auth: Option<PrivateAuth>,
    registry: Arc<RwLock<SubscriptionRegistry>>,
    events: EventSender,
    event_stream: Mutex<Option<EventStream>>,
    running: Mutex<Option<Running>>,
}

impl StreamMultiplexer {
    pub fn new(
        public_url: impl Into<String>,
        private_url: impl Into<String>,
        config: StreamConfig,
    ) -> Self {
        let (events, event_stream) = event_channel(config.event_capacity, config.overflow);
        Self {
            public_url: public_url.into(),
            private_url: private_url.into(),
            config,
            auth: None,
            registry: Arc::new(RwLock::new(SubscriptionRegistry::new())),
            events,
            event_stream: Mutex::new(Some(event_stream)),
            running: Mutex::new(Some(Running::new())),
        }
    }

    /// Enable private channels, authenticated as `auth.account`
    pub fn with_private_auth(mut self, auth: PrivateAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Take the event stream; only the first call returns it
    pub fn take_events(&self) -> Option<EventStream> {
        self.event_stream.lock().take()
    }

    /// Register a subscription and send it if its slot is connected.
    ///
    /// Never waits on the network. Must be called from within a Tokio runtime.
    pub fn subscribe(
        &self,
        channel: &str,
        selectors: Vec<String>,
        is_private: bool,
    ) -> Result<SubscriptionKey> {
        let kind = if is_private {
            ConnectionKind::Private
        } else {
            ConnectionKind::Public
        };
        if kind == ConnectionKind::Private && self.auth.is_none() {
            return Err(GrvtError::Config(format!(
                "private channel {channel} requires session credentials"
            )));
        }

        let key = SubscriptionKey::new(channel, selectors);
        let mut guard = self.running.lock();
        let Some(running) = guard.as_mut() else {
            return Err(GrvtError::Connection(
                "stream multiplexer is shut down".to_string(),
            ));
        };

        let needs_send = self.registry.write().upsert(key.clone(), kind);
        debug!(connection = %kind, subscription = %key, needs_send, "subscription registered");

        self.ensure_slot(running, kind)?;
        if needs_send && let Some(slot) = running.slot(kind) {
            // A closed worker leaves the entry pending for the next restart
            let _ = slot.commands.send(Command::Subscribe(key.clone()));
        }
        Ok(key)
    }

    /// Remove a subscription; an unsubscribe frame is sent if the server may hold it
    pub fn unsubscribe(&self, channel: &str, selectors: Vec<String>) -> bool {
        let key = SubscriptionKey::new(channel, selectors);
        let Some(entry) = self.registry.write().remove(&key) else {
            return false;
        };

        let sent = entry.state == SubscriptionState::Active || entry.request_id.is_some();
        if sent
            && let Some(running) = self.running.lock().as_ref()
            && let Some(slot) = running.slot(entry.connection)
        {
            let _ = slot.commands.send(Command::Unsubscribe(key));
        }
        true
    }

    /// Drop the socket of `kind` and go through reconnect and resubscribe
    pub fn reconnect(&self, kind: ConnectionKind) {
        if let Some(running) = self.running.lock().as_ref()
            && let Some(slot) = running.slot(kind)
        {
            let _ = slot.commands.send(Command::Reconnect);
        }
    }

    /// Consistent copy of every registered subscription
    pub fn subscriptions(&self) -> Vec<SubscriptionEntry> {
        self.registry.read().snapshot()
    }

    pub fn subscription_state(&self, channel: &str, selectors: Vec<String>) -> Option<SubscriptionState> {
        let key = SubscriptionKey::new(channel, selectors);
        self.registry.read().get(&key).map(|entry| entry.state)
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Cancel every worker and backoff timer, close the sockets and wait for the tasks to exit.
    ///
    /// Subscriptions are kept as `Stale` for a later `restart`.
    pub async fn shutdown(&self) {
        let running = {
            let mut guard = self.running.lock();
            let Some(running) = guard.take() else {
                return;
            };
            // Under the slot lock: a racing restart revives only after this
            self.registry.write().mark_all_stale();
            running.cancel.cancel();
            running
        };

        for slot in [running.public, running.private].into_iter().flatten() {
            if let Err(err) = slot.task.await {
                warn!(error = %err, "stream worker ended abnormally");
            }
        }

        info!(subscriptions = self.registry.read().len(), "stream multiplexer shut down");
    }

    /// Spawn workers again and resubscribe everything kept by `shutdown`.
    ///
    /// Also revives a slot whose worker stopped after exhausting its reconnect attempts.
    pub fn restart(&self) -> Result<()> {
        let mut guard = self.running.lock();
        if guard.is_none() {
            self.registry.write().revive_all();
        }
        let running = guard.get_or_insert_with(Running::new);

        for kind in [ConnectionKind::Public, ConnectionKind::Private] {
            if self.registry.read().has_connection(kind) {
                self.ensure_slot(running, kind)?;
            }
        }
        info!(subscriptions = self.registry.read().len(), "stream multiplexer restarted");
        Ok(())
    }

    fn ensure_slot(&self, running: &mut Running, kind: ConnectionKind) -> Result<()> {
        let cancel = running.cancel.clone();
        let slot = running.slot_mut(kind);
        if slot.as_ref().is_some_and(|slot| !slot.task.is_finished()) {
            return Ok(());
        }

        let handle = Handle::try_current().map_err(|_| {
            GrvtError::Config("stream subscriptions require a Tokio runtime".to_string())
        })?;

        // A finished worker (attempts exhausted) is replaced; its entries were left pending
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = ConnectionWorker {
            kind,
            url: match kind {
                ConnectionKind::Public => self.public_url.clone(),
                ConnectionKind::Private => self.private_url.clone(),
            },
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            auth: match kind {
                ConnectionKind::Public => None,
                ConnectionKind::Private => self.auth.clone(),
            },
            events: self.events.clone(),
            cancel,
            commands: receiver,
        };

        info!(connection = %kind, url = %worker.url, "starting stream worker");
        let task = handle.spawn(worker.run());
        *slot = Some(Slot { commands, task });
        Ok(())
    }
}

impl Drop for StreamMultiplexer {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for StreamMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMultiplexer")
            .field("public_url", &self.public_url)
            .field("private_url", &self.private_url)
            .field("subscriptions", &self.registry.read().len())
            .field("running", &self.is_running())
            .finish()
    }
}
