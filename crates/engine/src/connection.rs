use api_client::Transport;
use core_types::{ConnectionState, ReconnectPolicy};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// What the reader and timer tasks report back to the manager's owner.
///
/// Every event carries the generation of the attempt that produced it. Events
/// from an attempt that has since been stopped or replaced are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened { generation: u64 },
    Frame { generation: u64, text: String },
    Closed { generation: u64 },
    Failed { generation: u64, error: String },
    ReconnectDue { generation: u64 },
}

/// The single live connection attempt. Dropping it aborts the reader.
#[derive(Debug)]
struct ConnectionHandle {
    generation: u64,
    address: String,
    task: JoinHandle<()>,
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A scheduled reconnect. Dropping it cancels the timer.
#[derive(Debug)]
struct PendingReconnect {
    generation: u64,
    task: JoinHandle<()>,
}

impl Drop for PendingReconnect {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Owns at most one streaming connection for one channel.
///
/// The manager is driven by a single owner: it calls `start`/`stop` and feeds
/// every [`ConnectionEvent`] from the receiver returned by [`ConnectionManager::new`]
/// back into [`ConnectionManager::handle_event`]. Transport work happens in a
/// spawned reader task; all state changes happen on the owner's task.
pub struct ConnectionManager {
    channel: String,
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    generation: u64,
    handle: Option<ConnectionHandle>,
    reconnect: Option<PendingReconnect>,
    last_address: Option<String>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ConnectionManager {
    pub fn new(
        channel: impl Into<String>,
        transport: Arc<dyn Transport>,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Idle);
        let manager = Self {
            channel: channel.into(),
            transport,
            policy,
            state,
            generation: 0,
            handle: None,
            reconnect: None,
            last_address: None,
            events,
        };
        (manager, receiver)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The address of the live attempt, if any.
    pub fn address(&self) -> Option<&str> {
        self.handle.as_ref().map(|handle| handle.address.as_str())
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Opens a connection to `address` unless one is already connecting or open.
    ///
    /// A pending reconnect is superseded by an explicit start. Returns whether
    /// a new attempt was made.
    pub fn start(&mut self, address: &str) -> bool {
        if let Some(handle) = &self.handle {
            tracing::debug!(
                channel = %self.channel,
                address = %handle.address,
                state = %self.state(),
                "Start ignored; a connection is already live."
            );
            return false;
        }

        self.reconnect = None;
        self.generation += 1;
        let generation = self.generation;
        self.last_address = Some(address.to_string());

        tracing::info!(channel = %self.channel, %address, generation, "Connecting to log feed...");
        let task = tokio::spawn(read_feed(
            Arc::clone(&self.transport),
            address.to_string(),
            generation,
            self.events.clone(),
        ));
        self.handle = Some(ConnectionHandle {
            generation,
            address: address.to_string(),
            task,
        });
        self.set_state(ConnectionState::Connecting);
        true
    }

    /// Closes the live connection and cancels any pending reconnect.
    ///
    /// Always ends in `Idle` so a later `start` begins cleanly. Calling it on an
    /// idle manager changes nothing and returns false.
    pub fn stop(&mut self) -> bool {
        let had_reconnect = self.reconnect.take().is_some();
        let had_handle = self.handle.take().is_some();
        if !had_handle && !had_reconnect && self.state() == ConnectionState::Idle {
            return false;
        }

        tracing::info!(channel = %self.channel, "Log feed stopped.");
        self.set_state(ConnectionState::Idle);
        true
    }

    /// Unconditional close used when the owner is torn down.
    pub fn shutdown(&mut self) {
        if self.stop() {
            tracing::info!(channel = %self.channel, "Connection closed on shutdown.");
        }
    }

    /// Applies one event to the state machine.
    ///
    /// Returns the frame text when the event is a frame of the live connection.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<String> {
        match event {
            ConnectionEvent::Opened { generation } => {
                if self.is_current(generation) {
                    tracing::info!(channel = %self.channel, generation, "Log feed connected.");
                    self.set_state(ConnectionState::Open);
                }
                None
            }
            ConnectionEvent::Frame { generation, text } => {
                (self.is_current(generation) && self.state() == ConnectionState::Open)
                    .then_some(text)
            }
            ConnectionEvent::Closed { generation } => {
                if self.is_current(generation) {
                    tracing::warn!(channel = %self.channel, generation, "Log feed closed by the server.");
                    self.release(ConnectionState::Closed);
                }
                None
            }
            ConnectionEvent::Failed { generation, error } => {
                if self.is_current(generation) {
                    tracing::error!(channel = %self.channel, generation, %error, "Log feed error.");
                    self.release(ConnectionState::Errored);
                }
                None
            }
            ConnectionEvent::ReconnectDue { generation } => {
                let due = self
                    .reconnect
                    .as_ref()
                    .is_some_and(|pending| pending.generation == generation);
                if due {
                    self.reconnect = None;
                    if let Some(address) = self.last_address.clone() {
                        tracing::info!(channel = %self.channel, %address, "Reconnecting to log feed...");
                        self.start(&address);
                    }
                }
                None
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| handle.generation == generation)
    }

    fn release(&mut self, state: ConnectionState) {
        self.handle = None;
        self.set_state(state);

        match self.policy.backoff() {
            Some(delay) => self.schedule_reconnect(delay),
            None => self.set_state(ConnectionState::Idle),
        }
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();

        tracing::info!(channel = %self.channel, delay_secs = delay.as_secs_f64(), "Reconnect scheduled.");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ConnectionEvent::ReconnectDue { generation });
        });
        self.reconnect = Some(PendingReconnect { generation, task });
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

async fn read_feed(
    transport: Arc<dyn Transport>,
    address: String,
    generation: u64,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let mut frames = match transport.connect(&address).await {
        Ok(frames) => frames,
        Err(e) => {
            let _ = events.send(ConnectionEvent::Failed {
                generation,
                error: e.to_string(),
            });
            return;
        }
    };
    if events.send(ConnectionEvent::Opened { generation }).is_err() {
        return;
    }

    while let Some(frame) = frames.next().await {
        let event = match frame {
            Ok(text) => ConnectionEvent::Frame { generation, text },
            Err(e) => {
                let _ = events.send(ConnectionEvent::Failed {
                    generation,
                    error: e.to_string(),
                });
                return;
            }
        };
        if events.send(event).is_err() {
            return;
        }
    }

    let _ = events.send(ConnectionEvent::Closed { generation });
}
