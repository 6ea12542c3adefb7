use crate::connection::{ConnectionEvent, ConnectionManager};
use crate::error::EngineError;
use crate::retention::RetentionBuffer;
use crate::subscribers::{SubscriberRegistry, Subscription};
use api_client::{Transport, transport_for};
use configuration::Settings;
use core_types::{ConnectionState, NormalizedRecord, ReconnectPolicy, TransportKind};
use database::{DurableMirror, MirrorStore, SqliteStore};
use events::{FeedFrame, RawEvent, normalize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const COMMAND_BUFFER: usize = 64;
const RECORD_BUFFER: usize = 256;

/// Everything a provider needs to know about its channel.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Name used in logs, e.g. `log-feed`.
    pub channel: String,
    /// Used by `start_logs(None)`.
    pub address: String,
    pub transport: TransportKind,
    pub policy: ReconnectPolicy,
    pub max_messages: usize,
    pub max_payloads: usize,
    pub identity: Option<String>,
}

impl ProviderConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        Ok(Self {
            channel: "log-feed".to_string(),
            address: settings.stream.address.clone(),
            transport: settings.stream.transport()?,
            policy: settings.stream.reconnect_policy(),
            max_messages: settings.retention.max_messages,
            max_payloads: settings.retention.max_payloads,
            identity: settings.mirror.identity.clone(),
        })
    }
}

enum Command {
    Start {
        address: String,
        reply: oneshot::Sender<bool>,
    },
    Stop {
        reply: oneshot::Sender<bool>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Record {
        line: String,
        reply: oneshot::Sender<()>,
    },
    SwitchIdentity {
        identity: Option<String>,
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// The shared handle to the realtime log feed.
///
/// One provider is spawned per application; every consumer gets a clone of
/// the handle. A driver task owns the connection, the retention buffers and
/// the mirror, and processes commands and transport events one at a time, in
/// arrival order. Reads go through watch channels and never wait on the
/// driver.
///
/// The connection is closed when `shutdown` is called or the last handle is
/// dropped.
#[derive(Clone)]
pub struct FeedProvider {
    commands: mpsc::Sender<Command>,
    subscribers: SubscriberRegistry,
    messages: watch::Receiver<Vec<String>>,
    payloads: watch::Receiver<Vec<RawEvent>>,
    state: watch::Receiver<ConnectionState>,
    records: broadcast::Sender<NormalizedRecord>,
    transport: TransportKind,
    default_address: String,
}

impl FeedProvider {
    /// Builds the provider described by `settings`: SQLite mirror, transport
    /// chosen by the address scheme.
    pub async fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        let config = ProviderConfig::from_settings(settings)?;
        let store = SqliteStore::open(&settings.mirror.database_url).await?;
        let transport = transport_for(config.transport);
        Self::spawn(config, transport, Arc::new(store)).await
    }

    /// Restores the mirrored log for the configured identity and starts the
    /// driver task. The feed itself stays idle until `start_logs`.
    pub async fn spawn(
        config: ProviderConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn MirrorStore>,
    ) -> Result<Self, EngineError> {
        check_address(config.transport, &config.address)?;

        let mirror = DurableMirror::new(store, config.identity.as_deref());
        let messages = RetentionBuffer::from_snapshot(config.max_messages, mirror.restore().await);
        tracing::info!(
            channel = %config.channel,
            identity = %mirror.identity(),
            restored = messages.len(),
            "Log buffer restored."
        );

        let (connection, connection_events) =
            ConnectionManager::new(config.channel.clone(), transport, config.policy);
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (messages_tx, messages_rx) = watch::channel(messages.snapshot());
        let (payloads_tx, payloads_rx) = watch::channel(Vec::new());
        let (records, _) = broadcast::channel(RECORD_BUFFER);
        let subscribers = SubscriberRegistry::new();
        let state = connection.watch_state();

        let driver = Driver {
            connection,
            connection_events,
            commands: command_rx,
            messages,
            payloads: RetentionBuffer::new(config.max_payloads),
            mirror,
            subscribers: subscribers.clone(),
            messages_tx,
            payloads_tx,
            records: records.clone(),
            filter_keep_alive: config.transport.filters_keep_alive(),
        };
        tokio::spawn(driver.run());

        Ok(Self {
            commands,
            subscribers,
            messages: messages_rx,
            payloads: payloads_rx,
            state,
            records,
            transport: config.transport,
            default_address: config.address,
        })
    }

    /// Starts the feed at `address`, or the configured address.
    ///
    /// Returns `Ok(false)` when a connection was already connecting or open.
    pub async fn start_logs(&self, address: Option<&str>) -> Result<bool, EngineError> {
        let address = address.unwrap_or(&self.default_address);
        check_address(self.transport, address)?;
        self.request(|reply| Command::Start {
            address: address.to_string(),
            reply,
        })
        .await
    }

    /// Stops the feed. Returns `Ok(false)` when it was already idle.
    pub async fn stop_logs(&self) -> Result<bool, EngineError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Empties the log buffer and its mirror.
    pub async fn clear_logs(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// Appends an already formatted line, e.g. the outcome of a REST call.
    /// Subscribers are not notified.
    pub async fn record(&self, line: impl Into<String>) -> Result<(), EngineError> {
        let line = line.into();
        self.request(|reply| Command::Record { line, reply }).await
    }

    /// Moves the buffer to another identity's scope and reloads it from there.
    /// `None` selects the guest scope.
    pub async fn switch_identity(&self, identity: Option<&str>) -> Result<(), EngineError> {
        let identity = identity.map(str::to_string);
        self.request(|reply| Command::SwitchIdentity { identity, reply }).await
    }

    /// Closes the connection and stops the driver. Later calls fail with
    /// `ProviderClosed`.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Registers a consumer of every raw event, payload frames included.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RawEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// The current log buffer, oldest line first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    /// The most recent `payload` events, oldest first.
    pub fn payloads(&self) -> Vec<RawEvent> {
        self.payloads.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_messages(&self) -> watch::Receiver<Vec<String>> {
        self.messages.clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Every record accepted from the feed, as it is appended.
    pub fn records(&self) -> broadcast::Receiver<NormalizedRecord> {
        self.records.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| EngineError::ProviderClosed)?;
        response.await.map_err(|_| EngineError::ProviderClosed)
    }
}

fn check_address(transport: TransportKind, address: &str) -> Result<(), EngineError> {
    if TransportKind::from_address(address)? != transport {
        return Err(core_types::CoreError::UnsupportedAddress(address.to_string()).into());
    }
    Ok(())
}

struct Driver {
    connection: ConnectionManager,
    connection_events: mpsc::UnboundedReceiver<ConnectionEvent>,
    commands: mpsc::Receiver<Command>,
    messages: RetentionBuffer<String>,
    payloads: RetentionBuffer<RawEvent>,
    mirror: DurableMirror,
    subscribers: SubscriberRegistry,
    messages_tx: watch::Sender<Vec<String>>,
    payloads_tx: watch::Sender<Vec<RawEvent>>,
    records: broadcast::Sender<NormalizedRecord>,
    filter_keep_alive: bool,
}

impl Driver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.connection.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        tracing::debug!("All provider handles dropped.");
                        self.connection.shutdown();
                        break;
                    }
                },
                Some(event) = self.connection_events.recv() => {
                    if let Some(text) = self.connection.handle_event(event) {
                        self.ingest(&text).await;
                    }
                }
            }
        }
        tracing::info!("Feed provider stopped.");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { address, reply } => {
                let _ = reply.send(self.connection.start(&address));
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.connection.stop());
            }
            Command::Clear { reply } => {
                self.messages.clear();
                self.mirror.persist(&[]).await;
                self.publish_messages();
                tracing::info!(identity = %self.mirror.identity(), "Log buffer cleared.");
                let _ = reply.send(());
            }
            Command::Record { line, reply } => {
                tracing::debug!(target: "tradefeed::feed", "{}", line);
                self.append(line).await;
                let _ = reply.send(());
            }
            Command::SwitchIdentity { identity, reply } => {
                self.mirror.switch_identity(identity.as_deref());
                let restored = self.mirror.restore().await;
                self.messages = RetentionBuffer::from_snapshot(self.messages.capacity(), restored);
                self.payloads.clear();
                self.publish_messages();
                self.payloads_tx.send_replace(Vec::new());
                tracing::info!(
                    identity = %self.mirror.identity(),
                    restored = self.messages.len(),
                    "Switched log identity."
                );
                let _ = reply.send(());
            }
            // Handled by `run` so the loop can exit.
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Routes one frame of the live connection.
    async fn ingest(&mut self, text: &str) {
        match FeedFrame::classify(text, self.filter_keep_alive) {
            FeedFrame::KeepAlive => tracing::trace!("Keep-alive frame dropped."),
            FeedFrame::Payload(raw) => {
                self.payloads.append(raw.clone());
                self.payloads_tx.send_replace(self.payloads.snapshot());
                self.subscribers.publish(&raw);
            }
            FeedFrame::Log(raw) => {
                if raw.is_empty() {
                    return;
                }
                let record = normalize(&raw);
                tracing::debug!(target: "tradefeed::feed", "{}", record.display);
                self.append(record.display.clone()).await;
                let _ = self.records.send(record);
                self.subscribers.publish(&raw);
            }
        }
    }

    async fn append(&mut self, line: String) {
        self.messages.append(line);
        self.mirror.persist(&self.messages.snapshot()).await;
        self.publish_messages();
    }

    fn publish_messages(&self) {
        self.messages_tx.send_replace(self.messages.snapshot());
    }
}
