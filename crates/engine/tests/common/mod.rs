//! A scripted in-process transport and provider helpers shared by the engine
//! tests.

#![allow(dead_code)]

use api_client::{FrameStream, Transport, TransportError};
use async_trait::async_trait;
use core_types::{ConnectionState, ReconnectPolicy, TransportKind};
use database::MirrorStore;
use engine::{FeedProvider, ProviderConfig};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const WS_ADDRESS: &str = "ws://feed.test/ws/logs";
pub const PUSH_ADDRESS: &str = "http://feed.test/api/stream-logs";

/// What one `connect` call does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Refuse the connection.
    Fail,
    /// Deliver the frames, then close cleanly.
    Frames(Vec<String>),
    /// Deliver the frames, then stay open until dropped.
    Hold(Vec<String>),
}

impl Step {
    pub fn frames(frames: &[&str]) -> Self {
        Step::Frames(frames.iter().map(|f| f.to_string()).collect())
    }

    pub fn hold(frames: &[&str]) -> Self {
        Step::Hold(frames.iter().map(|f| f.to_string()).collect())
    }
}

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    max_live: AtomicUsize,
}

struct LiveGuard(Arc<Counters>);

impl LiveGuard {
    fn new(counters: Arc<Counters>) -> Self {
        let live = counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_live.fetch_max(live, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Plays back one `Step` per connect; once the script runs out every connect
/// holds an empty, open stream.
#[derive(Clone, Default)]
pub struct FakeTransport {
    script: Arc<Mutex<VecDeque<Step>>>,
    connects: Arc<Mutex<Vec<(Instant, String)>>>,
    counters: Arc<Counters>,
}

impl FakeTransport {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.connects
            .lock()
            .unwrap()
            .iter()
            .map(|(_, address)| address.clone())
            .collect()
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, address: &str) -> Result<FrameStream, TransportError> {
        self.connects
            .lock()
            .unwrap()
            .push((Instant::now(), address.to_string()));
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Hold(Vec::new()));

        let (frames, hold) = match step {
            Step::Fail => return Err(TransportError::Status(503)),
            Step::Frames(frames) => (frames, false),
            Step::Hold(frames) => (frames, true),
        };

        let guard = LiveGuard::new(Arc::clone(&self.counters));
        let tail: BoxStream<'static, Result<String, TransportError>> = if hold {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };
        let frames = stream::iter(frames.into_iter().map(Ok))
            .chain(tail)
            .map(move |frame| {
                let _held = &guard;
                frame
            });
        Ok(frames.boxed())
    }
}

pub fn config(address: &str, policy: ReconnectPolicy) -> ProviderConfig {
    ProviderConfig {
        channel: "test-feed".to_string(),
        address: address.to_string(),
        transport: TransportKind::from_address(address).unwrap(),
        policy,
        max_messages: 1000,
        max_payloads: 200,
        identity: None,
    }
}

pub fn fixed(secs: u64) -> ReconnectPolicy {
    ReconnectPolicy::FixedBackoff {
        delay: Duration::from_secs(secs),
    }
}

pub async fn spawn(
    config: ProviderConfig,
    transport: &FakeTransport,
    store: Arc<dyn MirrorStore>,
) -> FeedProvider {
    FeedProvider::spawn(config, Arc::new(transport.clone()), store)
        .await
        .unwrap()
}

/// Waits (bounded) until the provider reports `state`.
pub async fn wait_for_state(provider: &FeedProvider, state: ConnectionState) {
    let mut states = provider.watch_state();
    tokio::time::timeout(Duration::from_secs(60), states.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for connection state")
        .expect("provider dropped its state channel");
}

/// Waits (bounded) until the log buffer holds `len` lines and returns them.
pub async fn wait_for_messages(provider: &FeedProvider, len: usize) -> Vec<String> {
    let mut messages = provider.watch_messages();
    tokio::time::timeout(Duration::from_secs(60), messages.wait_for(|m| m.len() == len))
        .await
        .expect("timed out waiting for log lines")
        .expect("provider dropped its message channel")
        .clone()
}
