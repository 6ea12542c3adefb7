use crate::error::TransportError;
use crate::event_stream::EventStreamTransport;
use crate::live_connector::WebSocketTransport;
use async_trait::async_trait;
use core_types::TransportKind;
use futures_util::stream::BoxStream;
use std::sync::Arc;

/// The text frames of one open connection, in delivery order.
///
/// The stream ending means the remote closed the connection cleanly; an `Err`
/// item means the connection failed. Nothing is read after either.
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// Opens streaming connections.
///
/// `connect` resolving to `Ok` is the transport's acknowledgement that the
/// connection is open.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, address: &str) -> Result<FrameStream, TransportError>;
}

/// Builds the transport for `kind`.
pub fn transport_for(kind: TransportKind) -> Arc<dyn Transport> {
    match kind {
        TransportKind::WebSocket => Arc::new(WebSocketTransport::new()),
        TransportKind::EventStream => Arc::new(EventStreamTransport::new()),
    }
}
