use crate::error::TransportError;
use crate::transport::{FrameStream, Transport};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Connects to the backend's WebSocket log feed (`/ws/logs`).
///
/// Only text frames are surfaced. Pings are answered by tungstenite itself,
/// binary and pong frames are skipped, and a close frame ends the stream.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, address: &str) -> Result<FrameStream, TransportError> {
        tracing::info!(%address, "[WS-Logs] Connecting...");
        let (socket, _) = connect_async(address).await?;
        tracing::info!(%address, "[WS-Logs] Connection established.");

        let frames = stream::unfold(Some(socket), |socket| async move {
            let mut socket = socket?;
            loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Some((Ok(text.to_string()), Some(socket)));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("[WS-Logs] Connection closed by server: {:?}", frame);
                        return None;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!("[WS-Logs] Ignoring binary message of {} bytes", data.len());
                    }
                    Some(Ok(_)) => {
                        // Ping, pong and raw frames carry no log content.
                    }
                    Some(Err(e)) => {
                        return Some((Err(TransportError::from(e)), None));
                    }
                    None => return None,
                }
            }
        });

        Ok(frames.boxed())
    }
}
