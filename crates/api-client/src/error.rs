use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build or send the HTTP request: {0}")]
    RequestBuild(#[from] reqwest::Error),

    #[error("The API request returned status {0}: {1}")]
    ApiError(u16, String),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),
}

/// Failures of a streaming transport. None of them are fatal to the process;
/// they drive the connection state machine.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Event stream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Event stream endpoint returned status {0}")]
    Status(u16),

    #[error("Event stream line or event exceeded {0} bytes")]
    EventTooLarge(usize),
}
