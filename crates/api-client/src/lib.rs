use async_trait::async_trait;
use configuration::ApiSettings;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::time::Duration;

pub mod error;
pub mod event_stream;
pub mod live_connector;
pub mod responses;
pub mod transport;
// --- Public API ---
pub use error::{ApiError, TransportError};
pub use event_stream::{EventStreamTransport, SseDecoder, SseEvent};
pub use live_connector::WebSocketTransport;
pub use responses::{
    BrokerConnectResult, BrokerSelection, LotSizeRequest, LotSizeResponse, MessageResponse,
    StartTradingRequest, StartTradingResponse, failure_line,
};
pub use transport::{FrameStream, Transport, transport_for};

/// The console backend's REST surface.
///
/// These are thin request/response wrappers; the console only surfaces their
/// messages as log lines. The trait lets the binary and tests swap in a mock.
#[async_trait]
pub trait TradingApi: Send + Sync {
    async fn connect_broker(
        &self,
        brokers: &[BrokerSelection],
    ) -> Result<Vec<BrokerConnectResult>, ApiError>;

    async fn get_lot_size(&self, request: &LotSizeRequest) -> Result<LotSizeResponse, ApiError>;

    async fn disconnect_stock(&self, symbol: &str) -> Result<MessageResponse, ApiError>;

    async fn start_all_trading(
        &self,
        trading_parameters: &[Value],
        selected_brokers: &[BrokerSelection],
    ) -> Result<StartTradingResponse, ApiError>;

    async fn close_position(&self, symbol: &str) -> Result<MessageResponse, ApiError>;

    async fn close_all_positions(&self) -> Result<MessageResponse, ApiError>;
}

/// `TradingApi` over HTTP against the console backend.
#[derive(Debug, Clone)]
pub struct ConsoleApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ConsoleApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| {
                ApiError::Deserialization(format!("{}. Original text: {}", e, text))
            })
        } else {
            Err(ApiError::ApiError(status.as_u16(), text))
        }
    }
}

#[async_trait]
impl TradingApi for ConsoleApiClient {
    async fn connect_broker(
        &self,
        brokers: &[BrokerSelection],
    ) -> Result<Vec<BrokerConnectResult>, ApiError> {
        self.post("/connect-broker", &json!({ "brokers": brokers })).await
    }

    async fn get_lot_size(&self, request: &LotSizeRequest) -> Result<LotSizeResponse, ApiError> {
        self.post("/get-lot-size", request).await
    }

    async fn disconnect_stock(&self, symbol: &str) -> Result<MessageResponse, ApiError> {
        self.post("/disconnect-stock", &json!({ "symbol_value": symbol })).await
    }

    async fn start_all_trading(
        &self,
        trading_parameters: &[Value],
        selected_brokers: &[BrokerSelection],
    ) -> Result<StartTradingResponse, ApiError> {
        let body = StartTradingRequest {
            trading_parameters,
            selected_brokers,
        };
        self.post("/start-all-trading", &body).await
    }

    async fn close_position(&self, symbol: &str) -> Result<MessageResponse, ApiError> {
        self.post("/close-position", &json!({ "symbol_value": symbol })).await
    }

    async fn close_all_positions(&self) -> Result<MessageResponse, ApiError> {
        self.post("/close-all-positions", &json!({})).await
    }
}
