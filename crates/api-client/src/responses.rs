use chrono::{DateTime, SecondsFormat, Utc};
use core_types::NormalizedRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// The backend speaks snake_case except for the request envelopes noted below.

/// One broker the user selected, with the credentials typed into the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSelection {
    pub name: String,
    #[serde(default)]
    pub credentials: Value,
}

/// One entry of the `POST /connect-broker` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConnectResult {
    pub broker_key: String,
    pub status: String,
    #[serde(rename = "profileData", default)]
    pub profile_data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BrokerConnectResult {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// The body of `POST /get-lot-size`.
#[derive(Debug, Clone, Serialize)]
pub struct LotSizeRequest {
    pub symbol_key: String,
    pub symbol_value: String,
    #[serde(rename = "type")]
    pub instrument_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LotSizeResponse {
    #[serde(default)]
    pub lot_size: Option<Decimal>,
    #[serde(default)]
    pub tick_size: Option<Decimal>,
}

/// The body of `POST /start-all-trading`.
#[derive(Debug, Clone, Serialize)]
pub struct StartTradingRequest<'a> {
    #[serde(rename = "tradingParameters")]
    pub trading_parameters: &'a [Value],
    #[serde(rename = "selectedBrokers")]
    pub selected_brokers: &'a [BrokerSelection],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartTradingResponse {
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StartTradingResponse {
    /// The backend either returns its own log lines or a single message,
    /// which is stamped like any other feed record.
    pub fn log_lines(&self, captured_at: DateTime<Utc>) -> Vec<String> {
        if let Some(logs) = &self.logs {
            return logs.clone();
        }
        let message = self.message.as_deref().unwrap_or("Trading started.");
        let timestamp = captured_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        vec![NormalizedRecord::new(timestamp, "INFO", message).display]
    }
}

/// The `{ "message": ... }` reply shared by the disconnect and close endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageResponse {
    fn text(&self) -> &str {
        self.message.as_deref().unwrap_or("(no message)")
    }

    /// `🛑 {message}` after a stock was disconnected.
    pub fn disconnected_line(&self) -> String {
        format!("🛑 {}", self.text())
    }

    /// `🔵 {message}` after one or all positions were closed.
    pub fn closed_line(&self) -> String {
        format!("🔵 {}", self.text())
    }
}

/// The line logged when a console action could not reach the backend.
pub fn failure_line(action: &str) -> String {
    format!("❌ Error {}", action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_trading_prefers_backend_logs() {
        let response: StartTradingResponse =
            serde_json::from_str(r#"{"logs":["a","b"],"message":"ignored"}"#).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(response.log_lines(now), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn start_trading_stamps_a_bare_message() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 15, 0).unwrap();
        let response: StartTradingResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(
            response.log_lines(now),
            vec!["[2024-01-01T09:15:00.000Z] INFO: Trading started.".to_string()]
        );
    }

    #[test]
    fn message_replies_become_icon_lines() {
        let reply: MessageResponse =
            serde_json::from_str(r#"{"message":"Closed NIFTY position"}"#).unwrap();
        assert_eq!(reply.closed_line(), "🔵 Closed NIFTY position");
        assert_eq!(reply.disconnected_line(), "🛑 Closed NIFTY position");
        assert_eq!(MessageResponse::default().closed_line(), "🔵 (no message)");
        assert_eq!(failure_line("closing all positions"), "❌ Error closing all positions");
    }

    #[test]
    fn lot_size_accepts_numbers() {
        let reply: LotSizeResponse = serde_json::from_str(r#"{"lot_size":75,"tick_size":0.05}"#).unwrap();
        assert_eq!(reply.lot_size, Some(Decimal::from(75)));
        assert_eq!(reply.tick_size, Some(Decimal::new(5, 2)));
    }

    #[test]
    fn broker_results_keep_profile_data() {
        let results: Vec<BrokerConnectResult> = serde_json::from_str(
            r#"[{"broker_key":"u","status":"success","profileData":{"name":"A"}},
                {"broker_key":"z","status":"failed","message":"bad otp"}]"#,
        )
        .unwrap();
        assert!(results[0].is_success());
        assert!(results[0].profile_data.is_some());
        assert!(!results[1].is_success());
        assert_eq!(results[1].message.as_deref(), Some("bad otp"));
    }
}
