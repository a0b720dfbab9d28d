//! HTTP client for the platform's collaborator endpoints.
//!
//! Thin wrapper over four order-platform endpoints: the order's plan
//! list, the order summary, the pin-pack pricing settings, and the
//! create-revision call. Every response uses the platform's
//! `{ success: boolean, ... }` envelope; decoding lives in pure parse
//! functions so it is testable without a server.
//!
//! All calls carry explicit connect and request timeouts — a hung
//! request surfaces as an error instead of an indefinite spinner.

use std::time::Duration;

use serde::Deserialize;

use crate::model::Plan;
use crate::submission::{PlanSubmission, SubmitRevisions};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Errors
// ============================================================================

/// Errors produced by collaborator calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// The request failed in transport (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success HTTP status.
    #[error("server returned status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The envelope carried `success: false`; `message` is the
    /// server-provided error text shown to the user.
    #[error("{message}")]
    Rejected { message: String },
}

/// Fatal failure of the initial screen load: the plans fetch failed, so
/// the screen cannot be shown at all and the caller should navigate back
/// to the order page with a notice.
#[derive(Debug, thiserror::Error)]
#[error("could not load plans: {source}")]
pub struct ScreenLoadError {
    #[from]
    pub source: ApiError,
}

// ============================================================================
// Wire types
// ============================================================================

/// Order summary relevant to this screen.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pin_pack_purchases_count: usize,
}

/// Pin-pack pricing and upsell copy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinPackSettings {
    pub pin_pack_price: f64,
    #[serde(default)]
    pub pin_pack_old_price: Option<f64>,
    #[serde(default)]
    pub pin_pack_discount_percent: Option<f64>,
    /// Upsell copy shown when one pin slot remains in the active group.
    #[serde(default)]
    pub message_when_1_left: String,
    /// Upsell copy shown when the active group is full.
    #[serde(default)]
    pub message_when_0_left: String,
}

/// Everything the annotation screen needs at startup.
#[derive(Debug, Clone)]
pub struct ScreenData {
    pub plans: Vec<Plan>,
    /// Degrades to `None` when the order fetch fails.
    pub order: Option<OrderInfo>,
    /// Degrades to `None` when the settings fetch fails; the pin-pack
    /// upsell is simply unavailable then.
    pub pin_pack: Option<PinPackSettings>,
}

#[derive(Deserialize)]
struct PlansEnvelope {
    success: bool,
    #[serde(default)]
    plans: Vec<Plan>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OrderEnvelope {
    success: bool,
    order: Option<OrderInfo>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinPackEnvelope {
    success: bool,
    pin_pack: Option<PinPackSettings>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevisionEnvelope {
    success: bool,
    /// Opaque to this subsystem; returned for the host to display.
    revision_request: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRevisionBody<'a> {
    order_id: &'a str,
    plan_id: &'a str,
    pins: &'a [crate::submission::SubmissionPin],
}

// ============================================================================
// Parsing
// ============================================================================

fn rejected(error: Option<String>) -> ApiError {
    ApiError::Rejected {
        message: error.unwrap_or_else(|| "request rejected".to_string()),
    }
}

pub fn parse_plans(json: &str) -> Result<Vec<Plan>, ApiError> {
    let env: PlansEnvelope = serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    if !env.success {
        return Err(rejected(env.error));
    }
    Ok(env.plans)
}

pub fn parse_order(json: &str) -> Result<OrderInfo, ApiError> {
    let env: OrderEnvelope = serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    if !env.success {
        return Err(rejected(env.error));
    }
    env.order
        .ok_or_else(|| ApiError::Parse("missing order field".to_string()))
}

pub fn parse_pin_pack(json: &str) -> Result<PinPackSettings, ApiError> {
    let env: PinPackEnvelope =
        serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    if !env.success {
        return Err(rejected(env.error));
    }
    env.pin_pack
        .ok_or_else(|| ApiError::Parse("missing pinPack field".to_string()))
}

pub fn parse_revision(json: &str) -> Result<serde_json::Value, ApiError> {
    let env: RevisionEnvelope =
        serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    if !env.success {
        return Err(rejected(env.error));
    }
    Ok(env.revision_request.unwrap_or(serde_json::Value::Null))
}

// ============================================================================
// Config
// ============================================================================

/// Client configuration with env-overridable defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl ApiConfig {
    /// Build the config from environment variables, falling back to
    /// defaults:
    ///
    /// - `PLAT_API_BASE_URL`
    /// - `PLAT_API_REQUEST_TIMEOUT_SECS`
    /// - `PLAT_API_CONNECT_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("PLAT_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout_secs: env_parse_u64(
                "PLAT_API_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            connect_timeout_secs: env_parse_u64(
                "PLAT_API_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

fn env_parse_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the collaborator endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    async fn get_text(&self, path: &str) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Status { status, body: text });
        }
        Ok(text)
    }

    /// `GET /orders/{orderId}/plans`
    pub async fn fetch_plans(&self, order_id: &str) -> Result<Vec<Plan>, ApiError> {
        let text = self.get_text(&format!("/orders/{order_id}/plans")).await?;
        parse_plans(&text)
    }

    /// `GET /orders/{orderId}`
    pub async fn fetch_order(&self, order_id: &str) -> Result<OrderInfo, ApiError> {
        let text = self.get_text(&format!("/orders/{order_id}")).await?;
        parse_order(&text)
    }

    /// `GET /settings/pin-pack`
    pub async fn fetch_pin_pack(&self) -> Result<PinPackSettings, ApiError> {
        let text = self.get_text("/settings/pin-pack").await?;
        parse_pin_pack(&text)
    }

    /// Load everything the screen needs: the three fetches run
    /// concurrently and the result is assembled once all settle. A plans
    /// failure is fatal; order info and pin-pack settings degrade to
    /// `None` with a warning.
    pub async fn load_screen(&self, order_id: &str) -> Result<ScreenData, ScreenLoadError> {
        let (plans, order, pin_pack) = tokio::join!(
            self.fetch_plans(order_id),
            self.fetch_order(order_id),
            self.fetch_pin_pack(),
        );

        let plans = plans?;
        log::info!("Loaded {} plans for order {}", plans.len(), order_id);

        let order = order
            .map_err(|e| log::warn!("Order info unavailable, degrading: {}", e))
            .ok();
        let pin_pack = pin_pack
            .map_err(|e| log::warn!("Pin-pack settings unavailable, degrading: {}", e))
            .ok();

        Ok(ScreenData {
            plans,
            order,
            pin_pack,
        })
    }
}

impl SubmitRevisions for ApiClient {
    /// `POST /revisions/create`, one call per plan in a submission batch.
    async fn create_revision(
        &self,
        order_id: &str,
        submission: &PlanSubmission,
    ) -> Result<serde_json::Value, ApiError> {
        let body = CreateRevisionBody {
            order_id,
            plan_id: submission.plan_id.as_str(),
            pins: &submission.pins,
        };

        let url = format!("{}/revisions/create", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Status { status, body: text });
        }
        parse_revision(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plans_success() {
        let json = r#"{
            "success": true,
            "plans": [
                {"id": "p1", "name": "Ground floor", "fileUrl": "https://cdn/p1.png"},
                {"id": "p2", "name": "First floor", "fileUrl": "https://cdn/p2.png"}
            ]
        }"#;
        let plans = parse_plans(json).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[1].name, "First floor");
    }

    #[test]
    fn test_parse_plans_rejected() {
        let json = r#"{"success": false, "error": "order not found"}"#;
        let err = parse_plans(json).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { message } if message == "order not found"));
    }

    #[test]
    fn test_parse_order() {
        let json = r#"{
            "success": true,
            "order": {"deadline": "2026-09-01", "status": "in_revision", "pinPackPurchasesCount": 2}
        }"#;
        let order = parse_order(json).unwrap();
        assert_eq!(order.pin_pack_purchases_count, 2);
        assert_eq!(order.status.as_deref(), Some("in_revision"));
    }

    #[test]
    fn test_parse_pin_pack() {
        let json = r#"{
            "success": true,
            "pinPack": {
                "pinPackPrice": 19.0,
                "pinPackOldPrice": 29.0,
                "pinPackDiscountPercent": 34.0,
                "messageWhen1Left": "Only one pin left!",
                "messageWhen0Left": "Your pins are used up."
            }
        }"#;
        let settings = parse_pin_pack(json).unwrap();
        assert_eq!(settings.pin_pack_price, 19.0);
        assert_eq!(settings.message_when_1_left, "Only one pin left!");
    }

    #[test]
    fn test_parse_revision_error_text_is_surfaced() {
        let json = r#"{"success": false, "error": "no revision credits left"}"#;
        let err = parse_revision(json).unwrap_err();
        assert_eq!(err.to_string(), "no revision credits left");
    }

    #[test]
    fn test_parse_revision_success() {
        let json = r#"{"success": true, "revisionRequest": {"id": "r1"}}"#;
        let value = parse_revision(json).unwrap();
        assert_eq!(value["id"], "r1");
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        assert!(matches!(parse_order("not json"), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}
