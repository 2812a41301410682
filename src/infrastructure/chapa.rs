//! Chapa-compatible payment provider over HTTPS.

use crate::domain::payment::{
    CheckoutRequest, GatewayError, PaymentStatus, VerifiedPayment,
};
use crate::domain::ports::PaymentProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.chapa.co/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ChapaConfig {
    pub base_url: String,
    pub secret_key: String,
    /// Where the provider should deliver payment callbacks.
    pub callback_url: Option<String>,
    pub timeout: Duration,
}

impl ChapaConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            secret_key: secret_key.into(),
            callback_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChapaClient {
    base_url: Url,
    secret_key: String,
    callback_url: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    tx_ref: Option<String>,
    #[serde(default)]
    status: Option<String>,
    amount: Decimal,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl ChapaClient {
    pub fn new(config: ChapaConfig) -> Result<Self, GatewayError> {
        if config.secret_key.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "gateway secret key is not configured".to_string(),
            ));
        }
        // A trailing slash keeps `Url::join` from dropping the last path segment.
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid gateway url: {e}")))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            secret_key: config.secret_key,
            callback_url: config.callback_url,
            http,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidRequest("gateway url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_envelope(response: reqwest::Response) -> Result<Envelope, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("failed to read response: {e}")))?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::Unavailable(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            let message = serde_json::from_str::<Envelope>(&body)
                .map(|env| describe(&env.message))
                .unwrap_or(body);
            return Err(GatewayError::Rejected(format!("HTTP {status}: {message}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("unexpected body: {e}")))
    }
}

fn describe(message: &Value) -> String {
    match message {
        Value::String(text) => text.clone(),
        Value::Null => "no message".to_string(),
        other => other.to_string(),
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Unavailable(format!("request timed out: {e}"))
    } else {
        GatewayError::Unavailable(format!("request failed: {e}"))
    }
}

fn parse_paid_at(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

#[async_trait]
impl PaymentProvider for ChapaClient {
    async fn initialize(&self, checkout: &CheckoutRequest) -> Result<String, GatewayError> {
        let url = self.endpoint(&["transaction", "initialize"])?;
        let tx_ref = checkout.tx_ref.to_string();
        let mut payload = json!({
            "amount": checkout.amount.to_string(),
            "currency": checkout.currency,
            "first_name": checkout.payer.name,
            "tx_ref": tx_ref,
            "customization": { "title": checkout.title },
        });
        if let Some(phone) = &checkout.payer.phone_number {
            payload["phone_number"] = json!(phone);
        }
        if let Some(callback) = &self.callback_url {
            payload["callback_url"] = json!(callback);
        }

        debug!(reference = %tx_ref, "initializing payment");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        let envelope = Self::read_envelope(response).await?;

        if envelope.status.as_deref() != Some("success") {
            return Err(GatewayError::Rejected(describe(&envelope.message)));
        }
        envelope
            .data
            .as_ref()
            .and_then(|data| data.get("checkout_url"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("missing checkout_url in response".to_string())
            })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let url = self.endpoint(&["transaction", "verify", reference])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)?;
        let envelope = Self::read_envelope(response).await?;

        if envelope.status.as_deref() != Some("success") {
            warn!(reference, message = %describe(&envelope.message), "verification not successful");
            return Err(GatewayError::Rejected(describe(&envelope.message)));
        }
        let data = envelope.data.ok_or_else(|| {
            GatewayError::InvalidResponse("missing data in verification response".to_string())
        })?;
        let data: VerifyData = serde_json::from_value(data)
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid verification data: {e}")))?;

        Ok(VerifiedPayment {
            reference: data.tx_ref,
            status: data
                .status
                .as_deref()
                .map(PaymentStatus::from_provider)
                .unwrap_or(PaymentStatus::Failed),
            amount: data.amount,
            currency: data.currency,
            paid_at: parse_paid_at(data.created_at.as_deref()),
        })
    }
}
