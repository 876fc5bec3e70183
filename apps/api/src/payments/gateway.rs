//! Mobile-money gateway client, the only module that talks to the payment
//! provider. Every request carries the HMAC headers from `signing`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PaymentConfig;
use crate::payments::models::{
    CreateOrderRequest, CreateOrderResponse, OrderStatusResponse, WalletPushRequest,
    WalletPushResponse,
};
use crate::payments::signing::{
    sign, HEADER_SIGNATURE, HEADER_SIGNED_FIELDS, HEADER_TIMESTAMP, HEADER_VENDOR_ID,
};

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Gateway unavailable after {retries} attempts")]
    Unavailable { retries: u32 },
}

/// Operations the checkout flow needs from a payment provider.
///
/// Carried in `AppState` as `Arc<dyn PaymentGateway>`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, GatewayError>;

    /// Triggers the USSD prompt on the payer's handset.
    async fn push_wallet(
        &self,
        request: &WalletPushRequest,
    ) -> Result<WalletPushResponse, GatewayError>;

    async fn order_status(&self, order_id: &str) -> Result<OrderStatusResponse, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    message: String,
}

#[derive(Serialize)]
struct VendorScoped<'a, T: Serialize> {
    vendor_id: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

/// reqwest-backed implementation of [`PaymentGateway`].
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    vendor_id: String,
    secret: String,
}

impl HttpGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            vendor_id: config.vendor_id.clone(),
            secret: config.secret.clone(),
        })
    }

    fn scoped<T: Serialize>(&self, body: &T) -> Result<Map<String, Value>, GatewayError> {
        let value = serde_json::to_value(VendorScoped {
            vendor_id: &self.vendor_id,
            body,
        })
        .map_err(|e| GatewayError::InvalidResponse(format!("unserializable request: {e}")))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(GatewayError::InvalidResponse(
                "request body is not an object".to_string(),
            )),
        }
    }

    /// Sends a signed request, retrying transport errors, 429 and 5xx with
    /// exponential backoff. A fresh timestamp is signed on every attempt.
    async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Map<String, Value>,
    ) -> Result<R, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<GatewayError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(BASE_BACKOFF_MS * (1 << (attempt - 1)));
                warn!(
                    "Gateway call {} {} attempt {} failed, retrying after {}ms...",
                    method,
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let signature = sign(
                self.secret.as_bytes(),
                chrono::Utc::now().timestamp(),
                &payload,
            );

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(HEADER_VENDOR_ID, &self.vendor_id)
                .header(HEADER_TIMESTAMP, signature.timestamp.to_string())
                .header(HEADER_SIGNATURE, &signature.digest)
                .header(HEADER_SIGNED_FIELDS, signature.fields_header());
            request = if method == Method::GET {
                request.query(&payload)
            } else {
                request.json(&payload)
            };

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(GatewayError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Gateway returned {}: {}", status, body);
                last_error = Some(GatewayError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            let body = response.text().await?;
            if !status.is_success() {
                let message = serde_json::from_str::<GatewayErrorBody>(&body)
                    .map(|e| e.message)
                    .unwrap_or(body);
                return Err(GatewayError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!("Gateway call {} {} succeeded", method, path);
            return serde_json::from_str(&body)
                .map_err(|e| GatewayError::InvalidResponse(format!("{e}: {body}")));
        }

        Err(last_error.unwrap_or(GatewayError::Unavailable {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, GatewayError> {
        let payload = self.scoped(request)?;
        self.send(Method::POST, "/v1/orders", payload).await
    }

    async fn push_wallet(
        &self,
        request: &WalletPushRequest,
    ) -> Result<WalletPushResponse, GatewayError> {
        let payload = self.scoped(request)?;
        self.send(Method::POST, "/v1/payments/push", payload).await
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatusResponse, GatewayError> {
        let payload = self.scoped(&serde_json::json!({ "order_id": order_id }))?;
        let path = format!("/v1/orders/{order_id}");
        self.send(Method::GET, &path, payload).await
    }
}
