//! Inbound payment notifications.
//!
//! Verification runs entirely on headers and body, before any storage is
//! touched: vendor, timestamp freshness, declared field list, digest.

use axum::http::HeaderMap;
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::PaymentConfig;
use crate::payments::models::OrderStatus;
use crate::payments::signing::{
    parse_fields_header, verify, SignatureError, HEADER_SIGNATURE, HEADER_SIGNED_FIELDS,
    HEADER_TIMESTAMP, HEADER_VENDOR_ID,
};

/// Fields every notification must sign.
const REQUIRED_SIGNED_FIELDS: &[&str] = &["order_id", "status"];

#[derive(Debug, Error, PartialEq)]
pub enum WebhookError {
    #[error("missing header '{0}'")]
    MissingHeader(&'static str),

    #[error("invalid timestamp header")]
    InvalidTimestamp,

    #[error("timestamp is {skew}s away from server time")]
    Stale { skew: u64 },

    #[error("vendor id does not match")]
    VendorMismatch,

    #[error("body is not a JSON object")]
    MalformedBody,

    #[error("field '{0}' must be signed")]
    UnsignedField(&'static str),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// A notification whose signature has been checked.
#[derive(Debug, Clone)]
pub struct VerifiedNotification {
    pub order_id: String,
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub amount: Option<i64>,
    pub timestamp: i64,
    pub digest: String,
    pub payload: Value,
}

impl VerifiedNotification {
    /// Identity of this delivery for replay detection.
    pub fn replay_key(&self) -> String {
        format!(
            "webhook:{}:{}:{}",
            self.order_id, self.timestamp, self.digest
        )
    }
}

pub fn verify_notification(
    config: &PaymentConfig,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<VerifiedNotification, WebhookError> {
    let timestamp: i64 = header(headers, HEADER_TIMESTAMP)?
        .trim()
        .parse()
        .map_err(|_| WebhookError::InvalidTimestamp)?;
    let digest = header(headers, HEADER_SIGNATURE)?.trim().to_string();
    let fields_header = header(headers, HEADER_SIGNED_FIELDS)?;

    let skew = now.abs_diff(timestamp);
    if skew > config.webhook_tolerance_secs.max(0) as u64 {
        return Err(WebhookError::Stale { skew });
    }

    ensure_vendor(config, header(headers, HEADER_VENDOR_ID)?.trim())?;

    let payload: Map<String, Value> = match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => map,
        _ => return Err(WebhookError::MalformedBody),
    };
    if let Some(vendor) = payload.get("vendor_id").and_then(Value::as_str) {
        ensure_vendor(config, vendor)?;
    }

    let fields = parse_fields_header(fields_header);
    for required in REQUIRED_SIGNED_FIELDS {
        if !fields.contains(required) {
            return Err(WebhookError::UnsignedField(*required));
        }
    }

    verify(
        config.secret.as_bytes(),
        timestamp,
        &fields,
        &payload,
        &digest,
    )?;

    let order_id = payload
        .get("order_id")
        .and_then(Value::as_str)
        .ok_or_else(|| WebhookError::InvalidPayload("order_id must be a string".to_string()))?
        .to_string();
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| WebhookError::InvalidPayload("status must be a string".to_string()))?
        .parse::<OrderStatus>()
        .map_err(WebhookError::InvalidPayload)?;
    let transaction_id = signed_value(&payload, &fields, "transaction_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let amount = match signed_value(&payload, &fields, "amount") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_amount(value).ok_or_else(|| {
            WebhookError::InvalidPayload(format!("amount {value} is not an integer"))
        })?),
    };

    Ok(VerifiedNotification {
        order_id,
        status,
        transaction_id,
        amount,
        timestamp,
        digest,
        payload: Value::Object(payload),
    })
}

/// Values outside the signed field list are treated as absent.
fn signed_value<'p>(
    payload: &'p Map<String, Value>,
    fields: &[&str],
    name: &str,
) -> Option<&'p Value> {
    if fields.iter().any(|f| *f == name) {
        payload.get(name)
    } else {
        None
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

fn ensure_vendor(config: &PaymentConfig, vendor: &str) -> Result<(), WebhookError> {
    if bool::from(vendor.as_bytes().ct_eq(config.vendor_id.as_bytes())) {
        Ok(())
    } else {
        Err(WebhookError::VendorMismatch)
    }
}

/// Amounts arrive as JSON numbers or numeric strings ("1000", "1000.00").
fn parse_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::signing::sign;
    use axum::http::HeaderValue;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn config() -> PaymentConfig {
        PaymentConfig {
            api_url: "https://gateway.example".to_string(),
            vendor_id: "VENDOR-1".to_string(),
            secret: "shh".to_string(),
            price: 1000,
            currency: "XOF".to_string(),
            webhook_tolerance_secs: 300,
        }
    }

    fn signed(body: Value, timestamp: i64) -> (HeaderMap, Vec<u8>) {
        let map = body.as_object().cloned().unwrap();
        let sig = sign(b"shh", timestamp, &map);
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_VENDOR_ID, HeaderValue::from_static("VENDOR-1"));
        headers.insert(
            HEADER_TIMESTAMP,
            HeaderValue::from_str(&timestamp.to_string()).unwrap(),
        );
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_str(&sig.digest).unwrap());
        headers.insert(
            HEADER_SIGNED_FIELDS,
            HeaderValue::from_str(&sig.fields_header()).unwrap(),
        );
        (headers, serde_json::to_vec(&body).unwrap())
    }

    fn completed_body() -> Value {
        json!({
            "vendor_id": "VENDOR-1",
            "order_id": "CVCC-1",
            "status": "COMPLETED",
            "transaction_id": "tx-77",
            "amount": "1000"
        })
    }

    #[test]
    fn test_valid_notification() {
        let (headers, body) = signed(completed_body(), NOW);
        let n = verify_notification(&config(), &headers, &body, NOW + 10).unwrap();
        assert_eq!(n.order_id, "CVCC-1");
        assert_eq!(n.status, OrderStatus::Completed);
        assert_eq!(n.transaction_id.as_deref(), Some("tx-77"));
        assert_eq!(n.amount, Some(1000));
        assert!(n.replay_key().starts_with("webhook:CVCC-1:1700000000:"));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let (headers, body) = signed(completed_body(), NOW - 301);
        assert_eq!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::Stale { skew: 301 }
        );
    }

    #[test]
    fn test_tampered_body_rejected() {
        let (headers, _) = signed(completed_body(), NOW);
        let mut forged = completed_body();
        forged["amount"] = json!("1");
        let body = serde_json::to_vec(&forged).unwrap();
        assert_eq!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::Signature(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_vendor_rejected() {
        let mut body = completed_body();
        body["vendor_id"] = json!("SOMEONE-ELSE");
        let (headers, body) = signed(body, NOW);
        assert_eq!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::VendorMismatch
        );
    }

    #[test]
    fn test_status_must_be_signed() {
        let (mut headers, body) = signed(completed_body(), NOW);
        headers.insert(
            HEADER_SIGNED_FIELDS,
            HeaderValue::from_static("vendor_id,order_id"),
        );
        assert_eq!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::UnsignedField("status")
        );
    }

    #[test]
    fn test_missing_signature_header() {
        let (mut headers, body) = signed(completed_body(), NOW);
        headers.remove(HEADER_SIGNATURE);
        assert_eq!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::MissingHeader(HEADER_SIGNATURE)
        );
    }

    #[test]
    fn test_non_object_body_rejected() {
        let (headers, _) = signed(completed_body(), NOW);
        assert_eq!(
            verify_notification(&config(), &headers, b"[1,2]", NOW).unwrap_err(),
            WebhookError::MalformedBody
        );
    }

    #[test]
    fn test_extreme_timestamp_is_stale_not_a_panic() {
        let (mut headers, body) = signed(completed_body(), NOW);
        headers.insert(
            HEADER_TIMESTAMP,
            HeaderValue::from_str(&i64::MIN.to_string()).unwrap(),
        );
        assert!(matches!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::Stale { .. }
        ));

        headers.insert(
            HEADER_TIMESTAMP,
            HeaderValue::from_str(&i64::MAX.to_string()).unwrap(),
        );
        assert!(matches!(
            verify_notification(&config(), &headers, &body, i64::MIN).unwrap_err(),
            WebhookError::Stale { .. }
        ));
    }

    #[test]
    fn test_vendor_header_is_mandatory() {
        let (mut headers, body) = signed(json!({"order_id": "CVCC-1", "status": "COMPLETED"}), NOW);
        headers.remove(HEADER_VENDOR_ID);
        assert_eq!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::MissingHeader(HEADER_VENDOR_ID)
        );
    }

    #[test]
    fn test_wrong_vendor_header_rejected() {
        let (mut headers, body) = signed(completed_body(), NOW);
        headers.insert(HEADER_VENDOR_ID, HeaderValue::from_static("VENDOR-2"));
        assert_eq!(
            verify_notification(&config(), &headers, &body, NOW).unwrap_err(),
            WebhookError::VendorMismatch
        );
    }

    #[test]
    fn test_unsigned_amount_and_transaction_are_ignored() {
        let (headers, _) = signed(
            json!({"vendor_id": "VENDOR-1", "order_id": "CVCC-1", "status": "COMPLETED"}),
            NOW,
        );
        let body = serde_json::to_vec(&json!({
            "vendor_id": "VENDOR-1",
            "order_id": "CVCC-1",
            "status": "COMPLETED",
            "amount": 1000,
            "transaction_id": "tx-forged"
        }))
        .unwrap();
        let n = verify_notification(&config(), &headers, &body, NOW).unwrap();
        assert_eq!(n.amount, None);
        assert_eq!(n.transaction_id, None);
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount(&json!(1000)), Some(1000));
        assert_eq!(parse_amount(&json!("1000.00")), Some(1000));
        assert_eq!(parse_amount(&json!(10.5)), None);
        assert_eq!(parse_amount(&json!("dix")), None);
    }
}
