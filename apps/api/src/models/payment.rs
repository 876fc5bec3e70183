use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::payments::models::OrderStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentOrderRow {
    pub id: Uuid,
    pub order_id: String,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
    pub operator: Option<String>,
    pub token: Option<String>,
    pub checkout_url: Option<String>,
    pub transaction_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrderRow {
    /// Unknown statuses are treated as still pending so they get re-polled.
    pub fn status(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentEventRow {
    pub id: Uuid,
    pub order_id: String,
    pub source: String,
    pub status: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}
