use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::store::get_owned_document;
use crate::errors::AppError;
use crate::models::payment::PaymentOrderRow;
use crate::payments::orders::{
    apply_status, create_checkout, get_owned_order, poll_order, push_wallet, ApplyOutcome, Buyer,
    StatusObservation, StatusSource,
};
use crate::payments::replay::process_once;
use crate::payments::webhook::verify_notification;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub token: Option<String>,
    pub checkout_url: Option<String>,
}

impl From<PaymentOrderRow> for CheckoutResponse {
    fn from(order: PaymentOrderRow) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status,
            amount: order.amount,
            currency: order.currency,
            token: order.token,
            checkout_url: order.checkout_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WalletPushBody {
    pub user_id: Uuid,
    pub phone_number: String,
    pub operator: Option<String>,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub order: PaymentOrderRow,
    pub document_status: String,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(flatten)]
    pub outcome: Option<ApplyOutcome>,
}

/// POST /api/v1/payments/orders
pub async fn handle_create_order(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let order = create_checkout(
        &state.db,
        state.gateway.as_ref(),
        &state.config,
        req.user_id,
        req.document_id,
        Buyer {
            name: req.buyer_name,
            phone: req.buyer_phone,
            email: req.buyer_email,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// POST /api/v1/payments/orders/:order_id/push
pub async fn handle_wallet_push(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(req): Json<WalletPushBody>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let order = push_wallet(
        &state.db,
        state.gateway.as_ref(),
        req.user_id,
        &order_id,
        &req.phone_number,
        req.operator,
    )
    .await?;
    Ok(Json(order.into()))
}

/// GET /api/v1/payments/orders/:order_id/status
///
/// Polls the gateway for open orders, then reports both order and document state.
pub async fn handle_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<OrderStatusResponse>, AppError> {
    let order = get_owned_order(&state.db, &order_id, params.user_id).await?;
    let order = poll_order(&state.db, state.gateway.as_ref(), order).await?;
    let document = get_owned_document(&state.db, order.document_id, params.user_id).await?;

    Ok(Json(OrderStatusResponse {
        order,
        document_status: document.status,
    }))
}

/// POST /api/v1/payments/webhook
///
/// Signature problems answer 401 without touching the database. Replays are
/// acknowledged so the gateway stops retrying, but not applied again. A
/// delivery that fails to apply can be retried by the gateway.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let notification = verify_notification(
        &state.config.payment,
        &headers,
        &body,
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        warn!("Rejected payment webhook: {e}");
        AppError::Unauthorized
    })?;

    info!(
        order_id = %notification.order_id,
        status = %notification.status,
        "Payment webhook received"
    );

    let ttl = state.config.payment.webhook_tolerance_secs.max(1) as u64 * 2;
    let replay_key = notification.replay_key();
    let order_id = notification.order_id.clone();
    let outcome = process_once(
        state.replay_guard.as_ref(),
        &replay_key,
        ttl,
        apply_status(
            &state.db,
            &order_id,
            StatusObservation {
                status: notification.status,
                transaction_id: notification.transaction_id,
                amount: notification.amount,
                source: StatusSource::Webhook,
                payload: notification.payload,
            },
        ),
    )
    .await?;

    if outcome.is_none() {
        warn!(%order_id, "Duplicate webhook delivery ignored");
    }

    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::models::OrderStatus;

    #[test]
    fn test_webhook_ack_flattens_outcome() {
        let ack = WebhookAck {
            received: true,
            outcome: Some(ApplyOutcome::Updated {
                from: OrderStatus::Pending,
                to: OrderStatus::Completed,
            }),
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["received"], true);
        assert_eq!(value["outcome"], "updated");

        let duplicate = serde_json::to_value(WebhookAck {
            received: true,
            outcome: None,
        })
        .unwrap();
        assert!(duplicate.get("outcome").is_none());
    }

    #[test]
    fn test_checkout_request_email_optional() {
        let json = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "document_id": Uuid::new_v4(),
            "buyer_name": "Awa Koné",
            "buyer_phone": "0707070707"
        });
        let req: CheckoutRequest = serde_json::from_value(json).unwrap();
        assert!(req.buyer_email.is_none());
    }
}
