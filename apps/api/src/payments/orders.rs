//! Payment orders: checkout creation, wallet push and status reconciliation.
//!
//! Flow: create_checkout → (optional) push_wallet → status observations from
//! polling or the webhook → apply_status → document `PaymentCompleted`.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::documents::lifecycle::LifecycleEvent;
use crate::documents::store;
use crate::errors::AppError;
use crate::models::payment::PaymentOrderRow;
use crate::payments::gateway::PaymentGateway;
use crate::payments::models::{CreateOrderRequest, OrderStatus, WalletPushRequest};
use crate::payments::phone::normalize_phone;

/// Orders younger than this are left alone by the reconciliation sweep.
pub const RECONCILE_MIN_AGE: Duration = Duration::from_secs(2 * 60);
const RECONCILE_BATCH: i64 = 100;

pub struct Buyer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Where a status observation came from; stored on every payment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    Webhook,
    Poll,
    Push,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSource::Webhook => "webhook",
            StatusSource::Poll => "poll",
            StatusSource::Push => "push",
        }
    }
}

pub struct StatusObservation {
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub amount: Option<i64>,
    pub source: StatusSource,
    pub payload: Value,
}

/// What applying an observation did to the order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ApplyOutcome {
    Updated { from: OrderStatus, to: OrderStatus },
    Unchanged,
    IgnoredTerminal,
    AmountMismatch,
}

/// Decides how an observed status affects an order, independent of storage.
pub fn decide(
    current: OrderStatus,
    observed: OrderStatus,
    expected_amount: i64,
    observed_amount: Option<i64>,
) -> ApplyOutcome {
    if current.is_terminal() {
        return ApplyOutcome::IgnoredTerminal;
    }
    if observed == OrderStatus::Completed
        && observed_amount.is_some_and(|amount| amount != expected_amount)
    {
        return ApplyOutcome::AmountMismatch;
    }
    // A late PENDING must not undo a wallet push already in progress.
    if observed == current
        || (current == OrderStatus::InProgress && observed == OrderStatus::Pending)
    {
        return ApplyOutcome::Unchanged;
    }
    ApplyOutcome::Updated {
        from: current,
        to: observed,
    }
}

pub fn new_order_id() -> String {
    format!("CVCC-{}", Uuid::new_v4().simple())
}

fn redirect_url(config: &Config, document_id: Uuid) -> String {
    format!(
        "{}/payment/return?document_id={document_id}",
        config.frontend_url
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

pub async fn get_owned_order(
    pool: &PgPool,
    order_id: &str,
    user_id: Uuid,
) -> Result<PaymentOrderRow, AppError> {
    sqlx::query_as::<_, PaymentOrderRow>(
        "SELECT * FROM payment_orders WHERE order_id = $1 AND user_id = $2",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))
}

async fn find_open_order(
    conn: &mut PgConnection,
    document_id: Uuid,
) -> Result<Option<PaymentOrderRow>, AppError> {
    Ok(sqlx::query_as::<_, PaymentOrderRow>(
        r#"
        SELECT * FROM payment_orders
        WHERE document_id = $1 AND status IN ('PENDING', 'INPROGRESS')
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(document_id)
    .fetch_optional(&mut *conn)
    .await?)
}

async fn insert_event(
    conn: &mut PgConnection,
    order_id: &str,
    source: StatusSource,
    status: OrderStatus,
    payload: &Value,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO payment_events (id, order_id, source, status, payload)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(source.as_str())
    .bind(status.as_str())
    .bind(payload)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Checkout
// ────────────────────────────────────────────────────────────────────────────

/// Creates (or returns the still-open) checkout order for a document.
///
/// The document row stays locked from the open-order lookup until the new
/// order is stored, so concurrent checkouts for one document serialize and
/// the later one reuses the order the first created.
pub async fn create_checkout(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    config: &Config,
    user_id: Uuid,
    document_id: Uuid,
    buyer: Buyer,
) -> Result<PaymentOrderRow, AppError> {
    let buyer_name = buyer.name.trim().to_string();
    if buyer_name.is_empty() {
        return Err(AppError::Validation("buyer_name cannot be empty".to_string()));
    }
    let buyer_phone = normalize_phone(&buyer.phone).map_err(AppError::Validation)?;
    let buyer_email = buyer
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    let mut tx = pool.begin().await?;

    let document = store::lock_document(&mut tx, document_id).await?;
    if document.user_id != user_id {
        return Err(AppError::NotFound(format!("Document {document_id} not found")));
    }
    document.status()?.apply(LifecycleEvent::OrderCreated)?;

    if let Some(open) = find_open_order(&mut tx, document_id).await? {
        info!(order_id = %open.order_id, "Reusing open order for document {document_id}");
        return Ok(open);
    }

    let order_id = new_order_id();
    let request = CreateOrderRequest {
        order_id: order_id.clone(),
        amount: config.payment.price,
        currency: config.payment.currency.clone(),
        description: format!("CV Chap Chap - {}", document.title),
        buyer_name: buyer_name.clone(),
        buyer_phone: buyer_phone.clone(),
        buyer_email: buyer_email.clone(),
        webhook_url: BASE64.encode(config.webhook_url()),
        redirect_url: BASE64.encode(redirect_url(config, document_id)),
    };

    let created = gateway.create_order(&request).await?;
    info!(%order_id, "Gateway order created for document {document_id}");

    let order = sqlx::query_as::<_, PaymentOrderRow>(
        r#"
        INSERT INTO payment_orders
            (id, order_id, document_id, user_id, amount, currency, buyer_name, buyer_phone,
             buyer_email, token, checkout_url, transaction_id, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&order_id)
    .bind(document_id)
    .bind(user_id)
    .bind(request.amount)
    .bind(&request.currency)
    .bind(&buyer_name)
    .bind(&buyer_phone)
    .bind(&buyer_email)
    .bind(&created.token)
    .bind(&created.checkout_url)
    .bind(&created.transaction_id)
    .bind(OrderStatus::Pending.as_str())
    .fetch_one(&mut *tx)
    .await?;

    store::transition(&mut tx, &document, LifecycleEvent::OrderCreated).await?;
    tx.commit().await?;

    Ok(order)
}

/// Sends the USSD debit prompt for an open order. A push the gateway refuses
/// is logged as an event but leaves the order where it was.
pub async fn push_wallet(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    user_id: Uuid,
    order_id: &str,
    phone: &str,
    operator: Option<String>,
) -> Result<PaymentOrderRow, AppError> {
    let order = get_owned_order(pool, order_id, user_id).await?;
    if order.status().is_terminal() {
        return Err(AppError::Conflict(format!(
            "Order {order_id} is already {}",
            order.status
        )));
    }
    let phone_number = normalize_phone(phone).map_err(AppError::Validation)?;
    let transaction_id = order
        .transaction_id
        .clone()
        .or_else(|| order.token.clone())
        .ok_or_else(|| AppError::Conflict(format!("Order {order_id} has no transaction id")))?;

    let pushed = gateway
        .push_wallet(&WalletPushRequest {
            transaction_id,
            phone_number: phone_number.clone(),
            operator: operator.clone(),
        })
        .await?;
    info!(%order_id, gateway_status = %pushed.status, "Wallet push sent");

    let accepted = pushed.is_accepted();
    let mut tx = pool.begin().await?;
    insert_event(
        &mut tx,
        order_id,
        StatusSource::Push,
        if accepted {
            OrderStatus::InProgress
        } else {
            order.status()
        },
        &serde_json::json!({
            "status": pushed.status,
            "message": pushed.message,
            "phone_number": phone_number,
            "accepted": accepted,
        }),
    )
    .await?;

    if !accepted {
        tx.commit().await?;
        warn!(%order_id, gateway_status = %pushed.status, "Wallet push refused by gateway");
        return Err(AppError::UnprocessableEntity(format!(
            "The payment provider refused the wallet push: {}",
            pushed.message.as_deref().unwrap_or(pushed.status.as_str())
        )));
    }

    let updated = sqlx::query_as::<_, PaymentOrderRow>(
        r#"
        UPDATE payment_orders
        SET status = CASE WHEN status = 'PENDING' THEN 'INPROGRESS' ELSE status END,
            operator = COALESCE($1, operator),
            buyer_phone = $2,
            updated_at = NOW()
        WHERE order_id = $3
        RETURNING *
        "#,
    )
    .bind(&operator)
    .bind(&phone_number)
    .bind(order_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(updated)
}

// ────────────────────────────────────────────────────────────────────────────
// Reconciliation
// ────────────────────────────────────────────────────────────────────────────

/// Records an observation and applies it to the order and its document in a
/// single transaction. The event is kept even when the observation is ignored.
pub async fn apply_status(
    pool: &PgPool,
    order_id: &str,
    observation: StatusObservation,
) -> Result<ApplyOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, PaymentOrderRow>(
        "SELECT * FROM payment_orders WHERE order_id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

    insert_event(
        &mut tx,
        order_id,
        observation.source,
        observation.status,
        &observation.payload,
    )
    .await?;

    let outcome = decide(
        order.status(),
        observation.status,
        order.amount,
        observation.amount,
    );

    match outcome {
        ApplyOutcome::IgnoredTerminal => {
            if observation.status != order.status() {
                warn!(
                    %order_id,
                    current = %order.status,
                    observed = %observation.status,
                    "Ignoring status change on terminal order"
                );
            }
        }
        ApplyOutcome::AmountMismatch => {
            error!(
                %order_id,
                expected = order.amount,
                observed = ?observation.amount,
                "Completed payment amount does not match order"
            );
        }
        ApplyOutcome::Unchanged => {}
        ApplyOutcome::Updated { from, to } => {
            sqlx::query(
                r#"
                UPDATE payment_orders
                SET status = $1, transaction_id = COALESCE($2, transaction_id), updated_at = NOW()
                WHERE order_id = $3
                "#,
            )
            .bind(to.as_str())
            .bind(&observation.transaction_id)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

            info!(%order_id, %from, %to, source = observation.source.as_str(), "Order status updated");

            if to == OrderStatus::Completed {
                let document = store::lock_document(&mut tx, order.document_id).await?;
                store::transition(&mut tx, &document, LifecycleEvent::PaymentCompleted).await?;
            }
        }
    }

    tx.commit().await?;
    Ok(outcome)
}

/// Asks the gateway for the latest status of an order and applies it.
/// Terminal orders are returned without a gateway call.
pub async fn poll_order(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    order: PaymentOrderRow,
) -> Result<PaymentOrderRow, AppError> {
    if order.status().is_terminal() {
        return Ok(order);
    }

    let remote = gateway.order_status(&order.order_id).await?;
    if remote.order_id != order.order_id {
        return Err(AppError::Internal(anyhow::anyhow!(
            "gateway answered for order {} when asked about {}",
            remote.order_id,
            order.order_id
        )));
    }

    let payload = serde_json::json!({
        "order_id": remote.order_id,
        "status": remote.status,
        "transaction_id": remote.transaction_id,
        "amount": remote.amount,
    });
    apply_status(
        pool,
        &order.order_id,
        StatusObservation {
            status: remote.status,
            transaction_id: remote.transaction_id,
            amount: remote.amount,
            source: StatusSource::Poll,
            payload,
        },
    )
    .await?;

    sqlx::query_as::<_, PaymentOrderRow>("SELECT * FROM payment_orders WHERE order_id = $1")
        .bind(&order.order_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)
}

#[derive(Debug, Default, Serialize)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub settled: usize,
    pub failed: usize,
}

/// Polls every open order older than `min_age`. Failures are logged and
/// counted; one bad order does not stop the sweep.
pub async fn reconcile_open_orders(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    min_age: Duration,
) -> Result<ReconcileSummary, AppError> {
    let cutoff = chrono::Utc::now()
        - chrono::Duration::from_std(min_age)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid min age: {e}")))?;

    let open = sqlx::query_as::<_, PaymentOrderRow>(
        r#"
        SELECT * FROM payment_orders
        WHERE status IN ('PENDING', 'INPROGRESS') AND created_at < $1
        ORDER BY created_at ASC
        LIMIT $2
        "#,
    )
    .bind(cutoff)
    .bind(RECONCILE_BATCH)
    .fetch_all(pool)
    .await?;

    let mut summary = ReconcileSummary::default();
    for order in open {
        summary.checked += 1;
        let order_id = order.order_id.clone();
        match poll_order(pool, gateway, order).await {
            Ok(updated) if updated.status().is_terminal() => summary.settled += 1,
            Ok(_) => {}
            Err(e) => {
                summary.failed += 1;
                warn!(%order_id, "Reconciliation failed: {e}");
            }
        }
    }

    info!(
        "Reconciliation sweep: checked={} settled={} failed={}",
        summary.checked, summary.settled, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::models::OrderStatus::*;

    #[test]
    fn test_completed_payment_updates_open_order() {
        assert_eq!(
            decide(Pending, Completed, 1000, Some(1000)),
            ApplyOutcome::Updated {
                from: Pending,
                to: Completed
            }
        );
        assert_eq!(
            decide(InProgress, Completed, 1000, None),
            ApplyOutcome::Updated {
                from: InProgress,
                to: Completed
            }
        );
    }

    #[test]
    fn test_terminal_orders_never_change() {
        for terminal in [Completed, Cancelled, UserCancelled, Rejected] {
            for observed in OrderStatus::ALL {
                assert_eq!(
                    decide(terminal, observed, 1000, Some(1000)),
                    ApplyOutcome::IgnoredTerminal
                );
            }
        }
    }

    #[test]
    fn test_amount_mismatch_blocks_completion() {
        assert_eq!(
            decide(Pending, Completed, 1000, Some(100)),
            ApplyOutcome::AmountMismatch
        );
        // Amount is only checked on completion.
        assert_eq!(
            decide(Pending, Rejected, 1000, Some(100)),
            ApplyOutcome::Updated {
                from: Pending,
                to: Rejected
            }
        );
    }

    #[test]
    fn test_stale_pending_does_not_regress_in_progress() {
        assert_eq!(decide(InProgress, Pending, 1000, None), ApplyOutcome::Unchanged);
        assert_eq!(decide(Pending, Pending, 1000, None), ApplyOutcome::Unchanged);
        assert_eq!(
            decide(Pending, InProgress, 1000, None),
            ApplyOutcome::Updated {
                from: Pending,
                to: InProgress
            }
        );
    }

    #[test]
    fn test_order_id_format() {
        let id = new_order_id();
        assert!(id.starts_with("CVCC-"));
        assert_eq!(id.len(), 5 + 32);
        assert_ne!(id, new_order_id());
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(ApplyOutcome::Updated {
            from: Pending,
            to: Completed,
        })
        .unwrap();
        assert_eq!(value["outcome"], "updated");
        assert_eq!(value["to"], "COMPLETED");
    }
}
