use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::admin::auth::require_admin;
use crate::documents::lifecycle::DocumentStatus;
use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::models::payment::{PaymentEventRow, PaymentOrderRow};
use crate::payments::models::OrderStatus;
use crate::payments::orders::{reconcile_open_orders, ReconcileSummary, RECONCILE_MIN_AGE};
use crate::state::AppState;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub documents: BTreeMap<String, i64>,
    pub orders: BTreeMap<String, i64>,
    /// Sum of completed order amounts.
    pub revenue: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: PaymentOrderRow,
    pub events: Vec<PaymentEventRow>,
}

/// Zero-filled counts so the dashboard always sees every status.
fn fill_counts<'a>(
    statuses: impl Iterator<Item = &'a str>,
    rows: Vec<(String, i64)>,
) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = statuses.map(|s| (s.to_string(), 0)).collect();
    for (status, count) in rows {
        *counts.entry(status).or_insert(0) += count;
    }
    counts
}

async fn count_by_status(pool: &PgPool, table: &str) -> Result<Vec<(String, i64)>, AppError> {
    Ok(sqlx::query_as::<_, (String, i64)>(&format!(
        "SELECT status, COUNT(*) FROM {table} GROUP BY status"
    ))
    .fetch_all(pool)
    .await?)
}

/// GET /api/v1/admin/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    let documents = count_by_status(&state.db, "cv_documents").await?;
    let orders = count_by_status(&state.db, "payment_orders").await?;
    let revenue: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM payment_orders WHERE status = $1",
    )
    .bind(OrderStatus::Completed.as_str())
    .fetch_one(&state.db)
    .await?;

    Ok(Json(StatsResponse {
        documents: fill_counts(DocumentStatus::ALL.iter().map(|s| s.as_str()), documents),
        orders: fill_counts(OrderStatus::ALL.iter().map(|s| s.as_str()), orders),
        revenue,
        currency: state.config.payment.currency.clone(),
    }))
}

/// GET /api/v1/admin/documents?status=&limit=
pub async fn handle_list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<DocumentStatus>())
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let rows = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT * FROM cv_documents
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY updated_at DESC
        LIMIT $2
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(query.limit())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// GET /api/v1/admin/orders?status=&limit=
///
/// Each order carries its full event trail, oldest first.
pub async fn handle_list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AdminOrder>>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<OrderStatus>())
        .transpose()
        .map_err(AppError::Validation)?;

    let orders = sqlx::query_as::<_, PaymentOrderRow>(
        r#"
        SELECT * FROM payment_orders
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(query.limit())
    .fetch_all(&state.db)
    .await?;

    let order_ids: Vec<String> = orders.iter().map(|o| o.order_id.clone()).collect();
    let events = sqlx::query_as::<_, PaymentEventRow>(
        "SELECT * FROM payment_events WHERE order_id = ANY($1) ORDER BY received_at ASC",
    )
    .bind(&order_ids)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(attach_events(orders, events)))
}

fn attach_events(orders: Vec<PaymentOrderRow>, events: Vec<PaymentEventRow>) -> Vec<AdminOrder> {
    let mut by_order: HashMap<String, Vec<PaymentEventRow>> = HashMap::new();
    for event in events {
        by_order.entry(event.order_id.clone()).or_default().push(event);
    }
    orders
        .into_iter()
        .map(|order| {
            let events = by_order.remove(&order.order_id).unwrap_or_default();
            AdminOrder { order, events }
        })
        .collect()
}

/// POST /api/v1/admin/payments/reconcile
pub async fn handle_reconcile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReconcileSummary>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    info!("Admin-triggered payment reconciliation");
    let summary = reconcile_open_orders(&state.db, state.gateway.as_ref(), RECONCILE_MIN_AGE).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn order(order_id: &str) -> PaymentOrderRow {
        PaymentOrderRow {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            document_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: 1000,
            currency: "XOF".to_string(),
            buyer_name: "Awa Koné".to_string(),
            buyer_phone: "2250707070707".to_string(),
            buyer_email: None,
            operator: None,
            token: None,
            checkout_url: None,
            transaction_id: None,
            status: "PENDING".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn event(order_id: &str, status: &str) -> PaymentEventRow {
        PaymentEventRow {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            source: "webhook".to_string(),
            status: status.to_string(),
            payload: serde_json::json!({}),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_list_limit_is_clamped() {
        let q = |limit| ListQuery { status: None, limit };
        assert_eq!(q(None).limit(), DEFAULT_LIST_LIMIT);
        assert_eq!(q(Some(0)).limit(), 1);
        assert_eq!(q(Some(10_000)).limit(), MAX_LIST_LIMIT);
    }

    #[test]
    fn test_fill_counts_includes_missing_statuses() {
        let counts = fill_counts(
            DocumentStatus::ALL.iter().map(|s| s.as_str()),
            vec![("paid".to_string(), 3)],
        );
        assert_eq!(counts.len(), DocumentStatus::ALL.len());
        assert_eq!(counts["paid"], 3);
        assert_eq!(counts["draft"], 0);
    }

    #[test]
    fn test_attach_events_groups_by_order() {
        let orders = vec![order("CVCC-a"), order("CVCC-b")];
        let events = vec![
            event("CVCC-a", "INPROGRESS"),
            event("CVCC-a", "COMPLETED"),
        ];
        let result = attach_events(orders, events);
        assert_eq!(result[0].events.len(), 2);
        assert_eq!(result[0].events[1].status, "COMPLETED");
        assert!(result[1].events.is_empty());

        let json = serde_json::to_value(&result[0]).unwrap();
        assert_eq!(json["order_id"], "CVCC-a");
        assert_eq!(json["events"].as_array().unwrap().len(), 2);
    }
}
