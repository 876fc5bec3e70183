pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::assistant::handlers as assistant;
use crate::assistant::import::MAX_PDF_BYTES;
use crate::documents::handlers as documents;
use crate::payments::handlers as payments;
use crate::state::AppState;

/// Slack for multipart boundaries and the extra form fields.
const IMPORT_BODY_LIMIT: usize = MAX_PDF_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route("/api/v1/templates", get(documents::handle_list_templates))
        .route(
            "/api/v1/documents",
            post(documents::handle_create_document).get(documents::handle_list_documents),
        )
        .route(
            "/api/v1/documents/import",
            post(assistant::handle_import).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route(
            "/api/v1/documents/:id",
            get(documents::handle_get_document)
                .patch(documents::handle_update_document)
                .delete(documents::handle_delete_document),
        )
        .route(
            "/api/v1/documents/:id/progress",
            get(documents::handle_progress),
        )
        .route("/api/v1/documents/:id/preview", get(documents::handle_preview))
        .route(
            "/api/v1/documents/:id/download",
            post(documents::handle_download),
        )
        // Payments
        .route("/api/v1/payments/orders", post(payments::handle_create_order))
        .route(
            "/api/v1/payments/orders/:order_id/push",
            post(payments::handle_wallet_push),
        )
        .route(
            "/api/v1/payments/orders/:order_id/status",
            get(payments::handle_order_status),
        )
        .route("/api/v1/payments/webhook", post(payments::handle_webhook))
        // Assistant
        .route("/api/v1/assistant/summary", post(assistant::handle_summary))
        .route("/api/v1/assistant/bullets", post(assistant::handle_bullets))
        .route("/api/v1/assistant/skills", post(assistant::handle_skills))
        .route(
            "/api/v1/assistant/cover-letter",
            post(assistant::handle_cover_letter),
        )
        // Back-office
        .route("/api/v1/admin/stats", get(admin::handle_stats))
        .route("/api/v1/admin/documents", get(admin::handle_list_documents))
        .route("/api/v1/admin/orders", get(admin::handle_list_orders))
        .route(
            "/api/v1/admin/payments/reconcile",
            post(admin::handle_reconcile),
        )
        .with_state(state)
}
