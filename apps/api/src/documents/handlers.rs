use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::documents::lifecycle::LifecycleEvent;
use crate::documents::models::{CvContent, DocumentKind, WizardStep};
use crate::documents::progress::{compute_progress, ProgressReport};
use crate::documents::render::{render_html, RenderOptions};
use crate::documents::store::{self, DocumentChanges};
use crate::documents::templates::{templates_for, validate_template, Template};
use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::state::AppState;
use crate::storage::{export_key, upload_export, DOWNLOAD_LINK_TTL};

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct TemplateQuery {
    pub kind: Option<DocumentKind>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default = "default_kind")]
    pub kind: DocumentKind,
    pub template_id: Option<String>,
    #[serde(default)]
    pub content: CvContent,
}

fn default_kind() -> DocumentKind {
    DocumentKind::Cv
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub template_id: Option<String>,
    pub content: Option<CvContent>,
    pub current_step: Option<WizardStep>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub document: DocumentRow,
    pub progress: ProgressReport,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub document_id: Uuid,
    pub url: String,
    pub expires_in_secs: u64,
    pub status: String,
}

fn with_progress(document: DocumentRow) -> Result<DocumentResponse, AppError> {
    let progress = progress_of(&document)?;
    Ok(DocumentResponse { document, progress })
}

fn progress_of(document: &DocumentRow) -> Result<ProgressReport, AppError> {
    Ok(compute_progress(
        document.kind(),
        &document.content(),
        document.template_id.as_deref(),
        document.status()?,
    ))
}

/// GET /api/v1/templates
pub async fn handle_list_templates(
    Query(params): Query<TemplateQuery>,
) -> Json<Vec<&'static Template>> {
    Json(templates_for(params.kind))
}

/// POST /api/v1/documents
pub async fn handle_create_document(
    State(state): State<AppState>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if let Some(template_id) = req.template_id.as_deref() {
        validate_template(template_id, req.kind).map_err(AppError::Validation)?;
    }
    req.content.validate().map_err(AppError::Validation)?;

    let document = store::insert_document(
        &state.db,
        req.user_id,
        title,
        req.kind,
        req.template_id.as_deref(),
        &req.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(with_progress(document)?)))
}

/// GET /api/v1/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    Ok(Json(
        store::list_user_documents(&state.db, params.user_id).await?,
    ))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = store::get_owned_document(&state.db, id, params.user_id).await?;
    Ok(Json(with_progress(document)?))
}

/// PATCH /api/v1/documents/:id
pub async fn handle_update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = store::get_owned_document(&state.db, id, req.user_id).await?;

    if let Some(title) = req.title.as_deref() {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
    }
    if let Some(template_id) = req.template_id.as_deref() {
        validate_template(template_id, document.kind()).map_err(AppError::Validation)?;
    }
    if let Some(content) = &req.content {
        content.validate().map_err(AppError::Validation)?;
    }

    let updated = store::update_document(
        &state.db,
        &document,
        DocumentChanges {
            title: req.title.map(|t| t.trim().to_string()),
            template_id: req.template_id,
            content: req.content,
            current_step: req.current_step,
        },
    )
    .await?;

    Ok(Json(with_progress(updated)?))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let document = store::get_owned_document(&state.db, id, params.user_id).await?;
    store::delete_draft(&state.db, &document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/documents/:id/progress
pub async fn handle_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProgressReport>, AppError> {
    let document = store::get_owned_document(&state.db, id, params.user_id).await?;
    Ok(Json(progress_of(&document)?))
}

/// GET /api/v1/documents/:id/preview
///
/// Available in every state; unpaid documents are watermarked.
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Html<String>, AppError> {
    let document = store::get_owned_document(&state.db, id, params.user_id).await?;
    let status = document.status()?;
    let html = render_html(
        &document.content(),
        &RenderOptions {
            title: &document.title,
            kind: document.kind(),
            template_id: document.template_id.as_deref(),
            watermark: !status.is_paid(),
        },
    );
    Ok(Html(html))
}

/// POST /api/v1/documents/:id/download
///
/// Renders the paid document, stores the export and hands back a
/// short-lived link. Network calls happen before the row is locked; the
/// `downloaded` transition is re-checked under the lock afterwards.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<DownloadResponse>, AppError> {
    let document = store::get_owned_document(&state.db, id, params.user_id).await?;
    document.status()?.apply(LifecycleEvent::Downloaded)?;

    let html = render_html(
        &document.content(),
        &RenderOptions {
            title: &document.title,
            kind: document.kind(),
            template_id: document.template_id.as_deref(),
            watermark: false,
        },
    );
    let key = export_key(document.user_id, document.id);
    let url = upload_export(&state.s3, &state.config.s3_bucket, &key, html).await?;

    let updated = store::mark_downloaded(&state.db, document.id, params.user_id, &key).await?;

    Ok(Json(DownloadResponse {
        document_id: document.id,
        url,
        expires_in_secs: DOWNLOAD_LINK_TTL.as_secs(),
        status: updated.status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_to_cv() {
        let json = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "title": "CV comptable"
        });
        let req: CreateDocumentRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.kind, DocumentKind::Cv);
        assert_eq!(req.content, CvContent::default());
        assert!(req.template_id.is_none());
    }

    #[test]
    fn test_update_request_accepts_step_names() {
        let json = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "current_step": "references"
        });
        let req: UpdateDocumentRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.current_step, Some(WizardStep::References));
        assert!(req.content.is_none());
    }
}
