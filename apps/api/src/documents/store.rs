use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::documents::lifecycle::{DocumentStatus, LifecycleEvent};
use crate::documents::models::{CvContent, DocumentKind, WizardStep};
use crate::errors::AppError;
use crate::models::document::DocumentRow;

/// Fields a client may change on an editable document. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub template_id: Option<String>,
    pub content: Option<CvContent>,
    pub current_step: Option<WizardStep>,
}

pub async fn insert_document(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    kind: DocumentKind,
    template_id: Option<&str>,
    content: &CvContent,
) -> Result<DocumentRow, AppError> {
    let content = serde_json::to_value(content)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize content: {e}")))?;

    let row = sqlx::query_as::<_, DocumentRow>(
        r#"
        INSERT INTO cv_documents (id, user_id, title, kind, template_id, content, status, current_step)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(title)
    .bind(kind.as_str())
    .bind(template_id)
    .bind(&content)
    .bind(DocumentStatus::Draft.as_str())
    .bind(WizardStep::PersonalInfo.as_str())
    .fetch_one(pool)
    .await?;

    info!("Created {} document {} for user {user_id}", kind.as_str(), row.id);
    Ok(row)
}

/// Loads a document owned by `user_id`. Documents belonging to someone
/// else are reported as missing.
pub async fn get_owned_document(
    pool: &PgPool,
    document_id: Uuid,
    user_id: Uuid,
) -> Result<DocumentRow, AppError> {
    sqlx::query_as::<_, DocumentRow>("SELECT * FROM cv_documents WHERE id = $1 AND user_id = $2")
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))
}

pub async fn list_user_documents(pool: &PgPool, user_id: Uuid) -> Result<Vec<DocumentRow>, AppError> {
    Ok(sqlx::query_as::<_, DocumentRow>(
        "SELECT * FROM cv_documents WHERE user_id = $1 ORDER BY updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Applies `changes` to an editable document. The status guard lives in the
/// UPDATE so a payment completing mid-edit cannot be overwritten.
pub async fn update_document(
    pool: &PgPool,
    document: &DocumentRow,
    changes: DocumentChanges,
) -> Result<DocumentRow, AppError> {
    document.status()?.ensure_editable()?;

    let content = changes
        .content
        .map(|c| serde_json::to_value(&c))
        .transpose()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize content: {e}")))?;

    sqlx::query_as::<_, DocumentRow>(
        r#"
        UPDATE cv_documents
        SET title = COALESCE($1, title),
            template_id = COALESCE($2, template_id),
            content = COALESCE($3, content),
            current_step = COALESCE($4, current_step),
            updated_at = NOW()
        WHERE id = $5 AND status IN ('draft', 'pending_payment')
        RETURNING *
        "#,
    )
    .bind(changes.title)
    .bind(changes.template_id)
    .bind(content)
    .bind(changes.current_step.map(|s| s.as_str()))
    .bind(document.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Document {} is no longer editable", document.id)))
}

/// Deletes a document that never entered checkout.
pub async fn delete_draft(pool: &PgPool, document: &DocumentRow) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM cv_documents WHERE id = $1 AND status = 'draft'")
        .bind(document.id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "Document {} is '{}' and cannot be deleted",
            document.id, document.status
        )));
    }
    info!("Deleted draft document {}", document.id);
    Ok(())
}

/// Locks a document row for the remainder of the caller's transaction.
pub async fn lock_document(
    conn: &mut PgConnection,
    document_id: Uuid,
) -> Result<DocumentRow, AppError> {
    sqlx::query_as::<_, DocumentRow>("SELECT * FROM cv_documents WHERE id = $1 FOR UPDATE")
        .bind(document_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))
}

/// Moves `document` through `event`, compare-and-set on its current status.
pub async fn transition(
    conn: &mut PgConnection,
    document: &DocumentRow,
    event: LifecycleEvent,
) -> Result<DocumentRow, AppError> {
    let from = document.status()?;
    let to = from.apply(event)?;

    let updated = sqlx::query_as::<_, DocumentRow>(
        r#"
        UPDATE cv_documents
        SET status = $1,
            updated_at = NOW(),
            paid_at = CASE WHEN $1 = 'paid' AND paid_at IS NULL THEN NOW() ELSE paid_at END,
            downloaded_at = CASE WHEN $1 = 'downloaded' THEN NOW() ELSE downloaded_at END
        WHERE id = $2 AND status = $3
        RETURNING *
        "#,
    )
    .bind(to.as_str())
    .bind(document.id)
    .bind(from.as_str())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        AppError::Conflict(format!(
            "Document {} changed status concurrently; retry",
            document.id
        ))
    })?;

    if from != to {
        info!(document_id = %document.id, %from, %to, "Document status transition");
    }
    Ok(updated)
}

/// Records the export key and moves the document to `downloaded` in one
/// short transaction.
pub async fn mark_downloaded(
    pool: &PgPool,
    document_id: Uuid,
    user_id: Uuid,
    s3_key: &str,
) -> Result<DocumentRow, AppError> {
    let mut tx = pool.begin().await?;

    let document = lock_document(&mut tx, document_id).await?;
    if document.user_id != user_id {
        return Err(AppError::NotFound(format!("Document {document_id} not found")));
    }
    record_export(&mut tx, document_id, s3_key).await?;
    let updated = transition(&mut tx, &document, LifecycleEvent::Downloaded).await?;

    tx.commit().await?;
    Ok(updated)
}

async fn record_export(
    conn: &mut PgConnection,
    document_id: Uuid,
    s3_key: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE cv_documents SET s3_key = $1 WHERE id = $2")
        .bind(s3_key)
        .bind(document_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
