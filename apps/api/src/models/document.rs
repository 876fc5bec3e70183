use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::documents::lifecycle::{DocumentStatus, LifecycleError};
use crate::documents::models::{CvContent, DocumentKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub kind: String,
    pub template_id: Option<String>,
    pub content: Value,
    pub status: String,
    pub current_step: String,
    pub s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub downloaded_at: Option<DateTime<Utc>>,
}

impl DocumentRow {
    pub fn status(&self) -> Result<DocumentStatus, LifecycleError> {
        self.status.parse()
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::parse(&self.kind).unwrap_or(DocumentKind::Cv)
    }

    /// Decodes the stored JSONB. Rows written by older clients may carry
    /// unknown fields; those are ignored.
    pub fn content(&self) -> CvContent {
        serde_json::from_value(self.content.clone()).unwrap_or_else(|e| {
            tracing::warn!("Document {} has undecodable content: {e}", self.id);
            CvContent::default()
        })
    }
}
