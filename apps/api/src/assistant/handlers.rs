//! Axum route handlers for the writing assistant.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assistant::generator::{
    generate_bullets, generate_summary, structure_imported_cv, suggest_skills,
    write_cover_letter, CoverLetterTarget,
};
use crate::assistant::import::extract_pdf_text;
use crate::documents::models::CvContent;
use crate::documents::store::get_owned_document;
use crate::errors::AppError;
use crate::llm_client::prompts::Language;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub content: CvContent,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct BulletsRequest {
    pub position: String,
    #[serde(default)]
    pub company: String,
    pub description: String,
    pub count: Option<u8>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct BulletsResponse {
    pub bullets: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SkillsRequest {
    pub job_title: String,
    #[serde(default)]
    pub existing_skills: Vec<String>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct SkillsResponse {
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub user_id: Uuid,
    /// CV whose content backs the letter.
    pub document_id: Uuid,
    pub company: String,
    pub position: String,
    pub job_description: Option<String>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct CoverLetterResponse {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub content: CvContent,
    pub extracted_chars: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/assistant/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    if req.content.experiences.is_empty() && req.content.personal_info.job_title.trim().is_empty()
    {
        return Err(AppError::Validation(
            "Provide a job title or at least one experience to write a summary".to_string(),
        ));
    }
    let summary = generate_summary(&state.llm, &req.content, req.language).await?;
    Ok(Json(SummaryResponse { summary }))
}

/// POST /api/v1/assistant/bullets
pub async fn handle_bullets(
    State(state): State<AppState>,
    Json(req): Json<BulletsRequest>,
) -> Result<Json<BulletsResponse>, AppError> {
    if req.position.trim().is_empty() || req.description.trim().is_empty() {
        return Err(AppError::Validation(
            "position and description cannot be empty".to_string(),
        ));
    }
    let bullets = generate_bullets(
        &state.llm,
        &req.position,
        &req.company,
        &req.description,
        req.count,
        req.language,
    )
    .await?;
    Ok(Json(BulletsResponse { bullets }))
}

/// POST /api/v1/assistant/skills
pub async fn handle_skills(
    State(state): State<AppState>,
    Json(req): Json<SkillsRequest>,
) -> Result<Json<SkillsResponse>, AppError> {
    if req.job_title.trim().is_empty() {
        return Err(AppError::Validation("job_title cannot be empty".to_string()));
    }
    let skills = suggest_skills(
        &state.llm,
        &req.job_title,
        &req.existing_skills,
        req.language,
    )
    .await?;
    Ok(Json(SkillsResponse { skills }))
}

/// POST /api/v1/assistant/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    Json(req): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    if req.company.trim().is_empty() || req.position.trim().is_empty() {
        return Err(AppError::Validation(
            "company and position cannot be empty".to_string(),
        ));
    }
    let document = get_owned_document(&state.db, req.document_id, req.user_id).await?;
    let body = write_cover_letter(
        &state.llm,
        &document.content(),
        &CoverLetterTarget {
            company: &req.company,
            position: &req.position,
            job_description: req.job_description.as_deref(),
        },
        req.language,
    )
    .await?;
    Ok(Json(CoverLetterResponse { body }))
}

/// POST /api/v1/documents/import
///
/// Multipart upload with a `file` field (PDF) and an optional `language`
/// field. Returns structured content for the wizard to prefill.
pub async fn handle_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let mut file = None;
    let mut language = Language::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                file = Some(field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Could not read uploaded file: {e}"))
                })?);
            }
            Some("language") => {
                let value = field.text().await.unwrap_or_default();
                language = serde_json::from_value(serde_json::Value::String(value))
                    .map_err(|_| AppError::Validation("language must be 'fr' or 'en'".to_string()))?;
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;
    let text = extract_pdf_text(file).await?;
    let content = structure_imported_cv(&state.llm, &text, language).await?;

    Ok(Json(ImportResponse {
        content,
        extracted_chars: text.chars().count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullets_request_defaults() {
        let req: BulletsRequest = serde_json::from_value(serde_json::json!({
            "position": "Caissière",
            "description": "Tenue de caisse"
        }))
        .unwrap();
        assert_eq!(req.language, Language::Fr);
        assert!(req.company.is_empty());
        assert!(req.count.is_none());
    }

    #[test]
    fn test_skills_request_accepts_english() {
        let req: SkillsRequest = serde_json::from_value(serde_json::json!({
            "job_title": "Data analyst",
            "existing_skills": ["SQL"],
            "language": "en"
        }))
        .unwrap();
        assert_eq!(req.language, Language::En);
        assert_eq!(req.existing_skills, vec!["SQL"]);
    }
}
