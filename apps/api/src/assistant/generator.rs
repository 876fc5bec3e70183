//! Writing assistant: prompt assembly and post-processing for every AI
//! feature. All calls go through `llm_client`.

use std::collections::HashSet;

use tracing::info;

use crate::assistant::prompts::*;
use crate::documents::models::{CvContent, Experience, Skill};
use crate::errors::AppError;
use crate::llm_client::prompts::{system_prompt, Language};
use crate::llm_client::LlmClient;

pub const DEFAULT_BULLET_COUNT: u8 = 4;
pub const MAX_BULLET_COUNT: u8 = 8;
pub const MAX_SKILL_SUGGESTIONS: usize = 10;
/// Longer extracts are truncated before being sent for structuring.
pub const MAX_IMPORT_CHARS: usize = 20_000;
/// Experiences quoted in a prompt, most recent first.
const MAX_PROMPT_EXPERIENCES: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Prompt builders
// ────────────────────────────────────────────────────────────────────────────

fn format_experiences(experiences: &[Experience]) -> String {
    if experiences.is_empty() {
        return "(none provided)".to_string();
    }
    experiences
        .iter()
        .take(MAX_PROMPT_EXPERIENCES)
        .map(|e| {
            let end = if e.current {
                "present".to_string()
            } else {
                e.end_date.clone().unwrap_or_default()
            };
            let mut line = format!("- {} at {} ({} - {})", e.position, e.company, e.start_date, end);
            if !e.description.trim().is_empty() {
                line.push_str(&format!(": {}", e.description.trim()));
            }
            for bullet in &e.bullets {
                line.push_str(&format!("\n  * {bullet}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_skills(skills: &[Skill]) -> String {
    let names: Vec<_> = skills
        .iter()
        .map(|s| s.name.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        "(none provided)".to_string()
    } else {
        names.join(", ")
    }
}

pub fn build_summary_prompt(content: &CvContent) -> String {
    let job_title = content.personal_info.job_title.trim();
    SUMMARY_PROMPT_TEMPLATE
        .replace(
            "{job_title}",
            if job_title.is_empty() {
                "(not specified)"
            } else {
                job_title
            },
        )
        .replace("{experiences}", &format_experiences(&content.experiences))
        .replace("{skills}", &format_skills(&content.skills))
}

pub fn clamp_bullet_count(count: Option<u8>) -> u8 {
    count
        .unwrap_or(DEFAULT_BULLET_COUNT)
        .clamp(1, MAX_BULLET_COUNT)
}

pub fn build_bullets_prompt(position: &str, company: &str, description: &str, count: u8) -> String {
    BULLETS_PROMPT_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{position}", position.trim())
        .replace("{company}", company.trim())
        .replace("{description}", description.trim())
}

pub fn build_skills_prompt(job_title: &str, existing: &[String], count: usize) -> String {
    let existing = if existing.is_empty() {
        "(none)".to_string()
    } else {
        existing.join(", ")
    };
    SKILLS_PROMPT_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{job_title}", job_title.trim())
        .replace("{existing}", &existing)
}

pub struct CoverLetterTarget<'a> {
    pub company: &'a str,
    pub position: &'a str,
    pub job_description: Option<&'a str>,
}

pub fn build_cover_letter_prompt(content: &CvContent, target: &CoverLetterTarget<'_>) -> String {
    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{full_name}", content.personal_info.full_name.trim())
        .replace("{job_title}", content.personal_info.job_title.trim())
        .replace("{summary}", content.summary.trim())
        .replace("{experiences}", &format_experiences(&content.experiences))
        .replace("{position}", target.position.trim())
        .replace("{company}", target.company.trim())
        .replace(
            "{job_description}",
            target.job_description.unwrap_or("").trim(),
        )
}

pub fn build_import_prompt(raw_text: &str) -> String {
    let truncated: String = raw_text.chars().take(MAX_IMPORT_CHARS).collect();
    IMPORT_PROMPT_TEMPLATE.replace("{raw_text}", truncated.trim())
}

// ────────────────────────────────────────────────────────────────────────────
// Post-processing
// ────────────────────────────────────────────────────────────────────────────

/// Trims bullets, drops empties and leading list markers, caps the count.
pub fn clean_bullets(raw: Vec<String>, count: u8) -> Vec<String> {
    raw.into_iter()
        .map(|b| {
            b.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|b| !b.is_empty())
        .take(count as usize)
        .collect()
}

/// Drops suggestions already present (case-insensitive) or repeated, keeping
/// the model's order.
pub fn dedupe_skills(suggested: Vec<String>, existing: &[String], limit: usize) -> Vec<String> {
    let mut seen: HashSet<String> = existing
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();
    suggested
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .take(limit)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// LLM calls
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_summary(
    llm: &LlmClient,
    content: &CvContent,
    language: Language,
) -> Result<String, AppError> {
    let prompt = build_summary_prompt(content);
    let system = system_prompt(SUMMARY_ROLE, language, false);
    let summary = llm.call_text(&prompt, &system).await?;
    Ok(summary.trim_matches('"').trim().to_string())
}

pub async fn generate_bullets(
    llm: &LlmClient,
    position: &str,
    company: &str,
    description: &str,
    count: Option<u8>,
    language: Language,
) -> Result<Vec<String>, AppError> {
    let count = clamp_bullet_count(count);
    let prompt = build_bullets_prompt(position, company, description, count);
    let system = system_prompt(BULLETS_ROLE, language, true);
    let raw: Vec<String> = llm
        .call_json(&prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("Bullet generation failed: {e}")))?;
    Ok(clean_bullets(raw, count))
}

pub async fn suggest_skills(
    llm: &LlmClient,
    job_title: &str,
    existing: &[String],
    language: Language,
) -> Result<Vec<String>, AppError> {
    let prompt = build_skills_prompt(job_title, existing, MAX_SKILL_SUGGESTIONS);
    let system = system_prompt(SKILLS_ROLE, language, true);
    let raw: Vec<String> = llm
        .call_json(&prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("Skill suggestion failed: {e}")))?;
    Ok(dedupe_skills(raw, existing, MAX_SKILL_SUGGESTIONS))
}

pub async fn write_cover_letter(
    llm: &LlmClient,
    content: &CvContent,
    target: &CoverLetterTarget<'_>,
    language: Language,
) -> Result<String, AppError> {
    let prompt = build_cover_letter_prompt(content, target);
    let system = system_prompt(COVER_LETTER_ROLE, language, false);
    llm.call_text(&prompt, &system).await.map_err(AppError::from)
}

/// Structures raw CV text into wizard content. The result is a preview the
/// user reviews; nothing is persisted here.
pub async fn structure_imported_cv(
    llm: &LlmClient,
    raw_text: &str,
    language: Language,
) -> Result<CvContent, AppError> {
    let prompt = build_import_prompt(raw_text);
    let system = system_prompt(IMPORT_ROLE, language, true);
    let content: CvContent = llm
        .call_json(&prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("CV import failed: {e}")))?;
    info!(
        "Imported CV: {} experiences, {} educations, {} skills",
        content.experiences.len(),
        content.educations.len(),
        content.skills.len()
    );
    Ok(content)
}
