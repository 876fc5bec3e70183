use serde::{Deserialize, Serialize};

use crate::documents::lifecycle::DocumentStatus;
use crate::documents::models::{CvContent, DocumentKind, WizardStep};
use crate::documents::templates::validate_template;

const MIN_SUMMARY_CHARS: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Complete,
    Incomplete,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepProgress {
    pub step: WizardStep,
    pub status: StepStatus,
    pub optional: bool,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Share of required steps completed, 0.0 – 1.0.
    pub overall: f64,
    pub steps: Vec<StepProgress>,
    pub ready_for_preview: bool,
    pub next_step: Option<WizardStep>,
}

/// Computes per-step completion of the wizard from stored content.
pub fn compute_progress(
    kind: DocumentKind,
    content: &CvContent,
    template_id: Option<&str>,
    status: DocumentStatus,
) -> ProgressReport {
    let mut steps = Vec::with_capacity(WizardStep::ORDER.len());

    for step in WizardStep::ORDER {
        if matches!(step, WizardStep::Preview | WizardStep::Payment) {
            continue;
        }
        let optional = is_optional(step, kind);
        let (done, recommendation) = evaluate(step, kind, content, template_id);
        let status = match (done, optional) {
            (true, _) => StepStatus::Complete,
            (false, true) => StepStatus::Skipped,
            (false, false) => StepStatus::Incomplete,
        };
        steps.push(StepProgress {
            step,
            status,
            optional,
            recommendation: if done { None } else { recommendation },
        });
    }

    let ready_for_preview = steps
        .iter()
        .all(|s| s.optional || s.status == StepStatus::Complete);

    steps.push(StepProgress {
        step: WizardStep::Preview,
        status: if ready_for_preview {
            StepStatus::Complete
        } else {
            StepStatus::Incomplete
        },
        optional: false,
        recommendation: None,
    });
    steps.push(StepProgress {
        step: WizardStep::Payment,
        status: if status.is_paid() {
            StepStatus::Complete
        } else {
            StepStatus::Incomplete
        },
        optional: false,
        recommendation: (!status.is_paid())
            .then(|| "Pay to unlock the download of your document".to_string()),
    });

    let required: Vec<_> = steps.iter().filter(|s| !s.optional).collect();
    let completed = required
        .iter()
        .filter(|s| s.status == StepStatus::Complete)
        .count();
    let overall = if required.is_empty() {
        0.0
    } else {
        (completed as f64 / required.len() as f64).clamp(0.0, 1.0)
    };

    let next_step = steps
        .iter()
        .find(|s| s.status == StepStatus::Incomplete)
        .map(|s| s.step);

    ProgressReport {
        overall,
        steps,
        ready_for_preview,
        next_step,
    }
}

fn is_optional(step: WizardStep, kind: DocumentKind) -> bool {
    if step.is_optional() {
        return true;
    }
    // A cover letter only needs contact details, the letter itself and a template.
    kind == DocumentKind::CoverLetter
        && matches!(
            step,
            WizardStep::Experience | WizardStep::Education | WizardStep::Skills
        )
}

fn evaluate(
    step: WizardStep,
    kind: DocumentKind,
    content: &CvContent,
    template_id: Option<&str>,
) -> (bool, Option<String>) {
    match step {
        WizardStep::PersonalInfo => {
            let info = &content.personal_info;
            let has_contact = !info.email.trim().is_empty() || !info.phone.trim().is_empty();
            (
                !info.full_name.trim().is_empty() && has_contact,
                Some("Add your full name and an email address or phone number".to_string()),
            )
        }
        WizardStep::Experience => (
            content
                .experiences
                .iter()
                .any(|e| !e.position.trim().is_empty() && !e.company.trim().is_empty()),
            Some("Add at least one work experience with a position and a company".to_string()),
        ),
        WizardStep::Education => (
            content
                .educations
                .iter()
                .any(|e| !e.degree.trim().is_empty() || !e.school.trim().is_empty()),
            Some("Add at least one diploma or training".to_string()),
        ),
        WizardStep::Skills => (
            content.skills.iter().any(|s| !s.name.trim().is_empty()),
            Some("List at least one skill".to_string()),
        ),
        WizardStep::Summary => match kind {
            DocumentKind::Cv => (
                content.summary.trim().chars().count() >= MIN_SUMMARY_CHARS,
                Some(format!(
                    "Write a professional summary of at least {MIN_SUMMARY_CHARS} characters"
                )),
            ),
            DocumentKind::CoverLetter => (
                content
                    .cover_letter
                    .as_ref()
                    .is_some_and(|l| l.body.trim().chars().count() >= MIN_SUMMARY_CHARS),
                Some("Write the body of your cover letter".to_string()),
            ),
        },
        WizardStep::References => (
            content.references.iter().any(|r| !r.name.trim().is_empty()),
            None,
        ),
        WizardStep::AdditionalSections => (
            content
                .additional_sections
                .iter()
                .any(|s| !s.title.trim().is_empty() && !s.items.is_empty()),
            None,
        ),
        WizardStep::Template => {
            let valid = template_id.is_some_and(|id| validate_template(id, kind).is_ok());
            (valid, Some("Choose a template".to_string()))
        }
        WizardStep::Preview | WizardStep::Payment => (false, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::models::{CoverLetter, Education, Experience, Skill};

    fn complete_cv() -> CvContent {
        let mut content = CvContent::default();
        content.personal_info.full_name = "Awa Koné".to_string();
        content.personal_info.email = "awa@example.ci".to_string();
        content.experiences.push(Experience {
            position: "Comptable".to_string(),
            company: "SODECI".to_string(),
            ..Default::default()
        });
        content.educations.push(Education {
            degree: "BTS Finance".to_string(),
            ..Default::default()
        });
        content.skills.push(Skill {
            name: "Sage Saari".to_string(),
            level: Some(4),
        });
        content.summary =
            "Comptable rigoureuse avec cinq ans d'expérience en audit et fiscalité.".to_string();
        content
    }

    #[test]
    fn test_empty_draft_starts_at_personal_info() {
        let report = compute_progress(
            DocumentKind::Cv,
            &CvContent::default(),
            None,
            DocumentStatus::Draft,
        );
        assert_eq!(report.overall, 0.0);
        assert!(!report.ready_for_preview);
        assert_eq!(report.next_step, Some(WizardStep::PersonalInfo));
    }

    #[test]
    fn test_complete_cv_ready_for_preview_without_optional_steps() {
        let report = compute_progress(
            DocumentKind::Cv,
            &complete_cv(),
            Some("moderne"),
            DocumentStatus::Draft,
        );
        assert!(report.ready_for_preview);
        assert_eq!(report.next_step, Some(WizardStep::Payment));
        let refs = report
            .steps
            .iter()
            .find(|s| s.step == WizardStep::References)
            .unwrap();
        assert_eq!(refs.status, StepStatus::Skipped);
    }

    #[test]
    fn test_paid_document_is_fully_complete() {
        let report = compute_progress(
            DocumentKind::Cv,
            &complete_cv(),
            Some("classique"),
            DocumentStatus::Paid,
        );
        assert!((report.overall - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.next_step, None);
    }

    #[test]
    fn test_cover_letter_template_invalid_for_cv() {
        let report = compute_progress(
            DocumentKind::Cv,
            &complete_cv(),
            Some("lettre-sobre"),
            DocumentStatus::Draft,
        );
        assert!(!report.ready_for_preview);
        assert_eq!(report.next_step, Some(WizardStep::Template));
    }

    #[test]
    fn test_cover_letter_needs_body_not_experience() {
        let mut content = CvContent::default();
        content.personal_info.full_name = "Awa Koné".to_string();
        content.personal_info.phone = "0707070707".to_string();
        content.cover_letter = Some(CoverLetter {
            body: "Je souhaite vous proposer ma candidature au poste de comptable.".to_string(),
            ..Default::default()
        });
        let report = compute_progress(
            DocumentKind::CoverLetter,
            &content,
            Some("lettre-moderne"),
            DocumentStatus::Draft,
        );
        assert!(report.ready_for_preview);
    }
}
