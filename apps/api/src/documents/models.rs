use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cv,
    CoverLetter,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Cv => "cv",
            DocumentKind::CoverLetter => "cover_letter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cv" => Some(DocumentKind::Cv),
            "cover_letter" => Some(DocumentKind::CoverLetter),
            _ => None,
        }
    }
}

/// Wizard steps in the order the front-end walks through them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    PersonalInfo,
    Experience,
    Education,
    Skills,
    Summary,
    References,
    AdditionalSections,
    Template,
    Preview,
    Payment,
}

impl WizardStep {
    pub const ORDER: [WizardStep; 10] = [
        WizardStep::PersonalInfo,
        WizardStep::Experience,
        WizardStep::Education,
        WizardStep::Skills,
        WizardStep::Summary,
        WizardStep::References,
        WizardStep::AdditionalSections,
        WizardStep::Template,
        WizardStep::Preview,
        WizardStep::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::PersonalInfo => "personal_info",
            WizardStep::Experience => "experience",
            WizardStep::Education => "education",
            WizardStep::Skills => "skills",
            WizardStep::Summary => "summary",
            WizardStep::References => "references",
            WizardStep::AdditionalSections => "additional_sections",
            WizardStep::Template => "template",
            WizardStep::Preview => "preview",
            WizardStep::Payment => "payment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        WizardStep::ORDER.into_iter().find(|step| step.as_str() == s)
    }

    /// Steps the user may skip without blocking the preview.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            WizardStep::References | WizardStep::AdditionalSections
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub job_title: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Experience {
    pub position: String,
    pub company: String,
    pub city: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Education {
    pub degree: String,
    pub school: String,
    pub city: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Skill {
    pub name: String,
    /// 1 (notions) to 5 (expert).
    pub level: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Language {
    pub name: String,
    pub proficiency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Reference {
    pub name: String,
    pub position: String,
    pub company: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdditionalSection {
    pub title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoverLetter {
    pub recipient_name: String,
    pub company: String,
    pub position: String,
    pub body: String,
}

/// Everything the wizard collects. Stored as JSONB; every field defaults so
/// partially filled drafts deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CvContent {
    pub personal_info: PersonalInfo,
    pub experiences: Vec<Experience>,
    pub educations: Vec<Education>,
    pub skills: Vec<Skill>,
    pub languages: Vec<Language>,
    pub summary: String,
    pub references: Vec<Reference>,
    pub additional_sections: Vec<AdditionalSection>,
    pub cover_letter: Option<CoverLetter>,
}

impl CvContent {
    /// Rejects values the UI should never send.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(skill) = self
            .skills
            .iter()
            .find(|s| s.level.is_some_and(|l| !(1..=5).contains(&l)))
        {
            return Err(format!(
                "skill '{}' has level outside 1-5",
                skill.name
            ));
        }
        let email = self.personal_info.email.trim();
        if !email.is_empty() && !email.contains('@') {
            return Err(format!("'{email}' is not a valid email address"));
        }
        if self.summary.chars().count() > 2000 {
            return Err("summary must be at most 2000 characters".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_content_deserializes() {
        let json = serde_json::json!({
            "personal_info": { "full_name": "Awa Koné" },
            "skills": [{ "name": "Excel" }]
        });
        let content: CvContent = serde_json::from_value(json).unwrap();
        assert_eq!(content.personal_info.full_name, "Awa Koné");
        assert!(content.experiences.is_empty());
        assert_eq!(content.skills[0].level, None);
    }

    #[test]
    fn test_validate_rejects_bad_skill_level() {
        let content = CvContent {
            skills: vec![Skill {
                name: "Rust".to_string(),
                level: Some(9),
            }],
            ..Default::default()
        };
        assert!(content.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let mut content = CvContent::default();
        content.personal_info.email = "not-an-email".to_string();
        assert!(content.validate().is_err());
        content.personal_info.email = "awa@example.ci".to_string();
        assert!(content.validate().is_ok());
    }

    #[test]
    fn test_wizard_step_parse() {
        assert_eq!(
            WizardStep::parse("additional_sections"),
            Some(WizardStep::AdditionalSections)
        );
        assert_eq!(WizardStep::parse("checkout"), None);
    }
}
