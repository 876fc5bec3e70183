// Cross-cutting prompt fragments shared by every assistant feature.
// Feature-specific templates live in assistant/prompts.rs.

use serde::{Deserialize, Serialize};

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated content anchored to what the user actually provided.
pub const FACTUAL_INSTRUCTION: &str = "\
    Only use facts present in the information provided. Do NOT invent employers, \
    diplomas, dates, figures or certifications. When a detail is missing, write \
    around it rather than making it up.";

/// Output language of generated content.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

impl Language {
    pub fn instruction(&self) -> &'static str {
        match self {
            Language::Fr => "Write in professional French as used in West African business.",
            Language::En => "Write in professional English.",
        }
    }
}

/// Builds a system prompt from a role description, the language rule and
/// optionally the JSON-only rule.
pub fn system_prompt(role: &str, language: Language, json_only: bool) -> String {
    let mut system = format!("{role} {} {FACTUAL_INSTRUCTION}", language.instruction());
    if json_only {
        system.push(' ');
        system.push_str(JSON_ONLY_SYSTEM);
    }
    system
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_includes_language_and_json_rule() {
        let system = system_prompt("You are a CV writer.", Language::En, true);
        assert!(system.starts_with("You are a CV writer."));
        assert!(system.contains("professional English"));
        assert!(system.contains("valid JSON only"));

        let prose = system_prompt("You are a CV writer.", Language::Fr, false);
        assert!(prose.contains("French"));
        assert!(!prose.contains("valid JSON only"));
    }

    #[test]
    fn test_language_defaults_to_french() {
        assert_eq!(Language::default(), Language::Fr);
        assert_eq!(
            serde_json::from_str::<Language>("\"en\"").unwrap(),
            Language::En
        );
    }
}
