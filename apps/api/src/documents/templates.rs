use serde::Serialize;

use crate::documents::models::DocumentKind;

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: DocumentKind,
    pub accent_color: &'static str,
}

/// Templates offered in the selection step. Styling lives in the front-end;
/// the backend only needs ids to validate selections and tag exports.
pub const CATALOG: &[Template] = &[
    Template {
        id: "classique",
        name: "Classique",
        kind: DocumentKind::Cv,
        accent_color: "#1f2937",
    },
    Template {
        id: "moderne",
        name: "Moderne",
        kind: DocumentKind::Cv,
        accent_color: "#2563eb",
    },
    Template {
        id: "elegant",
        name: "Élégant",
        kind: DocumentKind::Cv,
        accent_color: "#7c3aed",
    },
    Template {
        id: "minimaliste",
        name: "Minimaliste",
        kind: DocumentKind::Cv,
        accent_color: "#111827",
    },
    Template {
        id: "professionnel",
        name: "Professionnel",
        kind: DocumentKind::Cv,
        accent_color: "#047857",
    },
    Template {
        id: "creatif",
        name: "Créatif",
        kind: DocumentKind::Cv,
        accent_color: "#ea580c",
    },
    Template {
        id: "lettre-sobre",
        name: "Lettre sobre",
        kind: DocumentKind::CoverLetter,
        accent_color: "#1f2937",
    },
    Template {
        id: "lettre-moderne",
        name: "Lettre moderne",
        kind: DocumentKind::CoverLetter,
        accent_color: "#2563eb",
    },
];

pub fn find_template(id: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|t| t.id == id)
}

/// Returns an error message when `id` is unknown or meant for another kind.
pub fn validate_template(id: &str, kind: DocumentKind) -> Result<&'static Template, String> {
    let template = find_template(id).ok_or_else(|| format!("Unknown template '{id}'"))?;
    if template.kind != kind {
        return Err(format!(
            "Template '{id}' cannot be used for a {} document",
            kind.as_str()
        ));
    }
    Ok(template)
}

pub fn templates_for(kind: Option<DocumentKind>) -> Vec<&'static Template> {
    CATALOG
        .iter()
        .filter(|t| kind.map_or(true, |k| t.kind == k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_ids_are_unique() {
        let mut ids: Vec<_> = CATALOG.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn test_validate_template_kind_mismatch() {
        assert!(validate_template("moderne", DocumentKind::Cv).is_ok());
        assert!(validate_template("moderne", DocumentKind::CoverLetter).is_err());
        assert!(validate_template("lettre-sobre", DocumentKind::CoverLetter).is_ok());
        assert!(validate_template("inexistant", DocumentKind::Cv).is_err());
    }

    #[test]
    fn test_templates_for_filters_by_kind() {
        let letters = templates_for(Some(DocumentKind::CoverLetter));
        assert_eq!(letters.len(), 2);
        assert_eq!(templates_for(None).len(), CATALOG.len());
    }
}
