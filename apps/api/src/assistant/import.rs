use bytes::Bytes;

use crate::errors::AppError;

/// Upload size accepted for CV imports.
pub const MAX_PDF_BYTES: usize = 5 * 1024 * 1024;
/// Extracts shorter than this are almost always scanned images.
const MIN_TEXT_CHARS: usize = 50;

/// Checks the upload looks like a PDF we are willing to parse.
pub fn validate_pdf(bytes: &[u8]) -> Result<(), AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }
    if bytes.len() > MAX_PDF_BYTES {
        return Err(AppError::Validation(format!(
            "file exceeds the {} MB limit",
            MAX_PDF_BYTES / (1024 * 1024)
        )));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(AppError::Validation(
            "only PDF files can be imported".to_string(),
        ));
    }
    Ok(())
}

/// Extracts plain text from a PDF upload. Parsing is CPU-bound and runs on
/// the blocking pool.
pub async fn extract_pdf_text(bytes: Bytes) -> Result<String, AppError> {
    validate_pdf(&bytes)?;

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?
        .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))?;

    let text = normalize_whitespace(&text);
    if text.chars().count() < MIN_TEXT_CHARS {
        return Err(AppError::UnprocessableEntity(
            "The PDF contains no selectable text (scanned document?)".to_string(),
        ));
    }
    Ok(text)
}

/// Collapses runs of blank lines and trailing spaces left by PDF layout.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pdf_magic() {
        assert!(validate_pdf(b"%PDF-1.7\n...").is_ok());
        assert!(validate_pdf(b"PK\x03\x04 docx").is_err());
        assert!(validate_pdf(b"").is_err());
    }

    #[test]
    fn test_validate_pdf_size_limit() {
        let mut big = b"%PDF-1.4".to_vec();
        big.resize(MAX_PDF_BYTES + 1, b' ');
        assert!(validate_pdf(&big).is_err());
    }

    #[test]
    fn test_normalize_whitespace() {
        let raw = "Awa Koné   \n\n\n\nComptable\n \nAbidjan";
        assert_eq!(normalize_whitespace(raw), "Awa Koné\n\nComptable\n\nAbidjan");
    }

    #[tokio::test]
    async fn test_extract_rejects_non_pdf_before_parsing() {
        let err = extract_pdf_text(Bytes::from_static(b"hello")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
