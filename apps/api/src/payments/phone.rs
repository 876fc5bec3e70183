/// Country prefix applied to local ten-digit numbers (Côte d'Ivoire).
pub const DEFAULT_COUNTRY_PREFIX: &str = "225";

const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// Normalises a handset number to international digits-only form.
///
/// Accepts spaces, dots, dashes and parentheses; strips a leading `+` or
/// `00`; prefixes local ten-digit numbers with [`DEFAULT_COUNTRY_PREFIX`].
pub fn normalize_phone(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("phone number is required".to_string());
    }

    let mut digits = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        match c {
            '0'..='9' => digits.push(c),
            '+' if i == 0 => {}
            ' ' | '.' | '-' | '(' | ')' => {}
            _ => return Err(format!("'{raw}' is not a valid phone number")),
        }
    }

    let digits = match digits.strip_prefix("00") {
        Some(rest) if !trimmed.starts_with('+') => rest.to_string(),
        _ => digits,
    };

    let digits = if digits.len() == 10 && !digits.starts_with(DEFAULT_COUNTRY_PREFIX) {
        format!("{DEFAULT_COUNTRY_PREFIX}{digits}")
    } else {
        digits
    };

    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return Err(format!("'{raw}' is not a valid phone number"));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_number_gets_prefix() {
        assert_eq!(normalize_phone("07 07 07 07 07").unwrap(), "2250707070707");
    }

    #[test]
    fn test_international_forms() {
        assert_eq!(normalize_phone("+225 0707070707").unwrap(), "2250707070707");
        assert_eq!(normalize_phone("00225-07-07-07-07-07").unwrap(), "2250707070707");
        assert_eq!(normalize_phone("+221 77 123 45 67").unwrap(), "221771234567");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("07a7").is_err());
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("1234567890123456").is_err());
        assert!(normalize_phone("07+0707").is_err());
    }
}
