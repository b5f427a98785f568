//! Identifier rules shared by addresses and declarations.
//!
//! Two distinct rules exist:
//!
//! - **Identifiers** (aliases, for_each keys, resource names) follow the
//!   configuration language: a letter or underscore, then letters, digits,
//!   underscores or dashes.
//! - **Provider parts** (provider local names) are stricter: letters, digits
//!   and single dashes, with lowercase as the only normalized form.

/// Detail appended to diagnostics about a bad identifier.
pub const BAD_IDENTIFIER_DETAIL: &str = "A name must start with a letter or underscore and may contain only letters, digits, underscores, and dashes.";

/// Returns true if `s` is a valid identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Parse a provider name part, returning its normalized form.
///
/// # Errors
///
/// Returns a human-readable reason when the given string can never be a
/// provider name, regardless of case.
pub fn parse_provider_part(given: &str) -> Result<String, String> {
    if given.is_empty() {
        return Err("must have at least one character".to_string());
    }
    if !given.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err("must contain only letters, digits, and dashes".to_string());
    }
    if given.starts_with('-') || given.ends_with('-') {
        return Err("must not begin or end with a dash".to_string());
    }
    if given.contains("--") {
        return Err("cannot use multiple consecutive dashes".to_string());
    }
    Ok(given.to_lowercase())
}

/// Check whether `given` is already in normalized provider-part form.
///
/// # Errors
///
/// Propagates the reason from [`parse_provider_part`] when the name is invalid.
pub fn is_provider_part_normalized(given: &str) -> Result<bool, String> {
    let normalized = parse_provider_part(given)?;
    Ok(normalized == given)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_foo"));
        assert!(is_valid_identifier("foo-bar_2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2foo"));
        assert!(!is_valid_identifier("foo.bar"));
        assert!(!is_valid_identifier("us east"));
    }

    #[test]
    fn test_provider_part_normalization() {
        assert_eq!(is_provider_part_normalized("aws"), Ok(true));
        assert_eq!(is_provider_part_normalized("AWS"), Ok(false));
        assert_eq!(parse_provider_part("Google-Beta"), Ok("google-beta".to_string()));
        assert!(parse_provider_part("-aws").is_err());
        assert!(parse_provider_part("a--b").is_err());
        assert!(parse_provider_part("aws_x").is_err());
        assert!(parse_provider_part("").is_err());
    }
}
