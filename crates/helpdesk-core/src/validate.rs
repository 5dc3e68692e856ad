//! Input validation for titles and contact fields.
//!
//! Ticket intake runs these before anything is persisted. Contact rules
//! are deliberately
//! permissive about formatting (people paste phone numbers with spaces
//! and dashes) and strict about content.

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_NAME_LEN: usize = 60;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_PHONE_DIGITS: usize = 15;

/// A rejected field, with enough context for direct UI display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: &'static str,
}

impl ValidationError {
    fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: &'static str,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid {} '{}': {}",
            self.field, self.value, self.reason
        )
    }
}

impl std::error::Error for ValidationError {}

/// Validate a ticket title.
pub fn validate_title(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::new(
            "title",
            s,
            "must not be empty",
            "provide a short summary of the issue",
            "invalid_title",
        ));
    }
    if s.trim() != s {
        return Err(ValidationError::new(
            "title",
            s,
            "must not start or end with whitespace",
            "trim leading/trailing whitespace",
            "invalid_title",
        ));
    }
    if s.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::new(
            "title",
            s,
            format!("must be <= {MAX_TITLE_LEN} characters"),
            "shorten the title",
            "invalid_title",
        ));
    }
    if s.chars().any(char::is_control) {
        return Err(ValidationError::new(
            "title",
            s,
            "must not contain control characters",
            "remove control characters",
            "invalid_title",
        ));
    }
    Ok(())
}

/// Validate a display name (first or last).
pub fn validate_display_name(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::new(
            "name",
            s,
            "must not be empty",
            "provide a name",
            "invalid_name",
        ));
    }
    if s.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            s,
            format!("must be <= {MAX_NAME_LEN} characters"),
            "shorten the name",
            "invalid_name",
        ));
    }
    let ok = s
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '\'' | '-' | '.'));
    if !ok {
        return Err(ValidationError::new(
            "name",
            s,
            "may only contain letters, spaces, apostrophes, hyphens, and periods",
            "remove digits and symbols",
            "invalid_name",
        ));
    }
    Ok(())
}

/// Validate an email address: exactly one `@`, a non-empty local part,
/// and a dotted domain. Intentionally not a full RFC 5321 parser — the
/// store-side identity provider is the authority; this just catches
/// obvious typos before a round trip.
pub fn validate_email(s: &str) -> Result<(), ValidationError> {
    let err = |reason: &str| {
        Err(ValidationError::new(
            "email",
            s,
            reason.to_string(),
            "use the form name@example.com",
            "invalid_email",
        ))
    };

    if s.is_empty() || s.chars().count() > MAX_EMAIL_LEN {
        return err("must be non-empty and at most 254 characters");
    }
    if s.chars().any(char::is_whitespace) {
        return err("must not contain whitespace");
    }
    let Some((local, domain)) = s.split_once('@') else {
        return err("must contain '@'");
    };
    if local.is_empty() {
        return err("must have a local part before '@'");
    }
    if domain.contains('@') {
        return err("must contain exactly one '@'");
    }
    let dotted = domain.split('.');
    if domain.is_empty() || dotted.clone().count() < 2 || dotted.clone().any(str::is_empty) {
        return err("domain must contain a dot with labels on both sides");
    }
    Ok(())
}

/// Validate a phone number: an optional leading `+`, then 7–15 digits.
/// Spaces, dashes, dots, and parentheses are accepted as separators and
/// ignored.
pub fn validate_phone(s: &str) -> Result<(), ValidationError> {
    let err = |reason: &str| {
        Err(ValidationError::new(
            "phone",
            s,
            reason.to_string(),
            "use digits with an optional leading +, e.g. +1 555 123 4567",
            "invalid_phone",
        ))
    };

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return err("must not be empty");
    }
    let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut digits = 0usize;
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits += 1;
        } else if !matches!(c, ' ' | '-' | '.' | '(' | ')') {
            return err("may only contain digits, separators, and a leading +");
        }
    }
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return err("must contain between 7 and 15 digits");
    }
    Ok(())
}
