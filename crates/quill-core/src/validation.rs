//! Field validation with a closed field set.
//!
//! Every request field that can fail validation is named by [`Field`], so
//! error payloads are keyed by a known identifier instead of arbitrary
//! strings. Validators report every violated field, not just the first.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_EXCERPT_LEN: usize = 300;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;
pub const MAX_CATEGORY_DESCRIPTION_LEN: usize = 200;
pub const MIN_PASSWORD_LEN: usize = 6;

/// The closed set of request fields that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Content,
    Excerpt,
    Name,
    Description,
    Username,
    Email,
    Password,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Content => "content",
            Field::Excerpt => "excerpt",
            Field::Name => "name",
            Field::Description => "description",
            Field::Username => "username",
            Field::Email => "email",
            Field::Password => "password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single violated field with its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: Field,
    pub message: String,
}

impl FieldViolation {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate the writable post fields. Used for creation and for the merged
/// result of a partial update.
pub fn validate_post(
    title: &str,
    content: &str,
    excerpt: Option<&str>,
) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Vec::new();

    if title.trim().is_empty() {
        violations.push(FieldViolation::new(Field::Title, "Title is required"));
    } else if title.chars().count() > MAX_TITLE_LEN {
        violations.push(FieldViolation::new(
            Field::Title,
            format!("Title cannot be more than {MAX_TITLE_LEN} characters"),
        ));
    }

    if content.trim().is_empty() {
        violations.push(FieldViolation::new(Field::Content, "Content is required"));
    }

    if let Some(excerpt) = excerpt {
        if excerpt.chars().count() > MAX_EXCERPT_LEN {
            violations.push(FieldViolation::new(
                Field::Excerpt,
                format!("Excerpt cannot be more than {MAX_EXCERPT_LEN} characters"),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Validate the writable category fields.
pub fn validate_category(name: &str, description: Option<&str>) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Vec::new();

    if name.trim().is_empty() {
        violations.push(FieldViolation::new(Field::Name, "Category name is required"));
    } else if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        violations.push(FieldViolation::new(
            Field::Name,
            format!("Category name cannot be more than {MAX_CATEGORY_NAME_LEN} characters"),
        ));
    }

    if let Some(description) = description {
        if description.chars().count() > MAX_CATEGORY_DESCRIPTION_LEN {
            violations.push(FieldViolation::new(
                Field::Description,
                format!(
                    "Description cannot be more than {MAX_CATEGORY_DESCRIPTION_LEN} characters"
                ),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Validate a registration request.
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Vec::new();

    if !is_valid_username(username) {
        violations.push(FieldViolation::new(
            Field::Username,
            "Username can only contain letters, numbers, and underscores (3-30 characters)",
        ));
    }

    if !is_valid_email(email) {
        violations.push(FieldViolation::new(
            Field::Email,
            "Please enter a valid email address",
        ));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        violations.push(FieldViolation::new(
            Field::Password,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (3..=30).contains(&len)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_title_boundary() {
        let at_limit = "t".repeat(MAX_TITLE_LEN);
        assert!(validate_post(&at_limit, "content", None).is_ok());

        let over_limit = "t".repeat(MAX_TITLE_LEN + 1);
        let violations = validate_post(&over_limit, "content", None).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, Field::Title);
    }

    #[test]
    fn post_reports_every_violated_field() {
        let excerpt = "e".repeat(MAX_EXCERPT_LEN + 1);
        let violations = validate_post("", "", Some(&excerpt)).unwrap_err();

        let fields: Vec<Field> = violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec![Field::Title, Field::Content, Field::Excerpt]);
    }

    #[test]
    fn post_missing_content_message() {
        let violations = validate_post("Title", "   ", None).unwrap_err();
        assert_eq!(violations[0].message, "Content is required");
    }

    #[test]
    fn category_name_limits() {
        assert!(validate_category("Tech", None).is_ok());
        assert!(validate_category("", None).is_err());

        let long = "n".repeat(MAX_CATEGORY_NAME_LEN + 1);
        let violations = validate_category(&long, None).unwrap_err();
        assert_eq!(violations[0].field, Field::Name);
    }

    #[test]
    fn registration_checks_all_fields() {
        let violations = validate_registration("x", "not-an-email", "short").unwrap_err();
        let fields: Vec<Field> = violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec![Field::Username, Field::Email, Field::Password]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user@sub.example.co"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn username_shapes() {
        assert!(is_valid_username("writer_01"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"u".repeat(31)));
    }
}
