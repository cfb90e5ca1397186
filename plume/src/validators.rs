use std::sync::LazyLock;

use email_address::EmailAddress;
use regex::Regex;
use url::Url;

use crate::errors::{ValidationError, ValidationIssue, ValidationResult};

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("username pattern is valid"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

pub fn is_valid_username(value: &str) -> bool {
    USERNAME_PATTERN.is_match(value)
}

/// Removes markup tags, leaving the text between them.
pub fn strip_tags(value: &str) -> String {
    HTML_TAG.replace_all(value, "").into_owned()
}

/// Accumulates field issues and turns them into a single [`ValidationError`].
#[derive(Debug, Default)]
pub struct Checks {
    issues: Vec<ValidationIssue>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.issues.push(ValidationIssue::new(field, "required", format!("{field} is required")));
        }
        self
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        if len < min || len > max {
            self.issues.push(ValidationIssue::new(
                field,
                "length",
                format!("{field} must be between {min} and {max} characters"),
            ));
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.issues.push(ValidationIssue::new(
                field,
                "length",
                format!("{field} cannot exceed {max} characters"),
            ));
        }
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, code: &str, message: &str) -> &mut Self {
        if !ok {
            self.issues.push(ValidationIssue::new(field, code, message));
        }
        self
    }

    pub fn finish(&mut self) -> ValidationResult<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(std::mem::take(&mut self.issues)))
        }
    }
}

/// Checks a comment body against the configured maximum length.
pub fn validate_comment_body(body: &str, max_chars: usize) -> ValidationResult<()> {
    Checks::new()
        .require("content", body)
        .max_length("content", body, max_chars)
        .finish()
}
