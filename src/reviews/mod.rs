//! Album reviews and comments: document model, form validation, lifecycle
//! rules. Documents live in the library db next to the albums they belong to.

mod sanitize;

pub use sanitize::{sanitize_html, ALLOWED_TAGS};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Review,
    Comment,
}

impl DocKind {
    pub fn to_int(self) -> i64 {
        match self {
            DocKind::Review => 0,
            DocKind::Comment => 1,
        }
    }

    pub fn from_int(value: i64) -> Option<DocKind> {
        match value {
            0 => Some(DocKind::Review),
            1 => Some(DocKind::Comment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub album_id: String,
    pub kind: DocKind,
    /// Set when the author was logged in, otherwise `author_name` is free text.
    pub author_user_id: Option<String>,
    pub author_name: String,
    /// Reviews carry a title, comments never do.
    pub title: Option<String>,
    pub text: String,
    pub is_hidden: bool,
    pub created: i64,
    pub modified: i64,
}

pub const MAX_TITLE_LEN: usize = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("text must not be empty")]
    EmptyText,
    #[error("a review needs a title")]
    MissingTitle,
    #[error("title must be at most {MAX_TITLE_LEN} characters")]
    TitleTooLong,
    #[error("author name must not be empty")]
    MissingAuthor,
}

/// Validates a submitted review/comment form. `author_name` is the resolved
/// author: the session user's handle or the free-text name from the form.
pub fn validate_form(
    kind: DocKind,
    title: Option<&str>,
    text: &str,
    author_name: &str,
) -> Result<(), FormError> {
    if text.trim().is_empty() {
        return Err(FormError::EmptyText);
    }
    if author_name.trim().is_empty() {
        return Err(FormError::MissingAuthor);
    }
    if kind == DocKind::Review {
        match title {
            None => return Err(FormError::MissingTitle),
            Some(title) if title.trim().is_empty() => return Err(FormError::MissingTitle),
            Some(title) if title.chars().count() > MAX_TITLE_LEN => {
                return Err(FormError::TitleTooLong)
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_requires_title_and_text() {
        assert_eq!(
            validate_form(DocKind::Review, None, "text", "dj"),
            Err(FormError::MissingTitle)
        );
        assert_eq!(
            validate_form(DocKind::Review, Some("  "), "text", "dj"),
            Err(FormError::MissingTitle)
        );
        assert_eq!(
            validate_form(DocKind::Review, Some("t"), "   ", "dj"),
            Err(FormError::EmptyText)
        );
        assert!(validate_form(DocKind::Review, Some("t"), "text", "dj").is_ok());
    }

    #[test]
    fn comment_needs_no_title() {
        assert!(validate_form(DocKind::Comment, None, "text", "dj").is_ok());
    }

    #[test]
    fn title_length_limit() {
        let long_title = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(
            validate_form(DocKind::Review, Some(&long_title), "text", "dj"),
            Err(FormError::TitleTooLong)
        );
        let max_title = "x".repeat(MAX_TITLE_LEN);
        assert!(validate_form(DocKind::Review, Some(&max_title), "text", "dj").is_ok());
    }

    #[test]
    fn author_must_be_present() {
        assert_eq!(
            validate_form(DocKind::Comment, None, "text", ""),
            Err(FormError::MissingAuthor)
        );
    }
}
