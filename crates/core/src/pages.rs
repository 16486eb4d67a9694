//! Page field validation and slug generation.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the repository layer and any future CLI or worker tooling.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";

/// All valid page workflow statuses.
pub const VALID_STATUSES: &[&str] = &[STATUS_DRAFT, STATUS_PUBLISHED];

// ---------------------------------------------------------------------------
// Slug generation
// ---------------------------------------------------------------------------

/// Generate a URL-safe slug from a page title.
///
/// Converts to lowercase, replaces spaces and special characters with hyphens,
/// collapses consecutive hyphens, and trims leading/trailing hyphens.
pub fn generate_slug(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else {
                '-'
            }
        })
        .collect();

    // Collapse consecutive hyphens.
    let mut result = String::with_capacity(slug.len());
    let mut prev_hyphen = false;
    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen {
                result.push('-');
            }
            prev_hyphen = true;
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    // Trim leading/trailing hyphens.
    result.trim_matches('-').to_string()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a page title (non-empty, <= 200 chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.len() > 200 {
        return Err(CoreError::Validation(
            "Title must be at most 200 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a slug (non-empty, only lowercase alphanumeric + hyphens).
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation("Slug must not be empty".into()));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::Validation(
            "Slug must contain only lowercase alphanumeric characters and hyphens".into(),
        ));
    }
    Ok(())
}

/// Validate a page workflow status against the known set.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if !VALID_STATUSES.contains(&status) {
        return Err(CoreError::Validation(format!(
            "Invalid status '{}'. Valid statuses: {}",
            status,
            VALID_STATUSES.join(", ")
        )));
    }
    Ok(())
}

/// Validate page content (max 500 000 chars).
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.len() > 500_000 {
        return Err(CoreError::Validation(
            "Content must be at most 500000 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a page summary (max 500 chars).
pub fn validate_summary(summary: &str) -> Result<(), CoreError> {
    if summary.len() > 500 {
        return Err(CoreError::Validation(
            "Summary must be at most 500 characters".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- generate_slug -------------------------------------------------------

    #[test]
    fn slug_basic_title() {
        assert_eq!(generate_slug("About Us"), "about-us");
    }

    #[test]
    fn slug_special_characters() {
        assert_eq!(
            generate_slug("Pricing: Plans & Add-ons (2026)"),
            "pricing-plans-add-ons-2026"
        );
    }

    #[test]
    fn slug_collapses_consecutive_hyphens() {
        assert_eq!(generate_slug("foo---bar"), "foo-bar");
    }

    #[test]
    fn slug_trims_leading_trailing_hyphens() {
        assert_eq!(generate_slug("--hello--"), "hello");
    }

    // -- validate_title ------------------------------------------------------

    #[test]
    fn title_valid() {
        assert!(validate_title("My Page").is_ok());
    }

    #[test]
    fn title_empty_rejected() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn title_too_long_rejected() {
        let long = "a".repeat(201);
        assert!(validate_title(&long).is_err());
    }

    // -- validate_slug -------------------------------------------------------

    #[test]
    fn slug_valid() {
        assert!(validate_slug("about-us").is_ok());
    }

    #[test]
    fn slug_empty_rejected() {
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn slug_uppercase_rejected() {
        assert!(validate_slug("About-Us").is_err());
    }

    // -- validate_status -----------------------------------------------------

    #[test]
    fn status_valid() {
        assert!(validate_status("draft").is_ok());
        assert!(validate_status("published").is_ok());
    }

    #[test]
    fn status_invalid() {
        assert!(validate_status("archived").is_err());
    }

    // -- validate_content ----------------------------------------------------

    #[test]
    fn content_valid() {
        assert!(validate_content("Hello world").is_ok());
    }

    #[test]
    fn content_too_long_rejected() {
        let long = "x".repeat(500_001);
        assert!(validate_content(&long).is_err());
    }

    // -- validate_summary ----------------------------------------------------

    #[test]
    fn summary_too_long_rejected() {
        let long = "s".repeat(501);
        assert!(validate_summary(&long).is_err());
    }
}
