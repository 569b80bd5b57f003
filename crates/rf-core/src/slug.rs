//! URL slugs for forums and topics.

use crate::error::{AppError, Result};

/// Words taken by fixed routes under `/forum/`.
pub const RESERVED_SLUGS: &[&str] = &["topics", "posts", "topic", "rss", "atom"];

/// Lowercases, keeps ASCII alphanumerics and `_`, turns whitespace and
/// hyphen runs into a single `-`, and drops everything else.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}

/// Accepts slugs made of ASCII alphanumerics, `_` and `-`.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() {
        return Err(AppError::invalid("slug must not be empty"));
    }
    if slug.len() > 255 {
        return Err(AppError::invalid("slug is longer than 255 characters"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::invalid(format!("'{}' is not a valid slug", slug)));
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Err(AppError::invalid(format!("'{}' is a reserved word", slug)));
    }
    Ok(())
}

/// Uses `explicit` when given and non-blank, otherwise derives one from `name`.
pub fn slug_for(name: &str, explicit: Option<&str>) -> Result<String> {
    let slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => slugify(name),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust -- 2021 Edition! "), "rust-2021-edition");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn derived_slug_must_not_be_empty() {
        assert!(slug_for("???", None).is_err());
        assert_eq!(slug_for("General Talk", None).unwrap(), "general-talk");
    }

    #[test]
    fn explicit_slug_overrides_name() {
        assert_eq!(slug_for("General Talk", Some("lounge")).unwrap(), "lounge");
        assert_eq!(slug_for("General Talk", Some("  ")).unwrap(), "general-talk");
        assert!(slug_for("x", Some("has space")).is_err());
    }

    #[test]
    fn reserved_route_words_are_rejected() {
        assert!(slug_for("Topics", None).is_err());
        assert!(slug_for("anything", Some("rss")).is_err());
    }
}
