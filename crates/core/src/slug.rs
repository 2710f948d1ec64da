//! Slug generation, format validation, and per-place uniqueness.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::DirectorySnapshot;
use crate::error::CoreError;
use crate::types::DbId;

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 120;

/// Lowercase alphanumeric words joined by single hyphens.
const SLUG_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(SLUG_PATTERN).expect("valid regex"));

/// Entity kinds that carry a slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlugKind {
    Place,
    Segment,
    Category,
    Subcategory,
    Company,
}

impl SlugKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Segment => "segment",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::Company => "company",
        }
    }
}

/// Derive a slug from a display name.
///
/// Non-ASCII-alphanumeric runs collapse to one hyphen; leading and trailing
/// hyphens are dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation("Slug must not be empty".to_string()));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(CoreError::Validation(format!(
            "Slug exceeds maximum length of {MAX_SLUG_LEN} characters"
        )));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(CoreError::Validation(format!(
            "Invalid slug '{slug}'. Use lowercase letters, digits and single hyphens"
        )));
    }
    Ok(())
}

/// Ensure no other entity of `kind` uses `slug` within `place_id`.
///
/// Place slugs are checked system-wide and ignore `place_id`. `exclude_id`
/// skips the entity being edited.
pub fn ensure_slug_unique(
    snapshot: &DirectorySnapshot,
    kind: SlugKind,
    place_id: DbId,
    slug: &str,
    exclude_id: Option<DbId>,
) -> Result<(), CoreError> {
    let others = |id: DbId| Some(id) != exclude_id;
    let taken = match kind {
        SlugKind::Place => snapshot
            .places
            .iter()
            .any(|p| others(p.id) && p.slug == slug),
        SlugKind::Segment => snapshot
            .segments
            .iter()
            .any(|s| others(s.id) && s.place_id == place_id && s.slug == slug),
        SlugKind::Category => snapshot
            .categories
            .iter()
            .any(|c| others(c.id) && c.place_id == place_id && c.slug == slug),
        SlugKind::Subcategory => snapshot
            .subcategories
            .iter()
            .any(|s| others(s.id) && s.place_id == place_id && s.slug == slug),
        SlugKind::Company => snapshot
            .companies
            .iter()
            .any(|c| others(c.id) && c.place_id == place_id && c.slug == slug),
    };

    if taken {
        Err(CoreError::Conflict(format!(
            "A {} with slug '{slug}' already exists",
            kind.as_str()
        )))
    } else {
        Ok(())
    }
}
