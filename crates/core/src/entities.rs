//! Directory entities and the snapshot that holds them.
//!
//! Every segment, category, subcategory, and company is scoped to exactly
//! one [`Place`]. Categories belong to a *set* of segments (many-to-many);
//! subcategories belong to exactly one category. Companies carry a single
//! [`CompanyAttachment`] and derive the remaining levels by walking upward.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A geographic venue; the root of all scoping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: DbId,
    pub name: String,
    /// Unique across the whole system.
    pub slug: String,
    pub city: String,
    pub state: String,
    pub is_active: bool,
}

/// Top level of the categorization hierarchy within a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: DbId,
    pub place_id: DbId,
    pub name: String,
    pub slug: String,
    /// Display color, e.g. `"#ff8800"`.
    pub color: Option<String>,
    /// Display rank; lower sorts first.
    pub order: i32,
    pub is_active: bool,
}

/// Middle level of the hierarchy. May belong to several segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: DbId,
    pub place_id: DbId,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_active: bool,
    /// Owning segments, duplicate-free, in the order the backend listed them.
    #[serde(default)]
    pub segment_ids: Vec<DbId>,
}

impl Category {
    /// Whether `segment_id` is one of this category's segments.
    pub fn has_segment(&self, segment_id: DbId) -> bool {
        self.segment_ids.contains(&segment_id)
    }

    /// Drop repeated segment ids, keeping the first occurrence of each.
    pub fn dedup_segment_ids(&mut self) {
        let mut seen = HashSet::with_capacity(self.segment_ids.len());
        self.segment_ids.retain(|id| seen.insert(*id));
    }
}

/// Deepest level of the hierarchy. Owned by exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: DbId,
    pub place_id: DbId,
    pub category_id: DbId,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_active: bool,
}

/// A business listed in a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: DbId,
    pub place_id: DbId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    #[serde(default)]
    pub attachment: CompanyAttachment,
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// The hierarchy levels a company can be attached at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentLevel {
    Segment,
    Category,
    Subcategory,
}

impl AttachmentLevel {
    /// Parse a level name as used by the directory backend.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "segment" => Ok(Self::Segment),
            "category" => Ok(Self::Category),
            "subcategory" => Ok(Self::Subcategory),
            _ => Err(CoreError::Validation(format!(
                "Invalid attachment level '{s}'. Must be one of: segment, category, subcategory"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
        }
    }
}

/// The single hierarchy node a company is directly linked to.
///
/// Being an enum, a company can never carry two independent,
/// possibly-contradictory attachment ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "target_id", rename_all = "snake_case")]
pub enum CompanyAttachment {
    #[default]
    Unattached,
    Segment(DbId),
    Category(DbId),
    Subcategory(DbId),
}

/// The flat three-field view of an attachment, as forms and the backend see it.
///
/// Exactly one field is set for an attached company, none otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentFields {
    pub segment_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub subcategory_id: Option<DbId>,
}

impl CompanyAttachment {
    /// Build an attachment from a level and target id.
    pub fn at(level: AttachmentLevel, target_id: DbId) -> Self {
        match level {
            AttachmentLevel::Segment => Self::Segment(target_id),
            AttachmentLevel::Category => Self::Category(target_id),
            AttachmentLevel::Subcategory => Self::Subcategory(target_id),
        }
    }

    /// Collapse possibly-redundant ids to the deepest one present.
    ///
    /// Backend records carry all three resolved levels; only the deepest
    /// is the real attachment, the rest are derivable.
    pub fn deepest_of(
        segment_id: Option<DbId>,
        category_id: Option<DbId>,
        subcategory_id: Option<DbId>,
    ) -> Self {
        match (subcategory_id, category_id, segment_id) {
            (Some(id), _, _) => Self::Subcategory(id),
            (None, Some(id), _) => Self::Category(id),
            (None, None, Some(id)) => Self::Segment(id),
            (None, None, None) => Self::Unattached,
        }
    }

    pub fn level(&self) -> Option<AttachmentLevel> {
        match self {
            Self::Unattached => None,
            Self::Segment(_) => Some(AttachmentLevel::Segment),
            Self::Category(_) => Some(AttachmentLevel::Category),
            Self::Subcategory(_) => Some(AttachmentLevel::Subcategory),
        }
    }

    pub fn target_id(&self) -> Option<DbId> {
        match *self {
            Self::Unattached => None,
            Self::Segment(id) | Self::Category(id) | Self::Subcategory(id) => Some(id),
        }
    }

    pub fn is_attached(&self) -> bool {
        !matches!(self, Self::Unattached)
    }

    pub fn fields(&self) -> AttachmentFields {
        match *self {
            Self::Unattached => AttachmentFields::default(),
            Self::Segment(id) => AttachmentFields {
                segment_id: Some(id),
                ..Default::default()
            },
            Self::Category(id) => AttachmentFields {
                category_id: Some(id),
                ..Default::default()
            },
            Self::Subcategory(id) => AttachmentFields {
                subcategory_id: Some(id),
                ..Default::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A full, normalized copy of the loaded directory collections.
///
/// Snapshots are always replaced wholesale, never patched in place, except
/// for single-company refreshes after a mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
    #[serde(default)]
    pub companies: Vec<Company>,
}

impl DirectorySnapshot {
    pub fn place(&self, id: DbId) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn segment(&self, id: DbId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn category(&self, id: DbId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn subcategory(&self, id: DbId) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| s.id == id)
    }

    pub fn company(&self, id: DbId) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }

    /// Segment `id`, but only if it belongs to `place_id`.
    pub fn segment_in_place(&self, id: DbId, place_id: DbId) -> Option<&Segment> {
        self.segment(id).filter(|s| s.place_id == place_id)
    }

    /// Category `id`, but only if it belongs to `place_id`.
    pub fn category_in_place(&self, id: DbId, place_id: DbId) -> Option<&Category> {
        self.category(id).filter(|c| c.place_id == place_id)
    }

    /// Subcategory `id`, but only if it belongs to `place_id`.
    pub fn subcategory_in_place(&self, id: DbId, place_id: DbId) -> Option<&Subcategory> {
        self.subcategory(id).filter(|s| s.place_id == place_id)
    }

    /// Replace a loaded company by id. Returns `false`, leaving the
    /// snapshot untouched, when no company with that id is loaded.
    pub fn replace_company(&mut self, company: Company) -> bool {
        match self.companies.iter_mut().find(|c| c.id == company.id) {
            Some(existing) => {
                *existing = company;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deepest_of_prefers_subcategory() {
        assert_eq!(
            CompanyAttachment::deepest_of(Some(1), Some(10), Some(100)),
            CompanyAttachment::Subcategory(100)
        );
        assert_eq!(
            CompanyAttachment::deepest_of(Some(1), Some(10), None),
            CompanyAttachment::Category(10)
        );
        assert_eq!(
            CompanyAttachment::deepest_of(Some(1), None, None),
            CompanyAttachment::Segment(1)
        );
        assert_eq!(
            CompanyAttachment::deepest_of(None, None, None),
            CompanyAttachment::Unattached
        );
    }

    #[test]
    fn fields_sets_exactly_one_level() {
        let fields = CompanyAttachment::Category(10).fields();
        assert_eq!(fields.segment_id, None);
        assert_eq!(fields.category_id, Some(10));
        assert_eq!(fields.subcategory_id, None);

        assert_eq!(
            CompanyAttachment::Unattached.fields(),
            AttachmentFields::default()
        );
    }

    #[test]
    fn attachment_serializes_with_level_tag() {
        let json = serde_json::to_value(CompanyAttachment::Subcategory(100)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"level": "subcategory", "target_id": 100})
        );

        let back: CompanyAttachment = serde_json::from_value(json).unwrap();
        assert_eq!(back, CompanyAttachment::Subcategory(100));
    }

    #[test]
    fn attachment_level_parses_known_names() {
        assert_eq!(
            AttachmentLevel::from_str_db("category").unwrap(),
            AttachmentLevel::Category
        );
        let err = AttachmentLevel::from_str_db("place").unwrap_err();
        assert!(err.to_string().contains("place"));
    }

    #[test]
    fn dedup_segment_ids_keeps_first_occurrence() {
        let mut category = Category {
            id: 1,
            place_id: 1,
            name: "Bars".to_string(),
            slug: "bars".to_string(),
            order: 0,
            is_active: true,
            segment_ids: vec![2, 1, 2, 3, 1],
        };
        category.dedup_segment_ids();
        assert_eq!(category.segment_ids, vec![2, 1, 3]);
    }

    #[test]
    fn place_scoped_lookups_reject_other_places() {
        let snapshot = DirectorySnapshot {
            segments: vec![Segment {
                id: 1,
                place_id: 7,
                name: "Food".to_string(),
                slug: "food".to_string(),
                color: None,
                order: 0,
                is_active: true,
            }],
            ..Default::default()
        };
        assert!(snapshot.segment_in_place(1, 7).is_some());
        assert!(snapshot.segment_in_place(1, 8).is_none());
        assert!(snapshot.segment_in_place(2, 7).is_none());
    }
}
