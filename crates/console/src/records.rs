//! Denormalized records as the directory backend returns them, and their
//! normalization into core entities.
//!
//! The backend embeds parents in children: a category carries its
//! segments, a subcategory carries its category (with segments), and a
//! company carries whatever levels it resolves to. The console keeps only
//! ids and derives everything else from the snapshot.

use serde::{Deserialize, Serialize};

use placedir_core::entities::{
    Category, Company, CompanyAttachment, DirectorySnapshot, Place, Segment, Subcategory,
};
use placedir_core::types::DbId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: DbId,
    pub place_id: DbId,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_active: bool,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryRecord {
    pub id: DbId,
    pub place_id: DbId,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_active: bool,
    pub category: CategoryRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: DbId,
    pub place_id: DbId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub segment_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub subcategory_id: Option<DbId>,
    pub segment: Option<Segment>,
    pub category: Option<CategoryRecord>,
    pub subcategory: Option<SubcategoryRecord>,
}

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        let mut category = Category {
            id: record.id,
            place_id: record.place_id,
            name: record.name,
            slug: record.slug,
            order: record.order,
            is_active: record.is_active,
            segment_ids: record.segments.iter().map(|s| s.id).collect(),
        };
        category.dedup_segment_ids();
        category
    }
}

impl From<SubcategoryRecord> for Subcategory {
    fn from(record: SubcategoryRecord) -> Self {
        Subcategory {
            id: record.id,
            place_id: record.place_id,
            category_id: record.category.id,
            name: record.name,
            slug: record.slug,
            order: record.order,
            is_active: record.is_active,
        }
    }
}

impl From<CompanyRecord> for Company {
    /// The deepest level present, from explicit ids or embedded objects,
    /// becomes the attachment.
    fn from(record: CompanyRecord) -> Self {
        let subcategory_id = record
            .subcategory_id
            .or(record.subcategory.as_ref().map(|s| s.id));
        let category_id = record.category_id.or(record.category.as_ref().map(|c| c.id));
        let segment_id = record.segment_id.or(record.segment.as_ref().map(|s| s.id));

        Company {
            id: record.id,
            place_id: record.place_id,
            name: record.name,
            slug: record.slug,
            is_active: record.is_active,
            attachment: CompanyAttachment::deepest_of(segment_id, category_id, subcategory_id),
        }
    }
}

/// Everything one reload fetched for one place.
#[derive(Debug, Clone, Default)]
pub struct PlaceRecords {
    pub segments: Vec<Segment>,
    pub categories: Vec<CategoryRecord>,
    pub subcategories: Vec<SubcategoryRecord>,
    pub companies: Vec<CompanyRecord>,
}

/// Build a normalized snapshot from the places list and per-place records.
pub fn normalize(places: Vec<Place>, per_place: Vec<PlaceRecords>) -> DirectorySnapshot {
    let mut snapshot = DirectorySnapshot {
        places,
        ..Default::default()
    };
    for records in per_place {
        snapshot.segments.extend(records.segments);
        snapshot
            .categories
            .extend(records.categories.into_iter().map(Category::from));
        snapshot
            .subcategories
            .extend(records.subcategories.into_iter().map(Subcategory::from));
        snapshot
            .companies
            .extend(records.companies.into_iter().map(Company::from));
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: DbId) -> Segment {
        Segment {
            id,
            place_id: 1,
            name: format!("Segment {id}"),
            slug: format!("segment-{id}"),
            color: None,
            order: 0,
            is_active: true,
        }
    }

    fn bars() -> CategoryRecord {
        CategoryRecord {
            id: 11,
            place_id: 1,
            name: "Bars".to_string(),
            slug: "bars".to_string(),
            order: 1,
            is_active: true,
            segments: vec![seg(2), seg(1), seg(2)],
        }
    }

    #[test]
    fn category_keeps_listing_order_without_duplicates() {
        let category = Category::from(bars());
        assert_eq!(category.segment_ids, vec![2, 1]);
    }

    #[test]
    fn subcategory_takes_embedded_category_id() {
        let record = SubcategoryRecord {
            id: 110,
            place_id: 1,
            name: "Pubs".to_string(),
            slug: "pubs".to_string(),
            order: 0,
            is_active: true,
            category: bars(),
        };
        assert_eq!(Subcategory::from(record).category_id, 11);
    }

    #[test]
    fn company_attachment_is_deepest_level() {
        let record = CompanyRecord {
            id: 1000,
            place_id: 1,
            name: "The Tap".to_string(),
            slug: "the-tap".to_string(),
            is_active: true,
            segment_id: Some(1),
            category_id: None,
            subcategory_id: None,
            segment: Some(seg(1)),
            category: Some(bars()),
            subcategory: None,
        };
        assert_eq!(
            Company::from(record).attachment,
            CompanyAttachment::Category(11)
        );
    }

    #[test]
    fn company_record_parses_from_json() {
        let json = serde_json::json!({
            "id": 5,
            "place_id": 1,
            "name": "Corner Shop",
            "slug": "corner-shop",
            "is_active": true,
            "segment_id": null,
            "category_id": null,
            "subcategory_id": 100,
            "segment": null,
            "category": null,
            "subcategory": null
        });
        let record: CompanyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(
            Company::from(record).attachment,
            CompanyAttachment::Subcategory(100)
        );
    }
}
