//! Deletion impact: what an operator loses or detaches by deleting a node.
//!
//! The backend performs the actual cascade; this module lets the console
//! show the consequences up front and block place deletion while children
//! remain.

use serde::{Deserialize, Serialize};

use crate::entities::{CompanyAttachment, DirectorySnapshot};
use crate::error::CoreError;
use crate::types::DbId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DeletionTarget {
    Place(DbId),
    Segment(DbId),
    Category(DbId),
    Subcategory(DbId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionImpact {
    /// Entities deleted along with the target (owned children).
    pub removed_segment_ids: Vec<DbId>,
    pub removed_category_ids: Vec<DbId>,
    pub removed_subcategory_ids: Vec<DbId>,
    pub removed_company_ids: Vec<DbId>,
    /// Categories that lose the target segment but survive.
    pub detached_category_ids: Vec<DbId>,
    /// Of those, categories left with no segment at all.
    pub orphaned_category_ids: Vec<DbId>,
    /// Companies whose direct attachment gets cleared.
    pub detached_company_ids: Vec<DbId>,
}

impl DeletionImpact {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn company_ids_attached_to(
    snapshot: &DirectorySnapshot,
    pred: impl Fn(&CompanyAttachment) -> bool,
) -> Vec<DbId> {
    snapshot
        .companies
        .iter()
        .filter(|c| pred(&c.attachment))
        .map(|c| c.id)
        .collect()
}

pub fn deletion_impact(snapshot: &DirectorySnapshot, target: DeletionTarget) -> DeletionImpact {
    let mut impact = DeletionImpact::default();

    match target {
        DeletionTarget::Place(place_id) => {
            impact.removed_segment_ids = snapshot
                .segments
                .iter()
                .filter(|s| s.place_id == place_id)
                .map(|s| s.id)
                .collect();
            impact.removed_category_ids = snapshot
                .categories
                .iter()
                .filter(|c| c.place_id == place_id)
                .map(|c| c.id)
                .collect();
            impact.removed_subcategory_ids = snapshot
                .subcategories
                .iter()
                .filter(|s| s.place_id == place_id)
                .map(|s| s.id)
                .collect();
            impact.removed_company_ids = snapshot
                .companies
                .iter()
                .filter(|c| c.place_id == place_id)
                .map(|c| c.id)
                .collect();
        }
        DeletionTarget::Segment(segment_id) => {
            for category in snapshot.categories.iter().filter(|c| c.has_segment(segment_id)) {
                impact.detached_category_ids.push(category.id);
                if category.segment_ids.iter().all(|id| *id == segment_id) {
                    impact.orphaned_category_ids.push(category.id);
                }
            }
            impact.detached_company_ids = company_ids_attached_to(snapshot, |a| {
                *a == CompanyAttachment::Segment(segment_id)
            });
        }
        DeletionTarget::Category(category_id) => {
            impact.removed_subcategory_ids = snapshot
                .subcategories
                .iter()
                .filter(|s| s.category_id == category_id)
                .map(|s| s.id)
                .collect();
            let removed = impact.removed_subcategory_ids.clone();
            impact.detached_company_ids = company_ids_attached_to(snapshot, |a| match a {
                CompanyAttachment::Category(id) => *id == category_id,
                CompanyAttachment::Subcategory(id) => removed.contains(id),
                _ => false,
            });
        }
        DeletionTarget::Subcategory(subcategory_id) => {
            impact.detached_company_ids = company_ids_attached_to(snapshot, |a| {
                *a == CompanyAttachment::Subcategory(subcategory_id)
            });
        }
    }

    impact
}

/// Refuse to delete a place that still owns anything.
pub fn ensure_place_deletable(
    snapshot: &DirectorySnapshot,
    place_id: DbId,
) -> Result<(), CoreError> {
    let impact = deletion_impact(snapshot, DeletionTarget::Place(place_id));
    if impact.is_empty() {
        return Ok(());
    }
    Err(CoreError::Conflict(format!(
        "Place {place_id} still has {} segments, {} categories, {} subcategories and {} companies",
        impact.removed_segment_ids.len(),
        impact.removed_category_ids.len(),
        impact.removed_subcategory_ids.len(),
        impact.removed_company_ids.len(),
    )))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::fixtures::food_and_drink;

    #[test]
    fn place_with_children_cannot_be_deleted() {
        let snapshot = food_and_drink();
        assert_matches!(
            ensure_place_deletable(&snapshot, 1),
            Err(CoreError::Conflict(msg)) if msg.contains("2 segments")
        );
        assert!(ensure_place_deletable(&snapshot, 2).is_ok());
    }

    #[test]
    fn segment_deletion_detaches_categories_and_companies() {
        let impact = deletion_impact(&food_and_drink(), DeletionTarget::Segment(1));
        assert_eq!(impact.detached_category_ids, vec![10, 11]);
        assert_eq!(impact.orphaned_category_ids, vec![10]);
        assert_eq!(impact.detached_company_ids, vec![1002]);
        assert!(impact.removed_category_ids.is_empty());
    }

    #[test]
    fn category_deletion_removes_subcategories_and_detaches_companies() {
        let impact = deletion_impact(&food_and_drink(), DeletionTarget::Category(10));
        assert_eq!(impact.removed_subcategory_ids, vec![100]);
        assert_eq!(impact.detached_company_ids, vec![1000]);

        let impact = deletion_impact(&food_and_drink(), DeletionTarget::Category(11));
        assert_eq!(impact.removed_subcategory_ids, vec![110]);
        assert_eq!(impact.detached_company_ids, vec![1001]);
    }

    #[test]
    fn subcategory_deletion_detaches_only_its_companies() {
        let impact = deletion_impact(&food_and_drink(), DeletionTarget::Subcategory(110));
        assert!(impact.detached_company_ids.is_empty());
        assert!(impact.is_empty());
    }
}
