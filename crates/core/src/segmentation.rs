//! Company segmentation: effective hierarchy, attachment requests, and
//! aggregate views for overview screens.
//!
//! A company is attached at exactly one depth (or not at all); the other
//! levels are always derived by walking up from that attachment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{
    Category, Company, CompanyAttachment, DirectorySnapshot, Segment, Subcategory,
};
use crate::error::CoreError;
use crate::hierarchy::{categories_for_place, segments_for_place};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Tie-break policy
// ---------------------------------------------------------------------------

/// How to pick "the" segment of a category that belongs to several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentTieBreak {
    /// The first segment in the order the backend listed them.
    #[default]
    FirstListed,
    /// The segment with the smallest id.
    LowestId,
}

impl SegmentTieBreak {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "first_listed" => Ok(Self::FirstListed),
            "lowest_id" => Ok(Self::LowestId),
            _ => Err(CoreError::Validation(format!(
                "Invalid segment tie-break '{s}'. Must be one of: first_listed, lowest_id"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstListed => "first_listed",
            Self::LowestId => "lowest_id",
        }
    }

    /// Pick one id out of `candidates`.
    pub fn pick(&self, candidates: &[DbId]) -> Option<DbId> {
        match self {
            Self::FirstListed => candidates.first().copied(),
            Self::LowestId => candidates.iter().min().copied(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hierarchy resolution
// ---------------------------------------------------------------------------

/// The effective segmentation of one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHierarchy<'a> {
    pub segment: Option<&'a Segment>,
    pub category: Option<&'a Category>,
    pub subcategory: Option<&'a Subcategory>,
    /// Every segment the company falls under, in listing order. More than
    /// one only when attached below a multi-segment category.
    pub candidate_segment_ids: Vec<DbId>,
    /// All three levels resolved to entities present in the snapshot.
    pub has_full_hierarchy: bool,
}

/// Segments of `category` that are present in the snapshot.
fn present_segments(snapshot: &DirectorySnapshot, category: &Category) -> Vec<DbId> {
    category
        .segment_ids
        .iter()
        .copied()
        .filter(|id| snapshot.segment(*id).is_some())
        .collect()
}

/// Walk upward from the company's attachment.
///
/// Missing parents (deleted from the snapshot) resolve to `None` at that
/// level and everything above it.
pub fn resolve_hierarchy<'a>(
    company: &Company,
    snapshot: &'a DirectorySnapshot,
    policy: SegmentTieBreak,
) -> ResolvedHierarchy<'a> {
    let mut subcategory = None;
    let mut category = None;
    let mut candidate_segment_ids = Vec::new();

    match company.attachment {
        CompanyAttachment::Unattached => {}
        CompanyAttachment::Segment(id) => {
            if snapshot.segment(id).is_some() {
                candidate_segment_ids.push(id);
            }
        }
        CompanyAttachment::Category(id) => {
            category = snapshot.category(id);
        }
        CompanyAttachment::Subcategory(id) => {
            subcategory = snapshot.subcategory(id);
            category = subcategory.and_then(|s| snapshot.category(s.category_id));
        }
    }

    if let Some(category) = category {
        candidate_segment_ids = present_segments(snapshot, category);
    }

    let segment = policy
        .pick(&candidate_segment_ids)
        .and_then(|id| snapshot.segment(id));

    ResolvedHierarchy {
        segment,
        category,
        subcategory,
        candidate_segment_ids,
        has_full_hierarchy: segment.is_some() && category.is_some() && subcategory.is_some(),
    }
}

// ---------------------------------------------------------------------------
// Attachment requests
// ---------------------------------------------------------------------------

/// A request to re-point a company, safe to hand to the backend.
///
/// The attachment is an enum, so the request can never carry two levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRequest {
    pub company_id: DbId,
    pub attachment: CompanyAttachment,
}

fn company_place(snapshot: &DirectorySnapshot, company_id: DbId) -> Result<DbId, CoreError> {
    snapshot
        .company(company_id)
        .map(|c| c.place_id)
        .ok_or(CoreError::NotFound {
            entity: "company",
            id: company_id,
        })
}

/// Attach a company directly to a segment.
pub fn assign_to_segment(
    snapshot: &DirectorySnapshot,
    company_id: DbId,
    segment_id: DbId,
) -> Result<AttachmentRequest, CoreError> {
    let place_id = company_place(snapshot, company_id)?;
    snapshot
        .segment_in_place(segment_id, place_id)
        .ok_or(CoreError::Referential {
            entity: "segment",
            id: segment_id,
        })?;
    Ok(AttachmentRequest {
        company_id,
        attachment: CompanyAttachment::Segment(segment_id),
    })
}

/// Attach a company directly to a category.
pub fn assign_to_category(
    snapshot: &DirectorySnapshot,
    company_id: DbId,
    category_id: DbId,
) -> Result<AttachmentRequest, CoreError> {
    let place_id = company_place(snapshot, company_id)?;
    snapshot
        .category_in_place(category_id, place_id)
        .ok_or(CoreError::Referential {
            entity: "category",
            id: category_id,
        })?;
    Ok(AttachmentRequest {
        company_id,
        attachment: CompanyAttachment::Category(category_id),
    })
}

/// Attach a company directly to a subcategory.
pub fn assign_to_subcategory(
    snapshot: &DirectorySnapshot,
    company_id: DbId,
    subcategory_id: DbId,
) -> Result<AttachmentRequest, CoreError> {
    let place_id = company_place(snapshot, company_id)?;
    snapshot
        .subcategory_in_place(subcategory_id, place_id)
        .ok_or(CoreError::Referential {
            entity: "subcategory",
            id: subcategory_id,
        })?;
    Ok(AttachmentRequest {
        company_id,
        attachment: CompanyAttachment::Subcategory(subcategory_id),
    })
}

/// Detach a company from the hierarchy entirely.
pub fn remove_segmentation(
    snapshot: &DirectorySnapshot,
    company_id: DbId,
) -> Result<AttachmentRequest, CoreError> {
    company_place(snapshot, company_id)?;
    Ok(AttachmentRequest {
        company_id,
        attachment: CompanyAttachment::Unattached,
    })
}

/// Dispatch on the attachment variant to the matching `assign_to_*`.
pub fn request_attachment(
    snapshot: &DirectorySnapshot,
    company_id: DbId,
    attachment: CompanyAttachment,
) -> Result<AttachmentRequest, CoreError> {
    match attachment {
        CompanyAttachment::Unattached => remove_segmentation(snapshot, company_id),
        CompanyAttachment::Segment(id) => assign_to_segment(snapshot, company_id, id),
        CompanyAttachment::Category(id) => assign_to_category(snapshot, company_id, id),
        CompanyAttachment::Subcategory(id) => assign_to_subcategory(snapshot, company_id, id),
    }
}

/// The company as it looks once `request` has been applied.
pub fn apply_attachment(company: &Company, request: &AttachmentRequest) -> Company {
    Company {
        attachment: request.attachment,
        ..company.clone()
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Companies with no attachment at any level.
pub fn companies_without_segmentation(companies: &[Company]) -> Vec<&Company> {
    companies
        .iter()
        .filter(|c| !c.attachment.is_attached())
        .collect()
}

/// Companies whose direct attachment points at an entity missing from
/// the snapshot (its parent was deleted out from under it).
pub fn dangling_attachments<'a>(
    companies: &'a [Company],
    snapshot: &DirectorySnapshot,
) -> Vec<&'a Company> {
    companies
        .iter()
        .filter(|c| match c.attachment {
            CompanyAttachment::Unattached => false,
            CompanyAttachment::Segment(id) => snapshot.segment(id).is_none(),
            CompanyAttachment::Category(id) => snapshot.category(id).is_none(),
            CompanyAttachment::Subcategory(id) => snapshot.subcategory(id).is_none(),
        })
        .collect()
}

/// Group companies under every segment they fall into.
///
/// A company below a multi-segment category appears in each of that
/// category's segment groups. Companies that resolve to no segment are
/// left out.
pub fn group_companies_by_segment<'a>(
    companies: &'a [Company],
    snapshot: &DirectorySnapshot,
) -> BTreeMap<DbId, Vec<&'a Company>> {
    let mut groups: BTreeMap<DbId, Vec<&'a Company>> = BTreeMap::new();
    for company in companies {
        let resolved = resolve_hierarchy(company, snapshot, SegmentTieBreak::FirstListed);
        for segment_id in resolved.candidate_segment_ids {
            groups.entry(segment_id).or_default().push(company);
        }
    }
    groups
}

/// Share of companies with any attachment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub total: usize,
    pub categorized: usize,
    pub uncategorized: usize,
    /// `categorized / total * 100`, or `0.0` when there are no companies.
    pub percentage: f64,
}

pub fn coverage(companies: &[Company]) -> CoverageStats {
    let total = companies.len();
    let categorized = companies
        .iter()
        .filter(|c| c.attachment.is_attached())
        .count();
    let percentage = if total == 0 {
        0.0
    } else {
        categorized as f64 / total as f64 * 100.0
    };
    CoverageStats {
        total,
        categorized,
        uncategorized: total - categorized,
        percentage,
    }
}

/// Per-segment counts for a place overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentOverview {
    pub segment_id: DbId,
    pub name: String,
    pub category_count: usize,
    pub subcategory_count: usize,
    pub company_count: usize,
}

/// One row per segment of `place_id`, in display order.
pub fn segment_overview(snapshot: &DirectorySnapshot, place_id: DbId) -> Vec<SegmentOverview> {
    let place_companies: Vec<Company> = snapshot
        .companies
        .iter()
        .filter(|c| c.place_id == place_id)
        .cloned()
        .collect();
    let groups = group_companies_by_segment(&place_companies, snapshot);

    segments_for_place(snapshot, Some(place_id))
        .into_iter()
        .map(|segment| {
            let categories = categories_for_place(snapshot, Some(place_id), Some(segment.id));
            let subcategory_count = snapshot
                .subcategories
                .iter()
                .filter(|s| categories.iter().any(|c| c.id == s.category_id))
                .count();
            SegmentOverview {
                segment_id: segment.id,
                name: segment.name.clone(),
                category_count: categories.len(),
                subcategory_count,
                company_count: groups.get(&segment.id).map_or(0, Vec::len),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::fixtures::{company, food_and_drink};

    fn resolved_ids(r: &ResolvedHierarchy<'_>) -> (Option<DbId>, Option<DbId>, Option<DbId>) {
        (
            r.segment.map(|s| s.id),
            r.category.map(|c| c.id),
            r.subcategory.map(|s| s.id),
        )
    }

    #[test]
    fn subcategory_attachment_resolves_full_chain() {
        let snapshot = food_and_drink();
        let request = assign_to_subcategory(&snapshot, 1003, 100).unwrap();
        let company = apply_attachment(snapshot.company(1003).unwrap(), &request);

        let resolved = resolve_hierarchy(&company, &snapshot, SegmentTieBreak::FirstListed);
        assert_eq!(resolved_ids(&resolved), (Some(1), Some(10), Some(100)));
        assert!(resolved.has_full_hierarchy);
    }

    #[test]
    fn category_attachment_is_not_full_hierarchy() {
        let snapshot = food_and_drink();
        let resolved = resolve_hierarchy(
            snapshot.company(1001).unwrap(),
            &snapshot,
            SegmentTieBreak::FirstListed,
        );
        assert_eq!(resolved_ids(&resolved), (Some(1), Some(11), None));
        assert_eq!(resolved.candidate_segment_ids, vec![1, 2]);
        assert!(!resolved.has_full_hierarchy);
    }

    #[test]
    fn tie_break_policy_selects_segment() {
        let mut snapshot = food_and_drink();
        snapshot.categories[1].segment_ids = vec![2, 1];
        let company = snapshot.company(1001).unwrap().clone();

        let first = resolve_hierarchy(&company, &snapshot, SegmentTieBreak::FirstListed);
        assert_eq!(first.segment.map(|s| s.id), Some(2));

        let lowest = resolve_hierarchy(&company, &snapshot, SegmentTieBreak::LowestId);
        assert_eq!(lowest.segment.map(|s| s.id), Some(1));
    }

    #[test]
    fn missing_parent_resolves_to_none() {
        let mut snapshot = food_and_drink();
        snapshot.categories.retain(|c| c.id != 10);
        let resolved = resolve_hierarchy(
            snapshot.company(1000).unwrap(),
            &snapshot,
            SegmentTieBreak::FirstListed,
        );
        assert_eq!(resolved_ids(&resolved), (None, None, Some(100)));
        assert!(!resolved.has_full_hierarchy);
    }

    #[test]
    fn every_assignment_sets_exactly_one_level() {
        let snapshot = food_and_drink();
        let original = snapshot.company(1000).unwrap();
        let requests = [
            assign_to_segment(&snapshot, 1000, 2).unwrap(),
            assign_to_category(&snapshot, 1000, 11).unwrap(),
            assign_to_subcategory(&snapshot, 1000, 110).unwrap(),
        ];
        for request in requests {
            let updated = apply_attachment(original, &request);
            let fields = updated.attachment.fields();
            let set = [fields.segment_id, fields.category_id, fields.subcategory_id]
                .iter()
                .filter(|f| f.is_some())
                .count();
            assert_eq!(set, 1);

            let resolved = resolve_hierarchy(&updated, &snapshot, SegmentTieBreak::FirstListed);
            assert_eq!(
                resolved.has_full_hierarchy,
                matches!(updated.attachment, CompanyAttachment::Subcategory(_))
            );
        }
    }

    #[test]
    fn remove_segmentation_is_idempotent() {
        let mut snapshot = food_and_drink();
        let first = remove_segmentation(&snapshot, 1000).unwrap();
        let cleared = apply_attachment(snapshot.company(1000).unwrap(), &first);
        assert!(snapshot.replace_company(cleared.clone()));

        let second = remove_segmentation(&snapshot, 1000).unwrap();
        let cleared_again = apply_attachment(snapshot.company(1000).unwrap(), &second);

        assert_eq!(first, second);
        assert_eq!(cleared, cleared_again);
        assert_eq!(cleared.attachment, CompanyAttachment::Unattached);
    }

    #[test]
    fn assignment_refuses_missing_target() {
        let snapshot = food_and_drink();
        assert_matches!(
            assign_to_segment(&snapshot, 1000, 3),
            Err(CoreError::Referential { entity: "segment", id: 3 })
        );
        assert_matches!(
            assign_to_subcategory(&snapshot, 1000, 999),
            Err(CoreError::Referential { entity: "subcategory", .. })
        );
    }

    #[test]
    fn assignment_refuses_target_in_other_place() {
        let mut snapshot = food_and_drink();
        snapshot.companies.push(company(2000, 2, "Elsewhere Co", CompanyAttachment::Unattached));
        assert_matches!(
            assign_to_category(&snapshot, 2000, 10),
            Err(CoreError::Referential { entity: "category", id: 10 })
        );
    }

    #[test]
    fn assignment_refuses_unknown_company() {
        let snapshot = food_and_drink();
        assert_matches!(
            request_attachment(&snapshot, 42, CompanyAttachment::Segment(1)),
            Err(CoreError::NotFound { entity: "company", id: 42 })
        );
    }

    #[test]
    fn uncategorized_and_coverage() {
        let snapshot = food_and_drink();
        let uncategorized = companies_without_segmentation(&snapshot.companies);
        assert_eq!(uncategorized.len(), 1);
        assert_eq!(uncategorized[0].id, 1003);

        let stats = coverage(&snapshot.companies);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.categorized, 3);
        assert_eq!(stats.uncategorized, 1);
        assert!((stats.percentage - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coverage_of_empty_scope_is_zero() {
        let stats = coverage(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percentage, 0.0);
    }

    #[test]
    fn grouping_fans_out_multi_segment_categories() {
        let snapshot = food_and_drink();
        let groups = group_companies_by_segment(&snapshot.companies, &snapshot);

        let food: Vec<DbId> = groups[&1].iter().map(|c| c.id).collect();
        let drinks: Vec<DbId> = groups[&2].iter().map(|c| c.id).collect();
        assert_eq!(food, vec![1000, 1001, 1002]);
        assert_eq!(drinks, vec![1001]);
    }

    #[test]
    fn dangling_attachments_are_reported() {
        let mut snapshot = food_and_drink();
        snapshot.segments.retain(|s| s.id != 1);
        let dangling = dangling_attachments(&snapshot.companies, &snapshot);
        assert_eq!(dangling.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1002]);
    }

    #[test]
    fn overview_counts_per_segment() {
        let snapshot = food_and_drink();
        let overview = segment_overview(&snapshot, 1);
        assert_eq!(overview.len(), 2);

        assert_eq!(overview[0].name, "Food");
        assert_eq!(overview[0].category_count, 2);
        assert_eq!(overview[0].subcategory_count, 2);
        assert_eq!(overview[0].company_count, 3);

        assert_eq!(overview[1].name, "Drinks");
        assert_eq!(overview[1].category_count, 1);
        assert_eq!(overview[1].subcategory_count, 1);
        assert_eq!(overview[1].company_count, 1);
    }

    #[test]
    fn tie_break_parses_config_values() {
        assert_eq!(
            SegmentTieBreak::from_str_db("lowest_id").unwrap(),
            SegmentTieBreak::LowestId
        );
        assert!(SegmentTieBreak::from_str_db("random").is_err());
        assert_eq!(SegmentTieBreak::default().as_str(), "first_listed");
    }
}
