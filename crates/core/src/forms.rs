//! Create/edit form validation for segments, categories, subcategories and
//! companies.
//!
//! Validators never fail outright; they collect every problem into a
//! [`FormReport`] so a form can show all messages inline at once.
//! [`FormReport::into_result`] turns a report into a [`CoreError`] for
//! callers that abort on the first problem.

use serde::{Deserialize, Serialize};

use crate::entities::{CompanyAttachment, DirectorySnapshot};
use crate::error::CoreError;
use crate::selection::Selection;
use crate::slug::{ensure_slug_unique, validate_slug, SlugKind};
use crate::types::DbId;

/// Maximum display name length in characters.
pub const MAX_NAME_LEN: usize = 120;

/* --------------------------------------------------------------------------
Report
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormReport {
    pub errors: Vec<FieldError>,
}

impl FormReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn check(&mut self, field: &'static str, result: Result<(), CoreError>) {
        if let Err(err) = result {
            let message = match err {
                CoreError::Validation(msg) | CoreError::Conflict(msg) => msg,
                other => other.to_string(),
            };
            self.push(field, message);
        }
    }

    /// Collapse into a single validation error listing every field message.
    pub fn into_result(self) -> Result<(), CoreError> {
        if self.is_valid() {
            return Ok(());
        }
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(CoreError::Validation(joined))
    }
}

/* --------------------------------------------------------------------------
Drafts
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentDraft {
    /// Set when editing an existing segment.
    pub id: Option<DbId>,
    pub place_id: Option<DbId>,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
    pub order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub id: Option<DbId>,
    pub place_id: Option<DbId>,
    pub name: String,
    pub slug: String,
    pub order: i32,
    #[serde(default)]
    pub segment_ids: Vec<DbId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubcategoryDraft {
    pub id: Option<DbId>,
    pub place_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub name: String,
    pub slug: String,
    pub order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyDraft {
    pub id: Option<DbId>,
    pub name: String,
    pub slug: String,
    /// Place plus the segmentation picked in the form.
    pub selection: Selection,
}

impl CompanyDraft {
    /// The attachment this draft would save: its deepest selected level.
    pub fn attachment(&self) -> CompanyAttachment {
        self.selection.attachment()
    }
}

/* --------------------------------------------------------------------------
Shared checks
-------------------------------------------------------------------------- */

fn check_name(report: &mut FormReport, name: &str) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        report.push("name", "Name is required");
    } else if trimmed.chars().count() > MAX_NAME_LEN {
        report.push(
            "name",
            format!("Name exceeds maximum length of {MAX_NAME_LEN} characters"),
        );
    }
}

fn check_slug(
    report: &mut FormReport,
    snapshot: &DirectorySnapshot,
    kind: SlugKind,
    place_id: DbId,
    slug: &str,
    exclude_id: Option<DbId>,
) {
    if let Err(err) = validate_slug(slug) {
        report.check("slug", Err(err));
        return;
    }
    report.check(
        "slug",
        ensure_slug_unique(snapshot, kind, place_id, slug, exclude_id),
    );
}

/// Returns the place id when present and known, recording an error otherwise.
fn check_place(
    report: &mut FormReport,
    snapshot: &DirectorySnapshot,
    place_id: Option<DbId>,
) -> Option<DbId> {
    match place_id {
        None => {
            report.push("place_id", "Place is required");
            None
        }
        Some(id) if snapshot.place(id).is_none() => {
            report.push("place_id", format!("Place {id} does not exist"));
            None
        }
        Some(id) => Some(id),
    }
}

/* --------------------------------------------------------------------------
Validators
-------------------------------------------------------------------------- */

pub fn validate_segment(draft: &SegmentDraft, snapshot: &DirectorySnapshot) -> FormReport {
    let mut report = FormReport::default();
    check_name(&mut report, &draft.name);
    if let Some(place_id) = check_place(&mut report, snapshot, draft.place_id) {
        check_slug(
            &mut report,
            snapshot,
            SlugKind::Segment,
            place_id,
            &draft.slug,
            draft.id,
        );
    }
    report
}

pub fn validate_category(draft: &CategoryDraft, snapshot: &DirectorySnapshot) -> FormReport {
    let mut report = FormReport::default();
    check_name(&mut report, &draft.name);
    let Some(place_id) = check_place(&mut report, snapshot, draft.place_id) else {
        return report;
    };
    check_slug(
        &mut report,
        snapshot,
        SlugKind::Category,
        place_id,
        &draft.slug,
        draft.id,
    );
    for segment_id in &draft.segment_ids {
        if snapshot.segment_in_place(*segment_id, place_id).is_none() {
            report.push(
                "segment_ids",
                format!("Segment {segment_id} does not belong to this place"),
            );
        }
    }
    report
}

pub fn validate_subcategory(draft: &SubcategoryDraft, snapshot: &DirectorySnapshot) -> FormReport {
    let mut report = FormReport::default();
    check_name(&mut report, &draft.name);
    let Some(place_id) = check_place(&mut report, snapshot, draft.place_id) else {
        return report;
    };
    check_slug(
        &mut report,
        snapshot,
        SlugKind::Subcategory,
        place_id,
        &draft.slug,
        draft.id,
    );
    match draft.category_id {
        None => report.push("category_id", "A subcategory requires a category"),
        Some(category_id) if snapshot.category_in_place(category_id, place_id).is_none() => {
            report.push(
                "category_id",
                format!("Category {category_id} does not belong to this place"),
            );
        }
        Some(_) => {}
    }
    report
}

pub fn validate_company(draft: &CompanyDraft, snapshot: &DirectorySnapshot) -> FormReport {
    let mut report = FormReport::default();
    check_name(&mut report, &draft.name);
    let Some(place_id) = check_place(&mut report, snapshot, draft.selection.place_id) else {
        return report;
    };
    check_slug(
        &mut report,
        snapshot,
        SlugKind::Company,
        place_id,
        &draft.slug,
        draft.id,
    );

    let selection = &draft.selection;
    if let Some(segment_id) = selection.segment_id {
        if snapshot.segment_in_place(segment_id, place_id).is_none() {
            report.push(
                "segment_id",
                format!("Segment {segment_id} does not belong to this place"),
            );
        }
    }
    if let Some(category_id) = selection.category_id {
        match snapshot.category_in_place(category_id, place_id) {
            None => report.push(
                "category_id",
                format!("Category {category_id} does not belong to this place"),
            ),
            Some(category) => {
                if let Some(segment_id) = selection.segment_id {
                    if !category.has_segment(segment_id) {
                        report.push(
                            "category_id",
                            format!(
                                "Category {category_id} is not part of segment {segment_id}"
                            ),
                        );
                    }
                }
            }
        }
    }
    if let Some(subcategory_id) = selection.subcategory_id {
        match (
            snapshot.subcategory_in_place(subcategory_id, place_id),
            selection.category_id,
        ) {
            (None, _) => report.push(
                "subcategory_id",
                format!("Subcategory {subcategory_id} does not belong to this place"),
            ),
            (Some(_), None) => report.push(
                "subcategory_id",
                "A subcategory can only be chosen together with its category",
            ),
            (Some(sub), Some(category_id)) if sub.category_id != category_id => report.push(
                "subcategory_id",
                format!("Subcategory {subcategory_id} is not part of category {category_id}"),
            ),
            _ => {}
        }
    }
    report
}
