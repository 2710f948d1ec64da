//! Selection consistency controller.
//!
//! A form or filter holds a [`Selection`] over place, segment, category and
//! subcategory. [`reduce`] applies one operator change and clears exactly
//! the deeper levels the change made invalid; levels that are still valid
//! are kept. [`reconcile`] re-derives validity after the underlying
//! snapshot changed (e.g. after a reload).

use serde::{Deserialize, Serialize};

use crate::entities::{CompanyAttachment, DirectorySnapshot};
use crate::store::EntityStore;
use crate::types::DbId;

/// The in-progress hierarchy selection of one form or filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub place_id: Option<DbId>,
    pub segment_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub subcategory_id: Option<DbId>,
}

/// An operator picking a value (or "none") at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum SelectionEvent {
    SetPlace(Option<DbId>),
    SetSegment(Option<DbId>),
    SetCategory(Option<DbId>),
    SetSubcategory(Option<DbId>),
}

/// Coarse progress of a selection, deepest level first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    Empty,
    PlaceChosen,
    SegmentChosen,
    CategoryChosen,
    SubcategoryChosen,
}

impl Selection {
    pub fn for_place(place_id: DbId) -> Self {
        Self {
            place_id: Some(place_id),
            ..Default::default()
        }
    }

    pub fn stage(&self) -> SelectionStage {
        if self.subcategory_id.is_some() {
            SelectionStage::SubcategoryChosen
        } else if self.category_id.is_some() {
            SelectionStage::CategoryChosen
        } else if self.segment_id.is_some() {
            SelectionStage::SegmentChosen
        } else if self.place_id.is_some() {
            SelectionStage::PlaceChosen
        } else {
            SelectionStage::Empty
        }
    }

    /// The deepest selected level, as a company attachment.
    pub fn attachment(&self) -> CompanyAttachment {
        CompanyAttachment::deepest_of(self.segment_id, self.category_id, self.subcategory_id)
    }

    fn clear_below_place(&mut self) {
        self.segment_id = None;
        self.clear_below_segment();
    }

    fn clear_below_segment(&mut self) {
        self.category_id = None;
        self.clear_below_category();
    }

    fn clear_below_category(&mut self) {
        self.subcategory_id = None;
    }
}

/// Apply one operator change to `state`.
///
/// Runs against `snapshot` as it is at the moment of the change. A pick
/// that is not one of the valid options under the current parent levels
/// is refused and leaves `state` unchanged.
pub fn reduce(state: &Selection, event: SelectionEvent, snapshot: &DirectorySnapshot) -> Selection {
    let mut next = *state;

    match event {
        SelectionEvent::SetPlace(place_id) => {
            if place_id != state.place_id {
                next.place_id = place_id;
                next.clear_below_place();
            }
        }
        SelectionEvent::SetSegment(None) => {
            next.segment_id = None;
            next.clear_below_segment();
        }
        SelectionEvent::SetSegment(Some(segment_id)) => {
            if !segment_allowed(state, segment_id, snapshot) {
                return next;
            }
            next.segment_id = Some(segment_id);
            if let Some(category_id) = state.category_id {
                let still_valid = snapshot
                    .category(category_id)
                    .is_some_and(|c| c.has_segment(segment_id));
                if !still_valid {
                    next.clear_below_segment();
                }
            }
        }
        SelectionEvent::SetCategory(None) => {
            next.category_id = None;
            next.clear_below_category();
        }
        SelectionEvent::SetCategory(Some(category_id)) => {
            if !category_allowed(state, category_id, snapshot) {
                return next;
            }
            next.category_id = Some(category_id);
            if let Some(subcategory_id) = state.subcategory_id {
                let still_valid = snapshot
                    .subcategory(subcategory_id)
                    .is_some_and(|s| s.category_id == category_id);
                if !still_valid {
                    next.clear_below_category();
                }
            }
        }
        SelectionEvent::SetSubcategory(None) => {
            next.subcategory_id = None;
        }
        SelectionEvent::SetSubcategory(Some(subcategory_id)) => {
            if subcategory_allowed(state, subcategory_id, snapshot) {
                next.subcategory_id = Some(subcategory_id);
            }
        }
    }

    next
}

fn segment_allowed(state: &Selection, segment_id: DbId, snapshot: &DirectorySnapshot) -> bool {
    state
        .place_id
        .is_some_and(|p| snapshot.segment_in_place(segment_id, p).is_some())
}

/// The category must contain the selected segment, if one is selected.
fn category_allowed(state: &Selection, category_id: DbId, snapshot: &DirectorySnapshot) -> bool {
    state
        .place_id
        .and_then(|p| snapshot.category_in_place(category_id, p))
        .is_some_and(|c| state.segment_id.map_or(true, |s| c.has_segment(s)))
}

/// A subcategory needs its own category selected.
fn subcategory_allowed(
    state: &Selection,
    subcategory_id: DbId,
    snapshot: &DirectorySnapshot,
) -> bool {
    let (Some(place_id), Some(category_id)) = (state.place_id, state.category_id) else {
        return false;
    };
    snapshot
        .subcategory_in_place(subcategory_id, place_id)
        .is_some_and(|s| s.category_id == category_id)
}

/// Drop every level that is no longer valid against `snapshot`.
///
/// A level is valid when its entity is present, belongs to the selected
/// place, and is contained by the selected parent level (if any). An
/// invalid level clears everything beneath it; valid levels are kept.
pub fn reconcile(state: &Selection, snapshot: &DirectorySnapshot) -> Selection {
    let mut next = *state;

    let Some(place_id) = next.place_id.filter(|id| snapshot.place(*id).is_some()) else {
        return Selection::default();
    };

    if let Some(segment_id) = next.segment_id {
        if snapshot.segment_in_place(segment_id, place_id).is_none() {
            next.clear_below_place();
            return next;
        }
    }

    if let Some(category_id) = next.category_id {
        let valid = snapshot
            .category_in_place(category_id, place_id)
            .is_some_and(|c| next.segment_id.map_or(true, |s| c.has_segment(s)));
        if !valid {
            next.clear_below_segment();
            return next;
        }
    }

    if let Some(subcategory_id) = next.subcategory_id {
        let valid = snapshot
            .subcategory_in_place(subcategory_id, place_id)
            .is_some_and(|s| Some(s.category_id) == next.category_id);
        if !valid {
            next.clear_below_category();
        }
    }

    next
}

/// A selection bound to an [`EntityStore`], re-validated whenever the
/// store has moved on since the last look.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: Selection,
    seen_revision: u64,
}

impl SelectionController {
    pub fn new(state: Selection) -> Self {
        Self {
            state,
            seen_revision: 0,
        }
    }

    pub fn state(&self) -> &Selection {
        &self.state
    }

    /// Reconcile against the store if it changed since the last call.
    ///
    /// Returns `true` if any level was cleared.
    pub fn sync(&mut self, store: &EntityStore) -> bool {
        if store.revision() == self.seen_revision {
            return false;
        }
        self.seen_revision = store.revision();
        let next = reconcile(&self.state, store.snapshot());
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Apply an operator change against the store as it is right now.
    pub fn dispatch(&mut self, event: SelectionEvent, store: &EntityStore) -> &Selection {
        self.sync(store);
        self.state = reduce(&self.state, event, store.snapshot());
        &self.state
    }
}
