//! Hierarchy resolver: valid children at each level of the segmentation tree.
//!
//! The free functions work directly on a [`DirectorySnapshot`].
//! [`HierarchyIndex`] answers the same queries from lists precomputed once
//! per snapshot; the entity store rebuilds it every time a snapshot is
//! applied.
//!
//! A missing scoping id means "nothing selected yet" and always yields an
//! empty list.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::entities::{Category, DirectorySnapshot, Segment, Subcategory};
use crate::types::DbId;

/* --------------------------------------------------------------------------
Ordering
-------------------------------------------------------------------------- */

/// Display order shared by every level: `order`, then `name`, then `id`.
///
/// The trailing `id` comparison makes the order total, so equal
/// `(order, name)` pairs never fall back to insertion order.
fn display_cmp(a: (i32, &str, DbId), b: (i32, &str, DbId)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)).then_with(|| a.2.cmp(&b.2))
}

fn segment_key(s: &Segment) -> (i32, &str, DbId) {
    (s.order, s.name.as_str(), s.id)
}

fn category_key(c: &Category) -> (i32, &str, DbId) {
    (c.order, c.name.as_str(), c.id)
}

fn subcategory_key(s: &Subcategory) -> (i32, &str, DbId) {
    (s.order, s.name.as_str(), s.id)
}

/* --------------------------------------------------------------------------
Resolver
-------------------------------------------------------------------------- */

/// All segments of a place in display order.
pub fn segments_for_place(snapshot: &DirectorySnapshot, place_id: Option<DbId>) -> Vec<&Segment> {
    let Some(place_id) = place_id else {
        return Vec::new();
    };
    let mut segments: Vec<&Segment> = snapshot
        .segments
        .iter()
        .filter(|s| s.place_id == place_id)
        .collect();
    segments.sort_by(|a, b| display_cmp(segment_key(a), segment_key(b)));
    segments
}

/// Categories of a place, optionally narrowed to those containing `segment_id`.
pub fn categories_for_place(
    snapshot: &DirectorySnapshot,
    place_id: Option<DbId>,
    segment_id: Option<DbId>,
) -> Vec<&Category> {
    let Some(place_id) = place_id else {
        return Vec::new();
    };
    let mut categories: Vec<&Category> = snapshot
        .categories
        .iter()
        .filter(|c| c.place_id == place_id)
        .filter(|c| segment_id.map_or(true, |s| c.has_segment(s)))
        .collect();
    categories.sort_by(|a, b| display_cmp(category_key(a), category_key(b)));
    categories
}

/// Subcategories owned by a category in display order.
pub fn subcategories_for_category(
    snapshot: &DirectorySnapshot,
    category_id: Option<DbId>,
) -> Vec<&Subcategory> {
    let Some(category_id) = category_id else {
        return Vec::new();
    };
    let mut subcategories: Vec<&Subcategory> = snapshot
        .subcategories
        .iter()
        .filter(|s| s.category_id == category_id)
        .collect();
    subcategories.sort_by(|a, b| display_cmp(subcategory_key(a), subcategory_key(b)));
    subcategories
}

/// Trait for option entries that can be hidden when inactive.
pub trait Activatable {
    fn is_active(&self) -> bool;
}

impl Activatable for Segment {
    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Activatable for Category {
    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Activatable for Subcategory {
    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Keep only active entries, preserving order.
pub fn active_only<T: Activatable>(items: Vec<&T>) -> Vec<&T> {
    items.into_iter().filter(|i| i.is_active()).collect()
}

/* --------------------------------------------------------------------------
Memoized index
-------------------------------------------------------------------------- */

/// Precomputed, already-sorted child lists for one snapshot.
///
/// Lists hold ids; lookups go back to the snapshot the index was built
/// from, so the index must only be used with that snapshot.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    segments_by_place: HashMap<DbId, Vec<DbId>>,
    categories_by_place: HashMap<DbId, Vec<DbId>>,
    categories_by_segment: HashMap<DbId, Vec<DbId>>,
    subcategories_by_category: HashMap<DbId, Vec<DbId>>,
    segment_pos: HashMap<DbId, usize>,
    category_pos: HashMap<DbId, usize>,
    subcategory_pos: HashMap<DbId, usize>,
}

impl HierarchyIndex {
    pub fn build(snapshot: &DirectorySnapshot) -> Self {
        let mut index = Self::default();

        for (pos, segment) in snapshot.segments.iter().enumerate() {
            index.segment_pos.insert(segment.id, pos);
        }
        for (pos, category) in snapshot.categories.iter().enumerate() {
            index.category_pos.insert(category.id, pos);
        }
        for (pos, subcategory) in snapshot.subcategories.iter().enumerate() {
            index.subcategory_pos.insert(subcategory.id, pos);
        }

        let mut segments: Vec<&Segment> = snapshot.segments.iter().collect();
        segments.sort_by(|a, b| display_cmp(segment_key(a), segment_key(b)));
        for segment in segments {
            index
                .segments_by_place
                .entry(segment.place_id)
                .or_default()
                .push(segment.id);
        }

        let mut categories: Vec<&Category> = snapshot.categories.iter().collect();
        categories.sort_by(|a, b| display_cmp(category_key(a), category_key(b)));
        for category in categories {
            index
                .categories_by_place
                .entry(category.place_id)
                .or_default()
                .push(category.id);
            for segment_id in &category.segment_ids {
                index
                    .categories_by_segment
                    .entry(*segment_id)
                    .or_default()
                    .push(category.id);
            }
        }

        let mut subcategories: Vec<&Subcategory> = snapshot.subcategories.iter().collect();
        subcategories.sort_by(|a, b| display_cmp(subcategory_key(a), subcategory_key(b)));
        for subcategory in subcategories {
            index
                .subcategories_by_category
                .entry(subcategory.category_id)
                .or_default()
                .push(subcategory.id);
        }

        index
    }

    pub fn segments_for_place<'a>(
        &self,
        snapshot: &'a DirectorySnapshot,
        place_id: Option<DbId>,
    ) -> Vec<&'a Segment> {
        place_id
            .and_then(|p| self.segments_by_place.get(&p))
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.segment_pos.get(id))
                    .map(|&pos| &snapshot.segments[pos])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn categories_for_place<'a>(
        &self,
        snapshot: &'a DirectorySnapshot,
        place_id: Option<DbId>,
        segment_id: Option<DbId>,
    ) -> Vec<&'a Category> {
        let Some(place_id) = place_id else {
            return Vec::new();
        };
        let ids = match segment_id {
            Some(segment_id) => self.categories_by_segment.get(&segment_id),
            None => self.categories_by_place.get(&place_id),
        };
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| self.category_pos.get(id))
                .map(|&pos| &snapshot.categories[pos])
                .filter(|c| c.place_id == place_id)
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn subcategories_for_category<'a>(
        &self,
        snapshot: &'a DirectorySnapshot,
        category_id: Option<DbId>,
    ) -> Vec<&'a Subcategory> {
        category_id
            .and_then(|c| self.subcategories_by_category.get(&c))
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.subcategory_pos.get(id))
                    .map(|&pos| &snapshot.subcategories[pos])
                    .collect()
            })
            .unwrap_or_default()
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
