//! Shared builders for unit tests.

use crate::entities::{
    Category, Company, CompanyAttachment, DirectorySnapshot, Place, Segment, Subcategory,
};
use crate::types::DbId;

pub fn place(id: DbId, name: &str) -> Place {
    Place {
        id,
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        is_active: true,
    }
}

pub fn segment(id: DbId, place_id: DbId, name: &str, order: i32) -> Segment {
    Segment {
        id,
        place_id,
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        color: None,
        order,
        is_active: true,
    }
}

pub fn category(
    id: DbId,
    place_id: DbId,
    name: &str,
    order: i32,
    segment_ids: Vec<DbId>,
) -> Category {
    Category {
        id,
        place_id,
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        order,
        is_active: true,
        segment_ids,
    }
}

pub fn subcategory(
    id: DbId,
    place_id: DbId,
    category_id: DbId,
    name: &str,
    order: i32,
) -> Subcategory {
    Subcategory {
        id,
        place_id,
        category_id,
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        order,
        is_active: true,
    }
}

pub fn company(id: DbId, place_id: DbId, name: &str, attachment: CompanyAttachment) -> Company {
    Company {
        id,
        place_id,
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        is_active: true,
        attachment,
    }
}

/// Place 1 with segments Food (1) and Drinks (2); categories Restaurants
/// (10, in Food) and Bars (11, in Food and Drinks); subcategories Burgers
/// (100, under Restaurants) and Pubs (110, under Bars). Place 2 exists
/// with no children. Companies 1000..=1003 cover every attachment depth.
pub fn food_and_drink() -> DirectorySnapshot {
    DirectorySnapshot {
        places: vec![place(1, "Downtown"), place(2, "Uptown")],
        segments: vec![segment(1, 1, "Food", 0), segment(2, 1, "Drinks", 1)],
        categories: vec![
            category(10, 1, "Restaurants", 0, vec![1]),
            category(11, 1, "Bars", 1, vec![1, 2]),
        ],
        subcategories: vec![
            subcategory(100, 1, 10, "Burgers", 0),
            subcategory(110, 1, 11, "Pubs", 0),
        ],
        companies: vec![
            company(1000, 1, "Joe's Diner", CompanyAttachment::Subcategory(100)),
            company(1001, 1, "The Tap", CompanyAttachment::Category(11)),
            company(1002, 1, "Snack Stand", CompanyAttachment::Segment(1)),
            company(1003, 1, "Mystery Shop", CompanyAttachment::Unattached),
        ],
    }
}
