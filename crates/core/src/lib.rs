//! Domain logic for the place directory console.
//!
//! Everything here is synchronous and side-effect free apart from the
//! [`store::EntityStore`] itself. Network access lives in the console crate.

pub mod entities;
pub mod error;
pub mod forms;
pub mod hierarchy;
pub mod impact;
pub mod roles;
pub mod segmentation;
pub mod selection;
pub mod slug;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;
