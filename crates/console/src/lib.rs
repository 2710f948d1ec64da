//! `placedir-console` library crate.
//!
//! The async operator session over the directory backend. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod records;
pub mod session;
