//! Project storage.
//!
//! This crate provides:
//! - The `ProjectStore` trait the render controller depends on
//! - An in-memory store for tests and embedding
//! - A filesystem store keeping one JSON document per project

pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use fs::FsProjectStore;
pub use memory::InMemoryProjectStore;
pub use store::ProjectStore;
