//! Persistence layer for the Playtime admin dashboard.
//!
//! This crate contains:
//! - The store query surface with Postgres and in-memory implementations
//! - Object storage for uploaded documents
//! - Connection pool management, migrations and query metrics
//! - One repository per business entity

pub mod db;
pub mod metrics;
pub mod repositories;
pub mod schema;
pub mod storage;
pub mod store;

pub use storage::{HttpObjectStorage, MemoryObjectStorage, ObjectStorage};
pub use store::{DataStore, MemoryStore, PgStore, StoreError};
