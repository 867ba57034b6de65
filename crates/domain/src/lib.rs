//! Domain layer for the Playtime admin dashboard.
//!
//! This crate contains:
//! - Entity models with closed status enums
//! - Typed settings payloads
//! - View objects returned by list reads
//! - Notification and audit services

pub mod models;
pub mod services;
