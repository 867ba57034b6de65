//! Shared utilities and common types for the Playtime admin dashboard.
//!
//! This crate provides common functionality used across all other crates:
//! - Page/offset pagination state for list views
//! - Debounced search and filter state
//! - Display formatting (currency, dates, durations)
//! - Access token verification for the hosted auth provider
//! - Common validation logic

pub mod format;
pub mod jwt;
pub mod pagination;
pub mod search;
pub mod validation;
