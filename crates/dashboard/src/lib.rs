pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod hooks;
pub mod middleware;
pub mod query;
pub mod routes;
