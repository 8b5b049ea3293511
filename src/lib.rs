//! Filtering and aggregation core behind the pandemic dashboard.
//!
//! The GUI binary in `main.rs` is a thin client: every interaction builds a
//! [`data::pipeline::DashboardParams`] and renders the returned
//! [`data::pipeline::DashboardView`].

pub mod config;
pub mod data;

pub use config::DashboardConfig;
pub use data::error::DashboardError;
