//! NexGen Cost Intelligence
//!
//! Loads seven logistics datasets, joins them per order, and derives cost
//! aggregates, a cost forecast and savings recommendations for a dashboard.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod join;
pub mod loader;
pub mod models;
pub mod recommend;
pub mod stats;

pub use error::{Error, Result};
