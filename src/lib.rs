//! Minimal smart order router.
//!
//! Pulls order-book snapshots from several venues, merges them into one
//! virtual book and simulates filling a quantity against it to quote a
//! volume-weighted execution price.

pub mod config;
pub mod engine;
pub mod market_data;
pub mod telemetry;

pub use engine::types::{BookError, FillResult, Side};
pub use market_data::error::FetchError;
pub use market_data::router::{RouteReport, RouteSide, SmartOrderRouter};
