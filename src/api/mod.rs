//! HTTP handlers

pub mod complaints;
pub mod error;
pub mod health;
pub mod predict;

pub use complaints::analyze_complaints;
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use predict::predict;
