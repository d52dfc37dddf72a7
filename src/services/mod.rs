//! Thin endpoint functions, one per REST route.
//!
//! Each function builds the path and parameters, calls [`ApiClient`] and
//! hands back the normalized [`ApiResponse`]. Nothing here catches errors;
//! the stores decide how to interpret them.
//!
//! [`ApiClient`]: crate::api::ApiClient
//! [`ApiResponse`]: crate::api::ApiResponse

pub mod analytics;
pub mod auth;
pub mod documents;
pub mod projects;
pub mod settings;
pub mod templates;
pub mod tests;
pub mod uploads;
