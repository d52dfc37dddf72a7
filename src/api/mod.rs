//! HTTP transport for the CaseCrafter REST API.
//!
//! [`ApiClient`] is the single request/response pipeline: it attaches the
//! bearer token read from storage at call time, normalizes response bodies
//! into one [`ApiResponse`] shape, and turns a 401 from any endpoint into a
//! global session reset.

pub mod client;

pub use client::{
    ApiClient, ApiResponse, LoginRedirect, UnauthorizedHandler, extract_error_message,
    unwrap_envelope,
};
