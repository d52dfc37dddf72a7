//! # CaseCrafter client
//!
//! Client core for the CaseCrafter test generation service: sign in, keep
//! projects and their documents in cached stores, follow document
//! processing, generate test suites and export them.
//!
//! ## Overview
//!
//! CaseCrafter can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `casecrafter` binary
//! 2. **As a library** - Drive the stores from your own front end
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use casecrafter::{AppContext, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> casecrafter::Result<()> {
//!     let config = ClientConfig::load("casecrafter.toml")?;
//!     let ctx = AppContext::from_config(config)?;
//!
//!     ctx.auth.login("qa@example.com", "s3cret").await?;
//!     let projects = ctx.projects.fetch_projects().await?;
//!     println!("{} projects", projects.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Following document processing
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//!
//! let snapshot = ctx
//!     .poller()
//!     .wait_for_completion(document.id, CancellationToken::new())
//!     .await?;
//! println!("{} at {}%", snapshot.state, snapshot.progress);
//! ```
//!
//! ## Modules
//!
//! - [`api`] - HTTP transport: bearer token, envelope unwrapping, 401 handling
//! - [`services`] - One function per backend endpoint
//! - [`stores`] - Auth, project, template and analytics state
//! - [`cache`] - TTL cache for per-project collections
//! - [`polling`] - Document processing status polling
//! - [`storage`] - Durable session storage
//! - [`types`] - Domain types and error handling
//!
//! ## Configuration
//!
//! Settings come from `casecrafter.toml` and `CASECRAFTER_*` environment
//! variables, see [`utils::config`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP transport shared by every service call.
pub mod api;
/// Per-project TTL cache.
pub mod cache;
/// Command-line interface.
pub mod cli;
/// Application container wiring stores to one transport.
pub mod context;
/// Test suite export download.
pub mod export;
/// Document processing status polling.
pub mod polling;
/// Endpoint wrappers.
pub mod services;
/// Durable session storage.
pub mod storage;
/// Client state stores.
pub mod stores;
/// Domain types and errors.
pub mod types;
/// Client-side upload validation.
pub mod upload;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use api::{ApiClient, ApiResponse, UnauthorizedHandler};
pub use cache::{CacheKey, ResourceKind, TtlCache};
pub use context::AppContext;
pub use export::{ExportFormat, ExportedFile};
pub use polling::{PollHandle, PollOptions, PollView, ProcessingSnapshot, StatusPoller};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use stores::{AnalyticsStore, AuthStore, ProjectStore, TemplateStore};
pub use types::{AppError, Result};
pub use upload::UploadFile;
pub use utils::config::ClientConfig;
