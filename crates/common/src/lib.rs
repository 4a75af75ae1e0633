//! ExamVault Common Library
//!
//! Client-side data layer for the exam paper portal:
//! - Record model and wire parsing
//! - Remote gateway abstraction (HTTP and in-memory)
//! - Scoped client cache with session lifecycle
//! - Pure derived views (filter, sort, aggregate, leaderboard)
//! - Mutation coordinator and submission form state machine
//! - Identity boundary, configuration, errors and metrics

pub mod cache;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod mutation;
pub mod remote;
pub mod views;

// Re-export commonly used types
pub use cache::{CacheRegistry, ClientCache, ScopeKey};
pub use catalog::Catalog;
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{Branch, PaperType, Record, RecordDraft, Status};
pub use mutation::{MutationCoordinator, SubmissionForm};
pub use remote::RecordGateway;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of rows on the leaderboard
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
