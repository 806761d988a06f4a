use std::sync::Arc;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::Config;
use crate::middleware::RateLimiter;

/// A stored row that cannot be decoded into its domain type. Surfaced as
/// fatal: a corrupt aggregate must never settle as if it were empty.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid UUID in stored row: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error("Corrupt JSON column: {0}")]
    CorruptJson(#[from] serde_json::Error),
    #[error("Unknown bet mode: {0}")]
    UnknownBetMode(String),
}

pub mod challenge;
pub mod time_entry;
pub mod user;

pub use challenge::*;
pub use time_entry::*;
pub use user::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub login_rate_limiter: Arc<RateLimiter>,
}
