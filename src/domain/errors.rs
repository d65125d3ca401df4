//! Error taxonomy shared by every domain and application operation.
//!
//! Nothing in the core is allowed to panic or bubble an exception to a
//! top-level event loop; every fallible operation returns an `AppError`
//! (or a `Result<T, AppError>`) so callers — the scheduler in particular —
//! can log and continue rather than unwind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Transient network failure. Caller should retry with backoff.
    #[error("transient network error: {0}")]
    Transient(String),

    /// Broker signaled it is throttling us (HTTP 429/500 or a business
    /// rate-limit code). Caller should retry with backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Cached access token was rejected (HTTP 401). Caller should
    /// invalidate the cache and retry once.
    #[error("auth expired: {0}")]
    AuthExpired(String),

    /// Input failed validation before any request was sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Broker accepted the request but rejected the business operation
    /// (`rt_cd != "0"`).
    #[error("broker rejected request: {0}")]
    BusinessRejection(String),

    /// Quote/history data was empty or otherwise unusable for a symbol.
    #[error("data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// The embedded database could not be opened or queried.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Required configuration (credentials, account number) is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not need a distinct variant but still
    /// need to propagate as a tagged outcome.
    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_) | AppError::RateLimited(_))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Other(e.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
