// src/errors.rs - error taxonomy for indicators, providers, persistence and config
use thiserror::Error;

/// Not enough candles/values to evaluate an indicator. Callers treat this as
/// "cannot evaluate this unit right now", never as a fatal condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: need at least {needed} values, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

/// Market-data provider failures. Logged and the affected unit is skipped for
/// the current cycle.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("TWELVE_API_KEY is not configured")]
    MissingApiKey,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned error: {message}")]
    Api { message: String },
    #[error("provider returned no candles")]
    EmptyData,
}

/// Persistence failures. A failed write leaves the previous durable state
/// file untouched; the monitor retries the affected trade on the next tick.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Invalid startup configuration. Fatal at startup only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
