//! Error taxonomy (§7). Configuration errors surface at `start()`;
//! adjudication errors feed the `JobQueue` retry path; registry/aging
//! alerts are structured data delivered through the `Logger` port
//! rather than propagated as errors (§7: "alerts... do not halt
//! processing").

use thiserror::Error;

/// Surfaced at `SimulatorOrchestrator::start` (§7 "Configuration errors").
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no payers configured")]
    NoPayersConfigured,
    #[error("payer {payer_id} has an invalid delay range: min {min_ms}ms > max {max_ms}ms")]
    InvalidDelayRange {
        payer_id: String,
        min_ms: u64,
        max_ms: u64,
    },
    #[error("rate limit must be > 0, got {0}")]
    InvalidRateLimit(f64),
    #[error("payer {payer_id} has {field} out of range [0,1]: {value}")]
    InvalidProbability {
        payer_id: String,
        field: &'static str,
        value: f64,
    },
}

/// Transient failures inside the payer adjudication pipeline (§4.F,
/// §7 "Transient handler errors"). The `JobQueue` retries on this error,
/// applying exponential backoff up to `max_attempts`.
#[derive(Debug, Error)]
pub enum AdjudicationError {
    #[error("claim {claim_id} failed validation: {reason}")]
    InvalidClaim { claim_id: String, reason: String },
    #[error("unknown payer id: {0}")]
    UnknownPayer(String),
    #[error("injected adjudication failure for claim {0}")]
    Injected(String),
}
