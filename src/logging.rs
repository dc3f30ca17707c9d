//! Structured logging (§6 `Logger` port). Upgrades the teacher's
//! `println!`-based `log_claim_event` into `tracing` events, matching
//! the logging crate the rest of the retrieved pack reaches for.

use tracing_subscriber::EnvFilter;

/// Install a `tracing_subscriber` fmt subscriber for the process.
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Per-claim structured log line, preserving the teacher's
/// `component`/`claim_id`/`event`/`message` call shape.
pub fn log_claim_event(component: &str, claim_id: &str, event: &str, message: &str) {
    tracing::info!(component, claim_id, event, "{}", message);
}

pub fn log_claim_warn(component: &str, claim_id: &str, event: &str, message: &str) {
    tracing::warn!(component, claim_id, event, "{}", message);
}

pub fn log_claim_error(component: &str, claim_id: &str, event: &str, message: &str) {
    tracing::error!(component, claim_id, event, "{}", message);
}

pub fn log_claim_debug(component: &str, claim_id: &str, event: &str, message: &str) {
    tracing::debug!(component, claim_id, event, "{}", message);
}
