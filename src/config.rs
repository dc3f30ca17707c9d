//! Configuration (§6 "Configuration shape", §7 "Configuration errors").
//!
//! Config *loading* (reading a file on disk) is explicitly out of scope
//! for the core (§1) — that belongs to the external CLI. What the core
//! owns is the in-process shape `start()` accepts and validates, plus
//! (resolving the teacher's own `// TODO: replace with clap` note) a
//! `clap`-derived CLI for the bundled demo binary.

use clap::Parser;

use crate::denial::DenialCategory;
use crate::errors::ConfigError;

/// Demo-binary CLI, built with `clap` (already a teacher dependency,
/// previously unused).
#[derive(Parser, Debug, Clone)]
#[command(name = "claimsim", about = "Healthcare claims pipeline simulator")]
pub struct Cli {
    /// Path to a JSONL file of claims to stream in.
    #[arg(default_value = "fake_claims.jsonl")]
    pub file_path: String,

    /// Target ingestion rate, in claims/second.
    #[arg(long, default_value_t = 1.0)]
    pub ingest_rate: f64,

    /// Number of claims to generate with the faker if `file_path`
    /// does not already exist.
    #[arg(long, default_value_t = 20)]
    pub generate: usize,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct PayerConfig {
    pub payer_id: String,
    pub name: String,
    /// Contact line attached to generated EDI-835 text (§6 `Edi835Encoder`).
    pub contact: Option<String>,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub payer_percentage: f64,
    pub copay_fixed: f64,
    pub deductible_percentage: f64,
    pub denial_rate: f64,
    pub hard_denial_rate: f64,
    pub preferred_denial_categories: Vec<DenialCategory>,
}

impl PayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay_min_ms > self.delay_max_ms {
            return Err(ConfigError::InvalidDelayRange {
                payer_id: self.payer_id.clone(),
                min_ms: self.delay_min_ms,
                max_ms: self.delay_max_ms,
            });
        }
        for (field, value) in [
            ("payer_percentage", self.payer_percentage),
            ("deductible_percentage", self.deductible_percentage),
            ("denial_rate", self.denial_rate),
            ("hard_denial_rate", self.hard_denial_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability {
                    payer_id: self.payer_id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Per §5: concurrency for `Q_payer[p]` scales with declared delay
    /// so throughput stays roughly independent of latency.
    pub fn default_concurrency(&self) -> usize {
        let avg_delay_ms = (self.delay_min_ms + self.delay_max_ms) as f64 / 2.0;
        let avg_delay_s = avg_delay_ms / 1000.0;
        if avg_delay_s > 10.0 {
            20
        } else if avg_delay_s > 5.0 {
            15
        } else if avg_delay_s > 2.0 {
            10
        } else {
            5
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// target claims/sec; selects limiter strategy (§4.C).
    pub rate_limit: f64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { rate_limit: 5.0 }
    }
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// periodic billing summary cadence; 0 disables.
    pub reporting_interval_seconds: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            reporting_interval_seconds: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgingConfig {
    pub reporting_interval_seconds: u64,
    pub critical_age_minutes: f64,
    pub high_volume_threshold: usize,
    pub payer_delay_threshold_minutes: f64,
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            reporting_interval_seconds: 5,
            critical_age_minutes: 3.0,
            high_volume_threshold: 10,
            payer_delay_threshold_minutes: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub payers: Vec<PayerConfig>,
    pub ingestion: IngestionConfig,
    pub billing: BillingConfig,
    pub aging: AgingConfig,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
    pub verbose: bool,
}

impl SimulatorConfig {
    /// §7 "Configuration errors": the orchestrator refuses to start on
    /// an empty payer map, an invalid delay range, or a non-positive
    /// rate limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payers.is_empty() {
            return Err(ConfigError::NoPayersConfigured);
        }
        if self.ingestion.rate_limit <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(self.ingestion.rate_limit));
        }
        for payer in &self.payers {
            payer.validate()?;
        }
        Ok(())
    }

    /// First-inserted payer — the deterministic fallback target (§4.E).
    pub fn fallback_payer_id(&self) -> &str {
        &self.payers[0].payer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payer(id: &str) -> PayerConfig {
        PayerConfig {
            payer_id: id.to_string(),
            name: id.to_string(),
            contact: None,
            delay_min_ms: 0,
            delay_max_ms: 0,
            payer_percentage: 0.8,
            copay_fixed: 25.0,
            deductible_percentage: 0.1,
            denial_rate: 0.0,
            hard_denial_rate: 0.0,
            preferred_denial_categories: vec![],
        }
    }

    #[test]
    fn rejects_empty_payers() {
        let cfg = SimulatorConfig {
            payers: vec![],
            ingestion: IngestionConfig::default(),
            billing: BillingConfig::default(),
            aging: AgingConfig::default(),
            max_attempts: 3,
            retry_base_ms: 1000,
            verbose: false,
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoPayersConfigured));
    }

    #[test]
    fn rejects_bad_delay_range() {
        let mut payer = sample_payer("p");
        payer.delay_min_ms = 100;
        payer.delay_max_ms = 10;
        assert!(payer.validate().is_err());
    }

    #[test]
    fn fallback_is_first_inserted() {
        let cfg = SimulatorConfig {
            payers: vec![sample_payer("A"), sample_payer("B")],
            ingestion: IngestionConfig::default(),
            billing: BillingConfig::default(),
            aging: AgingConfig::default(),
            max_attempts: 3,
            retry_base_ms: 1000,
            verbose: false,
        };
        assert_eq!(cfg.fallback_payer_id(), "A");
    }

    #[test]
    fn concurrency_scales_with_delay() {
        let mut payer = sample_payer("p");
        payer.delay_min_ms = 11_000;
        payer.delay_max_ms = 11_000;
        assert_eq!(payer.default_concurrency(), 20);
        payer.delay_min_ms = 0;
        payer.delay_max_ms = 0;
        assert_eq!(payer.default_concurrency(), 5);
    }
}
