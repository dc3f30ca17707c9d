//! Port traits (§6) — the seams the orchestrator wires concrete
//! adapters into. Grounded in the teacher's channel-based module
//! boundaries (`reader.rs` feeding `biller.rs`, `payer.rs` feeding
//! `clearinghouse.rs`), expressed here as `async_trait` objects so the
//! orchestrator can swap adapters without touching pipeline logic.

use async_trait::async_trait;

use crate::message::ClaimEnvelope;
use crate::remittance::RemittanceStatus;
use crate::schema::PayerClaim;

/// Supplies claims to the ingestor. The bundled adapter (`reader.rs`)
/// streams from a JSONL file; other sources (a queue, an HTTP feed)
/// implement the same trait.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    /// Returns the next claim, or `Ok(None)` once the source is exhausted.
    async fn next_claim(&mut self) -> anyhow::Result<Option<PayerClaim>>;
}

/// Summary handed to `ClaimStore::mark_adjudicated` — everything a sink
/// needs to persist the outcome of adjudication without depending on the
/// full `Remittance` shape.
#[derive(Debug, Clone)]
pub struct AdjudicationOutcome {
    pub overall_status: RemittanceStatus,
    pub billed: f64,
    pub paid: f64,
    pub patient_share: f64,
    pub not_allowed: f64,
}

/// Persists claim lifecycle transitions (§6): a claim is stored on
/// arrival, marked ingested once it clears validation, marked routed once
/// a payer is chosen, marked adjudicated once a remittance is produced,
/// and marked billed once billing has consumed it. The bundled adapter is
/// a no-op — persistence is explicitly out of scope for the core (§1) but
/// the port is real so a durable sink can be wired in without touching
/// the pipeline stages that call it.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn store_new_claim(&self, envelope: &ClaimEnvelope) -> anyhow::Result<()>;
    async fn mark_ingested(&self, claim_id: &str) -> anyhow::Result<()>;
    async fn mark_routed(&self, claim_id: &str, payer_id: &str, payer_name: &str) -> anyhow::Result<()>;
    async fn mark_adjudicated(&self, claim_id: &str, outcome: &AdjudicationOutcome) -> anyhow::Result<()>;
    async fn mark_billed(&self, claim_id: &str) -> anyhow::Result<()>;
}

/// Encodes a remittance into an EDI 835-shaped representation. The
/// bundled adapter emits a readable plaintext rendering rather than a
/// byte-exact X12 835 — full X12 segment encoding is out of scope (§1)
/// but the port is real so a compliant encoder can be dropped in later.
pub trait Edi835Encoder: Send + Sync {
    fn encode(
        &self,
        remittance: &crate::remittance::Remittance,
        claim: &PayerClaim,
        payer_name: &str,
        payer_contact: Option<&str>,
    ) -> String;
}
