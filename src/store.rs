//! Bundled `ClaimStore` adapter.

use async_trait::async_trait;

use crate::message::ClaimEnvelope;
use crate::ports::{AdjudicationOutcome, ClaimStore};

/// Discards every lifecycle transition after logging it. Persistence is
/// explicitly out of scope for the core (§1); this adapter exists so the
/// port has a default implementation to wire into the orchestrator.
#[derive(Debug, Default, Clone)]
pub struct NoopClaimStore;

#[async_trait]
impl ClaimStore for NoopClaimStore {
    async fn store_new_claim(&self, envelope: &ClaimEnvelope) -> anyhow::Result<()> {
        tracing::debug!(claim_id = envelope.claim.claim_id.as_str(), "claim stored by noop store");
        Ok(())
    }

    async fn mark_ingested(&self, claim_id: &str) -> anyhow::Result<()> {
        tracing::debug!(claim_id, "claim marked ingested by noop store");
        Ok(())
    }

    async fn mark_routed(&self, claim_id: &str, payer_id: &str, payer_name: &str) -> anyhow::Result<()> {
        tracing::debug!(claim_id, payer_id, payer_name, "claim marked routed by noop store");
        Ok(())
    }

    async fn mark_adjudicated(&self, claim_id: &str, outcome: &AdjudicationOutcome) -> anyhow::Result<()> {
        tracing::debug!(
            claim_id,
            billed = outcome.billed,
            paid = outcome.paid,
            "claim marked adjudicated by noop store"
        );
        Ok(())
    }

    async fn mark_billed(&self, claim_id: &str) -> anyhow::Result<()> {
        tracing::debug!(claim_id, "claim marked billed by noop store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mock_claim;

    #[tokio::test]
    async fn noop_store_always_succeeds() {
        let store = NoopClaimStore;
        let envelope = ClaimEnvelope {
            correlation_id: "corr-mock".to_string(),
            claim: mock_claim(),
            ingested_at: chrono::Utc::now().to_rfc3339(),
        };
        assert!(store.store_new_claim(&envelope).await.is_ok());
        assert!(store.mark_ingested("abc123").await.is_ok());
        assert!(store.mark_routed("abc123", "medicare", "Medicare").await.is_ok());
        assert!(store.mark_billed("abc123").await.is_ok());
    }
}
