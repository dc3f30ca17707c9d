//! Clearinghouse (§4.E): routes each ingested claim to the `Q_payer[p]`
//! matching its `payer_id`, falling back deterministically to the
//! first-configured payer when the id is unrecognized. Grounded in the
//! teacher's `Clearinghouse::handle_claim` routing, adapted from a
//! channel actor into a `Q_claims` handler since jobs now flow through
//! `JobQueue` stages instead of per-claim response channels.

use std::collections::HashMap;
use std::sync::Arc;

use crate::aging::ARAgingService;
use crate::correlation::CorrelationRegistry;
use crate::job_queue::{AddOptions, JobQueue};
use crate::message::ClaimEnvelope;
use crate::ports::ClaimStore;

#[derive(Clone)]
pub struct Clearinghouse {
    payer_queues: HashMap<String, JobQueue<ClaimEnvelope>>,
    fallback_payer_id: String,
    correlation: CorrelationRegistry,
    aging: ARAgingService,
    store: Arc<dyn ClaimStore>,
    payer_names: HashMap<String, String>,
    max_attempts: u32,
}

impl Clearinghouse {
    pub fn new(
        payer_queues: HashMap<String, JobQueue<ClaimEnvelope>>,
        fallback_payer_id: String,
        correlation: CorrelationRegistry,
        aging: ARAgingService,
        store: Arc<dyn ClaimStore>,
        payer_names: HashMap<String, String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            payer_queues,
            fallback_payer_id,
            correlation,
            aging,
            store,
            payer_names,
            max_attempts,
        }
    }

    /// Handles one claim off `Q_claims`: records tracking state, resolves
    /// the target payer queue (falling back to the first-configured payer
    /// for an unrecognized id), and enqueues it there.
    pub async fn route(&self, envelope: ClaimEnvelope) -> Result<(), String> {
        let claim_id = envelope.claim.claim_id.clone();
        let correlation_id = envelope.correlation_id.clone();
        let requested_payer_id = envelope.claim.payer_id().to_string();

        let target_payer_id = if self.payer_queues.contains_key(&requested_payer_id) {
            requested_payer_id.clone()
        } else {
            tracing::warn!(
                claim_id = claim_id.as_str(),
                requested_payer_id = requested_payer_id.as_str(),
                fallback_payer_id = self.fallback_payer_id.as_str(),
                "unknown payer id, routing to fallback payer"
            );
            self.fallback_payer_id.clone()
        };

        self.correlation
            .record_submission(&correlation_id, &claim_id, &target_payer_id)
            .await;
        self.aging.record_submission(&correlation_id, &target_payer_id).await;

        let payer_name = self
            .payer_names
            .get(&target_payer_id)
            .cloned()
            .unwrap_or_else(|| target_payer_id.clone());
        self.store
            .mark_routed(&claim_id, &target_payer_id, &payer_name)
            .await
            .unwrap_or_else(|err| tracing::warn!(error = %err, "claim store rejected mark_routed"));

        let queue = self
            .payer_queues
            .get(&target_payer_id)
            .ok_or_else(|| format!("no queue configured for fallback payer {target_payer_id}"))?;
        queue
            .add(envelope, AddOptions::with_max_attempts(self.max_attempts))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mock_claim;
    use crate::store::NoopClaimStore;

    fn envelope_for(payer_id: &str) -> ClaimEnvelope {
        let mut claim = mock_claim();
        claim.insurance.payer_id = payer_id.to_string();
        ClaimEnvelope::new("corr-1".to_string(), claim, "now".to_string())
    }

    #[tokio::test]
    async fn routes_to_matching_payer_queue() {
        let medicare_queue: JobQueue<ClaimEnvelope> = JobQueue::new("medicare", 4);
        let aetna_queue: JobQueue<ClaimEnvelope> = JobQueue::new("aetna", 4);
        let mut queues = HashMap::new();
        queues.insert("medicare".to_string(), medicare_queue.clone());
        queues.insert("aetna".to_string(), aetna_queue.clone());

        let clearinghouse = Clearinghouse::new(
            queues,
            "medicare".to_string(),
            CorrelationRegistry::new(),
            ARAgingService::new(3.0, 10, 2.0),
            Arc::new(NoopClaimStore),
            HashMap::new(),
            3,
        );

        clearinghouse.route(envelope_for("aetna")).await.unwrap();
        assert_eq!(aetna_queue.stats().await.pending, 1);
        assert_eq!(medicare_queue.stats().await.pending, 0);
    }

    #[tokio::test]
    async fn unknown_payer_falls_back_deterministically() {
        let medicare_queue: JobQueue<ClaimEnvelope> = JobQueue::new("medicare", 4);
        let mut queues = HashMap::new();
        queues.insert("medicare".to_string(), medicare_queue.clone());

        let clearinghouse = Clearinghouse::new(
            queues,
            "medicare".to_string(),
            CorrelationRegistry::new(),
            ARAgingService::new(3.0, 10, 2.0),
            Arc::new(NoopClaimStore),
            HashMap::new(),
            3,
        );

        clearinghouse.route(envelope_for("unknown_payer")).await.unwrap();
        assert_eq!(medicare_queue.stats().await.pending, 1);
    }

    #[tokio::test]
    async fn routing_records_submission_in_correlation_registry() {
        let medicare_queue: JobQueue<ClaimEnvelope> = JobQueue::new("medicare", 4);
        let mut queues = HashMap::new();
        queues.insert("medicare".to_string(), medicare_queue);
        let correlation = CorrelationRegistry::new();

        let clearinghouse = Clearinghouse::new(
            queues,
            "medicare".to_string(),
            correlation.clone(),
            ARAgingService::new(3.0, 10, 2.0),
            Arc::new(NoopClaimStore),
            HashMap::new(),
            3,
        );

        clearinghouse.route(envelope_for("medicare")).await.unwrap();
        assert!(correlation.get("corr-1").await.is_some());
    }
}
