//! Ingestor (§4.D): pulls claims from a `ClaimSource`, paces them
//! through a `RateLimiter`, stamps each with a fresh correlation id, and
//! hands the envelope to `Q_claims`. Generalizes the teacher's
//! `run_biller` loop, replacing its fixed per-claim response channel
//! with the shared `Q_claims` hand-off the rest of the pipeline expects.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::job_queue::{AddOptions, JobQueue};
use crate::message::ClaimEnvelope;
use crate::ports::ClaimSource;
use crate::ports::ClaimStore;
use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone, Default)]
pub struct IngestorStats {
    pub claims_ingested: u64,
    pub claims_rejected: u64,
}

pub struct Ingestor {
    rate_limiter: RateLimiter,
    claims_ingested: Arc<AtomicU64>,
    claims_rejected: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    store: Arc<dyn ClaimStore>,
    max_attempts: u32,
}

impl Ingestor {
    pub fn new(rate_per_second: f64, store: Arc<dyn ClaimStore>, max_attempts: u32) -> Self {
        Self {
            rate_limiter: RateLimiter::new(rate_per_second),
            claims_ingested: Arc::new(AtomicU64::new(0)),
            claims_rejected: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(true)),
            store,
            max_attempts,
        }
    }

    pub fn stats(&self) -> IngestorStats {
        IngestorStats {
            claims_ingested: self.claims_ingested.load(Ordering::SeqCst),
            claims_rejected: self.claims_rejected.load(Ordering::SeqCst),
        }
    }

    /// Signals `run` to exit at the next loop iteration instead of
    /// pulling further claims from the source (§4.D, §5).
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    /// Drains `source` into `claim_queue`, stopping after `limit` claims
    /// (`None` drains the source to exhaustion) or as soon as `stop()`
    /// has been called.
    pub async fn run(
        &self,
        mut source: Box<dyn ClaimSource>,
        claim_queue: JobQueue<ClaimEnvelope>,
        limit: Option<usize>,
    ) -> anyhow::Result<()> {
        let start = Instant::now();
        let mut ingested = 0usize;
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Some(limit) = limit {
                if ingested >= limit {
                    break;
                }
            }
            self.rate_limiter.acquire().await;
            match source.next_claim().await? {
                None => break,
                Some(claim) => {
                    if let Err(reason) = claim.validate() {
                        tracing::warn!(claim_id = claim.claim_id.as_str(), reason = %reason, "rejecting invalid claim at ingestion");
                        self.claims_rejected.fetch_add(1, Ordering::SeqCst);
                        continue;
                    }
                    let correlation_id = Uuid::new_v4().to_string();
                    let envelope = ClaimEnvelope::new(correlation_id, claim, Utc::now().to_rfc3339());
                    self.store
                        .store_new_claim(&envelope)
                        .await
                        .unwrap_or_else(|err| tracing::warn!(error = %err, "claim store rejected store_new_claim"));
                    self.store
                        .mark_ingested(&envelope.claim.claim_id)
                        .await
                        .unwrap_or_else(|err| tracing::warn!(error = %err, "claim store rejected mark_ingested"));
                    claim_queue
                        .add(envelope, AddOptions::with_max_attempts(self.max_attempts))
                        .await;
                    ingested += 1;
                    self.claims_ingested.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        tracing::info!(
            claims_ingested = ingested,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ingestor drained source"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mock_claim;
    use crate::schema::PayerClaim;
    use crate::store::NoopClaimStore;
    use async_trait::async_trait;
    use std::time::Duration;

    fn ingestor(rate_per_second: f64) -> Ingestor {
        Ingestor::new(rate_per_second, Arc::new(NoopClaimStore), 3)
    }

    struct FixedSource {
        remaining: usize,
    }

    #[async_trait]
    impl ClaimSource for FixedSource {
        async fn next_claim(&mut self) -> anyhow::Result<Option<PayerClaim>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(mock_claim()))
        }
    }

    #[tokio::test]
    async fn ingests_up_to_source_exhaustion() {
        let ingestor = ingestor(1000.0);
        let queue: JobQueue<ClaimEnvelope> = JobQueue::new("claims", 4);
        let source = Box::new(FixedSource { remaining: 3 });
        ingestor.run(source, queue.clone(), None).await.unwrap();
        assert_eq!(ingestor.stats().claims_ingested, 3);
        assert_eq!(queue.stats().await.pending, 3);
    }

    #[tokio::test]
    async fn respects_explicit_limit() {
        let ingestor = ingestor(1000.0);
        let queue: JobQueue<ClaimEnvelope> = JobQueue::new("claims", 4);
        let source = Box::new(FixedSource { remaining: 10 });
        ingestor.run(source, queue.clone(), Some(2)).await.unwrap();
        assert_eq!(ingestor.stats().claims_ingested, 2);
    }

    #[tokio::test]
    async fn rejects_invalid_claims_without_enqueuing() {
        let ingestor = ingestor(1000.0);
        let queue: JobQueue<ClaimEnvelope> = JobQueue::new("claims", 4);
        let mut claim = mock_claim();
        claim.service_lines.clear();
        struct OneBadClaim(Option<PayerClaim>);
        #[async_trait]
        impl ClaimSource for OneBadClaim {
            async fn next_claim(&mut self) -> anyhow::Result<Option<PayerClaim>> {
                Ok(self.0.take())
            }
        }
        let source = Box::new(OneBadClaim(Some(claim)));
        ingestor.run(source, queue.clone(), None).await.unwrap();
        assert_eq!(ingestor.stats().claims_ingested, 0);
        assert_eq!(ingestor.stats().claims_rejected, 1);
    }

    #[tokio::test]
    async fn stop_called_before_run_ingests_nothing() {
        let ingestor = ingestor(1000.0);
        ingestor.stop();
        let queue: JobQueue<ClaimEnvelope> = JobQueue::new("claims", 4);
        let source = Box::new(FixedSource { remaining: 5 });
        ingestor.run(source, queue.clone(), None).await.unwrap();
        assert_eq!(ingestor.stats().claims_ingested, 0);
    }

    struct SlowSource {
        remaining: usize,
    }

    #[async_trait]
    impl ClaimSource for SlowSource {
        async fn next_claim(&mut self) -> anyhow::Result<Option<PayerClaim>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(Some(mock_claim()))
        }
    }

    #[tokio::test]
    async fn stop_mid_stream_halts_further_ingestion() {
        let ingestor = Arc::new(ingestor(1000.0));
        let queue: JobQueue<ClaimEnvelope> = JobQueue::new("claims", 4);
        let running = ingestor.clone();
        let queue_clone = queue.clone();
        let handle = tokio::spawn(async move {
            running
                .run(Box::new(SlowSource { remaining: 100 }), queue_clone, None)
                .await
                .unwrap();
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        ingestor.stop();
        handle.await.unwrap();
        assert!(ingestor.stats().claims_ingested < 100);
    }
}
