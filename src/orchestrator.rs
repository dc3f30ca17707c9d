//! Simulator orchestrator (§4.I): wires the ingestor, clearinghouse,
//! per-payer adjudicators, and billing/aging services leaf-first, then
//! drives claims from a `ClaimSource` through the full pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::aging::ARAgingService;
use crate::clearinghouse::Clearinghouse;
use crate::config::SimulatorConfig;
use crate::correlation::CorrelationRegistry;
use crate::denial::{DenialReasonCatalog, StaticDenialCatalog};
use crate::edi835::PlaintextEdi835Encoder;
use crate::errors::ConfigError;
use crate::ingestor::Ingestor;
use crate::job_queue::{AddOptions, JobQueue, QueueStats};
use crate::message::{ClaimEnvelope, RemittanceMessage};
use crate::payer::PayerAdjudicator;
use crate::ports::ClaimSource;
use crate::ports::ClaimStore;
use crate::ports::Edi835Encoder;
use crate::billing::BillingAggregator;

#[derive(Debug, Clone)]
pub struct PipelineStatus {
    pub claim_queue: QueueStats,
    pub payer_queues: HashMap<String, QueueStats>,
    pub remittance_queue: QueueStats,
}

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub configured_payers: Vec<String>,
    pub fallback_payer_id: String,
    pub ingestion_rate: f64,
}

pub struct SimulatorOrchestrator {
    claim_queue: JobQueue<ClaimEnvelope>,
    payer_queues: HashMap<String, JobQueue<ClaimEnvelope>>,
    remittance_queue: JobQueue<RemittanceMessage>,
    correlation: CorrelationRegistry,
    aging: ARAgingService,
    billing: BillingAggregator,
    ingestor: Ingestor,
    fallback_payer_id: String,
}

impl SimulatorOrchestrator {
    /// Validates `config` (§7 "Configuration errors") and wires every
    /// stage's handler before returning. No claims flow until `start`
    /// is called with a concrete `ClaimSource`.
    pub fn new(config: &SimulatorConfig, store: Arc<dyn ClaimStore>) -> Result<Self, ConfigError> {
        config.validate()?;

        let correlation = CorrelationRegistry::new();
        let aging = ARAgingService::new(
            config.aging.critical_age_minutes,
            config.aging.high_volume_threshold,
            config.aging.payer_delay_threshold_minutes,
        );
        let billing = BillingAggregator::new(correlation.clone(), aging.clone());
        let retry_base = Duration::from_millis(config.retry_base_ms);

        let claim_queue: JobQueue<ClaimEnvelope> =
            JobQueue::with_retry_base("Q_claims", 1, retry_base);
        let remittance_queue: JobQueue<RemittanceMessage> =
            JobQueue::with_retry_base("Q_remittance", 1, retry_base);

        let denial_catalog: Arc<dyn DenialReasonCatalog> = Arc::new(StaticDenialCatalog::new());
        let encoder: Arc<dyn Edi835Encoder> = Arc::new(PlaintextEdi835Encoder);
        let payer_names: HashMap<String, String> = config
            .payers
            .iter()
            .map(|p| (p.payer_id.clone(), p.name.clone()))
            .collect();

        let mut payer_queues = HashMap::new();
        let mut adjudicators: HashMap<String, Arc<PayerAdjudicator>> = HashMap::new();
        for payer_cfg in &config.payers {
            let queue: JobQueue<ClaimEnvelope> = JobQueue::with_retry_base(
                format!("Q_payer[{}]", payer_cfg.payer_id),
                payer_cfg.default_concurrency(),
                retry_base,
            );
            payer_queues.insert(payer_cfg.payer_id.clone(), queue);
            adjudicators.insert(
                payer_cfg.payer_id.clone(),
                Arc::new(PayerAdjudicator::new(
                    payer_cfg.clone(),
                    denial_catalog.clone(),
                    store.clone(),
                    encoder.clone(),
                )),
            );
        }

        let fallback_payer_id = config.fallback_payer_id().to_string();
        let clearinghouse = Clearinghouse::new(
            payer_queues.clone(),
            fallback_payer_id.clone(),
            correlation.clone(),
            aging.clone(),
            store.clone(),
            payer_names,
            config.max_attempts,
        );

        claim_queue.process(move |envelope: ClaimEnvelope| {
            let clearinghouse = clearinghouse.clone();
            async move { clearinghouse.route(envelope).await }
        });

        let max_attempts = config.max_attempts;
        for (payer_id, queue) in &payer_queues {
            let adjudicator = adjudicators.get(payer_id).expect("adjudicator configured per payer").clone();
            let remittance_queue = remittance_queue.clone();
            queue.process(move |envelope: ClaimEnvelope| {
                let adjudicator = adjudicator.clone();
                let remittance_queue = remittance_queue.clone();
                async move {
                    match adjudicator.adjudicate(&envelope).await {
                        Ok(remittance) => {
                            remittance_queue
                                .add(RemittanceMessage::new(remittance), AddOptions::with_max_attempts(max_attempts))
                                .await;
                            Ok(())
                        }
                        Err(err) => Err(err.to_string()),
                    }
                }
            });
        }

        {
            let billing = billing.clone();
            let store = store.clone();
            remittance_queue.process(move |msg: RemittanceMessage| {
                let billing = billing.clone();
                let store = store.clone();
                async move {
                    store
                        .mark_billed(&msg.remittance.claim_id)
                        .await
                        .map_err(|e| e.to_string())?;
                    billing.on_claim_processed(&msg.remittance).await;
                    Ok(())
                }
            });
        }

        let ingestor = Ingestor::new(config.ingestion.rate_limit, store.clone(), config.max_attempts);

        Ok(Self {
            claim_queue,
            payer_queues,
            remittance_queue,
            correlation,
            aging,
            billing,
            ingestor,
            fallback_payer_id,
        })
    }

    /// Drains `source` into `Q_claims`, stopping after `limit` claims
    /// (`None` drains to exhaustion). Downstream stages keep draining
    /// their own queues independently via the handlers wired in `new`.
    pub async fn start(&self, source: Box<dyn ClaimSource>, limit: Option<usize>) -> anyhow::Result<()> {
        self.ingestor.run(source, self.claim_queue.clone(), limit).await
    }

    pub fn stop(&self) {
        self.ingestor.stop();
        self.claim_queue.pause();
        for queue in self.payer_queues.values() {
            queue.pause();
        }
        self.remittance_queue.pause();
    }

    pub fn resume(&self) {
        self.ingestor.resume();
        self.claim_queue.resume();
        for queue in self.payer_queues.values() {
            queue.resume();
        }
        self.remittance_queue.resume();
    }

    pub async fn status(&self) -> PipelineStatus {
        let mut payer_queues = HashMap::new();
        for (payer_id, queue) in &self.payer_queues {
            payer_queues.insert(payer_id.clone(), queue.stats().await);
        }
        PipelineStatus {
            claim_queue: self.claim_queue.stats().await,
            payer_queues,
            remittance_queue: self.remittance_queue.stats().await,
        }
    }

    pub fn billing(&self) -> &BillingAggregator {
        &self.billing
    }

    pub fn aging(&self) -> &ARAgingService {
        &self.aging
    }

    pub fn correlation(&self) -> &CorrelationRegistry {
        &self.correlation
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            configured_payers: self.payer_queues.keys().cloned().collect(),
            fallback_payer_id: self.fallback_payer_id.clone(),
            ingestion_rate: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgingConfig, BillingConfig, IngestionConfig, PayerConfig};
    use crate::fixtures::mock_claim;
    use crate::schema::PayerClaim;
    use crate::store::NoopClaimStore;
    use async_trait::async_trait;
    use tokio::time::{sleep, Duration as StdDuration};

    fn payer_cfg(id: &str) -> PayerConfig {
        PayerConfig {
            payer_id: id.to_string(),
            name: id.to_string(),
            contact: None,
            delay_min_ms: 0,
            delay_max_ms: 0,
            payer_percentage: 0.8,
            copay_fixed: 25.0,
            deductible_percentage: 0.05,
            denial_rate: 0.0,
            hard_denial_rate: 0.0,
            preferred_denial_categories: vec![],
        }
    }

    fn test_config() -> SimulatorConfig {
        SimulatorConfig {
            payers: vec![payer_cfg("medicare")],
            ingestion: IngestionConfig { rate_limit: 1000.0 },
            billing: BillingConfig {
                reporting_interval_seconds: 0,
            },
            aging: AgingConfig::default(),
            max_attempts: 3,
            retry_base_ms: 10,
            verbose: false,
        }
    }

    struct OneClaimSource(Option<PayerClaim>);

    #[async_trait]
    impl ClaimSource for OneClaimSource {
        async fn next_claim(&mut self) -> anyhow::Result<Option<PayerClaim>> {
            Ok(self.0.take())
        }
    }

    #[tokio::test]
    async fn end_to_end_claim_reaches_billing() {
        let orchestrator =
            SimulatorOrchestrator::new(&test_config(), Arc::new(NoopClaimStore)).unwrap();
        let source = Box::new(OneClaimSource(Some(mock_claim())));
        orchestrator.start(source, None).await.unwrap();

        let mut waited = 0;
        while orchestrator.billing().claims_processed().await == 0 && waited < 50 {
            sleep(StdDuration::from_millis(20)).await;
            waited += 1;
        }
        assert_eq!(orchestrator.billing().claims_processed().await, 1);
    }

    #[tokio::test]
    async fn rejects_config_with_no_payers() {
        let mut config = test_config();
        config.payers.clear();
        let result = SimulatorOrchestrator::new(&config, Arc::new(NoopClaimStore));
        assert!(result.is_err());
    }
}
