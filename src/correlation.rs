//! Correlation-id tracking across pipeline stages (§4.B).
//!
//! Grounded in the teacher's `clearinghouse.rs` history map
//! (`HashMap<String, ClaimStatus>`) — generalized into a dedicated
//! registry with a secondary payer index and outstanding/critical
//! queries, since the spec's tracking surface is wider than the
//! teacher's claim-status lookup.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::aging::Severity;

const ALERT_RING_CAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAlertKind {
    DuplicateCompletion,
    ChronologyViolation,
    UnknownCompletion,
}

/// Structured data-integrity alert, parallel to `aging::Alert`, raised
/// when a remittance completion doesn't line up cleanly against the
/// submission it's supposed to close out.
#[derive(Debug, Clone)]
pub struct RegistryAlert {
    pub kind: RegistryAlertKind,
    pub severity: Severity,
    pub message: String,
    pub correlation_id: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CorrelationRecord {
    pub correlation_id: String,
    pub claim_id: String,
    pub payer_id: String,
    pub submitted_at: DateTime<Utc>,
    pub remitted_at: Option<DateTime<Utc>>,
    pub billed: Option<f64>,
    pub paid: Option<f64>,
    pub patient_share: Option<f64>,
    pub not_allowed: Option<f64>,
}

impl CorrelationRecord {
    pub fn is_outstanding(&self) -> bool {
        self.remitted_at.is_none()
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> f64 {
        let end = self.remitted_at.unwrap_or(now);
        (end - self.submitted_at).num_milliseconds() as f64 / 60_000.0
    }
}

#[derive(Debug, Default, Clone)]
pub struct RegistryStateStats {
    pub total: usize,
    pub outstanding: usize,
    pub completed: usize,
}

struct Inner {
    records: HashMap<String, CorrelationRecord>,
    by_payer: HashMap<String, Vec<String>>,
    alerts: VecDeque<RegistryAlert>,
}

fn push_ring(ring: &mut VecDeque<RegistryAlert>, alert: RegistryAlert) {
    if ring.len() >= ALERT_RING_CAP {
        ring.pop_front();
    }
    ring.push_back(alert);
}

/// Tracks claims as they move `submitted -> remitted`, last-write-wins
/// on duplicate correlation ids (§4.B invariant a).
#[derive(Clone)]
pub struct CorrelationRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                records: HashMap::new(),
                by_payer: HashMap::new(),
                alerts: VecDeque::new(),
            })),
        }
    }

    pub async fn record_submission(&self, correlation_id: &str, claim_id: &str, payer_id: &str) {
        let mut inner = self.inner.write().await;
        inner.records.insert(
            correlation_id.to_string(),
            CorrelationRecord {
                correlation_id: correlation_id.to_string(),
                claim_id: claim_id.to_string(),
                payer_id: payer_id.to_string(),
                submitted_at: Utc::now(),
                remitted_at: None,
                billed: None,
                paid: None,
                patient_share: None,
                not_allowed: None,
            },
        );
        inner
            .by_payer
            .entry(payer_id.to_string())
            .or_default()
            .push(correlation_id.to_string());
    }

    /// Records completion. Unknown correlation ids are logged and
    /// otherwise ignored (§4.B: "no-op + warn"); a completion observed
    /// before its submission (clock skew, reordering) is also logged
    /// but still recorded, keyed on whichever timestamps are present.
    pub async fn record_completion(
        &self,
        correlation_id: &str,
        billed: f64,
        paid: f64,
        patient_share: f64,
        not_allowed: f64,
    ) {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        match inner.records.get_mut(correlation_id) {
            Some(record) => {
                if let Some(existing) = record.remitted_at {
                    tracing::warn!(
                        correlation_id,
                        previous_remitted_at = %existing,
                        "duplicate completion observed for correlation id"
                    );
                    push_ring(
                        &mut inner.alerts,
                        RegistryAlert {
                            kind: RegistryAlertKind::DuplicateCompletion,
                            severity: Severity::High,
                            message: format!(
                                "correlation {correlation_id} completed again; previous completion at {existing}"
                            ),
                            correlation_id: correlation_id.to_string(),
                            raised_at: now,
                        },
                    );
                }
                if now < record.submitted_at {
                    tracing::warn!(
                        correlation_id,
                        "completion timestamp precedes submission timestamp"
                    );
                    push_ring(
                        &mut inner.alerts,
                        RegistryAlert {
                            kind: RegistryAlertKind::ChronologyViolation,
                            severity: Severity::Medium,
                            message: format!(
                                "correlation {correlation_id} completed before its recorded submission time"
                            ),
                            correlation_id: correlation_id.to_string(),
                            raised_at: now,
                        },
                    );
                }
                record.remitted_at = Some(now);
                record.billed = Some(billed);
                record.paid = Some(paid);
                record.patient_share = Some(patient_share);
                record.not_allowed = Some(not_allowed);
            }
            None => {
                tracing::warn!(
                    correlation_id,
                    "completion recorded for unknown correlation id"
                );
                push_ring(
                    &mut inner.alerts,
                    RegistryAlert {
                        kind: RegistryAlertKind::UnknownCompletion,
                        severity: Severity::Medium,
                        message: format!("completion observed for untracked correlation id {correlation_id}"),
                        correlation_id: correlation_id.to_string(),
                        raised_at: now,
                    },
                );
            }
        }
    }

    pub async fn alerts(&self) -> Vec<RegistryAlert> {
        self.inner.read().await.alerts.iter().cloned().collect()
    }

    pub async fn get(&self, correlation_id: &str) -> Option<CorrelationRecord> {
        self.inner.read().await.records.get(correlation_id).cloned()
    }

    pub async fn by_payer(&self, payer_id: &str) -> Vec<CorrelationRecord> {
        let inner = self.inner.read().await;
        inner
            .by_payer
            .get(payer_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn outstanding(&self) -> Vec<CorrelationRecord> {
        self.inner
            .read()
            .await
            .records
            .values()
            .filter(|r| r.is_outstanding())
            .cloned()
            .collect()
    }

    /// Outstanding claims aged at least `threshold_minutes`, oldest first.
    pub async fn critical(&self, threshold_minutes: f64) -> Vec<CorrelationRecord> {
        let now = Utc::now();
        let mut records: Vec<CorrelationRecord> = self
            .inner
            .read()
            .await
            .records
            .values()
            .filter(|r| r.is_outstanding() && r.age_minutes(now) >= threshold_minutes)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        records
    }

    pub async fn state_stats(&self) -> RegistryStateStats {
        let inner = self.inner.read().await;
        let total = inner.records.len();
        let outstanding = inner.records.values().filter(|r| r.is_outstanding()).count();
        RegistryStateStats {
            total,
            outstanding,
            completed: total - outstanding,
        }
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submission_then_completion_tracks_outstanding_flag() {
        let registry = CorrelationRegistry::new();
        registry.record_submission("corr-1", "claim-1", "medicare").await;
        assert_eq!(registry.outstanding().await.len(), 1);

        registry.record_completion("corr-1", 150.0, 120.0, 25.0, 5.0).await;
        let record = registry.get("corr-1").await.unwrap();
        assert!(!record.is_outstanding());
        assert_eq!(record.paid, Some(120.0));
        assert_eq!(registry.outstanding().await.len(), 0);
    }

    #[tokio::test]
    async fn completion_for_unknown_id_is_ignored() {
        let registry = CorrelationRegistry::new();
        registry.record_completion("ghost", 1.0, 1.0, 0.0, 0.0).await;
        assert!(registry.get("ghost").await.is_none());
        let alerts = registry.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, RegistryAlertKind::UnknownCompletion);
    }

    #[tokio::test]
    async fn duplicate_completion_raises_alert() {
        let registry = CorrelationRegistry::new();
        registry.record_submission("corr-1", "claim-1", "medicare").await;
        registry.record_completion("corr-1", 150.0, 120.0, 25.0, 5.0).await;
        registry.record_completion("corr-1", 150.0, 120.0, 25.0, 5.0).await;
        let alerts = registry.alerts().await;
        assert!(alerts.iter().any(|a| a.kind == RegistryAlertKind::DuplicateCompletion));
    }

    #[tokio::test]
    async fn last_write_wins_on_duplicate_submission() {
        let registry = CorrelationRegistry::new();
        registry.record_submission("corr-1", "claim-1", "medicare").await;
        registry.record_submission("corr-1", "claim-2", "aetna").await;
        let record = registry.get("corr-1").await.unwrap();
        assert_eq!(record.claim_id, "claim-2");
        assert_eq!(record.payer_id, "aetna");
    }

    #[tokio::test]
    async fn by_payer_filters_to_matching_records() {
        let registry = CorrelationRegistry::new();
        registry.record_submission("corr-1", "claim-1", "medicare").await;
        registry.record_submission("corr-2", "claim-2", "aetna").await;
        assert_eq!(registry.by_payer("medicare").await.len(), 1);
        assert_eq!(registry.by_payer("aetna").await.len(), 1);
        assert_eq!(registry.by_payer("unitedhealth").await.len(), 0);
    }
}
