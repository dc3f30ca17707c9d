//! AR aging service (§4.H). Generalizes the teacher's `reporter.rs`
//! `update_aging_buckets` arithmetic (age buckets keyed by payer) into a
//! standalone tracked service that also raises structured alerts instead
//! of only printing a report.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

const ALERT_RING_CAP: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgingBuckets {
    pub age_0_1: usize,
    pub age_1_2: usize,
    pub age_2_3: usize,
    pub age_3_plus: usize,
}

impl AgingBuckets {
    fn record(&mut self, age_minutes: f64) {
        if age_minutes < 1.0 {
            self.age_0_1 += 1;
        } else if age_minutes < 2.0 {
            self.age_1_2 += 1;
        } else if age_minutes < 3.0 {
            self.age_2_3 += 1;
        } else {
            self.age_3_plus += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    HighAging,
    StuckClaims,
    PayerDelay,
    DataValidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub payer_id: Option<String>,
    pub correlation_id: Option<String>,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TrackedClaim {
    payer_id: String,
    submitted_at: DateTime<Utc>,
    remitted_at: Option<DateTime<Utc>>,
    billed: f64,
    paid: f64,
}

/// Per-payer aging report entry: age buckets over every tracked claim
/// (outstanding and completed alike) plus billed/paid totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PayerAgingMetrics {
    pub buckets: AgingBuckets,
    pub total_claims: usize,
    pub outstanding_count: usize,
    pub total_billed: f64,
    pub total_paid: f64,
    pub average_age_minutes: f64,
    pub oldest_age_minutes: f64,
}

struct Inner {
    claims: HashMap<String, TrackedClaim>,
    alerts: VecDeque<Alert>,
}

#[derive(Clone)]
pub struct ARAgingService {
    inner: Arc<Mutex<Inner>>,
    critical_age_minutes: f64,
    high_volume_threshold: usize,
    payer_delay_threshold_minutes: f64,
}

impl ARAgingService {
    pub fn new(
        critical_age_minutes: f64,
        high_volume_threshold: usize,
        payer_delay_threshold_minutes: f64,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                claims: HashMap::new(),
                alerts: VecDeque::new(),
            })),
            critical_age_minutes,
            high_volume_threshold,
            payer_delay_threshold_minutes,
        }
    }

    pub async fn record_submission(&self, correlation_id: &str, payer_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.claims.insert(
            correlation_id.to_string(),
            TrackedClaim {
                payer_id: payer_id.to_string(),
                submitted_at: Utc::now(),
                remitted_at: None,
                billed: 0.0,
                paid: 0.0,
            },
        );
        let outstanding_for_payer = inner
            .claims
            .values()
            .filter(|c| c.payer_id == payer_id && c.remitted_at.is_none())
            .count();
        if outstanding_for_payer > self.high_volume_threshold {
            let alert = Alert {
                kind: AlertKind::HighAging,
                severity: Severity::High,
                message: format!(
                    "payer {} has {} outstanding claims (threshold {})",
                    payer_id, outstanding_for_payer, self.high_volume_threshold
                ),
                payer_id: Some(payer_id.to_string()),
                correlation_id: None,
                raised_at: Utc::now(),
            };
            push_ring(&mut inner.alerts, alert);
        }
    }

    pub async fn record_completion(&self, correlation_id: &str, billed: f64, paid: f64) {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let delay_minutes;
        let payer_id;
        match inner.claims.get_mut(correlation_id) {
            Some(claim) => {
                claim.remitted_at = Some(now);
                claim.billed = billed;
                claim.paid = paid;
                delay_minutes = (now - claim.submitted_at).num_milliseconds() as f64 / 60_000.0;
                payer_id = claim.payer_id.clone();
            }
            None => {
                let alert = Alert {
                    kind: AlertKind::DataValidation,
                    severity: Severity::Medium,
                    message: format!("completion observed for untracked correlation id {correlation_id}"),
                    payer_id: None,
                    correlation_id: Some(correlation_id.to_string()),
                    raised_at: now,
                };
                push_ring(&mut inner.alerts, alert);
                return;
            }
        }
        if delay_minutes >= self.payer_delay_threshold_minutes {
            let alert = Alert {
                kind: AlertKind::PayerDelay,
                severity: if delay_minutes >= self.critical_age_minutes {
                    Severity::Critical
                } else {
                    Severity::Medium
                },
                message: format!(
                    "payer {payer_id} took {delay_minutes:.2} minutes to remit correlation {correlation_id}"
                ),
                payer_id: Some(payer_id),
                correlation_id: Some(correlation_id.to_string()),
                raised_at: now,
            };
            push_ring(&mut inner.alerts, alert);
        }
    }

    /// Per-payer age-bucket report over every tracked claim. Outstanding
    /// claims age against `now`; completed claims age against the moment
    /// they were remitted, so a claim keeps its bucket after completion
    /// instead of disappearing from the report.
    pub async fn generate_report(&self) -> HashMap<String, PayerAgingMetrics> {
        let inner = self.inner.lock().await;
        let now = Utc::now();
        let mut report: HashMap<String, PayerAgingMetrics> = HashMap::new();
        let mut age_sums: HashMap<String, f64> = HashMap::new();
        for claim in inner.claims.values() {
            let age_minutes = (claim.remitted_at.unwrap_or(now) - claim.submitted_at).num_milliseconds() as f64 / 60_000.0;
            let metrics = report.entry(claim.payer_id.clone()).or_default();
            metrics.buckets.record(age_minutes);
            metrics.total_claims += 1;
            metrics.total_billed += claim.billed;
            metrics.total_paid += claim.paid;
            if claim.remitted_at.is_none() {
                metrics.outstanding_count += 1;
            }
            metrics.oldest_age_minutes = metrics.oldest_age_minutes.max(age_minutes);
            *age_sums.entry(claim.payer_id.clone()).or_insert(0.0) += age_minutes;
        }
        for (payer_id, metrics) in report.iter_mut() {
            let sum = age_sums.get(payer_id).copied().unwrap_or(0.0);
            metrics.average_age_minutes = sum / metrics.total_claims as f64;
        }
        report
    }

    /// Outstanding claims aged at or beyond `critical_age_minutes`,
    /// oldest first, additionally raising a `StuckClaims` alert for each.
    pub async fn critical_claims(&self) -> Vec<(String, f64)> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let mut critical: Vec<(String, f64)> = inner
            .claims
            .iter()
            .filter(|(_, c)| c.remitted_at.is_none())
            .map(|(id, c)| (id.clone(), (now - c.submitted_at).num_milliseconds() as f64 / 60_000.0))
            .filter(|(_, age)| *age >= self.critical_age_minutes)
            .collect();
        critical.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        // oldest first means largest age first
        critical.reverse();
        for (correlation_id, age_minutes) in &critical {
            let alert = Alert {
                kind: AlertKind::StuckClaims,
                severity: Severity::Critical,
                message: format!("claim {correlation_id} has been outstanding for {age_minutes:.2} minutes"),
                payer_id: None,
                correlation_id: Some(correlation_id.clone()),
                raised_at: now,
            };
            push_ring(&mut inner.alerts, alert);
        }
        critical
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.inner.lock().await.alerts.iter().cloned().collect()
    }
}

fn push_ring(ring: &mut VecDeque<Alert>, alert: Alert) {
    if ring.len() >= ALERT_RING_CAP {
        ring.pop_front();
    }
    ring.push_back(alert);
}
