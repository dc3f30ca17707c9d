//! Billing aggregation and periodic reporting (§4.G). Generalizes the
//! teacher's `reporter.rs` patient-summary arithmetic
//! (`update_patient_summary`) into a standalone aggregator that also
//! feeds `CorrelationRegistry`/`ARAgingService` completion, and prints
//! with `prettytable`/`colored` instead of raw `println!`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use colored::Colorize;
use prettytable::{row, Table};
use tokio::sync::Mutex;

use crate::aging::ARAgingService;
use crate::correlation::CorrelationRegistry;
use crate::remittance::Remittance;

const DURATION_SAMPLES_CAP: usize = 1000;

#[derive(Debug, Default, Clone)]
pub struct PatientShare {
    pub copay: f64,
    pub coinsurance: f64,
    pub deductible: f64,
}

impl PatientShare {
    pub fn total(&self) -> f64 {
        self.copay + self.coinsurance + self.deductible
    }
}

#[derive(Debug, Default, Clone)]
pub struct PayerBreakdown {
    pub claims_processed: u64,
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_denied: f64,
}

struct Inner {
    total_billed: f64,
    total_paid: f64,
    total_denied: f64,
    total_patient_responsibility: f64,
    claims_processed: u64,
    per_payer: HashMap<String, PayerBreakdown>,
    per_patient: HashMap<String, PatientShare>,
    processing_durations_ms: VecDeque<i64>,
}

/// Patient key per §4.G: `"patient_" + last 6 chars of the correlation id`.
pub fn patient_key(correlation_id: &str) -> String {
    let tail_start = correlation_id.len().saturating_sub(6);
    format!("patient_{}", &correlation_id[tail_start..])
}

#[derive(Clone)]
pub struct BillingAggregator {
    inner: Arc<Mutex<Inner>>,
    correlation: CorrelationRegistry,
    aging: ARAgingService,
}

impl BillingAggregator {
    pub fn new(correlation: CorrelationRegistry, aging: ARAgingService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                total_billed: 0.0,
                total_paid: 0.0,
                total_denied: 0.0,
                total_patient_responsibility: 0.0,
                claims_processed: 0,
                per_payer: HashMap::new(),
                per_patient: HashMap::new(),
                processing_durations_ms: VecDeque::new(),
            })),
            correlation,
            aging,
        }
    }

    /// Consumes a finished remittance off `Q_remittance`: updates totals,
    /// records completion against both tracking services, and samples
    /// the end-to-end processing duration if the correlation id was seen
    /// at submission.
    pub async fn on_claim_processed(&self, remittance: &Remittance) {
        let billed = remittance.claim_billed();
        let paid = remittance.claim_paid();
        let patient_share = remittance.claim_patient_share();
        let not_allowed = remittance.claim_not_allowed();

        let submitted_at = self.correlation.get(&remittance.correlation_id).await.map(|r| r.submitted_at);

        self.correlation
            .record_completion(&remittance.correlation_id, billed, paid, patient_share, not_allowed)
            .await;
        self.aging.record_completion(&remittance.correlation_id, billed, paid).await;

        let mut inner = self.inner.lock().await;
        inner.total_billed += billed;
        inner.total_paid += paid;
        inner.total_denied += not_allowed;
        inner.total_patient_responsibility += patient_share;
        inner.claims_processed += 1;

        let breakdown = inner.per_payer.entry(remittance.payer_id.clone()).or_default();
        breakdown.claims_processed += 1;
        breakdown.total_billed += billed;
        breakdown.total_paid += paid;
        breakdown.total_denied += not_allowed;

        let key = patient_key(&remittance.correlation_id);
        let share = inner.per_patient.entry(key).or_default();
        for line in &remittance.remittance_lines {
            share.copay += line.copay;
            share.coinsurance += line.coinsurance;
            share.deductible += line.deductible;
        }

        if let Some(submitted_at) = submitted_at {
            let duration_ms = (chrono::Utc::now() - submitted_at).num_milliseconds();
            if inner.processing_durations_ms.len() >= DURATION_SAMPLES_CAP {
                inner.processing_durations_ms.pop_front();
            }
            inner.processing_durations_ms.push_back(duration_ms);
        }
    }

    pub async fn per_payer_breakdown(&self) -> HashMap<String, PayerBreakdown> {
        self.inner.lock().await.per_payer.clone()
    }

    pub async fn per_patient_share(&self) -> HashMap<String, PatientShare> {
        self.inner.lock().await.per_patient.clone()
    }

    pub async fn average_processing_duration_ms(&self) -> Option<f64> {
        let inner = self.inner.lock().await;
        if inner.processing_durations_ms.is_empty() {
            return None;
        }
        let sum: i64 = inner.processing_durations_ms.iter().sum();
        Some(sum as f64 / inner.processing_durations_ms.len() as f64)
    }

    pub async fn claims_processed(&self) -> u64 {
        self.inner.lock().await.claims_processed
    }

    pub async fn total_patient_responsibility(&self) -> f64 {
        self.inner.lock().await.total_patient_responsibility
    }

    /// Renders the per-payer and per-patient summary as formatted tables.
    pub async fn render_report(&self) -> String {
        let inner = self.inner.lock().await;
        let mut out = String::new();

        out.push_str(&format!("{}\n", "--- Billing Summary ---".bold()));
        let mut payer_table = Table::new();
        payer_table.add_row(row!["Payer", "Claims", "Billed", "Paid", "Denied"]);
        for (payer_id, breakdown) in &inner.per_payer {
            payer_table.add_row(row![
                payer_id,
                breakdown.claims_processed,
                format!("${:.2}", breakdown.total_billed),
                format!("${:.2}", breakdown.total_paid),
                format!("${:.2}", breakdown.total_denied),
            ]);
        }
        out.push_str(&payer_table.to_string());

        out.push_str(&format!("\n{}\n", "--- Patient Financial Summary ---".bold()));
        let mut patient_table = Table::new();
        patient_table.add_row(row!["Patient", "Copay", "Coinsurance", "Deductible"]);
        for (patient, share) in &inner.per_patient {
            patient_table.add_row(row![
                patient,
                format!("${:.2}", share.copay),
                format!("${:.2}", share.coinsurance),
                format!("${:.2}", share.deductible),
            ]);
        }
        out.push_str(&patient_table.to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mock_remittance;

    #[tokio::test]
    async fn on_claim_processed_updates_totals_and_breakdowns() {
        let correlation = CorrelationRegistry::new();
        correlation.record_submission("corr-mock", "abc123", "medicare").await;
        let aging = ARAgingService::new(3.0, 10, 2.0);
        aging.record_submission("corr-mock", "medicare").await;

        let billing = BillingAggregator::new(correlation, aging);
        billing.on_claim_processed(&mock_remittance()).await;

        assert_eq!(billing.claims_processed().await, 1);
        let breakdown = billing.per_payer_breakdown().await;
        assert_eq!(breakdown.get("medicare").unwrap().claims_processed, 1);
        let patients = billing.per_patient_share().await;
        assert_eq!(patients.len(), 1);
        assert_eq!(billing.total_patient_responsibility().await, 30.0);
    }

    #[test]
    fn patient_key_uses_last_six_characters() {
        assert_eq!(patient_key("abcdef123456"), "patient_123456");
        assert_eq!(patient_key("ab"), "patient_ab");
    }
}
