//! `DenialReasonCatalog` port (§6) and a static in-memory implementation.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenialCategory {
    Authorization,
    MedicalNecessity,
    Eligibility,
    Coding,
    Timely,
    Duplicate,
}

impl DenialCategory {
    pub const ALL: [DenialCategory; 6] = [
        DenialCategory::Authorization,
        DenialCategory::MedicalNecessity,
        DenialCategory::Eligibility,
        DenialCategory::Coding,
        DenialCategory::Timely,
        DenialCategory::Duplicate,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Hard,
    Soft,
}

/// A single denial reason, modelled loosely on an EDI-835 CARC/RARC pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialReason {
    pub code: String,
    pub group_code: String,
    pub reason_code: String,
    pub category: DenialCategory,
    pub severity: Severity,
    pub description: String,
    pub explanation: String,
}

/// §6 port: picks a denial reason either unconditionally or scoped to a
/// preferred category. Consumed by the payer adjudicator (§4.F step 2).
pub trait DenialReasonCatalog: Send + Sync {
    fn pick_random(&self, rng: &mut dyn rand::RngCore) -> DenialReason;
    fn pick_by_category(&self, category: DenialCategory, rng: &mut dyn rand::RngCore) -> DenialReason;
}

/// Fixed reason table seeded per category — enough variety to exercise
/// every branch of the adjudicator without needing an external catalog.
pub struct StaticDenialCatalog {
    by_category: Vec<(DenialCategory, Vec<DenialReason>)>,
}

impl Default for StaticDenialCatalog {
    fn default() -> Self {
        let mk = |code: &str, group: &str, reason: &str, cat: DenialCategory, sev: Severity, desc: &str, exp: &str| {
            DenialReason {
                code: code.to_string(),
                group_code: group.to_string(),
                reason_code: reason.to_string(),
                category: cat,
                severity: sev,
                description: desc.to_string(),
                explanation: exp.to_string(),
            }
        };
        Self {
            by_category: vec![
                (
                    DenialCategory::Authorization,
                    vec![
                        mk("CO-197", "CO", "197", DenialCategory::Authorization, Severity::Hard,
                            "Precertification/authorization absent", "No prior authorization on file for this service"),
                        mk("CO-15", "CO", "15", DenialCategory::Authorization, Severity::Soft,
                            "Authorization number invalid", "Submitted authorization number does not match payer records"),
                    ],
                ),
                (
                    DenialCategory::MedicalNecessity,
                    vec![
                        mk("CO-50", "CO", "50", DenialCategory::MedicalNecessity, Severity::Hard,
                            "Not medically necessary", "Service deemed not medically necessary per payer policy"),
                    ],
                ),
                (
                    DenialCategory::Eligibility,
                    vec![
                        mk("CO-27", "CO", "27", DenialCategory::Eligibility, Severity::Hard,
                            "Coverage terminated", "Patient was not covered on date of service"),
                    ],
                ),
                (
                    DenialCategory::Coding,
                    vec![
                        mk("CO-16", "CO", "16", DenialCategory::Coding, Severity::Soft,
                            "Claim lacks required information", "Missing or invalid procedure code/modifier"),
                    ],
                ),
                (
                    DenialCategory::Timely,
                    vec![
                        mk("CO-29", "CO", "29", DenialCategory::Timely, Severity::Hard,
                            "Timely filing limit expired", "Claim submitted after the payer's filing deadline"),
                    ],
                ),
                (
                    DenialCategory::Duplicate,
                    vec![
                        mk("CO-18", "CO", "18", DenialCategory::Duplicate, Severity::Soft,
                            "Duplicate claim/service", "Exact duplicate of a previously adjudicated claim"),
                    ],
                ),
            ],
        }
    }
}

impl StaticDenialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn all_reasons(&self) -> Vec<&DenialReason> {
        self.by_category.iter().flat_map(|(_, v)| v.iter()).collect()
    }
}

impl DenialReasonCatalog for StaticDenialCatalog {
    fn pick_random(&self, rng: &mut dyn rand::RngCore) -> DenialReason {
        let reasons = self.all_reasons();
        let idx = rng.random_range(0..reasons.len());
        reasons[idx].clone()
    }

    fn pick_by_category(&self, category: DenialCategory, rng: &mut dyn rand::RngCore) -> DenialReason {
        match self.by_category.iter().find(|(c, _)| *c == category) {
            Some((_, reasons)) if !reasons.is_empty() => {
                let idx = rng.random_range(0..reasons.len());
                reasons[idx].clone()
            }
            _ => self.pick_random(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn pick_by_category_stays_in_category() {
        let catalog = StaticDenialCatalog::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let reason = catalog.pick_by_category(DenialCategory::Authorization, &mut rng);
            assert_eq!(reason.category, DenialCategory::Authorization);
        }
    }

    #[test]
    fn pick_random_returns_some_reason() {
        let catalog = StaticDenialCatalog::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let reason = catalog.pick_random(&mut rng);
        assert!(!reason.code.is_empty());
    }
}
