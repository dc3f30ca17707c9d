//! Remittance data model and the adjudication arithmetic invariants
//! (§3, §4.F, §8 properties 1-4).

use serde::{Deserialize, Serialize};

use crate::denial::DenialReason;

/// Three-cent tolerance for floating point rounding (§3, §9 — load-bearing,
/// do not tighten).
pub const RECONCILIATION_TOLERANCE: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStatus {
    Approved,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemittanceStatus {
    Approved,
    Denied,
    PartialDenial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceLine {
    pub service_line_id: String,
    pub billed_amount: f64,
    pub payer_paid: f64,
    pub coinsurance: f64,
    pub copay: f64,
    pub deductible: f64,
    pub not_allowed: f64,
    pub status: LineStatus,
    pub denial_info: Option<DenialReason>,
}

impl RemittanceLine {
    pub fn sum_components(&self) -> f64 {
        self.payer_paid + self.coinsurance + self.copay + self.deductible + self.not_allowed
    }

    /// §8 property 1: the six amounts reconcile to the billed amount
    /// within `RECONCILIATION_TOLERANCE`.
    pub fn reconciles(&self) -> bool {
        (self.sum_components() - self.billed_amount).abs() <= RECONCILIATION_TOLERANCE
    }

    /// §8 property 4: a denied line pays nothing and carries the full
    /// billed amount as not-allowed.
    pub fn denial_accounting_holds(&self) -> bool {
        if self.status != LineStatus::Denied {
            return true;
        }
        self.payer_paid == 0.0
            && self.coinsurance == 0.0
            && self.copay == 0.0
            && self.deductible == 0.0
            && (self.not_allowed - self.billed_amount).abs() <= RECONCILIATION_TOLERANCE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remittance {
    pub correlation_id: String,
    pub claim_id: String,
    pub payer_id: String,
    pub remittance_lines: Vec<RemittanceLine>,
    pub processed_at: String,
    pub overall_status: RemittanceStatus,
    pub total_denied_amount: Option<f64>,
    /// EDI-835 text attached at adjudication time (§4.F step 5).
    pub edi835: String,
}

impl Remittance {
    /// §4.F step 4 / §3: APPROVED iff every line approved, DENIED iff
    /// every line denied, else PARTIAL_DENIAL.
    pub fn derive_overall_status(lines: &[RemittanceLine]) -> RemittanceStatus {
        let all_approved = lines.iter().all(|l| l.status == LineStatus::Approved);
        let all_denied = lines.iter().all(|l| l.status == LineStatus::Denied);
        if all_approved {
            RemittanceStatus::Approved
        } else if all_denied {
            RemittanceStatus::Denied
        } else {
            RemittanceStatus::PartialDenial
        }
    }

    pub fn claim_billed(&self) -> f64 {
        self.remittance_lines.iter().map(|l| l.billed_amount).sum()
    }

    pub fn claim_paid(&self) -> f64 {
        self.remittance_lines.iter().map(|l| l.payer_paid).sum()
    }

    pub fn claim_patient_share(&self) -> f64 {
        self.remittance_lines
            .iter()
            .map(|l| l.copay + l.coinsurance + l.deductible)
            .sum()
    }

    pub fn claim_not_allowed(&self) -> f64 {
        self.remittance_lines.iter().map(|l| l.not_allowed).sum()
    }
}

/// Round to the nearest cent, half-away-from-zero (§4.F step 3).
pub fn round_cents(amount: f64) -> f64 {
    if amount >= 0.0 {
        (amount * 100.0 + 0.5).floor() / 100.0
    } else {
        (amount * 100.0 - 0.5).ceil() / 100.0
    }
}

/// Re-balance six rounded amounts back onto `billed` when cent-rounding
/// drifted the sum outside tolerance (§9): absorb the residual into
/// `not_allowed` first, clamping at zero; if that still leaves a deficit,
/// push the remainder into `payer_paid`.
pub fn rebalance(
    billed: f64,
    payer_paid: f64,
    coinsurance: f64,
    copay: f64,
    deductible: f64,
    not_allowed: f64,
) -> (f64, f64, f64, f64, f64) {
    let sum = payer_paid + coinsurance + copay + deductible + not_allowed;
    let residual = billed - sum;
    if residual.abs() <= RECONCILIATION_TOLERANCE {
        return (payer_paid, coinsurance, copay, deductible, not_allowed);
    }
    let adjusted_not_allowed = not_allowed + residual;
    if adjusted_not_allowed >= 0.0 {
        return (
            payer_paid,
            coinsurance,
            copay,
            deductible,
            round_cents(adjusted_not_allowed),
        );
    }
    // Absorbing entirely into not_allowed would go negative — push the
    // remaining deficit into payer_paid instead, clamping not_allowed at 0.
    let deficit = -adjusted_not_allowed;
    let adjusted_payer_paid = (payer_paid + residual + deficit).max(0.0);
    (
        round_cents(adjusted_payer_paid),
        coinsurance,
        copay,
        deductible,
        0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_cents_half_away_from_zero() {
        assert_eq!(round_cents(1.005), 1.01);
        assert_eq!(round_cents(-1.005), -1.01);
        assert_eq!(round_cents(1.004), 1.0);
    }

    #[test]
    fn rebalance_noop_within_tolerance() {
        let (pp, ci, cp, dd, na) = rebalance(100.0, 80.0, 10.0, 5.0, 3.0, 2.0);
        assert_eq!((pp, ci, cp, dd, na), (80.0, 10.0, 5.0, 3.0, 2.0));
    }

    #[test]
    fn rebalance_absorbs_residual_into_not_allowed() {
        let (pp, ci, cp, dd, na) = rebalance(100.0, 80.0, 10.0, 5.0, 3.0, 1.90);
        assert_eq!((pp, ci, cp, dd), (80.0, 10.0, 5.0, 3.0));
        assert!((na - 2.10).abs() < 1e-9);
    }

    #[test]
    fn rebalance_pushes_deficit_into_payer_paid_when_not_allowed_would_go_negative() {
        let (pp, ci, cp, dd, na) = rebalance(100.0, 80.0, 10.0, 5.0, 3.0, -5.0);
        assert_eq!(na, 0.0);
        assert!((pp - 93.0).abs() < 1e-6);
        assert_eq!((ci, cp, dd), (10.0, 5.0, 3.0));
    }

    #[test]
    fn overall_status_derivation() {
        let approved = RemittanceLine {
            service_line_id: "a".into(),
            billed_amount: 10.0,
            payer_paid: 8.0,
            coinsurance: 1.0,
            copay: 1.0,
            deductible: 0.0,
            not_allowed: 0.0,
            status: LineStatus::Approved,
            denial_info: None,
        };
        let denied = RemittanceLine {
            status: LineStatus::Denied,
            not_allowed: 10.0,
            payer_paid: 0.0,
            coinsurance: 0.0,
            copay: 0.0,
            deductible: 0.0,
            ..approved.clone()
        };
        assert_eq!(
            Remittance::derive_overall_status(&[approved.clone(), approved.clone()]),
            RemittanceStatus::Approved
        );
        assert_eq!(
            Remittance::derive_overall_status(&[denied.clone(), denied.clone()]),
            RemittanceStatus::Denied
        );
        assert_eq!(
            Remittance::derive_overall_status(&[approved, denied]),
            RemittanceStatus::PartialDenial
        );
    }
}
