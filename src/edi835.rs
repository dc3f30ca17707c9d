//! Bundled `Edi835Encoder` adapter.

use crate::ports::Edi835Encoder;
use crate::remittance::{LineStatus, Remittance};
use crate::schema::PayerClaim;

/// Renders a remittance as a readable plaintext summary in the shape of
/// an EDI 835 remittance advice (ISA/CLP/SVC-like line grouping) without
/// byte-exact X12 segment encoding — full X12 support is out of scope (§1).
#[derive(Debug, Default, Clone)]
pub struct PlaintextEdi835Encoder;

impl Edi835Encoder for PlaintextEdi835Encoder {
    fn encode(
        &self,
        remittance: &Remittance,
        claim: &PayerClaim,
        payer_name: &str,
        payer_contact: Option<&str>,
    ) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "ISA*{}*{}~\n",
            payer_name,
            payer_contact.unwrap_or("N/A"),
        ));
        out.push_str(&format!(
            "CLP*{}*{:?}*{:.2}*{:.2}*{:.2}*{}*{}~\n",
            remittance.claim_id,
            remittance.overall_status,
            remittance.claim_billed(),
            remittance.claim_paid(),
            remittance.claim_patient_share(),
            remittance.payer_id,
            remittance.correlation_id,
        ));
        out.push_str(&format!(
            "NM1*{} {}*{}~\n",
            claim.patient.first_name, claim.patient.last_name, claim.insurance.patient_member_id,
        ));
        for line in &remittance.remittance_lines {
            out.push_str(&format!(
                "SVC*{}*{:.2}*{:.2}*{:?}~\n",
                line.service_line_id, line.billed_amount, line.payer_paid, line.status
            ));
            if matches!(line.status, LineStatus::Denied) {
                if let Some(denial) = &line.denial_info {
                    out.push_str(&format!(
                        "CAS*{}*{}*{:.2}~\n",
                        denial.group_code, denial.reason_code, line.not_allowed
                    ));
                }
            }
        }
        out
    }
}
