use crate::remittance::Remittance;
use crate::schema::PayerClaim;

/// A claim bound to the correlation id assigned at ingestion (§3).
/// Immutable once constructed — the clearinghouse and payer stages
/// only ever read from it.
#[derive(Debug, Clone)]
pub struct ClaimEnvelope {
    pub correlation_id: String,
    pub claim: PayerClaim,
    pub ingested_at: String,
}

impl ClaimEnvelope {
    pub fn new(correlation_id: String, claim: PayerClaim, ingested_at: String) -> Self {
        Self {
            correlation_id,
            claim,
            ingested_at,
        }
    }
}

/// Payload carried on `Q_remittance`.
#[derive(Debug, Clone)]
pub struct RemittanceMessage {
    pub remittance: Remittance,
}

impl RemittanceMessage {
    pub fn new(remittance: Remittance) -> Self {
        Self { remittance }
    }
}
