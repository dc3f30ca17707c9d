use serde::{Deserialize, Serialize};

/// The root struct for a claim submitted into the pipeline.
///
/// `insurance.payer_id` is the routing key the clearinghouse resolves
/// against the configured payer set (§4.E); everything else is carried
/// through to adjudication and billing without mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayerClaim {
    pub claim_id: String,
    pub place_of_service_code: u32,
    pub insurance: Insurance,
    pub patient: Patient,
    pub organization: Organization,
    pub rendering_provider: Provider,
    pub service_lines: Vec<ServiceLine>,
}

impl PayerClaim {
    /// `Σ unit_charge_amount × units` across all service lines.
    pub fn billed_total(&self) -> f64 {
        self.service_lines.iter().map(ServiceLine::billed).sum()
    }

    pub fn payer_id(&self) -> &str {
        &self.insurance.payer_id
    }

    /// Schema validation enforced by the external `ClaimSource` (§6):
    /// required identity fields present and at least one service line,
    /// each with its own required identity fields.
    pub fn validate(&self) -> Result<(), String> {
        if self.claim_id.trim().is_empty() {
            return Err("claim_id is required".to_string());
        }
        if self.patient.first_name.trim().is_empty() || self.patient.last_name.trim().is_empty() {
            return Err("patient first_name/last_name are required".to_string());
        }
        if self.insurance.payer_id.trim().is_empty() {
            return Err("insurance.payer_id is required".to_string());
        }
        if self.service_lines.is_empty() {
            return Err("claim must have at least one service line".to_string());
        }
        for line in &self.service_lines {
            if line.service_line_id.trim().is_empty() {
                return Err("service_line_id is required".to_string());
            }
            if line.unit_charge_amount < 0.0 {
                return Err(format!(
                    "service line {} has negative unit_charge_amount",
                    line.service_line_id
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insurance {
    pub payer_id: String,
    pub patient_member_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub dob: String,
    pub email: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub billing_npi: Option<String>,
    pub ein: Option<String>,
    pub contact: Option<Contact>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub first_name: String,
    pub last_name: String,
    pub npi: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLine {
    pub service_line_id: String,
    pub procedure_code: String,
    pub units: u32,
    pub details: String,
    pub unit_charge_currency: String,
    pub unit_charge_amount: f64,
    pub modifiers: Option<Vec<String>>,
    pub do_not_bill: Option<bool>,
}

impl ServiceLine {
    pub fn billed(&self) -> f64 {
        self.unit_charge_amount * self.units as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::from_str;

    #[test]
    fn test_schema() {
        let json = r#"
        {
            "claim_id": "abc123",
            "place_of_service_code": 11,
            "insurance": {
                "payer_id": "medicare",
                "patient_member_id": "pmid456"
            },
            "patient": {
                "first_name": "Jane",
                "last_name": "Doe",
                "gender": "f",
                "dob": "1990-01-01",
                "email": "jane.doe@example.com",
                "address": {
                    "street": "123 Main St",
                    "city": "Metropolis",
                    "state": "NY",
                    "zip": "12345",
                    "country": "USA"
                }
            },
            "organization": {
                "name": "Health Inc",
                "billing_npi": "9876543210",
                "ein": "12-3456789",
                "contact": {
                    "first_name": "Bob",
                    "last_name": "Jones",
                    "phone_number": "555-1234"
                },
                "address": {
                    "street": "456 Health Ave",
                    "city": "Gotham",
                    "state": "CA",
                    "zip": "67890",
                    "country": "USA"
                }
            },
            "rendering_provider": {
                "first_name": "Alice",
                "last_name": "Smith",
                "npi": "1234567890"
            },
            "service_lines": [
                {
                    "service_line_id": "sl1",
                    "procedure_code": "99213",
                    "units": 1,
                    "details": "Office visit",
                    "unit_charge_currency": "USD",
                    "unit_charge_amount": 150.0,
                    "modifiers": ["A1", "B2"],
                    "do_not_bill": true
                }
            ]
        }
        "#;

        let claim: PayerClaim = from_str(json).expect("Failed to parse JSON");
        assert_eq!(claim.claim_id, "abc123");
        assert_eq!(claim.insurance.payer_id, "medicare");
        assert_eq!(claim.service_lines.len(), 1);
        assert_eq!(claim.billed_total(), 150.0);
    }

    #[test]
    fn test_validate_rejects_empty_service_lines() {
        let mut claim = crate::fixtures::mock_claim();
        claim.service_lines.clear();
        assert!(claim.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_payer() {
        let mut claim = crate::fixtures::mock_claim();
        claim.insurance.payer_id = "".to_string();
        assert!(claim.validate().is_err());
    }
}
