use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Funding authority record: organization details, billing contact, invoice
/// configuration and the CM2000 exchange settings. Form-backed; the only
/// invariant is that required fields are present before a write goes out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorityData {
    pub id: Option<String>,
    pub name: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub invoice: InvoiceSettings,
    pub cm2000: Cm2000Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceSettings {
    pub payment_terms_days: Option<u32>,
    pub invoice_email: String,
    pub purchase_order_required: bool,
    pub purchase_order_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cm2000Settings {
    pub enabled: bool,
    pub provider_reference: Option<String>,
}

impl AuthorityData {
    /// Required-field validation, run before insert/update. First missing
    /// field wins; the message is what the caller surfaces.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("authority name is required"));
        }
        if self.contact_name.trim().is_empty() {
            return Err(AppError::validation("contact name is required"));
        }
        if self.contact_email.trim().is_empty() {
            return Err(AppError::validation("contact email is required"));
        }
        if self.invoice.invoice_email.trim().is_empty() {
            return Err(AppError::validation("invoice email is required"));
        }
        if self.cm2000.enabled
            && self
                .cm2000
                .provider_reference
                .as_deref()
                .map_or(true, |r| r.trim().is_empty())
        {
            return Err(AppError::validation(
                "CM2000 provider reference is required when CM2000 is enabled",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> AuthorityData {
        AuthorityData {
            id: None,
            name: "West Council".to_string(),
            contact_name: "A. Ladd".to_string(),
            contact_email: "a.ladd@example.org".to_string(),
            contact_phone: None,
            address: None,
            invoice: InvoiceSettings {
                payment_terms_days: Some(30),
                invoice_email: "billing@example.org".to_string(),
                purchase_order_required: false,
                purchase_order_number: None,
            },
            cm2000: Cm2000Settings::default(),
        }
    }

    #[test]
    fn valid_record_passes() {
        assert!(filled().validate().is_ok());
    }

    #[test]
    fn missing_name_blocks_submission() {
        let mut record = filled();
        record.name = "  ".to_string();
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn cm2000_requires_reference_only_when_enabled() {
        let mut record = filled();
        record.cm2000.enabled = true;
        assert!(record.validate().is_err());
        record.cm2000.provider_reference = Some("CM-4471".to_string());
        assert!(record.validate().is_ok());
    }
}
