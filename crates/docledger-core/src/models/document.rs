use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::content::StorageReference;

/// Numeric document-type code understood by the registry contract (`uint8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentType(pub u8);

impl DocumentType {
    pub fn code(&self) -> u8 {
        self.0
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map(DocumentType)
            .map_err(|_| anyhow::anyhow!("Invalid document type code: {}", s))
    }
}

impl Display for DocumentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// User-entered registration fields, before a storage reference exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub receiver_address: String,
    pub document_name: String,
    pub description: String,
    pub document_type: Option<DocumentType>,
}

impl RegistrationForm {
    pub fn new(
        receiver_address: impl Into<String>,
        document_name: impl Into<String>,
        description: impl Into<String>,
        document_type: DocumentType,
    ) -> Self {
        Self {
            receiver_address: receiver_address.into(),
            document_name: document_name.into(),
            description: description.into(),
            document_type: Some(document_type),
        }
    }

    /// Names of required fields that are empty or absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.receiver_address.trim().is_empty() {
            missing.push("receiver_address");
        }
        if self.document_name.trim().is_empty() {
            missing.push("document_name");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.document_type.is_none() {
            missing.push("document_type");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Payload of one `registerDocument` transaction.
///
/// Only constructible with all five fields present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    receiver_address: String,
    document_name: String,
    description: String,
    storage_reference: StorageReference,
    document_type: DocumentType,
}

impl RegistrationRecord {
    /// Combine a completed form with a published storage reference.
    ///
    /// Returns `None` if any field is empty or absent.
    pub fn from_form(form: &RegistrationForm, reference: &StorageReference) -> Option<Self> {
        if !form.is_complete() || reference.is_empty() {
            return None;
        }
        Some(Self {
            receiver_address: form.receiver_address.trim().to_string(),
            document_name: form.document_name.clone(),
            description: form.description.clone(),
            storage_reference: reference.clone(),
            document_type: form.document_type?,
        })
    }

    pub fn receiver_address(&self) -> &str {
        &self.receiver_address
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn storage_reference(&self) -> &StorageReference {
        &self.storage_reference
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }
}

/// A registration as stored on the ledger, returned by lookup-by-title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_name: String,
    pub storage_reference: StorageReference,
    /// Block timestamp of registration, in seconds since the Unix epoch
    pub creation_date: u64,
    pub document_type: DocumentType,
    pub issued: bool,
}

impl DocumentRecord {
    /// Registration time, if the stored timestamp is representable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.creation_date)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> RegistrationForm {
        RegistrationForm::new(
            "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4",
            "Vaccine Record",
            "2nd dose",
            DocumentType(2),
        )
    }

    #[test]
    fn complete_form_has_no_missing_fields() {
        assert!(complete_form().is_complete());
    }

    #[test]
    fn whitespace_only_fields_count_as_missing() {
        let mut form = complete_form();
        form.document_name = "   ".to_string();
        form.document_type = None;
        assert_eq!(form.missing_fields(), vec!["document_name", "document_type"]);
    }

    #[test]
    fn record_requires_every_field() {
        let reference = StorageReference::new("cid-123");
        let record = RegistrationRecord::from_form(&complete_form(), &reference).unwrap();
        assert_eq!(record.document_type(), DocumentType(2));
        assert_eq!(record.storage_reference().as_str(), "cid-123");

        assert!(RegistrationRecord::from_form(&complete_form(), &StorageReference::new("")).is_none());

        let mut form = complete_form();
        form.description.clear();
        assert!(RegistrationRecord::from_form(&form, &reference).is_none());
    }

    #[test]
    fn creation_date_converts_to_utc() {
        let record = DocumentRecord {
            document_name: "Diploma".to_string(),
            storage_reference: StorageReference::new("cid-123"),
            creation_date: 1_700_000_000,
            document_type: DocumentType(1),
            issued: true,
        };
        assert_eq!(
            record.created_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );

        let far_future = DocumentRecord {
            creation_date: u64::MAX,
            ..record
        };
        assert!(far_future.created_at().is_none());
    }

    #[test]
    fn document_type_parses_u8_codes() {
        assert_eq!("2".parse::<DocumentType>().unwrap(), DocumentType(2));
        assert!("256".parse::<DocumentType>().is_err());
        assert!("x-ray".parse::<DocumentType>().is_err());
    }
}
