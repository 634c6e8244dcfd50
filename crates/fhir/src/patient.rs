//! FHIR-aligned Patient resource model.
//!
//! Responsibilities:
//! - Define the Patient shape carried in a lab result bundle
//! - Map administrative gender to and from its wire vocabulary
//! - Enforce the non-empty identifier rule on construction and parse
//!
//! Notes:
//! - Only the members a lab result message can populate are modelled
//! - Optional members are omitted from JSON when empty

use crate::{FhirError, FhirResult, HumanName};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Administrative gender vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdministrativeGender {
    Male,
    Female,
    Other,
    Unknown,
}

impl AdministrativeGender {
    /// Convert to FHIR wire format string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdministrativeGender::Male => "male",
            AdministrativeGender::Female => "female",
            AdministrativeGender::Other => "other",
            AdministrativeGender::Unknown => "unknown",
        }
    }
}

/// Patient resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientResource {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(rename = "birthDate", default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<AdministrativeGender>,
}

impl PatientResource {
    /// Create a patient with only an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if `id` is empty or whitespace.
    pub fn new(id: impl Into<String>) -> FhirResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FhirError::InvalidInput(
                "Patient id cannot be empty".into(),
            ));
        }

        Ok(Self {
            id,
            name: Vec::new(),
            birth_date: None,
            gender: None,
        })
    }

    /// Add a name block built from non-empty parts.
    ///
    /// Nothing is added when both `family` and `given` are empty.
    pub fn with_name(mut self, family: &str, given: &str) -> Self {
        let family = Some(family.trim()).filter(|s| !s.is_empty());
        let given: Vec<String> = Some(given.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .into_iter()
            .collect();

        if family.is_some() || !given.is_empty() {
            self.name.push(HumanName {
                family: family.map(str::to_string),
                given,
            });
        }
        self
    }

    pub fn with_birth_date(mut self, birth_date: Option<String>) -> Self {
        self.birth_date = birth_date.filter(|d| !d.is_empty());
        self
    }

    pub fn with_gender(mut self, gender: Option<AdministrativeGender>) -> Self {
        self.gender = gender;
        self
    }

    pub(crate) fn validate(&self) -> FhirResult<()> {
        if self.id.trim().is_empty() {
            return Err(FhirError::InvalidInput(
                "Patient id cannot be empty".into(),
            ));
        }
        Ok(())
    }
}
