//! Collection bundle of one Patient and its Observations.
//!
//! A [`Bundle`] is built in one step from a patient and an ordered list of observations, and
//! cannot be modified afterwards. Any change to an observation means building a new bundle.

use crate::{FhirError, FhirResult, ObservationResource, PatientResource};
use serde::{Deserialize, Serialize};

/// Bundle type vocabulary. Only collections are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    Collection,
}

/// A resource carried in a bundle entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient(PatientResource),
    Observation(ObservationResource),
}

impl Resource {
    pub fn id(&self) -> &str {
        match self {
            Resource::Patient(p) => &p.id,
            Resource::Observation(o) => &o.id,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            Resource::Patient(_) => "Patient",
            Resource::Observation(_) => "Observation",
        }
    }
}

/// One bundle entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl")]
    full_url: String,
    resource: Resource,
}

impl BundleEntry {
    fn new(resource: Resource) -> Self {
        Self {
            full_url: format!("urn:uuid:{}-{}", resource.resource_type(), resource.id()),
            resource,
        }
    }

    pub fn full_url(&self) -> &str {
        &self.full_url
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

/// Collection bundle: entry 0 is the Patient, entries 1.. are Observations in source order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    resource_type: String,
    #[serde(rename = "type")]
    bundle_type: BundleType,
    entry: Vec<BundleEntry>,
}

impl Bundle {
    /// Assemble a collection bundle.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if:
    /// - the patient or any observation fails validation,
    /// - an observation's subject does not reference the patient,
    /// - two entries of the same resource type share a local id.
    pub fn collection(
        patient: PatientResource,
        observations: Vec<ObservationResource>,
    ) -> FhirResult<Self> {
        let mut entry = Vec::with_capacity(observations.len() + 1);
        entry.push(BundleEntry::new(Resource::Patient(patient)));
        entry.extend(
            observations
                .into_iter()
                .map(|o| BundleEntry::new(Resource::Observation(o))),
        );

        let bundle = Self {
            resource_type: "Bundle".to_string(),
            bundle_type: BundleType::Collection,
            entry,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Parse a bundle from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `entry[1].resource.status`)
    /// of the failing member when the JSON does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the JSON does not match the bundle schema or contains unknown keys,
    /// - resourceType is not "Bundle",
    /// - the bundle breaks the one-Patient/subject-reference rules.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let bundle: Bundle = match serde_path_to_error::deserialize(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };

        if bundle.resource_type != "Bundle" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Bundle', got '{}'",
                bundle.resource_type
            )));
        }

        bundle.validate()?;
        Ok(bundle)
    }

    /// Render the bundle as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidJson`] if serialisation fails.
    pub fn render(&self) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn bundle_type(&self) -> BundleType {
        self.bundle_type
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entry
    }

    /// The bundle's single patient.
    pub fn patient(&self) -> Option<&PatientResource> {
        self.entry.iter().find_map(|e| match &e.resource {
            Resource::Patient(p) => Some(p),
            _ => None,
        })
    }

    /// Observations in entry order.
    pub fn observations(&self) -> impl Iterator<Item = &ObservationResource> {
        self.entry.iter().filter_map(|e| match &e.resource {
            Resource::Observation(o) => Some(o),
            _ => None,
        })
    }

    fn validate(&self) -> FhirResult<()> {
        let patients: Vec<&PatientResource> = self
            .entry
            .iter()
            .filter_map(|e| match &e.resource {
                Resource::Patient(p) => Some(p),
                _ => None,
            })
            .collect();

        let patient = match patients.as_slice() {
            [only] => *only,
            other => {
                return Err(FhirError::InvalidInput(format!(
                    "Bundle must contain exactly one Patient, found {}",
                    other.len()
                )))
            }
        };
        patient.validate()?;

        let subject = format!("Patient/{}", patient.id);
        let mut seen = std::collections::HashSet::new();

        for entry in &self.entry {
            let key = (entry.resource.resource_type(), entry.resource.id());
            if !seen.insert(key) {
                return Err(FhirError::InvalidInput(format!(
                    "Duplicate entry id '{}/{}'",
                    key.0, key.1
                )));
            }

            if let Resource::Observation(obs) = &entry.resource {
                obs.validate()?;
                if obs.subject.reference != subject {
                    return Err(FhirError::InvalidInput(format!(
                        "Observation '{}' subject '{}' does not resolve to {subject}",
                        obs.id, obs.subject.reference
                    )));
                }
            }
        }

        Ok(())
    }
}
