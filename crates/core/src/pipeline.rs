//! Pipeline entry point: raw message text to entities, bundle and summary.

use crate::bundle::build_bundle;
use crate::code_table::CodeTable;
use crate::config::CoreConfig;
use crate::model::{Observation, Patient};
use crate::summary::{clinical_summary, requires_enrichment};
use crate::{mapper, PipelineResult};
use er7::{Header, Message};
use fhir::Bundle;
use serde::Serialize;
use std::sync::Arc;

/// Per-call options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Caller's enrichment request. Carried for the caller's benefit; the core always returns
    /// its deterministic mapping and never enriches.
    pub enrich: bool,
}

/// Everything one pipeline run produces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub header: Header,
    pub patient: Patient,
    pub observations: Vec<Observation>,
    pub bundle: Bundle,
    pub summary: String,
    pub requires_enrichment: bool,
}

/// Lab result pipeline.
///
/// Holds only the read-only code table, so one instance can be shared across connections and
/// threads; each run owns the entities it creates.
#[derive(Clone, Debug, Default)]
pub struct ResultPipeline {
    code_table: Arc<CodeTable>,
}

impl ResultPipeline {
    pub fn new(code_table: Arc<CodeTable>) -> Self {
        Self { code_table }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.code_table())
    }

    pub fn code_table(&self) -> &CodeTable {
        &self.code_table
    }

    /// Run the full pipeline over one message.
    ///
    /// Steps: tokenise and read the header, map the patient and observations, normalise codes
    /// against the code table, build the bundle and the summary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PipelineError::Er7`] when the header is malformed and
    /// [`crate::PipelineError::Fhir`] when the bundle cannot be assembled.
    pub fn run(&self, text: &str, options: &PipelineOptions) -> PipelineResult<PipelineOutput> {
        let message = Message::parse(text)?;
        let header = message.header();

        if options.enrich {
            tracing::debug!(
                control_id = header.control_id(),
                "enrichment requested; returning deterministic mapping only"
            );
        }

        let patient = mapper::map_patient(&message);
        let mut observations = mapper::map_observations(&message);
        for observation in &mut observations {
            self.code_table.apply(observation);
        }

        let bundle = build_bundle(&patient, &observations)?;
        let summary = clinical_summary(&observations);
        let requires_enrichment = requires_enrichment(&observations);

        tracing::debug!(
            control_id = header.control_id(),
            patient_id = %patient.id,
            observations = observations.len(),
            requires_enrichment,
            "mapped message"
        );

        Ok(PipelineOutput {
            header,
            patient,
            observations,
            bundle,
            summary,
            requires_enrichment,
        })
    }
}
