//! Code normalisation table.
//!
//! An ordered list of `(phrase, code, unit)` rules. An observation's display text is matched
//! case-insensitively against each phrase as a substring and the **first** rule that matches
//! wins, so more specific phrases must come before general ones ("diastolic" before "blood
//! pressure"). This is best-effort reconciliation, not a terminology lookup.
//!
//! The table is read-only once built and is shared between pipeline runs behind an `Arc`.

use crate::model::Observation;
use crate::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One normalisation rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeRule {
    /// Lower-case phrase searched for in the display text.
    pub phrase: String,
    /// Canonical code written onto matching observations.
    pub code: String,
    /// Unit used when the observation has none.
    pub unit: String,
}

impl CodeRule {
    fn new(phrase: &str, code: &str, unit: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            code: code.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Ordered code normalisation table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeTable {
    rules: Vec<CodeRule>,
}

impl Default for CodeTable {
    /// Built-in LOINC table.
    fn default() -> Self {
        Self {
            rules: vec![
                CodeRule::new("diastolic", "8462-4", "mmHg"),
                CodeRule::new("systolic", "8480-6", "mmHg"),
                CodeRule::new("blood pressure", "8480-6", "mmHg"),
                CodeRule::new("glucose", "2345-7", "mg/dL"),
                CodeRule::new("hemoglobin", "718-7", "g/dL"),
                CodeRule::new("wbc", "6690-2", "/uL"),
                CodeRule::new("white blood cell", "6690-2", "/uL"),
                CodeRule::new("heart rate", "8867-4", "bpm"),
                CodeRule::new("pulse", "8867-4", "bpm"),
                CodeRule::new("creatinine", "2160-0", "mg/dL"),
            ],
        }
    }
}

impl CodeTable {
    /// Build a table from rules in match order. Phrases are stored lower-cased.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if any rule has an empty phrase or code.
    pub fn new(rules: Vec<CodeRule>) -> PipelineResult<Self> {
        let mut normalised = Vec::with_capacity(rules.len());
        for (index, rule) in rules.into_iter().enumerate() {
            let phrase = rule.phrase.trim().to_lowercase();
            if phrase.is_empty() {
                return Err(PipelineError::InvalidInput(format!(
                    "code table rule {index} has an empty phrase"
                )));
            }
            if rule.code.trim().is_empty() {
                return Err(PipelineError::InvalidInput(format!(
                    "code table rule {index} ('{phrase}') has an empty code"
                )));
            }
            normalised.push(CodeRule {
                phrase,
                code: rule.code.trim().to_string(),
                unit: rule.unit.trim().to_string(),
            });
        }
        Ok(Self { rules: normalised })
    }

    /// Parse a YAML sequence of `{phrase, code, unit}` mappings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CodeTableYaml`] on malformed YAML or unknown keys, and
    /// [`PipelineError::InvalidInput`] for rules [`CodeTable::new`] rejects.
    pub fn from_yaml(text: &str) -> PipelineResult<Self> {
        let rules: Vec<CodeRule> =
            serde_yaml::from_str(text).map_err(PipelineError::CodeTableYaml)?;
        Self::new(rules)
    }

    /// Load a YAML code table from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CodeTableRead`] if the file cannot be read, plus any error from
    /// [`CodeTable::from_yaml`].
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(PipelineError::CodeTableRead)?;
        let table = Self::from_yaml(&text)?;
        tracing::info!(
            path = %path.display(),
            rules = table.rules.len(),
            "loaded code table"
        );
        Ok(table)
    }

    pub fn rules(&self) -> &[CodeRule] {
        &self.rules
    }

    /// First rule whose phrase occurs in `display`, ignoring case.
    pub fn lookup(&self, display: &str) -> Option<&CodeRule> {
        let display = display.to_lowercase();
        self.rules
            .iter()
            .find(|rule| display.contains(rule.phrase.as_str()))
    }

    /// Apply the first matching rule to `observation`.
    ///
    /// The code is overwritten when it differs; the unit is filled only when empty. Returns
    /// `true` when a rule matched.
    pub fn apply(&self, observation: &mut Observation) -> bool {
        let Some(rule) = self.lookup(&observation.display) else {
            return false;
        };

        if observation.code != rule.code {
            tracing::debug!(
                display = %observation.display,
                from = %observation.code,
                to = %rule.code,
                "normalised observation code"
            );
            observation.code = rule.code.clone();
        }
        if observation.unit.is_empty() {
            observation.unit = rule.unit.clone();
        }
        true
    }
}
