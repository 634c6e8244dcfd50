//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the pipeline. Nothing in
//! this crate reads environment variables while a message is being processed; binaries read the
//! variables and hand the raw values to the `resolve_*` helpers here.

use crate::code_table::CodeTable;
use crate::pipeline::PipelineOptions;
use crate::{PipelineError, PipelineResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    code_table: Arc<CodeTable>,
    options: PipelineOptions,
}

impl CoreConfig {
    pub fn new(code_table: CodeTable, options: PipelineOptions) -> Self {
        Self {
            code_table: Arc::new(code_table),
            options,
        }
    }

    /// Resolve configuration from raw environment values.
    ///
    /// # Arguments
    ///
    /// * `code_table_path` - Value of `LABFLOW_CODE_TABLE`, if set.
    /// * `enrich` - Value of `LABFLOW_ENRICH`, if set.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if the code table cannot be loaded or `enrich` is not a
    /// recognised boolean.
    pub fn from_env_values(
        code_table_path: Option<String>,
        enrich: Option<String>,
    ) -> PipelineResult<Self> {
        let code_table = resolve_code_table(code_table_path.map(PathBuf::from))?;
        let enrich = resolve_enrich(enrich)?;
        Ok(Self::new(code_table, PipelineOptions { enrich }))
    }

    pub fn code_table(&self) -> Arc<CodeTable> {
        Arc::clone(&self.code_table)
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(CodeTable::default(), PipelineOptions::default())
    }
}

/// Load the code table from `override_path`, or use the built-in table when none is given.
pub fn resolve_code_table(override_path: Option<PathBuf>) -> PipelineResult<CodeTable> {
    match override_path {
        Some(path) if !path.as_os_str().is_empty() => CodeTable::load(&path),
        _ => Ok(CodeTable::default()),
    }
}

/// Parse the enrichment flag. Unset or blank means `false`.
pub fn resolve_enrich(raw: Option<String>) -> PipelineResult<bool> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => Err(PipelineError::InvalidInput(format!(
            "LABFLOW_ENRICH must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_to_builtin_table_without_enrichment() {
        let cfg = CoreConfig::from_env_values(None, None).expect("config");
        assert_eq!(*cfg.code_table(), CodeTable::default());
        assert!(!cfg.options().enrich);
    }

    #[test]
    fn loads_override_table() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"- phrase: lactate\n  code: 2524-7\n  unit: mmol/L\n")
            .expect("write");

        let path = file.path().to_string_lossy().into_owned();
        let cfg = CoreConfig::from_env_values(Some(path), Some("TRUE".into())).expect("config");
        assert_eq!(cfg.code_table().rules().len(), 1);
        assert!(cfg.options().enrich);
    }

    #[test]
    fn rejects_non_boolean_enrich_flag() {
        let err = resolve_enrich(Some("maybe".into())).expect_err("not a bool");
        match err {
            PipelineError::InvalidInput(msg) => assert!(msg.contains("maybe")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
        assert!(!resolve_enrich(Some(" ".into())).expect("blank"));
    }

    #[test]
    fn missing_override_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = resolve_code_table(Some(dir.path().join("nope.yaml"))).expect_err("missing");
        assert!(matches!(err, PipelineError::CodeTableRead(_)));
    }
}
