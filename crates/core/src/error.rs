#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Er7(#[from] er7::Er7Error),
    #[error("bundle error: {0}")]
    Fhir(#[from] fhir::FhirError),
    #[error("failed to read code table: {0}")]
    CodeTableRead(std::io::Error),
    #[error("failed to deserialize code table YAML: {0}")]
    CodeTableYaml(serde_yaml::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
