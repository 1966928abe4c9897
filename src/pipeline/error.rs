use crate::export::ExportError;
use crate::harmonize::HarmonizationError;
use crate::ingest::ParseError;
use crate::mapping::MappingError;
use crate::validator::ValidationError;

use super::Uploaded;

/// Errors that end a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The upload could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The mapping could not be confirmed
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Harmonization could not run
    #[error("Harmonization error: {0}")]
    Harmonization(#[from] HarmonizationError),

    /// Validation could not run
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The bundle could not be built
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// A mapping the operator has to fix; the uploaded run is handed back
#[derive(Debug, thiserror::Error)]
#[error("Mapping rejected for run {}: {error}", .run.run_id())]
pub struct MappingRejected {
    /// The run, still at the upload stage
    pub run: Box<Uploaded>,
    /// Why confirmation failed
    pub error: MappingError,
}

impl From<MappingRejected> for PipelineError {
    fn from(rejected: MappingRejected) -> Self {
        PipelineError::Mapping(rejected.error)
    }
}
