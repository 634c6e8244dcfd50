//! Message handling and acknowledgement policy.

use crate::MAX_ACK_TEXT_CHARS;
use er7::escape::escaped_prefix;
use er7::{ack, AckCode, Header};
use labflow_core::{PipelineOptions, PipelineResult, ResultPipeline};

/// Processes one framed message.
///
/// Implementations must be safe to call from many connection tasks at once.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, message: &str) -> PipelineResult<()>;
}

/// Runs each message through a [`ResultPipeline`] with fixed options.
#[derive(Clone, Debug, Default)]
pub struct PipelineHandler {
    pipeline: ResultPipeline,
    options: PipelineOptions,
}

impl PipelineHandler {
    pub fn new(pipeline: ResultPipeline, options: PipelineOptions) -> Self {
        Self { pipeline, options }
    }
}

impl MessageHandler for PipelineHandler {
    fn handle(&self, message: &str) -> PipelineResult<()> {
        let output = self.pipeline.run(message, &self.options)?;
        tracing::info!(
            control_id = output.header.control_id(),
            patient_id = %output.patient.id,
            observations = output.observations.len(),
            requires_enrichment = output.requires_enrichment,
            "processed result message"
        );
        Ok(())
    }
}

/// Decide the acknowledgement for one framed message.
///
/// - no usable header, or an empty control id: generic reject, handler not called
/// - handler succeeds: `AA` echoing the control id
/// - handler fails: `AE` with the error text cut so its escaped form fits in
///   [`MAX_ACK_TEXT_CHARS`] characters
pub fn respond<H>(handler: &H, message: &str) -> String
where
    H: MessageHandler + ?Sized,
{
    let header = match Header::parse(message) {
        Ok(header) if !header.control_id().is_empty() => header,
        Ok(_) => {
            tracing::warn!("message has an empty control id, rejecting");
            return ack::generic_reject();
        }
        Err(err) => {
            tracing::warn!(error = %err, "message has no usable header, rejecting");
            return ack::generic_reject();
        }
    };

    match handler.handle(message) {
        Ok(()) => {
            tracing::info!(
                control_id = header.control_id(),
                code = %AckCode::Accept,
                "acknowledging"
            );
            ack::build(&header, AckCode::Accept, None)
        }
        Err(err) => {
            let full = err.to_string();
            let text = escaped_prefix(&full, &header.delimiters(), MAX_ACK_TEXT_CHARS);
            tracing::info!(
                control_id = header.control_id(),
                code = %AckCode::Error,
                error = %full,
                "acknowledging with error"
            );
            ack::build(&header, AckCode::Error, Some(text))
        }
    }
}
