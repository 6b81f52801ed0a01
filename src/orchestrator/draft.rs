//! Per-composition builder returned by `MessageOrchestrator::for_type`

use serde::Serialize;

use super::{MessageOrchestrator, OrchestratorError, OrchestratorResult, OrchestratorState, StateTrace};
use crate::message::{OutboundMessage, ResolvedMessage};
use crate::metrics::CompositionMetrics;
use crate::pipeline::{PersonalizationPipeline, PipelineValue};
use crate::template::{CatalogError, TemplateEngine};

/// A message being composed: the selected type plus its own pipeline.
///
/// Binding methods consume and return the draft; `build_message` consumes it
/// for good.
pub struct MessageDraft<'a> {
    orchestrator: &'a MessageOrchestrator,
    message_type: String,
    pipeline: PersonalizationPipeline,
    state: OrchestratorState,
}

impl<'a> MessageDraft<'a> {
    pub(super) fn new(orchestrator: &'a MessageOrchestrator, message_type: String) -> Self {
        Self {
            orchestrator,
            message_type,
            pipeline: PersonalizationPipeline::new(),
            state: OrchestratorState::TypeSelected,
        }
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn pipeline(&self) -> &PersonalizationPipeline {
        &self.pipeline
    }

    /// Bind `value` under `name`
    pub fn map(
        mut self,
        name: impl Into<String>,
        value: impl Into<PipelineValue>,
    ) -> OrchestratorResult<Self> {
        self.pipeline.map(name, value)?;
        self.state = OrchestratorState::Bound;
        Ok(self)
    }

    /// Bind a serializable value; its fields become token properties
    pub fn map_serialized<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> OrchestratorResult<Self> {
        self.pipeline.map_serialized(name, value)?;
        self.state = OrchestratorState::Bound;
        Ok(self)
    }

    /// Bind each pair in order
    pub fn map_range<I, K, V>(mut self, pairs: I) -> OrchestratorResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PipelineValue>,
    {
        self.pipeline.map_range(pairs)?;
        self.state = OrchestratorState::Bound;
        Ok(self)
    }

    /// Compose the outbound message for `recipients`
    pub fn build_message(self, recipients: &[&str]) -> OrchestratorResult<OutboundMessage> {
        self.build_message_with_cc(recipients, &[])
    }

    /// Compose for a single address, rejecting a blank one
    pub fn build_message_to(
        self,
        address: &str,
        cc: Option<&str>,
    ) -> OrchestratorResult<OutboundMessage> {
        if address.trim().is_empty() {
            return Err(OrchestratorError::InvalidArgument(
                "Recipient address must not be blank".to_string(),
            ));
        }
        let cc: Vec<&str> = cc.into_iter().collect();
        self.build_message_with_cc(&[address], &cc)
    }

    /// Compose the outbound message for `recipients`, copying `cc`.
    ///
    /// A missing template does not fail composition: subject and body stay
    /// empty. An empty recipient list always fails.
    pub fn build_message_with_cc(
        self,
        recipients: &[&str],
        cc: &[&str],
    ) -> OrchestratorResult<OutboundMessage> {
        if recipients.is_empty() {
            return Err(OrchestratorError::InvalidArgument(
                "At least one recipient is required".to_string(),
            ));
        }

        let orchestrator = self.orchestrator;
        let mut trace = StateTrace::starting_at(self.state);
        if trace.current() == OrchestratorState::TypeSelected {
            trace.advance(OrchestratorState::Bound);
        }

        let resolved = match orchestrator
            .catalog
            .select(&self.message_type, &orchestrator.locale)
        {
            Ok(record) => {
                CompositionMetrics::record_resolved();
                let mut resolved = TemplateEngine::new(record, &self.pipeline).resolve();
                orchestrator.decorations.apply(&mut resolved.body);
                resolved
            }
            Err(CatalogError::NotFound(message_type)) => {
                tracing::warn!(
                    message_type = %message_type,
                    locale = %orchestrator.locale,
                    "No template loaded for message type, composing without subject and body"
                );
                CompositionMetrics::record_degraded();
                ResolvedMessage::default()
            }
            Err(err) => return Err(err.into()),
        };

        let recipients: Vec<String> = match orchestrator.catalog.recipient_override().active_address() {
            Some(address) => {
                tracing::debug!(
                    requested = recipients.len(),
                    "Recipient override active, redirecting message"
                );
                vec![address.to_string()]
            }
            None => recipients.iter().map(|r| r.to_string()).collect(),
        };

        let cc_recipients = cc
            .iter()
            .filter(|address| !address.trim().is_empty())
            .map(|address| address.to_string())
            .collect();

        let message = OutboundMessage::new(
            self.message_type,
            resolved,
            orchestrator.sender.clone(),
            recipients,
            cc_recipients,
        );
        trace.advance(OrchestratorState::Composed);

        tracing::debug!(
            message_id = %message.message_id(),
            message_type = %message.message_type(),
            recipients = message.recipients().len(),
            is_html = message.is_html(),
            "Message composed"
        );

        Ok(message)
    }
}
