//! Message orchestration: select a template, bind values, compose, dispatch.
//!
//! ```ignore
//! let mut orchestrator = MessageOrchestrator::new(catalog, transport, connection, sender);
//! orchestrator.subscribe(Arc::new(EventLog::new()));
//!
//! let message = orchestrator
//!     .for_type("Welcome")?
//!     .map("User", json!({"Name": "Ada"}))?
//!     .build_message(&["ada@example.com"])?;
//!
//! orchestrator.dispatch(message).await?;
//! ```
//!
//! Each `for_type` call starts a fresh draft with its own pipeline. Drafts
//! are threaded by value, so nothing leaks between compositions. The
//! orchestrator itself is meant for one logical flow; the catalog it holds is
//! shared read-only.

mod draft;
mod observer;
mod state;

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::{system_locale, Settings};
use crate::message::{DeliveryOutcome, OutboundMessage, SenderIdentity};
use crate::metrics::DeliveryMetrics;
use crate::pipeline::PipelineError;
use crate::telemetry::attributes;
use crate::template::{CatalogError, TemplateCatalog};
use crate::transport::{ConnectionParams, MailTransport, TransportError};

pub use draft::MessageDraft;
pub use observer::{DeliveryEvent, DeliveryObserver, EventLog};
pub use state::OrchestratorState;

pub(crate) use state::StateTrace;

/// Orchestrator error type
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Delivery failed: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: TransportError,
    },
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Callback invoked once per link of a transport error chain
pub type ErrorLogger = Arc<dyn Fn(&str, &(dyn StdError + 'static)) + Send + Sync>;

const DISPATCH_ERROR_CONTEXT: &str = "Error sending email";

fn log_with_tracing(context: &str, err: &(dyn StdError + 'static)) {
    tracing::error!(error = %err, "{}", context);
}

/// Text appended to every composed body
#[derive(Debug, Clone, Default)]
pub(crate) struct BodyDecorations {
    signature: Option<String>,
    footer: Option<String>,
}

impl BodyDecorations {
    pub(crate) fn apply(&self, body: &mut String) {
        if let Some(signature) = &self.signature {
            body.push_str(&format!("<p>{}</p>", signature));
        }
        if let Some(footer) = &self.footer {
            body.push_str(footer);
        }
    }
}

/// Turns a message type plus bound values into a delivered message
pub struct MessageOrchestrator {
    catalog: Arc<TemplateCatalog>,
    transport: Arc<dyn MailTransport>,
    connection: ConnectionParams,
    sender: SenderIdentity,
    decorations: BodyDecorations,
    locale: String,
    observers: Vec<Arc<dyn DeliveryObserver>>,
    error_logger: ErrorLogger,
}

impl MessageOrchestrator {
    /// Create an orchestrator using the system locale
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        transport: Arc<dyn MailTransport>,
        connection: ConnectionParams,
        sender: SenderIdentity,
    ) -> Self {
        Self {
            catalog,
            transport,
            connection,
            sender,
            decorations: BodyDecorations::default(),
            locale: system_locale(),
            observers: Vec::new(),
            error_logger: Arc::new(log_with_tracing),
        }
    }

    /// Create an orchestrator from loaded settings
    pub fn from_settings(
        settings: &Settings,
        catalog: Arc<TemplateCatalog>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let mut orchestrator = Self::new(
            catalog,
            transport,
            settings.smtp.connection_params(),
            settings.sender.clone(),
        )
        .with_locale(settings.mail.locale());

        if let Some(signature) = &settings.mail.signature {
            orchestrator = orchestrator.use_signature(signature.clone());
        }
        if let Some(footer) = &settings.mail.footer {
            orchestrator = orchestrator.with_footer(footer.clone());
        }
        orchestrator
    }

    /// Locale used for template selection
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Force TLS on the transport connection
    pub fn with_tls(mut self) -> Self {
        self.connection.use_tls = true;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.sender.display_name = display_name.into();
        self
    }

    pub fn with_sender_name(mut self, sender_name: impl Into<String>) -> Self {
        self.sender.sender_name = sender_name.into();
        self
    }

    /// Append `<p>{signature}</p>` to every body
    pub fn use_signature(mut self, signature: impl Into<String>) -> Self {
        self.decorations.signature = Some(signature.into());
        self
    }

    /// Append `footer` to every body, after the signature
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.decorations.footer = Some(footer.into());
        self
    }

    /// Replace the per-link error logging callback
    pub fn log_errors_with<F>(mut self, logger: F) -> Self
    where
        F: Fn(&str, &(dyn StdError + 'static)) + Send + Sync + 'static,
    {
        self.error_logger = Arc::new(logger);
        self
    }

    /// Register an observer for subsequent dispatches
    pub fn subscribe(&mut self, observer: Arc<dyn DeliveryObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn connection(&self) -> &ConnectionParams {
        &self.connection
    }

    pub fn sender(&self) -> &SenderIdentity {
        &self.sender
    }

    /// Start composing a message of `message_type` with a fresh pipeline.
    ///
    /// The catalog is not consulted until the message is built.
    pub fn for_type(&self, message_type: impl Into<String>) -> OrchestratorResult<MessageDraft<'_>> {
        let message_type = message_type.into();
        if message_type.is_empty() {
            return Err(OrchestratorError::InvalidArgument(
                "Message type must not be empty".to_string(),
            ));
        }

        tracing::debug!(message_type = %message_type, "Message type selected");
        Ok(MessageDraft::new(self, message_type))
    }

    /// Hand `message` to the transport and notify observers.
    ///
    /// Observers get exactly one of sent/failed, then completed, whatever the
    /// outcome. A transport failure is then returned as
    /// [`OrchestratorError::Transport`] with every causal message joined into
    /// `reason`.
    #[tracing::instrument(
        skip_all,
        fields(
            message_id = %message.message_id(),
            message_type = %message.message_type(),
            transport = self.transport.name()
        )
    )]
    pub async fn dispatch(&self, message: OutboundMessage) -> OrchestratorResult<DeliveryOutcome> {
        let observers = self.observers.clone();
        let mut trace = StateTrace::starting_at(OrchestratorState::Composed);
        trace.advance(OrchestratorState::Dispatched);

        let started = Instant::now();
        let result = self.transport.send(&message, &self.connection).await;

        let (outcome, failure) = match result {
            Ok(server_response) => (DeliveryOutcome::Sent { server_response }, None),
            Err(source) => {
                let reason = self.aggregate_failure(&source);
                (
                    DeliveryOutcome::Failed {
                        reason: reason.clone(),
                    },
                    Some((reason, source)),
                )
            }
        };

        match &outcome {
            DeliveryOutcome::Sent { server_response } => {
                trace.advance(OrchestratorState::Sent);
                tracing::info!(
                    recipients = message.recipients().len(),
                    server_response = %server_response,
                    "Email sent"
                );
                for observer in &observers {
                    observer.on_sent(&message, server_response);
                }
            }
            DeliveryOutcome::Failed { reason } => {
                trace.advance(OrchestratorState::Failed);
                for observer in &observers {
                    observer.on_failed(&message, reason);
                }
            }
        }

        trace.advance(OrchestratorState::Completed);
        for observer in &observers {
            observer.on_completed(&message);
        }

        DeliveryMetrics::record(&outcome, started.elapsed(), observers.len());
        let span = tracing::Span::current();
        for attribute in [
            attributes::message_id(message.message_id()),
            attributes::message_type(message.message_type()),
            attributes::recipient_count(message.recipients().len()),
            attributes::locale(&self.locale),
            attributes::outcome(outcome.label()),
        ] {
            span.set_attribute(attribute.key, attribute.value);
        }

        match failure {
            None => Ok(outcome),
            Some((reason, source)) => Err(OrchestratorError::Transport { reason, source }),
        }
    }

    /// Log every link of the chain and join their messages with spaces
    fn aggregate_failure(&self, err: &TransportError) -> String {
        let mut messages = Vec::new();
        let mut current: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(link) = current {
            (self.error_logger)(DISPATCH_ERROR_CONTEXT, link);
            messages.push(link.to_string());
            current = link.source();
        }
        messages.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{RecipientOverride, TemplateRecord};
    use crate::transport::MemoryTransport;
    use serde_json::json;
    use std::sync::Mutex;

    fn catalog() -> Arc<TemplateCatalog> {
        Arc::new(TemplateCatalog::new(vec![
            TemplateRecord::new("Welcome", "en-US", " Hi {User.Name} ", "Welcome {User.Name}"),
            TemplateRecord::new("Welcome", "fr-FR", "Salut {User.Name}", "Bienvenue {User.Name}")
                .html(),
        ]))
    }

    fn orchestrator_with(
        catalog: Arc<TemplateCatalog>,
        transport: Arc<MemoryTransport>,
    ) -> MessageOrchestrator {
        MessageOrchestrator::new(
            catalog,
            transport,
            ConnectionParams::new("localhost", 1025),
            SenderIdentity::new("noreply@example.com", "Example"),
        )
        .with_locale("de-DE")
    }

    #[test]
    fn test_for_type_rejects_empty_type() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()));
        assert!(matches!(
            orchestrator.for_type(""),
            Err(OrchestratorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_draft_states() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()));
        let draft = orchestrator.for_type("Welcome").unwrap();
        assert_eq!(draft.state(), OrchestratorState::TypeSelected);

        let draft = draft.map("User", json!({"Name": "Ada"})).unwrap();
        assert_eq!(draft.state(), OrchestratorState::Bound);
        assert!(draft.pipeline().has("User"));
    }

    #[test]
    fn test_for_type_starts_fresh_pipeline() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()));
        let _first = orchestrator.for_type("Welcome").unwrap().map("User", "Ada").unwrap();
        let second = orchestrator.for_type("Welcome").unwrap();
        assert!(second.pipeline().is_empty());
    }

    #[test]
    fn test_build_message_falls_back_to_first_template() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()));
        let message = orchestrator
            .for_type("Welcome")
            .unwrap()
            .map("User", json!({"Name": "Ada"}))
            .unwrap()
            .build_message(&["ada@example.com"])
            .unwrap();

        assert_eq!(message.subject(), "Hi Ada");
        assert_eq!(message.body(), "Welcome Ada");
        assert!(!message.is_html());
        assert_eq!(message.sender_address(), "noreply@example.com");
        assert_eq!(message.display_name(), "Example");
    }

    #[test]
    fn test_build_message_uses_locale_and_html_flag() {
        let orchestrator =
            orchestrator_with(catalog(), Arc::new(MemoryTransport::new())).with_locale("fr-fr");
        let message = orchestrator
            .for_type("Welcome")
            .unwrap()
            .map("User", json!({"Name": "Ada"}))
            .unwrap()
            .build_message(&["ada@example.com"])
            .unwrap();

        assert_eq!(message.subject(), "Salut Ada");
        assert!(message.is_html());
    }

    #[test]
    fn test_build_message_requires_recipients() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()));
        let result = orchestrator
            .for_type("Welcome")
            .unwrap()
            .map("User", "Ada")
            .unwrap()
            .build_message(&[]);
        assert!(matches!(result, Err(OrchestratorError::InvalidArgument(_))));

        let result = orchestrator.for_type("Welcome").unwrap().build_message_to("  ", None);
        assert!(matches!(result, Err(OrchestratorError::InvalidArgument(_))));
    }

    #[test]
    fn test_build_message_without_template_degrades() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()));
        let message = orchestrator
            .for_type("Unknown")
            .unwrap()
            .build_message(&["ada@example.com"])
            .unwrap();

        assert_eq!(message.subject(), "");
        assert_eq!(message.body(), "");
        assert!(!message.is_html());
    }

    #[test]
    fn test_build_message_without_template_skips_decorations() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()))
            .use_signature("Regards")
            .with_footer("<hr/>");
        let message = orchestrator
            .for_type("Unknown")
            .unwrap()
            .build_message(&["a@example.com"])
            .unwrap();

        assert_eq!(message.subject(), "");
        assert_eq!(message.body(), "");
    }

    #[test]
    fn test_build_message_recipient_override() {
        let catalog = TemplateCatalog::new(vec![TemplateRecord::new("Welcome", "", "Hi", "Body")])
            .with_recipient_override(RecipientOverride::redirect_to("qa@example.com"));
        let orchestrator = orchestrator_with(Arc::new(catalog), Arc::new(MemoryTransport::new()));

        let message = orchestrator
            .for_type("Welcome")
            .unwrap()
            .build_message_with_cc(&["a@example.com", "b@example.com"], &["cc@example.com", ""])
            .unwrap();

        assert_eq!(message.recipients(), ["qa@example.com".to_string()]);
        assert_eq!(message.cc_recipients(), ["cc@example.com".to_string()]);
    }

    #[test]
    fn test_build_message_signature_and_footer() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()))
            .use_signature("Regards")
            .with_footer("\nUnsubscribe")
            .with_sender_name("Robot");

        let message = orchestrator
            .for_type("Welcome")
            .unwrap()
            .map("User", json!({"Name": "Ada"}))
            .unwrap()
            .build_message_to("ada@example.com", Some("boss@example.com"))
            .unwrap();

        assert_eq!(message.body(), "Welcome Ada<p>Regards</p>\nUnsubscribe");
        assert_eq!(message.sender_name(), "Robot");
        assert_eq!(message.cc_recipients(), ["boss@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_success_notifies_sent_then_completed() {
        let transport = Arc::new(MemoryTransport::new().with_response("250 OK"));
        let mut orchestrator = orchestrator_with(catalog(), transport.clone());
        let log = Arc::new(EventLog::new());
        orchestrator.subscribe(log.clone());

        let message = orchestrator
            .for_type("Welcome")
            .unwrap()
            .build_message(&["ada@example.com"])
            .unwrap();
        let message_id = message.message_id();

        let outcome = orchestrator.dispatch(message).await.unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Sent {
                server_response: "250 OK".to_string()
            }
        );
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(
            log.events(),
            vec![
                DeliveryEvent::Sent {
                    message_id,
                    server_response: "250 OK".to_string()
                },
                DeliveryEvent::Completed { message_id },
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_failure_aggregates_chain() {
        let logged = Arc::new(Mutex::new(Vec::new()));
        let sink = logged.clone();

        let mut orchestrator =
            orchestrator_with(catalog(), Arc::new(MemoryTransport::failing(["A", "B"])))
                .log_errors_with(move |_, err| {
                    sink.lock().unwrap().push(err.to_string());
                });
        let log = Arc::new(EventLog::new());
        orchestrator.subscribe(log.clone());

        let message = orchestrator
            .for_type("Welcome")
            .unwrap()
            .build_message(&["ada@example.com"])
            .unwrap();
        let message_id = message.message_id();

        let err = orchestrator.dispatch(message).await.unwrap_err();
        match err {
            OrchestratorError::Transport { reason, source } => {
                assert_eq!(reason, "A B");
                assert_eq!(source.to_string(), "A");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(*logged.lock().unwrap(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(
            log.events(),
            vec![
                DeliveryEvent::Failed {
                    message_id,
                    reason: "A B".to_string()
                },
                DeliveryEvent::Completed { message_id },
            ]
        );
    }

    #[tokio::test]
    async fn test_observer_only_sees_attempts_after_subscription() {
        let mut orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new()));

        let first = orchestrator
            .for_type("Welcome")
            .unwrap()
            .build_message(&["a@example.com"])
            .unwrap();
        orchestrator.dispatch(first).await.unwrap();

        let log = Arc::new(EventLog::new());
        orchestrator.subscribe(log.clone());

        let second = orchestrator
            .for_type("Welcome")
            .unwrap()
            .build_message(&["b@example.com"])
            .unwrap();
        orchestrator.dispatch(second).await.unwrap();

        assert_eq!(log.events().len(), 2);
    }

    #[test]
    fn test_with_tls_sets_connection_flag() {
        let orchestrator = orchestrator_with(catalog(), Arc::new(MemoryTransport::new())).with_tls();
        assert!(orchestrator.connection().use_tls);
    }
}
