//! Templated email composition and delivery.
//!
//! A [`TemplateCatalog`] holds subject/body templates keyed by message type
//! and locale. Values bound into a [`PersonalizationPipeline`] are substituted
//! for `{Entity.Property}` tokens, and a [`MessageOrchestrator`] composes the
//! result and hands it to a [`MailTransport`].

// Core composition
pub mod message;
pub mod pipeline;
pub mod template;

// Delivery
pub mod orchestrator;
pub mod transport;

// Supporting modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use message::{DeliveryOutcome, OutboundMessage, ResolvedMessage, SenderIdentity};
pub use orchestrator::{
    DeliveryEvent, DeliveryObserver, EventLog, MessageDraft, MessageOrchestrator,
    OrchestratorError, OrchestratorState,
};
pub use pipeline::{PersonalizationPipeline, PipelineError, PipelineValue, PropertyReadable};
pub use template::{TemplateCatalog, TemplateEngine, TemplateRecord};
pub use transport::{ConnectionParams, MailTransport, MemoryTransport, SmtpTransport};
