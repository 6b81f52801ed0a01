//! Message value types: resolved template text, the outbound message, and
//! delivery outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Template subject and body after token substitution
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedMessage {
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

/// Who a message is sent as
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SenderIdentity {
    /// Address used for both `From` and `Sender`
    pub address: String,

    /// Display name on the `From` mailbox
    #[serde(default)]
    pub display_name: String,

    /// Display name on the `Sender` mailbox
    #[serde(default)]
    pub sender_name: String,
}

impl SenderIdentity {
    pub fn new(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
            sender_name: String::new(),
        }
    }
}

/// Fully composed message, ready for a transport.
///
/// Only the orchestrator builds these; nothing mutates one after it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    message_id: Uuid,
    composed_at: DateTime<Utc>,
    message_type: String,
    subject: String,
    body: String,
    is_html: bool,
    sender: SenderIdentity,
    recipients: Vec<String>,
    cc_recipients: Vec<String>,
}

impl OutboundMessage {
    pub(crate) fn new(
        message_type: String,
        resolved: ResolvedMessage,
        sender: SenderIdentity,
        recipients: Vec<String>,
        cc_recipients: Vec<String>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            composed_at: Utc::now(),
            message_type,
            subject: resolved.subject,
            body: resolved.body,
            is_html: resolved.is_html,
            sender,
            recipients,
            cc_recipients,
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn composed_at(&self) -> DateTime<Utc> {
        self.composed_at
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_html(&self) -> bool {
        self.is_html
    }

    pub fn sender_address(&self) -> &str {
        &self.sender.address
    }

    pub fn display_name(&self) -> &str {
        &self.sender.display_name
    }

    pub fn sender_name(&self) -> &str {
        &self.sender.sender_name
    }

    /// Primary recipients, never empty
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn cc_recipients(&self) -> &[String] {
        &self.cc_recipients
    }
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent { server_response: String },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }

    /// Label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent { .. } => "sent",
            DeliveryOutcome::Failed { .. } => "failed",
        }
    }
}
