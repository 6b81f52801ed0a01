//! In-memory transport that records deliveries

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ConnectionParams, MailTransport, TransportError, TransportResult};
use crate::message::OutboundMessage;

/// Records every message it is asked to send.
///
/// When a failure chain is scripted, every send fails with it instead.
pub struct MemoryTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    failure: Option<Vec<String>>,
    response: String,
}

impl MemoryTransport {
    /// Create a transport that accepts every message
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: None,
            response: "250 2.0.0 OK queued".to_string(),
        }
    }

    /// Create a transport that fails every send with the given chain,
    /// outermost message first
    pub fn failing<I, S>(chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failure: Some(chain.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// Override the server response reported on success
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    fn scripted_error(chain: &[String]) -> TransportError {
        chain
            .iter()
            .rev()
            .fold(None::<TransportError>, |cause, message| {
                let err = TransportError::new(message.clone());
                Some(match cause {
                    Some(cause) => err.with_source(cause),
                    None => err,
                })
            })
            .unwrap_or_else(|| TransportError::new("Delivery failed"))
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn send(
        &self,
        message: &OutboundMessage,
        _connection: &ConnectionParams,
    ) -> TransportResult<String> {
        if let Some(chain) = &self.failure {
            return Err(Self::scripted_error(chain));
        }

        self.sent
            .lock()
            .map_err(|_| TransportError::new("Memory transport lock poisoned"))?
            .push(message.clone());

        tracing::debug!(
            message_id = %message.message_id(),
            recipients = message.recipients().len(),
            "Message recorded by memory transport"
        );

        Ok(self.response.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
