//! Transport collaborators that deliver composed messages.
//!
//! - `SmtpTransport`: delivers over SMTP using lettre
//! - `MemoryTransport`: records messages in memory, optionally failing on demand

mod memory;
mod smtp;

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::OutboundMessage;

pub use memory::MemoryTransport;
pub use smtp::SmtpTransport;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Transport failure with an optional causal chain.
///
/// Display shows only this link's message; walk [`StdError::source`] for
/// the causes.
#[derive(Debug)]
pub struct TransportError {
    message: String,
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the error that caused this one
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Connection parameters handed to the transport on every send
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub use_tls: bool,
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: String::new(),
            use_tls: false,
        }
    }

    /// Builder method to set credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Builder method to set TLS
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Whether the transport should authenticate
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// Delivers a composed message.
///
/// Returns the server response on success. Transports never retry.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        message: &OutboundMessage,
        connection: &ConnectionParams,
    ) -> TransportResult<String>;

    /// Transport name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_chain() {
        let err = TransportError::new("A").with_source(TransportError::new("B"));
        assert_eq!(err.to_string(), "A");

        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "B");
        assert!(cause.source().is_none());
    }

    #[test]
    fn test_connection_params_debug_redacts_password() {
        let params = ConnectionParams::new("smtp.example.com", 587)
            .with_credentials("user", "hunter2")
            .with_tls(true);

        let debug = format!("{:?}", params);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("smtp.example.com"));
        assert!(params.has_credentials());
    }
}
