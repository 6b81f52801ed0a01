//! SMTP transport using lettre.
//!
//! A fresh connection is built per send from the supplied parameters:
//! STARTTLS relay when `use_tls` is set, plain SMTP otherwise (local dev
//! servers such as MailHog/Mailpit).

use async_trait::async_trait;
use lettre::{
    address::Address,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{ConnectionParams, MailTransport, TransportError, TransportResult};
use crate::message::OutboundMessage;

/// SMTP delivery
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransport;

impl SmtpTransport {
    pub fn new() -> Self {
        Self
    }

    /// Build the SMTP transport based on connection parameters
    fn build_transport(
        connection: &ConnectionParams,
    ) -> TransportResult<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if connection.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&connection.host).map_err(|e| {
                TransportError::new(format!("Failed to create SMTP relay for {}", connection.host))
                    .with_source(e)
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&connection.host)
        };
        let mut builder = builder.port(connection.port);

        if connection.has_credentials() {
            builder = builder.credentials(Credentials::new(
                connection.username.clone(),
                connection.password.clone(),
            ));
        }

        Ok(builder.build())
    }

    /// Build a lettre Message from an outbound message
    pub(crate) fn build_message(message: &OutboundMessage) -> TransportResult<Message> {
        let address = parse_address(message.sender_address(), "sender")?;
        let from = Mailbox::new(non_empty(message.display_name()), address.clone());
        let sender = Mailbox::new(non_empty(message.sender_name()), address);

        let mut builder = Message::builder()
            .from(from)
            .sender(sender)
            .subject(message.subject());

        for to in message.recipients() {
            builder = builder.to(Mailbox::new(None, parse_address(to, "recipient")?));
        }

        for cc in message.cc_recipients() {
            builder = builder.cc(Mailbox::new(None, parse_address(cc, "CC")?));
        }

        let content_type = if message.is_html() {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        builder
            .header(content_type)
            .body(message.body().to_string())
            .map_err(|e| TransportError::new("Failed to build email message").with_source(e))
    }
}

fn parse_address(address: &str, role: &str) -> TransportResult<Address> {
    address.trim().parse::<Address>().map_err(|e| {
        TransportError::new(format!("Invalid {} address '{}'", role, address)).with_source(e)
    })
}

fn non_empty(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_string())
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(
        &self,
        message: &OutboundMessage,
        connection: &ConnectionParams,
    ) -> TransportResult<String> {
        tracing::debug!(
            message_id = %message.message_id(),
            host = %connection.host,
            port = %connection.port,
            use_tls = connection.use_tls,
            recipients = message.recipients().len(),
            cc_count = message.cc_recipients().len(),
            "Sending email via SMTP"
        );

        let email = Self::build_message(message)?;
        let transport = Self::build_transport(connection)?;

        let response = transport
            .send(email)
            .await
            .map_err(|e| TransportError::new("SMTP send failed").with_source(e))?;

        let lines: Vec<&str> = response.message().collect();
        Ok(format!("{} {}", response.code(), lines.join(" ")))
    }

    fn name(&self) -> &'static str {
        "SMTP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::fixtures::outbound;

    #[test]
    fn test_build_message() {
        let message = outbound(&["a@example.com", "b@example.com"]);
        let email = SmtpTransport::build_message(&message).unwrap();

        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(formatted.contains("Subject: Subject"));
        assert!(formatted.contains("a@example.com"));
        assert!(formatted.contains("b@example.com"));
        assert!(formatted.contains("text/plain"));
    }

    #[test]
    fn test_build_message_invalid_recipient() {
        let message = outbound(&["not an address"]);
        let err = SmtpTransport::build_message(&message).unwrap_err();
        assert!(err.message().contains("Invalid recipient address"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_build_transport_plain() {
        let plain = ConnectionParams::new("localhost", 1025).with_credentials("user", "pass");
        assert!(SmtpTransport::build_transport(&plain).is_ok());
    }
}
