use std::error::Error as StdError;

use thiserror::Error;

use crate::orchestrator::OrchestratorError;
use crate::template::CatalogError;
use crate::telemetry::TelemetryError;

/// Top-level error for the binary and embedding applications
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Machine-readable error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Catalog(_) => "CATALOG_ERROR",
            AppError::Orchestrator(OrchestratorError::Transport { .. }) => "DELIVERY_FAILED",
            AppError::Orchestrator(_) => "COMPOSITION_ERROR",
            AppError::Telemetry(_) => "TELEMETRY_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

/// `err` followed by each of its causes
pub fn error_chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&current| current.source())
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_error_codes() {
        let validation = AppError::Validation("missing recipient".to_string());
        assert_eq!(validation.code(), "VALIDATION_ERROR");

        let delivery = AppError::from(OrchestratorError::Transport {
            reason: "A B".to_string(),
            source: TransportError::new("A"),
        });
        assert_eq!(delivery.code(), "DELIVERY_FAILED");
        assert_eq!(delivery.to_string(), "Delivery failed: A B");
    }

    #[test]
    fn test_error_chain() {
        let err = TransportError::new("A")
            .with_source(TransportError::new("B").with_source(TransportError::new("C")));
        let messages: Vec<String> = error_chain(&err).map(|e| e.to_string()).collect();
        assert_eq!(messages, vec!["A", "B", "C"]);
    }
}
