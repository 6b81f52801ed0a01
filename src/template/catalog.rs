//! In-memory template catalog with type + locale selection

use std::path::Path;

use config::{Config, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog-specific error type
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Failed to load template catalog: {0}")]
    Load(#[from] config::ConfigError),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// A stored subject/body pair tagged by message type and optional locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    /// Message type this template answers to (not unique across records)
    pub message_type: String,

    /// Culture name such as `en-US`; empty when the record has no locale
    #[serde(default)]
    pub locale: String,

    /// Whether the body is HTML
    #[serde(default)]
    pub is_html: bool,

    /// Subject text with `{Entity.Property}` tokens
    #[serde(default)]
    pub subject: String,

    /// Body text with `{Entity.Property}` tokens
    #[serde(default)]
    pub body: String,
}

impl TemplateRecord {
    pub fn new(
        message_type: impl Into<String>,
        locale: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            locale: locale.into(),
            is_html: false,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Mark the body as HTML
    pub fn html(mut self) -> Self {
        self.is_html = true;
        self
    }

    fn matches_locale(&self, locale: &str) -> bool {
        !self.locale.is_empty() && self.locale.eq_ignore_ascii_case(locale)
    }
}

/// Global recipient redirect for non-production environments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientOverride {
    #[serde(default, rename = "override_to_address")]
    pub enabled: bool,

    #[serde(default, rename = "to_address")]
    pub address: String,
}

impl RecipientOverride {
    pub fn redirect_to(address: impl Into<String>) -> Self {
        Self {
            enabled: true,
            address: address.into(),
        }
    }

    /// The redirect address, when the switch is on and an address is set
    pub fn active_address(&self) -> Option<&str> {
        let address = self.address.trim();
        (self.enabled && !address.is_empty()).then_some(address)
    }
}

/// Persisted catalog shape, as produced by a catalog loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSource {
    #[serde(default)]
    pub common: RecipientOverride,

    #[serde(default)]
    pub messages: Vec<TemplateRecord>,
}

/// Ordered, read-only collection of template records.
///
/// Load order is the selection tie-break: the first record of a message type
/// is its default.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    records: Vec<TemplateRecord>,
    recipient_override: RecipientOverride,
}

impl TemplateCatalog {
    /// Create a catalog from records in load order
    pub fn new(records: Vec<TemplateRecord>) -> Self {
        Self {
            records,
            recipient_override: RecipientOverride::default(),
        }
    }

    /// Create a catalog with no records
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attach a recipient override policy
    pub fn with_recipient_override(mut self, recipient_override: RecipientOverride) -> Self {
        self.recipient_override = recipient_override;
        self
    }

    /// Load a catalog file (TOML, YAML or JSON, chosen by extension)
    pub fn from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let source: CatalogSource = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        tracing::info!(
            path = %path.display(),
            templates = source.messages.len(),
            "Template catalog loaded"
        );

        Ok(Self::from(source))
    }

    /// Every record whose message type equals `message_type` (ordinal), in load order
    pub fn find_candidates(&self, message_type: &str) -> Vec<&TemplateRecord> {
        self.records
            .iter()
            .filter(|record| record.message_type == message_type)
            .collect()
    }

    /// Best template for `message_type` in `locale`.
    ///
    /// Prefers the first candidate whose locale equals `locale` ignoring case;
    /// otherwise the first candidate in load order, whatever its locale.
    pub fn select(&self, message_type: &str, locale: &str) -> CatalogResult<&TemplateRecord> {
        if message_type.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "Message type must not be empty".to_string(),
            ));
        }

        let candidates = self.find_candidates(message_type);
        let selected = candidates
            .iter()
            .find(|record| record.matches_locale(locale))
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| CatalogError::NotFound(message_type.to_string()))?;

        tracing::debug!(
            message_type = %message_type,
            requested_locale = %locale,
            selected_locale = %selected.locale,
            candidates = candidates.len(),
            "Template selected"
        );

        Ok(selected)
    }

    pub fn recipient_override(&self) -> &RecipientOverride {
        &self.recipient_override
    }

    /// All records in load order
    pub fn records(&self) -> &[TemplateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<CatalogSource> for TemplateCatalog {
    fn from(source: CatalogSource) -> Self {
        Self {
            records: source.messages,
            recipient_override: source.common,
        }
    }
}
