//! Email template system.
//!
//! This module provides:
//! - Template records tagged by message type and locale
//! - An ordered, read-only catalog that picks the best record for a locale
//! - The `{Entity.Property}` substitution engine
//!
//! # Example
//!
//! ```ignore
//! let catalog = TemplateCatalog::new(vec![
//!     TemplateRecord::new("Welcome", "en-US", "Hi {User.Name}", "Welcome aboard"),
//!     TemplateRecord::new("Welcome", "fr-FR", "Salut {User.Name}", "Bienvenue"),
//! ]);
//!
//! let record = catalog.select("Welcome", "fr-FR")?;
//! let resolved = TemplateEngine::new(record, &pipeline).resolve();
//! ```

mod catalog;
mod engine;

pub use catalog::{
    CatalogError, CatalogResult, CatalogSource, RecipientOverride, TemplateCatalog, TemplateRecord,
};
pub use engine::{format, tokens, TemplateEngine, Token};
