//! Token substitution for `{Entity.Property}` placeholders

use lazy_static::lazy_static;
use regex::Regex;

use crate::message::ResolvedMessage;
use crate::pipeline::{PersonalizationPipeline, PropertyResult};

use super::catalog::TemplateRecord;

lazy_static! {
    /// Entity and property are both one or more word characters.
    static ref TOKEN_PATTERN: Regex =
        Regex::new(r"\{(\w+)\.(\w+)\}").expect("token pattern is valid");
}

/// A `{Entity.Property}` placeholder found in template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub entity: &'a str,
    pub property: &'a str,
}

impl Token<'_> {
    /// The literal placeholder text, braces included
    pub fn placeholder(&self) -> String {
        format!("{{{}.{}}}", self.entity, self.property)
    }
}

/// Distinct tokens in `text`, in order of first occurrence
pub fn tokens(text: &str) -> Vec<Token<'_>> {
    let mut found: Vec<Token<'_>> = Vec::new();
    for captures in TOKEN_PATTERN.captures_iter(text) {
        let (Some(entity), Some(property)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let token = Token {
            entity: entity.as_str(),
            property: property.as_str(),
        };
        if !found.contains(&token) {
            found.push(token);
        }
    }
    found
}

/// Substitute every recognized token in `text` from `pipeline`.
///
/// Unknown entities and unreadable properties become the empty string.
/// Text without tokens is returned unchanged.
pub fn format(text: &str, pipeline: &PersonalizationPipeline) -> String {
    let mut formatted = text.to_string();
    for token in tokens(text) {
        let value = resolve_token(pipeline, &token).unwrap_or_else(|err| {
            tracing::trace!(
                entity = %token.entity,
                property = %token.property,
                error = %err,
                "Token rendered empty"
            );
            String::new()
        });
        formatted = formatted.replace(&token.placeholder(), &value);
    }
    formatted
}

fn resolve_token(pipeline: &PersonalizationPipeline, token: &Token<'_>) -> PropertyResult<String> {
    if !pipeline.has(token.entity) {
        return Ok(String::new());
    }
    match pipeline.get(token.entity) {
        Ok(entry) => entry.read(token.property),
        Err(_) => Ok(String::new()),
    }
}

/// Formats one template record against one pipeline
pub struct TemplateEngine<'a> {
    record: &'a TemplateRecord,
    pipeline: &'a PersonalizationPipeline,
}

impl<'a> TemplateEngine<'a> {
    pub fn new(record: &'a TemplateRecord, pipeline: &'a PersonalizationPipeline) -> Self {
        Self { record, pipeline }
    }

    pub fn record(&self) -> &TemplateRecord {
        self.record
    }

    pub fn pipeline(&self) -> &PersonalizationPipeline {
        self.pipeline
    }

    /// Substitute tokens in arbitrary text using this engine's pipeline
    pub fn format(&self, text: &str) -> String {
        format(text, self.pipeline)
    }

    /// Format subject and body, trimming surrounding whitespace from both
    pub fn resolve(&self) -> ResolvedMessage {
        ResolvedMessage {
            subject: self.format(&self.record.subject).trim().to_string(),
            body: self.format(&self.record.body).trim().to_string(),
            is_html: self.record.is_html,
        }
    }
}
