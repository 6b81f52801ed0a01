use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::message::SenderIdentity;
use crate::template::{CatalogSource, TemplateCatalog};
use crate::transport::ConnectionParams;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub smtp: SmtpSettings,
    #[serde(default)]
    pub sender: SenderIdentity,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default)]
    pub catalog: CatalogSource,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Clone, Deserialize)]
pub struct SmtpSettings {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// STARTTLS on connect
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
}

impl SmtpSettings {
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new(self.host.clone(), self.port)
            .with_credentials(self.username.clone(), self.password.clone())
            .with_tls(self.use_tls)
    }
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.connection_params(), f)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailSettings {
    /// Culture name for template selection; empty means the system locale
    #[serde(default)]
    pub locale: String,
    /// Appended to every body as `<p>{signature}</p>`
    #[serde(default)]
    pub signature: Option<String>,
    /// Appended to every body after the signature
    #[serde(default)]
    pub footer: Option<String>,
}

impl MailSettings {
    /// Configured locale, falling back to the system locale
    pub fn locale(&self) -> String {
        if self.locale.trim().is_empty() {
            system_locale()
        } else {
            self.locale.trim().to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    /// Export spans over OTLP
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Trace sampling ratio (0.0-1.0)
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "template-mailer".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

const DEFAULT_LOCALE: &str = "en-US";

/// Culture name derived from `LC_ALL`, `LC_MESSAGES` or `LANG`.
///
/// `fr_FR.UTF-8` becomes `fr-FR`; `C`/`POSIX` and unset variables give `en-US`.
pub fn system_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find_map(|value| normalize_locale(&value))
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}

fn normalize_locale(raw: &str) -> Option<String> {
    let name = raw.split(['.', '@']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "C" || name == "POSIX" {
        return None;
    }
    Some(name.replace('_', "-"))
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("smtp.host", default_smtp_host())?
            .set_default("smtp.use_tls", default_use_tls())?
            .set_default("otel.enabled", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // MAILER__SMTP__HOST, MAILER__SENDER__ADDRESS, ...
            .add_source(
                Environment::with_prefix("MAILER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Template catalog described by the `catalog` section
    pub fn template_catalog(&self) -> TemplateCatalog {
        TemplateCatalog::from(self.catalog.clone())
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            use_tls: default_use_tls(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
