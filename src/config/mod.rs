mod settings;

pub use settings::{system_locale, MailSettings, OtelConfig, Settings, SmtpSettings};
