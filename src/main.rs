use std::sync::Arc;

use anyhow::Result;

use template_mailer::config::Settings;
use template_mailer::error::{error_chain, AppError};
use template_mailer::metrics::encode_metrics;
use template_mailer::telemetry::init_telemetry;
use template_mailer::{EventLog, MailTransport, MemoryTransport, MessageOrchestrator, SmtpTransport};

const USAGE: &str = "usage: template-mailer [--dry-run] <recipient>";

struct Args {
    dry_run: bool,
    recipient: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // Load configuration
    let settings = Settings::new()?;
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    if let Err(e) = run(&settings, args).await {
        let causes: Vec<String> = error_chain(&e).skip(1).map(|c| c.to_string()).collect();
        tracing::error!(code = e.code(), error = %e, causes = ?causes, "Test mail failed");
        return Err(e.into());
    }
    Ok(())
}

fn parse_args() -> template_mailer::error::Result<Option<Args>> {
    let mut dry_run = false;
    let mut recipient = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "-h" | "--help" => return Ok(None),
            _ => recipient = Some(arg),
        }
    }
    let recipient = recipient.ok_or_else(|| AppError::Validation(USAGE.to_string()))?;
    Ok(Some(Args { dry_run, recipient }))
}

async fn run(settings: &Settings, args: Args) -> template_mailer::error::Result<()> {
    let catalog = Arc::new(settings.template_catalog());
    if catalog.is_empty() {
        tracing::warn!("Template catalog is empty; the message will have no subject or body");
    }

    let memory = Arc::new(MemoryTransport::new());
    let transport: Arc<dyn MailTransport> = if args.dry_run {
        memory.clone()
    } else {
        Arc::new(SmtpTransport::new())
    };

    let mut orchestrator = MessageOrchestrator::from_settings(settings, catalog, transport);
    let events = Arc::new(EventLog::new());
    orchestrator.subscribe(events.clone());

    let smtp = &settings.smtp;
    let message = orchestrator
        .for_type("TestMail")?
        .map("MachineName", machine_name())?
        .map("SmtpServer", smtp.host.as_str())?
        .map("SmtpServerPort", smtp.port)?
        .map("SmtpUserName", smtp.username.as_str())?
        .map("EmailDisplayName", settings.sender.display_name.as_str())?
        .map("EnableSsl", smtp.use_tls)?
        .build_message_to(&args.recipient, None)?;

    tracing::info!(
        message_id = %message.message_id(),
        subject = %message.subject(),
        locale = %orchestrator.locale(),
        "Message composed"
    );

    let outcome = orchestrator.dispatch(message).await;

    for event in events.events() {
        tracing::info!(event = ?event, "Delivery event");
    }
    if args.dry_run {
        for sent in memory.sent() {
            println!("To: {}", sent.recipients().join(", "));
            println!("Subject: {}", sent.subject());
            println!();
            println!("{}", sent.body());
        }
        match encode_metrics() {
            Ok(metrics) => println!("\n{metrics}"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
        }
    }

    outcome?;
    Ok(())
}

fn machine_name() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}
