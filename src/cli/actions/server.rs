use crate::storefront::{self, audit::DayBoundary, AuditSettings};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub audit_log: PathBuf,
    pub day_boundary: DayBoundary,
    pub tally_cache: bool,
    pub max_failed_logins: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the arguments are invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    Url::parse(&args.dsn).context("Invalid database connection string")?;

    anyhow::ensure!(
        !args.jwt_secret.expose_secret().is_empty(),
        "--jwt-secret must not be empty"
    );

    log_startup_args(&args);

    let audit = AuditSettings {
        path: args.audit_log,
        day_boundary: args.day_boundary,
        tally_cache: args.tally_cache,
        max_failed_logins: args.max_failed_logins,
    };

    storefront::new(args.port, args.dsn, args.jwt_secret, audit).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("audit_log", args.audit_log.display().to_string()),
        ("audit_day_boundary", format!("{:?}", args.day_boundary)),
        ("audit_tally_cache", args.tally_cache.to_string()),
        ("max_failed_logins", args.max_failed_logins.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
