use crate::{
    cli::actions::{server::Args, Action},
    storefront::audit::DayBoundary,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing or out of range.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --jwt-secret")?;

    let audit_log = matches
        .get_one::<String>("audit-log")
        .map(PathBuf::from)
        .context("missing argument: --audit-log")?;
    let day_boundary = matches
        .get_one::<DayBoundary>("audit-day-boundary")
        .copied()
        .unwrap_or_default();
    let tally_cache = matches
        .get_one::<bool>("audit-tally-cache")
        .copied()
        .unwrap_or(true);
    let max_failed_logins = matches
        .get_one::<u64>("max-failed-logins")
        .map(|max| usize::try_from(*max))
        .transpose()
        .context("invalid --max-failed-logins")?
        .context("missing argument: --max-failed-logins")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret,
        audit_log,
        day_boundary,
        tally_cache,
        max_failed_logins,
    }))
}
