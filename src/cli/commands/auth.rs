use clap::{Arg, Command};

use crate::storefront::audit::DayBoundary;

pub const DEFAULT_AUDIT_LOG: &str = "logs/auth_logins.log";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("Shared secret used to sign and verify session tokens")
                .env("STOREFRONT_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("audit-log")
                .long("audit-log")
                .help("Path of the login audit log")
                .default_value(DEFAULT_AUDIT_LOG)
                .env("STOREFRONT_AUDIT_LOG"),
        )
        .arg(
            Arg::new("audit-day-boundary")
                .long("audit-day-boundary")
                .help("Calendar day used to count failed logins: local or utc")
                .default_value("local")
                .env("STOREFRONT_AUDIT_DAY_BOUNDARY")
                .value_parser(clap::value_parser!(DayBoundary)),
        )
        .arg(
            Arg::new("audit-tally-cache")
                .long("audit-tally-cache")
                .help("Keep today's failure counts in memory instead of rescanning the log")
                .default_value("true")
                .env("STOREFRONT_AUDIT_TALLY_CACHE")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new("max-failed-logins")
                .long("max-failed-logins")
                .help("Failed logins per identity and day that trigger the lockout")
                .default_value("5")
                .env("STOREFRONT_MAX_FAILED_LOGINS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
