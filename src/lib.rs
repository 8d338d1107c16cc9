//! # Storefront
//!
//! `storefront` is the REST API behind a small e-commerce shop. This crate
//! carries the account surface: registration, login, session tokens and the
//! login throttle that guards it.
//!
//! ## Login throttling
//!
//! Every login attempt that reaches the account lookup leaves one line in an
//! append-only audit log. Failed attempts are counted per identity and per
//! calendar day; from the fifth failure of the day on, failed attempts are
//! answered with a lockout message until the day ends. The log is the only
//! lockout state.
//!
//! Audit I/O failures never block a login: the failure is reported through
//! `tracing` and the throttle treats the attempt as "not blocked".
//!
//! ## Session tokens
//!
//! Successful logins receive an HS256 JWT carrying the account id and role id.
//! Protected routes sit behind a bearer-token gate that verifies the token
//! without touching the database or the audit log.

pub mod cli;
pub mod storefront;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
