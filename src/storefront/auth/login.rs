//! Credential verification and session token issuance.
//!
//! Flow Overview:
//! 1) Reject requests missing the email or password (no audit entry).
//! 2) Look up the account; an unknown email records a FAILED entry.
//! 3) Compare the password against the stored hash; a mismatch records a
//!    FAILED entry. A stored hash that cannot be parsed counts as a mismatch.
//! 4) After any FAILED entry the throttle decides whether the identity is now
//!    locked out; the lockout message replaces the mismatch message.
//! 5) On match, resolve the role, record SUCCESS and sign a token.

use axum::http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use super::{
    password::{verify_password_blocking, CredentialError},
    throttle::ThrottlePolicy,
    token::{SessionClaims, SessionKeys, TokenError},
};
use crate::storefront::{
    accounts::{AccountStore, StoreError},
    audit::{auditor, LoginAuditor},
};

pub const MSG_LOGIN_FAILED: &str = "Login Failed";
pub const MSG_WRONG_EMAIL: &str = "Wrong email";
pub const MSG_WRONG_PASSWORD: &str = "Wrong password";
pub const MSG_BLOCKED: &str = "Too many failed login attempts. Please try again tomorrow.";
pub const MSG_LOGIN_SUCCESS: &str = "Login Successfully";

#[derive(ToSchema, Deserialize, Debug, Default, Clone)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub token: String,
    pub claims: SessionClaims,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("{}", MSG_LOGIN_FAILED)]
    Validation,
    #[error("{}", MSG_WRONG_EMAIL)]
    UnknownIdentity,
    #[error("{}", MSG_WRONG_PASSWORD)]
    CredentialMismatch,
    #[error("{}", MSG_BLOCKED)]
    Blocked,
    #[error("account has no role")]
    MissingRole,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl LoginError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::UnknownIdentity | Self::CredentialMismatch => StatusCode::UNAUTHORIZED,
            Self::Blocked => StatusCode::TOO_MANY_REQUESTS,
            Self::MissingRole | Self::Store(_) | Self::Credential(_) | Self::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the caller; internal failures stay generic.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Everything the login flow needs besides the account store.
#[derive(Clone, Debug)]
pub struct Authenticator {
    auditor: Arc<LoginAuditor>,
    policy: ThrottlePolicy,
    keys: SessionKeys,
}

impl Authenticator {
    #[must_use]
    pub fn new(auditor: Arc<LoginAuditor>, policy: ThrottlePolicy, keys: SessionKeys) -> Self {
        Self {
            auditor,
            policy,
            keys,
        }
    }

    #[must_use]
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Run one login attempt to completion.
    ///
    /// # Errors
    /// Returns the user-facing failure (`Validation`, `UnknownIdentity`,
    /// `CredentialMismatch`, `Blocked`) or an internal error from the store,
    /// the hash primitive or the signer.
    pub async fn login(
        &self,
        accounts: &dyn AccountStore,
        request: LoginRequest,
    ) -> Result<LoginSuccess, LoginError> {
        let (Some(email), Some(password)) = (
            request.email.filter(|email| !email.is_empty()),
            request.password.filter(|password| !password.is_empty()),
        ) else {
            return Err(LoginError::Validation);
        };

        let Some(account) = accounts
            .find_account_by_identity(&email)
            .await?
            .into_iter()
            .next()
        else {
            return Err(self.reject(&email, LoginError::UnknownIdentity).await);
        };

        let matched = match verify_password_blocking(password, account.password_hash).await {
            Ok(matched) => matched,
            Err(CredentialError::Hash(err)) => {
                error!("Unusable password hash for account {}: {err}", account.account_id);
                false
            }
            Err(err) => return Err(err.into()),
        };

        if !matched {
            return Err(self.reject(&email, LoginError::CredentialMismatch).await);
        }

        let role = accounts
            .find_role_by_account_id(account.account_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                error!("Account {} has no role", account.account_id);
                LoginError::MissingRole
            })?;

        auditor::record_success(&self.auditor, &email).await;

        let claims = SessionClaims::new(account.account_id, role.role_id);
        let token = self.keys.issue(&claims)?;
        debug!("Issued session token for account {}", account.account_id);

        Ok(LoginSuccess { token, claims })
    }

    /// Record the failure and swap in the lockout error once the identity has
    /// reached its daily limit.
    async fn reject(&self, email: &str, reason: LoginError) -> LoginError {
        let tally = auditor::record_failure(&self.auditor, email).await;
        if self.policy.decide(tally).is_blocked() {
            warn!("Login blocked after too many failed attempts: {email}");
            LoginError::Blocked
        } else {
            reason
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::{
        accounts::{MemoryAccountStore, NewAccount, Role},
        audit::{
            auditor::tests::{utc, BrokenStore, FixedClock},
            AuditEntry, AuditStore, DayBoundary, MemoryAuditStore, Outcome,
        },
        auth::password::hash_password,
    };
    use secrecy::SecretString;

    struct Fixture {
        accounts: MemoryAccountStore,
        audit: Arc<MemoryAuditStore>,
        authenticator: Authenticator,
    }

    async fn fixture() -> Fixture {
        let accounts = MemoryAccountStore::new();
        accounts
            .create_account(NewAccount {
                name: "User".to_string(),
                email: "user@example.com".to_string(),
                password_hash: hash_password("correctPassword").unwrap(),
                role: Role::Customer,
                store_name: None,
                phone_number: None,
            })
            .await
            .unwrap();

        let audit = Arc::new(MemoryAuditStore::new());
        let auditor = LoginAuditor::new(audit.clone())
            .with_clock(Arc::new(FixedClock::at(utc(15, 10, 0))))
            .with_day_boundary(DayBoundary::Utc);

        Fixture {
            accounts,
            audit,
            authenticator: Authenticator::new(
                Arc::new(auditor),
                ThrottlePolicy::default(),
                SessionKeys::new(&SecretString::from("test-secret".to_string())),
            ),
        }
    }

    fn request(email: Option<&str>, password: Option<&str>) -> LoginRequest {
        LoginRequest {
            email: email.map(ToString::to_string),
            password: password.map(ToString::to_string),
        }
    }

    fn outcomes(audit: &MemoryAuditStore) -> Vec<(Outcome, String)> {
        audit
            .entries()
            .unwrap()
            .iter()
            .map(|e| (e.outcome(), e.identity().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn correct_credentials_issue_token() {
        let fx = fixture().await;
        let success = fx
            .authenticator
            .login(&fx.accounts, request(Some("user@example.com"), Some("correctPassword")))
            .await
            .unwrap();

        let claims = fx.authenticator.keys().verify(&success.token).unwrap();
        assert_eq!(claims.account_id, 1);
        assert_eq!(claims.role_id, Role::Customer.id());
        assert_eq!(
            outcomes(&fx.audit),
            vec![(Outcome::Success, "user@example.com".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_fields_write_nothing() {
        let fx = fixture().await;
        for req in [
            request(None, None),
            request(Some("user@example.com"), None),
            request(None, Some("correctPassword")),
            request(Some(""), Some("correctPassword")),
        ] {
            let err = fx.authenticator.login(&fx.accounts, req).await.unwrap_err();
            assert!(matches!(err, LoginError::Validation));
            assert_eq!(err.to_string(), "Login Failed");
        }
        assert!(fx.audit.entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_email_is_recorded() {
        let fx = fixture().await;
        let err = fx
            .authenticator
            .login(&fx.accounts, request(Some("nonexistent@example.com"), Some("anyPassword")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Wrong email");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            outcomes(&fx.audit),
            vec![(Outcome::Failed, "nonexistent@example.com".to_string())]
        );
    }

    #[tokio::test]
    async fn fifth_wrong_password_locks_out() {
        let fx = fixture().await;
        for _ in 0..4 {
            let err = fx
                .authenticator
                .login(&fx.accounts, request(Some("user@example.com"), Some("wrongPassword")))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Wrong password");
        }

        let err = fx
            .authenticator
            .login(&fx.accounts, request(Some("user@example.com"), Some("wrongPassword")))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Blocked));
        assert_eq!(
            err.to_string(),
            "Too many failed login attempts. Please try again tomorrow."
        );
        assert_eq!(fx.audit.entries().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unknown_email_can_be_locked_out() {
        let fx = fixture().await;
        for minute in 0..4 {
            fx.audit
                .append(&AuditEntry::new(
                    utc(15, 9, minute),
                    Outcome::Failed,
                    "ghost@example.com",
                ))
                .unwrap();
        }
        let err = fx
            .authenticator
            .login(&fx.accounts, request(Some("ghost@example.com"), Some("anyPassword")))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Blocked));
    }

    #[tokio::test]
    async fn lockout_does_not_spill_to_other_identities() {
        let fx = fixture().await;
        for minute in 0..5 {
            fx.audit
                .append(&AuditEntry::new(
                    utc(15, 9, minute),
                    Outcome::Failed,
                    "other@example.com",
                ))
                .unwrap();
        }
        let err = fx
            .authenticator
            .login(&fx.accounts, request(Some("user@example.com"), Some("wrongPassword")))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::CredentialMismatch));
    }

    #[tokio::test]
    async fn broken_audit_log_fails_open() {
        let fx = fixture().await;
        let auditor = LoginAuditor::new(Arc::new(BrokenStore));
        let authenticator = Authenticator::new(
            Arc::new(auditor),
            ThrottlePolicy::new(1),
            fx.authenticator.keys().clone(),
        );

        let err = authenticator
            .login(&fx.accounts, request(Some("user@example.com"), Some("wrongPassword")))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::CredentialMismatch));

        assert!(authenticator
            .login(&fx.accounts, request(Some("user@example.com"), Some("correctPassword")))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn unusable_stored_hash_counts_as_mismatch() {
        let fx = fixture().await;
        fx.accounts
            .create_account(NewAccount {
                name: "Legacy".to_string(),
                email: "legacy@example.com".to_string(),
                password_hash: "$2a$10$abcdefghijklmnopqrstuuLegacyBcryptHashValue".to_string(),
                role: Role::Customer,
                store_name: None,
                phone_number: None,
            })
            .await
            .unwrap();

        for attempt in 1..=4 {
            let err = fx
                .authenticator
                .login(&fx.accounts, request(Some("legacy@example.com"), Some("pw")))
                .await
                .unwrap_err();
            assert!(matches!(err, LoginError::CredentialMismatch));
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(fx.audit.entries().unwrap().len(), attempt);
        }

        let err = fx
            .authenticator
            .login(&fx.accounts, request(Some("legacy@example.com"), Some("pw")))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Blocked));
        assert_eq!(
            outcomes(&fx.audit),
            vec![(Outcome::Failed, "legacy@example.com".to_string()); 5]
        );
    }
}
