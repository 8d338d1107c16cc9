//! Login, session tokens and the bearer-token gate.

pub mod gate;
pub mod login;
pub mod password;
pub mod throttle;
pub mod token;

pub use gate::{require_bearer, GateError, Principal};
pub use login::{Authenticator, LoginError, LoginRequest, LoginSuccess};
pub use throttle::{ThrottleDecision, ThrottlePolicy, DEFAULT_MAX_FAILED_LOGINS};
pub use token::{SessionClaims, SessionKeys, TokenError};
