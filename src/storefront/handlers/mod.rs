pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod me;
pub use self::me::me;

pub mod register;
pub use self::register::{register_customer, register_seller};

// common functions for the handlers
use regex::Regex;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}
