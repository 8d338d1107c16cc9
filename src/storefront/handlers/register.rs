//! Customer and seller sign-up.
//!
//! Both routes share one flow: check the form, refuse an email that is already
//! taken, hash the password and insert the account with its role. Registration
//! never writes to the login audit log.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use super::valid_email;
use crate::storefront::{
    accounts::{AccountStore, NewAccount, Role, StoreError},
    auth::password::{hash_password_blocking, CredentialError},
    response::Envelope,
};

pub const MSG_CUSTOMER_CREATED: &str = "Congratulation! Now you have an account!";
pub const MSG_CUSTOMER_INVALID: &str = "Oops! You have to fill all form for register!";
pub const MSG_SELLER_CREATED: &str = "Register as a Seller successfully";
pub const MSG_SELLER_INVALID: &str = "Error";
pub const MSG_EMAIL_USED: &str = "Email already used";

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct CustomerRegistration {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct SellerRegistration {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("missing or invalid field")]
    Validation,
    #[error("{}", MSG_EMAIL_USED)]
    Duplicate,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<StoreError> for RegisterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::Duplicate,
            other => Self::Store(other),
        }
    }
}

impl RegisterError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::Store(_) | Self::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_envelope(self, invalid_message: &str) -> Envelope {
        match self {
            Self::Validation => Envelope::new(invalid_message, self.status(), false),
            Self::Duplicate => Envelope::new(MSG_EMAIL_USED, self.status(), false),
            Self::Store(_) | Self::Credential(_) => {
                error!("Registration failed: {self}");
                Envelope::new("Internal server error", self.status(), false)
            }
        }
    }
}

#[utoipa::path(
    post,
    path= "/register/customer",
    request_body = CustomerRegistration,
    responses (
        (status = 201, description = "Customer account created"),
        (status = 400, description = "A field is missing or invalid"),
        (status = 409, description = "Email already registered"),
    ),
    tag= "register"
)]
#[instrument(skip_all)]
pub async fn register_customer(
    accounts: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<CustomerRegistration>>,
) -> Envelope {
    let form = payload.map(|Json(form)| form).unwrap_or_default();

    match create_customer(accounts.0.as_ref(), form).await {
        Ok(account_id) => {
            info!("Registered customer account {account_id}");
            Envelope::new(MSG_CUSTOMER_CREATED, StatusCode::CREATED, true)
                .with_extra(json!({ "id": account_id }))
        }
        Err(err) => err.into_envelope(MSG_CUSTOMER_INVALID),
    }
}

#[utoipa::path(
    post,
    path= "/register/seller",
    request_body = SellerRegistration,
    responses (
        (status = 201, description = "Seller account created"),
        (status = 400, description = "A field is missing or invalid"),
        (status = 409, description = "Email already registered"),
    ),
    tag= "register"
)]
#[instrument(skip_all)]
pub async fn register_seller(
    accounts: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<SellerRegistration>>,
) -> Envelope {
    let form = payload.map(|Json(form)| form).unwrap_or_default();

    match create_seller(accounts.0.as_ref(), form).await {
        Ok(account_id) => {
            info!("Registered seller account {account_id}");
            Envelope::new(MSG_SELLER_CREATED, StatusCode::CREATED, true)
                .with_extra(json!({ "id": account_id }))
        }
        Err(err) => err.into_envelope(MSG_SELLER_INVALID),
    }
}

async fn create_customer(
    accounts: &dyn AccountStore,
    form: CustomerRegistration,
) -> Result<i64, RegisterError> {
    let (Some(name), Some(email), Some(password)) =
        (required(form.name), required(form.email), required(form.password))
    else {
        return Err(RegisterError::Validation);
    };

    create_account(accounts, name, email, password, Role::Customer, None, None).await
}

async fn create_seller(
    accounts: &dyn AccountStore,
    form: SellerRegistration,
) -> Result<i64, RegisterError> {
    let (Some(name), Some(store_name), Some(email), Some(phone_number), Some(password)) = (
        required(form.name),
        required(form.store_name),
        required(form.email),
        required(form.phone_number),
        required(form.password),
    ) else {
        return Err(RegisterError::Validation);
    };

    create_account(
        accounts,
        name,
        email,
        password,
        Role::Seller,
        Some(store_name),
        Some(phone_number),
    )
    .await
}

async fn create_account(
    accounts: &dyn AccountStore,
    name: String,
    email: String,
    password: String,
    role: Role,
    store_name: Option<String>,
    phone_number: Option<String>,
) -> Result<i64, RegisterError> {
    if !valid_email(&email) {
        debug!("Invalid email");
        return Err(RegisterError::Validation);
    }

    // cheap check first; the unique index still guards concurrent sign-ups
    if !accounts.find_account_by_identity(&email).await?.is_empty() {
        return Err(RegisterError::Duplicate);
    }

    let password_hash = hash_password_blocking(password).await?;

    Ok(accounts
        .create_account(NewAccount {
            name,
            email,
            password_hash,
            role,
            store_name,
            phone_number,
        })
        .await?)
}

/// Present and not blank.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
