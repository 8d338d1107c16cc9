use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use crate::storefront::{
    accounts::AccountStore,
    auth::{login::MSG_LOGIN_SUCCESS, Authenticator, LoginRequest},
    response::Envelope,
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    success: bool,
    message: String,
    token: String,
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Unknown email or wrong password"),
        (status = 429, description = "Too many failed attempts today"),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    accounts: Extension<Arc<dyn AccountStore>>,
    authenticator: Extension<Authenticator>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    match authenticator.login(accounts.0.as_ref(), request).await {
        Ok(success) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                message: MSG_LOGIN_SUCCESS.to_string(),
                token: success.token,
            }),
        )
            .into_response(),

        Err(err) => {
            if err.status().is_server_error() {
                error!("Login failed: {err}");
            }

            Envelope::new(&err.public_message(), err.status(), false).into_response()
        }
    }
}
