//! Bearer-token gate for protected routes.
//!
//! Runs before the handler, does no I/O and never touches the audit log. A
//! verified token becomes a [`Principal`] in the request extensions.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use utoipa::ToSchema;

use super::token::{SessionKeys, TokenError};
use crate::storefront::response::Envelope;

pub const MSG_AUTHORIZATION_NEEDED: &str = "Authorization needed";

/// Authenticated caller, as carried by the session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    #[serde(rename = "id")]
    pub account_id: i64,
    pub role_id: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GateError {
    MissingBearer,
    Verification(TokenError),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingBearer => {
                Envelope::new(MSG_AUTHORIZATION_NEEDED, StatusCode::UNAUTHORIZED, false)
                    .into_response()
            }
            Self::Verification(err) => {
                let message = err.to_string();
                Envelope::new(&message, StatusCode::UNAUTHORIZED, false)
                    .with_extra(json!({ "error": message }))
                    .into_response()
            }
        }
    }
}

/// Token following `Bearer ` in the `Authorization` header, if any.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Check the request's bearer token.
///
/// # Errors
/// `MissingBearer` when there is no usable `Bearer` header (checked before any
/// token parsing), `Verification` when the token does not verify.
pub fn authorize(headers: &HeaderMap, keys: &SessionKeys) -> Result<Principal, GateError> {
    let token = bearer_token(headers).ok_or(GateError::MissingBearer)?;
    let claims = keys.verify(token).map_err(GateError::Verification)?;
    Ok(Principal {
        account_id: claims.account_id,
        role_id: claims.role_id,
    })
}

/// axum middleware: `middleware::from_fn_with_state(keys, require_bearer)`.
pub async fn require_bearer(
    State(keys): State<SessionKeys>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize(request.headers(), &keys) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => {
            debug!("Rejected request at auth gate: {err:?}");
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::auth::token::SessionClaims;
    use axum::{
        body::{to_bytes, Body},
        http::HeaderValue,
        middleware,
        routing::get,
        Extension, Router,
    };
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn keys() -> SessionKeys {
        SessionKeys::new(&SecretString::from("KODERAHASIA".to_string()))
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/protected",
                get(|Extension(principal): Extension<Principal>| async move {
                    format!("{}:{}", principal.account_id, principal.role_id)
                }),
            )
            .layer(middleware::from_fn_with_state(keys(), require_bearer))
    }

    async fn call(authorization: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let token = keys().issue(&SessionClaims::new(1, 3)).unwrap();
        let (status, body) = call(Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1:3");
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (status, body) = call(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Authorization needed");
    }

    #[tokio::test]
    async fn wrong_scheme_is_rejected_before_parsing() {
        let (status, body) = call(Some("InvalidToken")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["message"], "Authorization needed");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn bad_token_carries_verification_message() {
        let (status, body) = call(Some("Bearer invalid-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], json["error"]);
        assert_ne!(json["message"], "Authorization needed");
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn authorize_maps_claims() {
        let token = keys().issue(&SessionClaims::new(9, 2)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(
            authorize(&headers, &keys()),
            Ok(Principal {
                account_id: 9,
                role_id: 2
            })
        );
    }
}
