use axum::{extract::Extension, response::Json};

use crate::storefront::auth::Principal;

#[utoipa::path(
    get,
    path= "/me",
    responses (
        (status = 200, description = "Caller identified by the bearer token", body = Principal),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
/// Echo the principal the auth gate attached to the request.
pub async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}
