#![allow(clippy::needless_for_each)]

use axum::response::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::storefront::{
    auth::{LoginRequest, Principal},
    handlers::{
        health::{self, __path_health},
        login::{self, __path_login},
        me::__path_me,
        register::{self, __path_register_customer, __path_register_seller},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(health, login, register_customer, register_seller, me),
    components(schemas(
        health::Health,
        LoginRequest,
        login::LoginResponse,
        register::CustomerRegistration,
        register::SellerRegistration,
        Principal
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "storefront", description = "E-commerce accounts and login API")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

// axum handler for /openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}
