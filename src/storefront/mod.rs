use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post},
    Extension, Router,
};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod accounts;
pub mod audit;
pub mod auth;
pub mod handlers;
pub mod openapi;
pub mod response;

use accounts::{AccountStore, PgAccountStore, SCHEMA_SQL};
use audit::{DayBoundary, FileAuditStore, LoginAuditor};
use auth::{require_bearer, Authenticator, SessionKeys, ThrottlePolicy};

/// Audit log and throttle settings taken from the command line.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub path: PathBuf,
    pub day_boundary: DayBoundary,
    pub tally_cache: bool,
    pub max_failed_logins: usize,
}

impl AuditSettings {
    /// Build the login flow on top of a file-backed audit log.
    #[must_use]
    pub fn authenticator(&self, jwt_secret: &SecretString) -> Authenticator {
        let auditor = LoginAuditor::new(Arc::new(FileAuditStore::new(self.path.clone())))
            .with_day_boundary(self.day_boundary)
            .with_tally_cache(self.tally_cache);

        Authenticator::new(
            Arc::new(auditor),
            ThrottlePolicy::new(self.max_failed_logins),
            SessionKeys::new(jwt_secret),
        )
    }
}

/// Build the application router.
///
/// `/me` sits behind the bearer-token gate; `/health` is kept outside the
/// request tracing layer.
pub fn router(accounts: Arc<dyn AccountStore>, authenticator: Authenticator) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(
            authenticator.keys().clone(),
            require_bearer,
        ));

    Router::new()
        .route("/login", post(handlers::login))
        .route("/register/customer", post(handlers::register_customer))
        .route("/register/seller", post(handlers::register_seller))
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(authenticator)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(Extension(accounts))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    jwt_secret: SecretString,
    audit: AuditSettings,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&pool)
        .await
        .context("Failed to apply database schema")?;

    info!(
        "Audit log: {} (day boundary: {:?}, tally cache: {}, max failed logins: {})",
        audit.path.display(),
        audit.day_boundary,
        audit.tally_cache,
        audit.max_failed_logins
    );

    let accounts: Arc<dyn AccountStore> = Arc::new(PgAccountStore::new(pool));
    let app = router(accounts, audit.authenticator(&jwt_secret));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
