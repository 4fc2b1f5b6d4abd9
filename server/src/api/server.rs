//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::Redirect;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::middleware::{self, AllowedOrigins};
use super::openapi::{self, openapi_json, swagger_ui_html};
use super::routes::{crud, entities, health};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::domain::entity::EntityRegistry;
use crate::domain::query::QueryLimits;

/// Assemble the full router: one CRUD route set per entity plus the fixed endpoints
///
/// With `debug` set, every request and response is logged at INFO.
pub fn build_router(
    registry: &EntityRegistry,
    limits: QueryLimits,
    allowed_origins: &AllowedOrigins,
    debug: bool,
) -> Router {
    let doc = Arc::new(openapi::build(registry));

    let mut router = Router::new()
        .route("/", get(|| async { Redirect::temporary("/api/docs") }))
        .route(
            "/api/v1/health",
            get(health::health).with_state(registry.clone()),
        )
        .route("/api/openapi.json", get(openapi_json).with_state(doc))
        .route("/api/docs", get(swagger_ui_html))
        .route("/api/docs/", get(swagger_ui_html))
        .nest("/api/v1/entities", entities::routes(registry.clone()));

    for resource in registry.iter() {
        let prefix = format!("/api/v1/{}", resource.name());
        tracing::debug!(path = %prefix, exposed = ?resource.exposed(), "Mounting entity routes");
        router = router.nest(&prefix, crud::routes(resource.clone(), limits));
    }

    let level = if debug { Level::INFO } else { Level::DEBUG };
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(level))
        .on_response(DefaultOnResponse::new().level(level));

    router
        .fallback(middleware::handle_404)
        .layer(trace)
        .layer(CompressionLayer::new())
        .layer(middleware::cors(allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self {
            app,
            allowed_origins,
        }
    }

    /// Serve until shutdown is triggered; returns the app for cleanup
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);
        let router = build_router(
            &app.registry,
            app.config.query.limits(),
            &allowed_origins,
            app.config.debug,
        );

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "API server listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(app.shutdown.wait())
            .await?;

        Ok(app)
    }
}
