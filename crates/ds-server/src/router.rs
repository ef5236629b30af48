//! Axum router construction.
//!
//! Builds the full application router with all route groups, middleware
//! layers, and static frame serving.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::stream::dash_manifest,
        routes::stream::hls_manifest,
        routes::stream::rtmp_location,
        routes::stream::frames,
        routes::admin::tools,
    ),
    components(schemas(
        routes::health::HealthResponse,
        ds_av::ToolInfo,
        ds_core::StreamKind,
    ))
)]
struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Streams
        .route("/stream/{id}/dash", get(routes::stream::dash_manifest))
        .route("/stream/{id}/hls", get(routes::stream::hls_manifest))
        .route("/stream/{id}/rtmp", get(routes::stream::rtmp_location))
        .route(
            "/stream/{id}/frames/{count}",
            get(routes::stream::frames),
        )
        // Admin
        .route("/admin/tools", get(routes::admin::tools));

    let frames_dir = ctx.resolver.frames_dir().clone();
    let request_timeout = ctx.config.server.request_timeout();

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .nest_service("/frames", ServeDir::new(frames_dir))
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
