//! xlsmart-api - HTTP API server for the XLSMART analysis backend.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xlsmart_core::new_v7;
use xlsmart_db::Database;
use xlsmart_inference::GatewayClient;
use xlsmart_jobs::{handlers::HandlerDeps, JobIntake, WorkerBuilder, WorkerConfig};

use crate::handlers::AppState;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = new_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Permissive CORS: any origin, method, and headers. The dashboard is
/// served from arbitrary hosts and the API carries no cookie auth.
fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "xlsmart_api=debug,xlsmart_jobs=debug,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/xlsmart".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(xlsmart_core::defaults::SERVER_PORT);

    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // LLM gateway client, shared by every handler
    let gateway = GatewayClient::from_env()?;
    info!(
        "LLM gateway initialized: {}",
        xlsmart_core::CompletionBackend::model_name(&gateway)
    );

    // Job intake over the same repositories the worker uses
    let intake = Arc::new(JobIntake::new(
        Arc::new(db.employees.clone()),
        Arc::new(db.sessions.clone()),
        Arc::new(db.jobs.clone()),
    ));

    // Create and start the bulk-job worker
    let worker_config = WorkerConfig::from_env();
    let _worker_handle = if worker_config.enabled {
        info!("Starting bulk-job worker...");
        let worker = WorkerBuilder::new(
            Arc::new(db.jobs.clone()),
            Arc::new(db.sessions.clone()),
        )
        .with_config(worker_config)
        .build()
        .await;

        let deps = HandlerDeps::from_pool(db.pool().clone(), Arc::new(gateway));
        xlsmart_jobs::handlers::register_all(&worker, deps).await;

        let handle = worker.start();
        info!("Bulk-job worker started");
        Some(handle)
    } else {
        info!("Bulk-job worker disabled");
        None
    };

    let state = AppState {
        db,
        intake,
    };

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/bulk/:kind", post(handlers::submit_analysis))
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:id", get(handlers::get_session))
        .route(
            "/sessions/:id/results",
            get(handlers::get_session_results),
        )
        .route("/jobs/stats", get(handlers::queue_stats))
        .route("/jobs/:id", get(handlers::get_job))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    fn cors_app() -> Router {
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(cors_layer())
    }

    #[tokio::test]
    async fn preflight_allows_any_origin() {
        let response = cors_app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/health")
                    .header(header::ORIGIN, "https://dashboard.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn simple_request_carries_cors_headers() {
        let response = cors_app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .header(header::ORIGIN, "http://some-other-host:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
