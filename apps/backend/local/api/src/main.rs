#[cfg(not(any(all(target_os = "macos", target_arch = "aarch64"), target_os = "ios")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use dotenv::dotenv;
use std::time::Instant;
use wastesense::{InferenceContext, ServiceConfig};
use wastesense_api::construct_router;

mod config;
mod metrics;

async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    // Matched route keeps label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request(&method, &path, response.status().as_u16(), duration);

    response
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = config::Config::from_env()?;
    metrics::init_telemetry(&config)?;

    tracing::info!("Starting WasteSense local API");

    let service_config = ServiceConfig::from_env()?;
    tracing::info!(
        "Loaded configuration: port={}, max_upload_bytes={}, remote={}",
        config.port,
        config.max_upload_bytes,
        service_config
            .remote
            .as_ref()
            .map(|r| r.repo_id.as_str())
            .unwrap_or("disabled")
    );

    let context = match InferenceContext::bootstrap(&service_config).await {
        Ok(context) => context,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize inference context");
            return Err(e.into());
        }
    };

    let app = construct_router(context, config.max_upload_bytes)
        .route("/metrics", get(metrics::handler))
        .route_layer(middleware::from_fn(metrics_middleware));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
