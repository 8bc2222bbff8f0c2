//! ExitFlow control API
//!
//! The function behind the public URL: a thin authenticated dispatcher
//! over the node lifecycle. Routes:
//!
//! - `GET  /`                    health
//! - `GET  /{region}/instances`  list exit nodes
//! - `POST /{region}/start`      launch an exit node (409 if one is active)
//! - `POST /{region}/stop`       terminate exit nodes
//! - `POST /{region}/cleanup`    force-clean orphaned resources

mod auth;
mod handlers;

use aws_lambda_events::lambda_function_urls::{
    LambdaFunctionUrlRequest, LambdaFunctionUrlResponse,
};
use lambda_runtime::{Error, LambdaEvent, run, service_fn};

use crate::handlers::{error_response, json_response};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();
    run(service_fn(handler)).await
}

async fn handler(
    event: LambdaEvent<LambdaFunctionUrlRequest>,
) -> Result<LambdaFunctionUrlResponse, Error> {
    let request = event.payload;

    let method = request
        .request_context
        .http
        .method
        .clone()
        .unwrap_or_default();
    let path = request.raw_path.clone().unwrap_or_default();
    tracing::info!(%method, %path, "request");

    if let Err(err) = auth::validate(&request) {
        tracing::warn!(error = %err, "authentication failed");
        return Ok(error_response(401, format!("Unauthorized: {err}")));
    }

    let trimmed = path.trim_start_matches('/');
    let parts: Vec<&str> = trimmed.split('/').collect();

    let response = match (method.as_str(), parts.as_slice()) {
        ("GET", [""]) => json_response(200, &handlers::health()),
        ("GET", [region, "instances"]) => handlers::list_nodes(region).await,
        ("POST", [region, "start"]) => handlers::start_node(region).await,
        ("POST", [region, "stop"]) => handlers::stop_nodes(region).await,
        ("POST", [region, "cleanup"]) => handlers::cleanup_resources(region).await,
        _ => error_response(404, "Not found"),
    };

    Ok(response)
}
