//! Route handlers
//!
//! Each handler resolves the friendly region, builds a region-scoped
//! backend and lifecycle, and maps the outcome onto the wire types.

use aws_lambda_events::http::{HeaderMap, HeaderValue};
use aws_lambda_events::lambda_function_urls::LambdaFunctionUrlResponse;
use std::sync::Arc;

use exitflow_cloud::ENV_TAILSCALE_AUTH_KEY;
use exitflow_cloud_aws::AwsNodeBackend;
use exitflow_core::api::{
    ErrorResponse, HealthResponse, NodesResponse, StartResponse, StopResponse,
};
use exitflow_core::region::Region;
use exitflow_node::{ACTIVE_STATES, NodeLifecycle};

pub fn json_response<T: serde::Serialize>(status_code: i64, data: &T) -> LambdaFunctionUrlResponse {
    let body = match serde_json::to_string(data) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(error = %err, "response serialization failed");
            return error_response(500, "Internal server error");
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/json"));

    LambdaFunctionUrlResponse {
        status_code,
        headers,
        body: Some(body),
        is_base64_encoded: false,
        cookies: Vec::new(),
    }
}

pub fn error_response(status_code: i64, message: impl Into<String>) -> LambdaFunctionUrlResponse {
    json_response(
        status_code,
        &ErrorResponse::new(status_code as u16, message),
    )
}

pub fn health() -> HealthResponse {
    HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

async fn lifecycle_for(region: &Region) -> NodeLifecycle<AwsNodeBackend> {
    let backend = AwsNodeBackend::new(region.aws_code()).await;
    NodeLifecycle::new(Arc::new(backend), region.friendly_name())
}

pub async fn list_nodes(friendly_region: &str) -> LambdaFunctionUrlResponse {
    let region = match Region::from_friendly(friendly_region) {
        Ok(region) => region,
        Err(err) => return error_response(400, err.to_string()),
    };

    let lifecycle = lifecycle_for(&region).await;
    match lifecycle.list().await {
        Ok(nodes) => {
            let count = nodes.len();
            json_response(
                200,
                &NodesResponse {
                    success: true,
                    message: format!("Found {count} instances in {region}"),
                    nodes,
                    count,
                },
            )
        }
        Err(err) => error_response(500, format!("Failed to list instances: {err}")),
    }
}

pub async fn start_node(friendly_region: &str) -> LambdaFunctionUrlResponse {
    let region = match Region::from_friendly(friendly_region) {
        Ok(region) => region,
        Err(err) => return error_response(400, err.to_string()),
    };

    let auth_key = match std::env::var(ENV_TAILSCALE_AUTH_KEY) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            return error_response(
                500,
                format!("{ENV_TAILSCALE_AUTH_KEY} environment variable not set"),
            );
        }
    };

    let lifecycle = lifecycle_for(&region).await;

    // One exit node per region; a second start is a conflict, not an error.
    match lifecycle.list().await {
        Ok(nodes) => {
            let active = nodes
                .iter()
                .filter(|node| ACTIVE_STATES.contains(&node.state.as_str()))
                .count();
            if active > 0 {
                return error_response(409, format!("Exit node already running in {region}"));
            }
        }
        Err(err) => {
            return error_response(500, format!("Failed to check existing instances: {err}"));
        }
    }

    match lifecycle.start(&auth_key).await {
        Ok(node) => json_response(
            201,
            &StartResponse {
                success: true,
                message: format!("Exit node started in {region}"),
                node: Some(node),
            },
        ),
        Err(err) => error_response(500, format!("Failed to start instance: {err}")),
    }
}

pub async fn stop_nodes(friendly_region: &str) -> LambdaFunctionUrlResponse {
    let region = match Region::from_friendly(friendly_region) {
        Ok(region) => region,
        Err(err) => return error_response(400, err.to_string()),
    };

    let lifecycle = lifecycle_for(&region).await;
    match lifecycle.stop().await {
        Ok(terminated_ids) => json_response(
            200,
            &StopResponse {
                success: true,
                message: format!("Terminated {} instances in {region}", terminated_ids.len()),
                terminated_count: terminated_ids.len(),
                terminated_ids,
            },
        ),
        Err(err) => error_response(500, format!("Failed to stop instances: {err}")),
    }
}

pub async fn cleanup_resources(friendly_region: &str) -> LambdaFunctionUrlResponse {
    let region = match Region::from_friendly(friendly_region) {
        Ok(region) => region,
        Err(err) => return error_response(400, err.to_string()),
    };

    tracing::info!(region = %region, "forced cleanup requested");

    let lifecycle = lifecycle_for(&region).await;
    match lifecycle.force_cleanup().await {
        Ok(cleaned) => json_response(
            200,
            &StopResponse {
                success: true,
                message: format!("Cleaned up {} resources in {region}", cleaned.len()),
                terminated_count: cleaned.len(),
                terminated_ids: cleaned,
            },
        ),
        Err(err) => error_response(500, format!("Cleanup failed: {err}")),
    }
}
