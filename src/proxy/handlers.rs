use super::error::InvocationError;
use super::protocol::*;
use super::remote::execute_call;
use crate::grid::GridNode;
use crate::service::ServiceRegistry;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;

/// HTTP routes of a grid node.
pub fn router(grid: Arc<GridNode>) -> Router {
    Router::new()
        .route(ENDPOINT_INTERNAL_INVOKE, post(handle_internal_invoke))
        .route(ENDPOINT_SERVICE_INVOKE, post(handle_service_invoke))
        .route(ENDPOINT_SERVICE_TOPOLOGY, get(handle_service_topology))
        .layer(Extension(grid))
}

/// Executes a call forwarded by another node's proxy.
pub async fn handle_internal_invoke(
    Extension(grid): Extension<Arc<GridNode>>,
    Json(req): Json<InvokeRequest>,
) -> (StatusCode, Json<InvokeResponse>) {
    let local_id = grid.local_id();

    if req.target != local_id {
        tracing::warn!(
            "Rejecting call for node {} received by node {}",
            req.target,
            local_id
        );
        let response = InvokeResponse::WrongNode { node: local_id };
        return (status_of(&response), Json(response));
    }

    tracing::debug!(
        "Received call {}.{}",
        req.call.service,
        req.call.method_key()
    );

    let result = execute_call(grid.registry.as_ref(), &local_id, req.call).await;
    let response = InvokeResponse::from_result(result);

    (status_of(&response), Json(response))
}

/// Invokes a service method through this node's cluster-wide proxy.
///
/// The body is the JSON array of call arguments.
pub async fn handle_service_invoke(
    Extension(grid): Extension<Arc<GridNode>>,
    Path((name, method)): Path<(String, String)>,
    Json(args): Json<Vec<Value>>,
) -> (StatusCode, Json<ServiceInvokeResponse>) {
    let proxy = grid.service_proxy(&name);

    match proxy.invoke(&method, args).await {
        Ok(value) => (
            StatusCode::OK,
            Json(ServiceInvokeResponse {
                value: Some(value),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Invocation of {}.{} failed: {:#}", name, method, e);
            (
                invocation_status(&e),
                Json(ServiceInvokeResponse {
                    value: None,
                    error: Some(format!("{:#}", e)),
                }),
            )
        }
    }
}

pub async fn handle_service_topology(
    Extension(grid): Extension<Arc<GridNode>>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Option<TopologyResponse>>) {
    match grid.registry.topology(&name) {
        Some(topology) => {
            let total_instances = topology.values().sum();
            (
                StatusCode::OK,
                Json(Some(TopologyResponse {
                    service: name,
                    topology,
                    total_instances,
                })),
            )
        }
        None => (StatusCode::NOT_FOUND, Json(None)),
    }
}

fn status_of(response: &InvokeResponse) -> StatusCode {
    StatusCode::from_u16(response.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn invocation_status(err: &InvocationError) -> StatusCode {
    match err {
        InvocationError::ServiceUnavailable { .. } | InvocationError::MethodNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        InvocationError::Interrupted => StatusCode::SERVICE_UNAVAILABLE,
        InvocationError::Dispatch(_) => StatusCode::BAD_GATEWAY,
        InvocationError::ServiceNotFound { .. }
        | InvocationError::TopologyChanged { .. }
        | InvocationError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
