use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::balancer::Engine;
use crate::error::BalancerError;
use crate::wire::{
    ConfigureBody, ConfigureResponse, ErrorResponse, LogsResponse, RequestView, ServerNotice,
    ServerView, SubmitBody, SubmitResponse,
};

/// File name offered by the log download route.
pub const LOG_FILE_NAME: &str = "load_balancer.log";

#[derive(Clone)]
pub struct DashboardState {
    pub engine: Arc<Engine>,
}

/// Engine error rendered as `{"error": ...}` with a matching status code.
pub struct ApiError(pub BalancerError);

impl From<BalancerError> for ApiError {
    fn from(err: BalancerError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BalancerError::MalformedRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(BalancerError::MalformedRequest(rejection.body_text()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            BalancerError::DuplicateRequest(_) => StatusCode::CONFLICT,
            BalancerError::UnknownServer(_) => StatusCode::NOT_FOUND,
            BalancerError::InvalidConfiguration(_)
            | BalancerError::UnknownClient(_)
            | BalancerError::ClientQuotaExhausted(_)
            | BalancerError::InvalidPriority(_)
            | BalancerError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/configure", post(configure_handler))
        .route("/send_request", post(send_request_handler))
        .route("/requests", get(list_requests_handler))
        .route("/servers", get(list_servers_handler))
        .route("/server_down/:server_id", post(server_down_handler))
        .route("/server_up/:server_id", post(server_up_handler))
        .route("/logs", get(logs_handler))
        .route("/logs/download", get(download_logs_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the HTTP surface on an already-bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: DashboardState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn configure_handler(
    State(state): State<DashboardState>,
    body: Result<Json<ConfigureBody>, JsonRejection>,
) -> Result<Json<ConfigureResponse>, ApiError> {
    let Json(body) = body?;
    let topology = state
        .engine
        .configure(body.num_servers, body.num_clients, body.requests_per_client)
        .await?;
    Ok(Json(topology.into()))
}

async fn send_request_handler(
    State(state): State<DashboardState>,
    body: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(body) = body?;
    let ack = state
        .engine
        .submit(body.client_id, body.request_id, body.priority)
        .await?;
    Ok((StatusCode::CREATED, Json(ack.into())))
}

async fn list_requests_handler(State(state): State<DashboardState>) -> Json<Vec<RequestView>> {
    let requests = state.engine.list_requests().await;
    Json(requests.iter().map(RequestView::from).collect())
}

async fn list_servers_handler(State(state): State<DashboardState>) -> Json<Vec<ServerView>> {
    let servers = state.engine.list_servers().await;
    Json(servers.iter().map(ServerView::from).collect())
}

async fn server_down_handler(
    State(state): State<DashboardState>,
    server_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<ServerNotice>, ApiError> {
    let Path(server_id) = server_id?;
    let transition = state.engine.fail_server(server_id).await?;
    Ok(Json(ServerNotice::down(&transition)))
}

async fn server_up_handler(
    State(state): State<DashboardState>,
    server_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<ServerNotice>, ApiError> {
    let Path(server_id) = server_id?;
    let transition = state.engine.recover_server(server_id).await?;
    Ok(Json(ServerNotice::up(&transition)))
}

async fn logs_handler(State(state): State<DashboardState>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.engine.log_messages().await,
    })
}

async fn download_logs_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    let body = state.engine.render_log().await;
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", LOG_FILE_NAME),
            ),
        ],
        body,
    )
}
