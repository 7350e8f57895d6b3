use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use hrflow_core::domain::actor::{ActorId, Role};
use hrflow_core::domain::approval::ApprovalLogEntry;
use hrflow_core::domain::request::{CreateRequestInput, RequestId, RequestPayload, WorkflowRequest};
use hrflow_core::domain::revision::RequestVersionSnapshot;
use hrflow_core::errors::{InterfaceError, WorkflowError};
use hrflow_core::workflow::{
    TransitionCommand, UpdateRequestInput, WorkflowAction, WorkflowEngine, WorkflowStatus,
};
use hrflow_core::SystemClock;
use hrflow_db::{SqlActorDirectory, SqlWorkflowStore};

pub type Engine = WorkflowEngine<SqlWorkflowStore, SqlActorDirectory, SystemClock>;

pub const ACTOR_HEADER: &str = "x-actor-id";
pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct ApiState {
    engine: Arc<Engine>,
}

impl ApiState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/{id}", get(get_request).patch(update_request))
        .route("/requests/{id}/transitions", post(transition_request))
        .route("/requests/{id}/history", get(request_history))
        .route("/requests/{id}/versions", get(request_versions))
        .route("/approvals/pending", get(pending_approvals))
        .with_state(ApiState::new(engine))
}

/// Caller identity and tracing context, taken from headers and never from the body.
#[derive(Clone, Debug)]
struct CallContext {
    actor_id: Option<ActorId>,
    ip_address: Option<String>,
    correlation_id: String,
}

impl CallContext {
    fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Self {
            actor_id: header(ACTOR_HEADER).map(ActorId::new),
            ip_address: header("x-forwarded-for")
                .and_then(|chain| chain.split(',').next().map(|ip| ip.trim().to_string())),
            correlation_id: header(CORRELATION_HEADER)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    fn actor(&self) -> Result<ActorId, ApiError> {
        self.actor_id.clone().ok_or_else(|| ApiError::Unauthenticated {
            correlation_id: self.correlation_id.clone(),
        })
    }

    fn fail(&self, error: WorkflowError) -> ApiError {
        ApiError::Workflow(error.into_interface(self.correlation_id.clone()))
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated { correlation_id: String },
    Workflow(InterfaceError),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Unauthenticated { correlation_id } => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "UNAUTHENTICATED".to_string(),
                    message: format!("missing `{ACTOR_HEADER}` header"),
                    detail: None,
                    correlation_id,
                },
            ),
            Self::Workflow(error) => {
                let status = match &error {
                    InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
                    InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
                    InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
                    InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
                    InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!(
                        event_name = "http.request.failed",
                        correlation_id = %error.correlation_id(),
                        error = %error,
                        "request failed with internal error"
                    );
                } else {
                    warn!(
                        event_name = "http.request.rejected",
                        correlation_id = %error.correlation_id(),
                        error_code = error.code(),
                        "request rejected"
                    );
                }
                let detail = match &error {
                    InterfaceError::Internal { .. } => None,
                    other => Some(other.to_string()),
                };
                (
                    status,
                    ErrorBody {
                        code: error.code().to_string(),
                        message: error.user_message().to_string(),
                        detail,
                        correlation_id: error.correlation_id().to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateRequestBody {
    pub payload: RequestPayload,
    #[serde(default)]
    pub save_as_draft: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateRequestBody {
    pub payload: RequestPayload,
    pub expected_version: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransitionBody {
    pub action: WorkflowAction,
    pub expected_version: u32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: WorkflowRequest,
    pub available_actions: Vec<WorkflowAction>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransitionView {
    pub previous_status: WorkflowStatus,
    pub new_status: WorkflowStatus,
    pub version: u32,
    pub current_approver_id: Option<ActorId>,
    pub current_approver_role: Option<Role>,
}

async fn create_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<WorkflowRequest>), ApiError> {
    let call = CallContext::from_headers(&headers);
    let requester = call.actor()?;
    let input = CreateRequestInput { payload: body.payload, save_as_draft: body.save_as_draft };

    let created = state.engine.create(input, &requester).await.map_err(|error| call.fail(error))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RequestView>, ApiError> {
    let call = CallContext::from_headers(&headers);
    let id = RequestId::new(id);

    let request = state.engine.get_request(&id).await.map_err(|error| call.fail(error))?;
    let available_actions =
        state.engine.available_actions(&id).await.map_err(|error| call.fail(error))?;
    Ok(Json(RequestView { request, available_actions }))
}

async fn update_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateRequestBody>,
) -> Result<Json<WorkflowRequest>, ApiError> {
    let call = CallContext::from_headers(&headers);
    let user = call.actor()?;

    let updated = state
        .engine
        .update(
            &RequestId::new(id),
            UpdateRequestInput { payload: body.payload },
            body.expected_version,
            &user,
        )
        .await
        .map_err(|error| call.fail(error))?;
    Ok(Json(updated))
}

async fn transition_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TransitionBody>,
) -> Result<Json<TransitionView>, ApiError> {
    let call = CallContext::from_headers(&headers);
    let actor = call.actor()?;

    let mut command =
        TransitionCommand::new(RequestId::new(id), actor, body.action, body.expected_version);
    if let Some(comment) = body.comment {
        command = command.with_comment(comment);
    }
    if let Some(ip) = call.ip_address.clone() {
        command = command.from_ip(ip);
    }

    let receipt = state.engine.transition(command).await.map_err(|error| call.fail(error))?;
    Ok(Json(TransitionView {
        previous_status: receipt.previous_status,
        new_status: receipt.new_status,
        version: receipt.request.version,
        current_approver_id: receipt.request.current_approver_id,
        current_approver_role: receipt.request.current_approver_role,
    }))
}

async fn request_history(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApprovalLogEntry>>, ApiError> {
    let call = CallContext::from_headers(&headers);
    let entries =
        state.engine.history(&RequestId::new(id)).await.map_err(|error| call.fail(error))?;
    Ok(Json(entries))
}

async fn request_versions(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<RequestVersionSnapshot>>, ApiError> {
    let call = CallContext::from_headers(&headers);
    let snapshots =
        state.engine.versions(&RequestId::new(id)).await.map_err(|error| call.fail(error))?;
    Ok(Json(snapshots))
}

async fn pending_approvals(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<WorkflowRequest>>, ApiError> {
    let call = CallContext::from_headers(&headers);
    let approver = call.actor()?;
    let pending = state
        .engine
        .list_pending_for_approver(&approver)
        .await
        .map_err(|error| call.fail(error))?;
    Ok(Json(pending))
}
