use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use riffle_service::{
    AnswerRequest, AnswerResponse, ConversationSummary, ConversationTurn, Error as ServiceError,
    RagContext, Role,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/answer", post(answer))
        .route(
            "/v1/conversations",
            post(create_conversation).get(list_conversations),
        )
        .route("/v1/conversations/{id}", delete(delete_conversation))
        .route("/v1/conversations/{id}/turns", post(add_turn))
        .route("/v1/conversations/{id}/context", get(get_context))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let response = state.service.answer(payload).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct CreateConversationRequest {
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateConversationResponse {
    conversation_id: String,
    turn_count: usize,
}

async fn create_conversation(
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<Json<CreateConversationResponse>, ApiError> {
    let (conversation_id, context) = state
        .service
        .conversations
        .get_or_create(payload.conversation_id.as_deref());
    let turn_count = context
        .lock()
        .unwrap_or_else(|err| err.into_inner())
        .turn_count();

    Ok(Json(CreateConversationResponse {
        conversation_id,
        turn_count,
    }))
}

#[derive(Debug, Deserialize)]
struct AddTurnRequest {
    role: Role,
    content: String,
}

async fn add_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddTurnRequest>,
) -> Result<Json<ConversationTurn>, ApiError> {
    let turn = state
        .service
        .conversations
        .add_turn(&id, payload.role, &payload.content)?;
    Ok(Json(turn))
}

#[derive(Debug, Deserialize)]
struct ContextQuery {
    compact: Option<bool>,
}

async fn get_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ContextQuery>,
) -> Result<Json<RagContext>, ApiError> {
    let context = state
        .service
        .conversations
        .context_for_rag(&id, query.compact.unwrap_or(true))?;
    Ok(Json(context))
}

#[derive(Debug, Serialize)]
struct ListConversationsResponse {
    conversations: Vec<ConversationSummary>,
}

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ListConversationsResponse>, ApiError> {
    let conversations = state.service.conversations.list();
    Ok(Json(ListConversationsResponse { conversations }))
}

#[derive(Debug, Serialize)]
struct DeleteConversationResponse {
    deleted: bool,
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConversationResponse>, ApiError> {
    let deleted = state.service.conversations.delete(&id);
    Ok(Json(DeleteConversationResponse { deleted }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match &err {
            ServiceError::InvalidRequest { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", err.to_string())
            }
            ServiceError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            ServiceError::Provider { .. } => {
                ApiError::new(StatusCode::BAD_GATEWAY, "provider_error", err.to_string())
            }
            ServiceError::Index { .. } => {
                ApiError::new(StatusCode::BAD_GATEWAY, "index_error", err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
