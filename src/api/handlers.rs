use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};

use crate::controller::CreateTokenInput;
use crate::errors::AppError;
use crate::models::principal::Session;
use crate::models::token::{Token, TokenResponse};
use crate::AppState;

/// Resolve the calling session from `Authorization: Bearer <jwt>`.
fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Result<Session, AppError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthenticated)?;
    let claims = state.sessions.decode_session(bearer)?;
    Ok(Session {
        principal_id: claims.pid,
        principal_uid: claims.sub,
    })
}

/// POST /api/v1/service-accounts/{sa_uid}/tokens — issue a token.
/// The access_token field of the response is the only place the plaintext
/// credential ever appears.
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Path(sa_uid): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<CreateTokenInput>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let session = session_from_headers(&state, &headers)?;
    let response = state
        .controller
        .create_token(&session, &sa_uid, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/service-accounts/{sa_uid}/tokens — list token metadata.
pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
    Path(sa_uid): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Token>>, AppError> {
    let session = session_from_headers(&state, &headers)?;
    let tokens = state.controller.list_tokens(&session, &sa_uid).await?;
    Ok(Json(tokens))
}

/// DELETE /api/v1/service-accounts/{sa_uid}/tokens/{token_uid} — revoke.
pub async fn delete_token(
    State(state): State<Arc<AppState>>,
    Path((sa_uid, token_uid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let session = session_from_headers(&state, &headers)?;
    state
        .controller
        .delete_token(&session, &sa_uid, &token_uid)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
