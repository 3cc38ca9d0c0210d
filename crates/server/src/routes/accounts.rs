use axum::{
    Extension, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::user::{UpdateUser, User};
use services::services::account::{
    AccessToken, DeleteAccountRequest, LoginRequest, RefreshRequest, RegisterRequest,
};
use services::services::error::ServiceError;
use utils::response::ApiResponse;
use utils_jwt::TokenPair;

use super::ApiJson;
use crate::{Deployment, error::ApiError, http::auth::CurrentUser};

pub async fn register(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<User>>), ApiError> {
    let user = deployment
        .account()
        .register(&deployment.db().pool, payload)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(user))))
}

pub async fn login(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<TokenPair>>, ApiError> {
    let tokens = deployment
        .account()
        .login(&deployment.db().pool, deployment.jwt(), payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(tokens)))
}

pub async fn refresh(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<ResponseJson<ApiResponse<AccessToken>>, ApiError> {
    let token = deployment
        .account()
        .refresh(&deployment.db().pool, deployment.jwt(), payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(token)))
}

pub async fn get_profile(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ResponseJson<ApiResponse<User>> {
    ResponseJson(ApiResponse::success(user))
}

pub async fn update_profile(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<UpdateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = deployment
        .account()
        .update_profile(&deployment.db().pool, user.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn delete_account(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let payload = parse_delete_request(&body)?;
    deployment
        .account()
        .delete_account(&deployment.db().pool, user.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// DELETE bodies are optional; an absent body means no confirmation was given.
fn parse_delete_request(body: &[u8]) -> Result<DeleteAccountRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DeleteAccountRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        ServiceError::validation("non_field_errors", format!("Malformed request body: {err}"))
            .into()
    })
}

/// Registration and token endpoints, reachable without a bearer token.
pub fn public_router() -> Router<Deployment> {
    let auth_router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh));

    Router::new().nest("/auth", auth_router)
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/delete-account", delete(delete_account))
}
