use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::comment::{CommentWithIssueName, CreateComment, UpdateComment};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::{Deployment, error::ApiError, http::auth::CurrentUser};

pub async fn get_comments(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<Vec<CommentWithIssueName>>>, ApiError> {
    let comments = deployment
        .comment()
        .list(&deployment.db().pool, user.id, project_id, issue_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(comments)))
}

pub async fn create_comment(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(payload): ApiJson<CreateComment>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<CommentWithIssueName>>), ApiError> {
    let comment = deployment
        .comment()
        .create(&deployment.db().pool, user.id, project_id, issue_id, payload)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(comment))))
}

pub async fn get_comment(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id, comment_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<CommentWithIssueName>>, ApiError> {
    let comment = deployment
        .comment()
        .get(
            &deployment.db().pool,
            user.id,
            project_id,
            issue_id,
            comment_id,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

pub async fn update_comment(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id, comment_id)): ApiPath<(Uuid, Uuid, Uuid)>,
    ApiJson(payload): ApiJson<UpdateComment>,
) -> Result<ResponseJson<ApiResponse<CommentWithIssueName>>, ApiError> {
    let comment = deployment
        .comment()
        .update(
            &deployment.db().pool,
            user.id,
            project_id,
            issue_id,
            comment_id,
            payload,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

pub async fn delete_comment(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id, comment_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .comment()
        .delete(
            &deployment.db().pool,
            user.id,
            project_id,
            issue_id,
            comment_id,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route(
            "/projects/{project_id}/issues/{issue_id}/comments",
            get(get_comments).post(create_comment),
        )
        .route(
            "/projects/{project_id}/issues/{issue_id}/comments/{comment_id}",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
}
