use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::issue::{CreateIssue, IssueWithDetails, UpdateIssue};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::{Deployment, error::ApiError, http::auth::CurrentUser};

pub async fn get_issues(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<IssueWithDetails>>>, ApiError> {
    let issues = deployment
        .issue()
        .list(&deployment.db().pool, user.id, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(issues)))
}

pub async fn create_issue(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateIssue>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<IssueWithDetails>>), ApiError> {
    let issue = deployment
        .issue()
        .create(&deployment.db().pool, user.id, project_id, payload)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(issue))))
}

pub async fn get_issue(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<IssueWithDetails>>, ApiError> {
    let issue = deployment
        .issue()
        .get(&deployment.db().pool, user.id, project_id, issue_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(issue)))
}

pub async fn update_issue(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(payload): ApiJson<UpdateIssue>,
) -> Result<ResponseJson<ApiResponse<IssueWithDetails>>, ApiError> {
    let issue = deployment
        .issue()
        .update(&deployment.db().pool, user.id, project_id, issue_id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(issue)))
}

pub async fn delete_issue(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, issue_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .issue()
        .delete(&deployment.db().pool, user.id, project_id, issue_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route(
            "/projects/{project_id}/issues",
            get(get_issues).post(create_issue),
        )
        .route(
            "/projects/{project_id}/issues/{issue_id}",
            get(get_issue).put(update_issue).delete(delete_issue),
        )
}
