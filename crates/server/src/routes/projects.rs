use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::project::{CreateProject, ProjectWithContributorCount, UpdateProject};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::{Deployment, error::ApiError, http::auth::CurrentUser};

pub async fn get_projects(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectWithContributorCount>>>, ApiError> {
    let projects = deployment
        .project()
        .list(&deployment.db().pool, user.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn create_project(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateProject>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ProjectWithContributorCount>>), ApiError> {
    tracing::debug!("Creating project '{}'", payload.name);
    let project = deployment
        .project()
        .create(&deployment.db().pool, user.id, payload)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(project))))
}

pub async fn get_project(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectWithContributorCount>>, ApiError> {
    let project = deployment
        .project()
        .get(&deployment.db().pool, user.id, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn update_project(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<ProjectWithContributorCount>>, ApiError> {
    let project = deployment
        .project()
        .update(&deployment.db().pool, user.id, project_id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .project()
        .delete(&deployment.db().pool, user.id, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/projects", get(get_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project).put(update_project).delete(delete_project),
        )
}
