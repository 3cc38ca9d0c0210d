use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::contributor::{Contributor, CreateContributor};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::{Deployment, error::ApiError, http::auth::CurrentUser};

pub async fn get_contributors(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Contributor>>>, ApiError> {
    let contributors = deployment
        .contributor()
        .list(&deployment.db().pool, user.id, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(contributors)))
}

pub async fn add_contributor(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateContributor>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Contributor>>), ApiError> {
    let contributor = deployment
        .contributor()
        .add(&deployment.db().pool, user.id, project_id, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(contributor)),
    ))
}

pub async fn remove_contributor(
    State(deployment): State<Deployment>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath((project_id, contributor_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .contributor()
        .remove(&deployment.db().pool, user.id, project_id, contributor_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route(
            "/projects/{project_id}/contributors",
            get(get_contributors).post(add_contributor),
        )
        .route(
            "/projects/{project_id}/contributors/{contributor_id}",
            delete(remove_contributor),
        )
}
