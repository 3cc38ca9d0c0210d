use db::{
    TransactionTrait,
    models::{
        contributor::Contributor,
        project::{CreateProject, Project, ProjectWithContributorCount, UpdateProject},
    },
};
use uuid::Uuid;

use super::{
    authorization::{AccessRequest, Action, ResourceKind, Verb, authorize},
    error::{Result, ServiceError},
    membership::{MembershipResolver, Protected, ResolvedScope},
};

#[derive(Clone, Default)]
pub struct ProjectService {
    membership: MembershipResolver,
}

impl ProjectService {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("name", "This field may not be blank."));
        }
        Ok(())
    }

    async fn authorize_project(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        verb: Verb,
    ) -> Result<ResolvedScope> {
        let scope = self
            .membership
            .resolve(pool, principal, Protected::Project(project_id))
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
        authorize(
            &AccessRequest::new(Some(principal), Action::new(ResourceKind::Project, verb))
                .with_membership(scope.membership),
        )
        .into_result()?;
        Ok(scope)
    }

    /// Projects the principal contributes to. Never anything else.
    pub async fn list(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
    ) -> Result<Vec<ProjectWithContributorCount>> {
        authorize(&AccessRequest::new(
            Some(principal),
            Action::new(ResourceKind::Project, Verb::Read),
        ))
        .into_result()?;

        let projects = Project::find_for_contributor(pool, principal).await?;
        let mut counted = Vec::with_capacity(projects.len());
        for project in projects {
            counted.push(project.with_contributor_count(pool).await?);
        }
        Ok(counted)
    }

    /// Creates the project and the author's contributor link atomically.
    pub async fn create(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        payload: CreateProject,
    ) -> Result<ProjectWithContributorCount> {
        authorize(&AccessRequest::new(
            Some(principal),
            Action::new(ResourceKind::Project, Verb::Create),
        ))
        .into_result()?;
        Self::validate_name(&payload.name)?;

        let tx = pool.begin().await?;
        let project = Project::create(&tx, &payload, principal, Uuid::new_v4()).await?;
        Contributor::create(&tx, principal, project.id, Uuid::new_v4()).await?;
        let project = project.with_contributor_count(&tx).await?;
        tx.commit().await?;

        tracing::debug!("Created project {} for user {}", project.id, principal);
        Ok(project)
    }

    pub async fn get(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
    ) -> Result<ProjectWithContributorCount> {
        self.authorize_project(pool, principal, project_id, Verb::Read)
            .await?;
        let project = Project::find_by_id(pool, project_id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
        Ok(project.with_contributor_count(pool).await?)
    }

    pub async fn update(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        payload: UpdateProject,
    ) -> Result<ProjectWithContributorCount> {
        self.authorize_project(pool, principal, project_id, Verb::Update)
            .await?;
        if let Some(name) = payload.name.as_deref() {
            Self::validate_name(name)?;
        }
        let project = Project::update(pool, project_id, &payload).await?;
        Ok(project.with_contributor_count(pool).await?)
    }

    /// Deletes the project with its contributors, issues and comments.
    pub async fn delete(&self, pool: &db::DbPool, principal: Uuid, project_id: Uuid) -> Result<()> {
        self.authorize_project(pool, principal, project_id, Verb::Delete)
            .await?;

        let tx = pool.begin().await?;
        let rows_affected = Project::delete(&tx, project_id).await?;
        tx.commit().await?;

        if rows_affected == 0 {
            return Err(ServiceError::NotFound("Project"));
        }
        tracing::info!("Deleted project {} by user {}", project_id, principal);
        Ok(())
    }
}
