use db::{
    TransactionTrait,
    models::{
        issue::{CreateIssue, Issue, IssueWithDetails, UpdateIssue},
        project::Project,
    },
};
use uuid::Uuid;

use super::{
    authorization::{AccessRequest, Action, ResourceKind, Verb, authorize},
    error::{Result, ServiceError},
    membership::{MembershipResolver, Protected},
};

#[derive(Clone, Default)]
pub struct IssueService {
    membership: MembershipResolver,
}

impl IssueService {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("name", "This field may not be blank."));
        }
        Ok(())
    }

    /// An assignee must contribute to the issue's project when it is set.
    async fn validate_assignee(
        &self,
        pool: &db::DbPool,
        project_id: Uuid,
        assignee_id: Uuid,
    ) -> Result<()> {
        if !self
            .membership
            .is_contributor(pool, assignee_id, project_id)
            .await?
        {
            return Err(ServiceError::validation(
                "assignee_id",
                "The assignee must be a contributor of the project.",
            ));
        }
        Ok(())
    }

    /// Collection access: list and create under an existing project.
    async fn authorize_collection(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        verb: Verb,
    ) -> Result<()> {
        let scope = self
            .membership
            .resolve(pool, principal, Protected::Project(project_id))
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
        authorize(
            &AccessRequest::new(Some(principal), Action::new(ResourceKind::Issue, verb))
                .with_membership(scope.membership),
        )
        .into_result()?;
        Ok(())
    }

    /// Loads the issue from its parent project and checks `verb` against it.
    async fn authorized_issue(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
        verb: Verb,
    ) -> Result<Issue> {
        Project::find_by_id(pool, project_id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
        let issue = Issue::find_in_project(pool, project_id, issue_id)
            .await?
            .ok_or(ServiceError::NotFound("Issue"))?;

        let scope = self
            .membership
            .resolve(pool, principal, Protected::Issue(issue.id))
            .await?
            .ok_or(ServiceError::NotFound("Issue"))?;
        authorize(
            &AccessRequest::new(Some(principal), Action::new(ResourceKind::Issue, verb))
                .with_membership(scope.membership)
                .with_resource_author(issue.author_id),
        )
        .into_result()?;
        Ok(issue)
    }

    pub async fn list(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<IssueWithDetails>> {
        self.authorize_collection(pool, principal, project_id, Verb::Read)
            .await?;

        let issues = Issue::find_by_project_id(pool, project_id).await?;
        let mut detailed = Vec::with_capacity(issues.len());
        for issue in issues {
            detailed.push(issue.with_details(pool).await?);
        }
        Ok(detailed)
    }

    pub async fn create(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        payload: CreateIssue,
    ) -> Result<IssueWithDetails> {
        self.authorize_collection(pool, principal, project_id, Verb::Create)
            .await?;
        Self::validate_name(&payload.name)?;
        if let Some(assignee_id) = payload.assignee_id {
            self.validate_assignee(pool, project_id, assignee_id).await?;
        }

        let issue = Issue::create(pool, &payload, project_id, principal, Uuid::new_v4()).await?;
        tracing::debug!("Created issue {} in project {}", issue.id, project_id);
        Ok(issue.with_details(pool).await?)
    }

    pub async fn get(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
    ) -> Result<IssueWithDetails> {
        let issue = self
            .authorized_issue(pool, principal, project_id, issue_id, Verb::Read)
            .await?;
        Ok(issue.with_details(pool).await?)
    }

    pub async fn update(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
        payload: UpdateIssue,
    ) -> Result<IssueWithDetails> {
        let issue = self
            .authorized_issue(pool, principal, project_id, issue_id, Verb::Update)
            .await?;
        if let Some(name) = payload.name.as_deref() {
            Self::validate_name(name)?;
        }
        if let Some(Some(assignee_id)) = payload.assignee_id {
            self.validate_assignee(pool, issue.project_id, assignee_id)
                .await?;
        }

        let updated = Issue::update(pool, issue.id, &payload).await?;
        Ok(updated.with_details(pool).await?)
    }

    /// Deletes the issue together with its comments.
    pub async fn delete(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
    ) -> Result<()> {
        let issue = self
            .authorized_issue(pool, principal, project_id, issue_id, Verb::Delete)
            .await?;

        let tx = pool.begin().await?;
        Issue::delete(&tx, issue.id).await?;
        tx.commit().await?;

        tracing::debug!("Deleted issue {} from project {}", issue.id, project_id);
        Ok(())
    }
}
