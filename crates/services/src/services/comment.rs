use db::models::{
    comment::{Comment, CommentWithIssueName, CreateComment, UpdateComment},
    issue::Issue,
    project::Project,
};
use uuid::Uuid;

use super::{
    authorization::{AccessRequest, Action, ResourceKind, Verb, authorize},
    error::{Result, ServiceError},
    membership::{MembershipResolver, Protected},
};

#[derive(Clone, Default)]
pub struct CommentService {
    membership: MembershipResolver,
}

impl CommentService {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate_description(description: &str) -> Result<()> {
        if description.trim().is_empty() {
            return Err(ServiceError::validation(
                "description",
                "This field may not be blank.",
            ));
        }
        Ok(())
    }

    /// Re-fetches the parent issue through its project.
    async fn parent_issue(
        &self,
        pool: &db::DbPool,
        project_id: Uuid,
        issue_id: Uuid,
    ) -> Result<Issue> {
        Project::find_by_id(pool, project_id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
        Issue::find_in_project(pool, project_id, issue_id)
            .await?
            .ok_or(ServiceError::NotFound("Issue"))
    }

    async fn authorize_collection(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        issue: &Issue,
        verb: Verb,
    ) -> Result<()> {
        let scope = self
            .membership
            .resolve(pool, principal, Protected::Issue(issue.id))
            .await?
            .ok_or(ServiceError::NotFound("Issue"))?;
        authorize(
            &AccessRequest::new(Some(principal), Action::new(ResourceKind::Comment, verb))
                .with_membership(scope.membership),
        )
        .into_result()?;
        Ok(())
    }

    async fn authorized_comment(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
        comment_id: Uuid,
        verb: Verb,
    ) -> Result<Comment> {
        let issue = self.parent_issue(pool, project_id, issue_id).await?;
        let comment = Comment::find_in_issue(pool, issue.id, comment_id)
            .await?
            .ok_or(ServiceError::NotFound("Comment"))?;

        let scope = self
            .membership
            .resolve(pool, principal, Protected::Comment(comment.id))
            .await?
            .ok_or(ServiceError::NotFound("Comment"))?;
        authorize(
            &AccessRequest::new(Some(principal), Action::new(ResourceKind::Comment, verb))
                .with_membership(scope.membership)
                .with_resource_author(comment.author_id),
        )
        .into_result()?;
        Ok(comment)
    }

    pub async fn list(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
    ) -> Result<Vec<CommentWithIssueName>> {
        let issue = self.parent_issue(pool, project_id, issue_id).await?;
        self.authorize_collection(pool, principal, &issue, Verb::Read)
            .await?;

        Ok(Comment::find_by_issue_id(pool, issue.id)
            .await?
            .into_iter()
            .map(|comment| CommentWithIssueName {
                comment,
                issue_name: issue.name.clone(),
            })
            .collect())
    }

    pub async fn create(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
        payload: CreateComment,
    ) -> Result<CommentWithIssueName> {
        let issue = self.parent_issue(pool, project_id, issue_id).await?;
        self.authorize_collection(pool, principal, &issue, Verb::Create)
            .await?;
        Self::validate_description(&payload.description)?;

        let comment = Comment::create(pool, &payload, issue.id, principal, Uuid::new_v4()).await?;
        tracing::debug!("Created comment {} on issue {}", comment.id, issue.id);
        Ok(CommentWithIssueName {
            comment,
            issue_name: issue.name,
        })
    }

    pub async fn get(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentWithIssueName> {
        let comment = self
            .authorized_comment(pool, principal, project_id, issue_id, comment_id, Verb::Read)
            .await?;
        Ok(comment.with_issue_name(pool).await?)
    }

    pub async fn update(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
        comment_id: Uuid,
        payload: UpdateComment,
    ) -> Result<CommentWithIssueName> {
        let comment = self
            .authorized_comment(
                pool,
                principal,
                project_id,
                issue_id,
                comment_id,
                Verb::Update,
            )
            .await?;
        if let Some(description) = payload.description.as_deref() {
            Self::validate_description(description)?;
        }

        let updated = Comment::update(pool, comment.id, &payload).await?;
        Ok(updated.with_issue_name(pool).await?)
    }

    pub async fn delete(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        issue_id: Uuid,
        comment_id: Uuid,
    ) -> Result<()> {
        let comment = self
            .authorized_comment(
                pool,
                principal,
                project_id,
                issue_id,
                comment_id,
                Verb::Delete,
            )
            .await?;
        Comment::delete(pool, comment.id).await?;
        Ok(())
    }
}
