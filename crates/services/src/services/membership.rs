use db::{
    DbErr,
    models::{comment::Comment, contributor::Contributor, issue::Issue, project::Project},
};
use uuid::Uuid;

use super::authorization::Membership;

/// A resource whose access is governed by the project that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protected {
    Project(Uuid),
    Issue(Uuid),
    Comment(Uuid),
}

/// Project that owns a protected resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectScope {
    pub project_id: Uuid,
    pub author_id: Uuid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedScope {
    pub project: ProjectScope,
    pub membership: Membership,
}

impl Protected {
    /// Walks up to the owning project: directly, through the issue, or through
    /// the comment's issue. `None` when any link in the chain is gone.
    pub async fn owning_project(&self, pool: &db::DbPool) -> Result<Option<ProjectScope>, DbErr> {
        let project_id = match *self {
            Protected::Project(project_id) => project_id,
            Protected::Issue(issue_id) => match Issue::find_by_id(pool, issue_id).await? {
                Some(issue) => issue.project_id,
                None => return Ok(None),
            },
            Protected::Comment(comment_id) => {
                let Some(comment) = Comment::find_by_id(pool, comment_id).await? else {
                    return Ok(None);
                };
                match Issue::find_by_id(pool, comment.issue_id).await? {
                    Some(issue) => issue.project_id,
                    None => return Ok(None),
                }
            }
        };

        Ok(Project::find_by_id(pool, project_id)
            .await?
            .map(|project| ProjectScope {
                project_id: project.id,
                author_id: project.author_id,
            }))
    }
}

/// Answers what a user is to a project. Read-only.
#[derive(Clone, Default)]
pub struct MembershipResolver;

impl MembershipResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn is_contributor(
        &self,
        pool: &db::DbPool,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, DbErr> {
        Contributor::exists(pool, user_id, project_id).await
    }

    pub async fn is_author(
        &self,
        pool: &db::DbPool,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, DbErr> {
        Ok(Project::find_by_id(pool, project_id)
            .await?
            .is_some_and(|project| project.author_id == user_id))
    }

    /// Resolves the owning project of `target` and the user's relationship to it.
    /// Store errors propagate so a failed lookup can never be read as access.
    pub async fn resolve(
        &self,
        pool: &db::DbPool,
        user_id: Uuid,
        target: Protected,
    ) -> Result<Option<ResolvedScope>, DbErr> {
        let Some(project) = target.owning_project(pool).await? else {
            return Ok(None);
        };
        let is_contributor = self
            .is_contributor(pool, user_id, project.project_id)
            .await?;
        Ok(Some(ResolvedScope {
            project,
            membership: Membership {
                is_contributor,
                is_project_author: project.author_id == user_id,
            },
        }))
    }
}
