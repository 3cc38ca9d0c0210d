use db::models::contributor::{Contributor, CreateContributor};
use uuid::Uuid;

use super::{
    authorization::{AccessRequest, Action, ResourceKind, Verb, authorize},
    error::{Result, ServiceError},
    membership::{MembershipResolver, Protected, ResolvedScope},
};

#[derive(Clone, Default)]
pub struct ContributorService {
    membership: MembershipResolver,
}

impl ContributorService {
    pub fn new() -> Self {
        Self::default()
    }

    async fn project_scope(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
    ) -> Result<ResolvedScope> {
        self.membership
            .resolve(pool, principal, Protected::Project(project_id))
            .await?
            .ok_or(ServiceError::NotFound("Project"))
    }

    pub async fn list(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<Contributor>> {
        let scope = self.project_scope(pool, principal, project_id).await?;
        authorize(
            &AccessRequest::new(
                Some(principal),
                Action::new(ResourceKind::Contributor, Verb::Read),
            )
            .with_membership(scope.membership),
        )
        .into_result()?;

        Ok(Contributor::find_by_project_id(pool, project_id).await?)
    }

    /// Adds `payload.user_id` to the project. Unknown users and existing
    /// members are validation errors on `user_id`.
    pub async fn add(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        payload: CreateContributor,
    ) -> Result<Contributor> {
        let scope = self.project_scope(pool, principal, project_id).await?;
        authorize(
            &AccessRequest::new(
                Some(principal),
                Action::new(ResourceKind::Contributor, Verb::Create),
            )
            .with_membership(scope.membership),
        )
        .into_result()?;

        let contributor =
            Contributor::create(pool, payload.user_id, project_id, Uuid::new_v4()).await?;
        tracing::info!(
            "User {} added {} to project {}",
            principal,
            payload.user_id,
            project_id
        );
        Ok(contributor)
    }

    /// Removes a contributor link. The project author's own link is refused
    /// whoever asks.
    pub async fn remove(
        &self,
        pool: &db::DbPool,
        principal: Uuid,
        project_id: Uuid,
        contributor_id: Uuid,
    ) -> Result<()> {
        let scope = self.project_scope(pool, principal, project_id).await?;
        let contributor = Contributor::find_in_project(pool, project_id, contributor_id)
            .await?
            .ok_or(ServiceError::NotFound("Contributor"))?;

        authorize(
            &AccessRequest::new(
                Some(principal),
                Action::new(ResourceKind::Contributor, Verb::Delete),
            )
            .with_membership(scope.membership)
            .targeting_project_author(contributor.user.id == scope.project.author_id),
        )
        .into_result()?;

        Contributor::delete(pool, contributor.id).await?;
        tracing::info!(
            "User {} removed {} from project {}",
            principal,
            contributor.user.id,
            project_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::{
        models::{
            project::CreateProject,
            user::{CreateUser, User},
        },
        types::ProjectType,
    };

    use super::*;
    use crate::services::{
        authorization::DenyReason, project::ProjectService, test_support::setup_db,
    };

    async fn user(pool: &db::DbPool, name: &str) -> Uuid {
        User::create(
            pool,
            &CreateUser::new(
                name,
                "hash",
                chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            ),
            Uuid::new_v4(),
        )
        .await
        .unwrap()
        .id
    }

    async fn project(pool: &db::DbPool, author: Uuid) -> Uuid {
        ProjectService::new()
            .create(
                pool,
                author,
                CreateProject {
                    name: "Tracker".to_string(),
                    description: String::new(),
                    project_type: ProjectType::Ios,
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn only_the_author_manages_contributors() {
        let pool = setup_db().await;
        let ada = user(&pool, "ada").await;
        let bob = user(&pool, "bob").await;
        let cat = user(&pool, "cat").await;
        let project_id = project(&pool, ada).await;
        let service = ContributorService::new();

        let added = service
            .add(&pool, ada, project_id, CreateContributor { user_id: bob })
            .await
            .unwrap();
        assert_eq!(added.user.id, bob);

        assert!(matches!(
            service
                .add(&pool, bob, project_id, CreateContributor { user_id: cat })
                .await,
            Err(ServiceError::Forbidden(DenyReason::NotProjectAuthor))
        ));
        assert!(matches!(
            service.remove(&pool, bob, project_id, added.id).await,
            Err(ServiceError::Forbidden(DenyReason::NotProjectAuthor))
        ));

        assert_eq!(service.list(&pool, bob, project_id).await.unwrap().len(), 2);
        assert!(matches!(
            service.list(&pool, cat, project_id).await,
            Err(ServiceError::Forbidden(DenyReason::NotContributor))
        ));

        service.remove(&pool, ada, project_id, added.id).await.unwrap();
        assert_eq!(service.list(&pool, ada, project_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicates_and_unknown_users_are_validation_errors() {
        let pool = setup_db().await;
        let ada = user(&pool, "ada").await;
        let bob = user(&pool, "bob").await;
        let project_id = project(&pool, ada).await;
        let service = ContributorService::new();

        service
            .add(&pool, ada, project_id, CreateContributor { user_id: bob })
            .await
            .unwrap();
        assert!(matches!(
            service
                .add(&pool, ada, project_id, CreateContributor { user_id: bob })
                .await,
            Err(ServiceError::Validation { field: "user_id", .. })
        ));
        assert!(matches!(
            service
                .add(&pool, ada, project_id, CreateContributor { user_id: ada })
                .await,
            Err(ServiceError::Validation { field: "user_id", .. })
        ));
        assert!(matches!(
            service
                .add(
                    &pool,
                    ada,
                    project_id,
                    CreateContributor {
                        user_id: Uuid::new_v4()
                    }
                )
                .await,
            Err(ServiceError::Validation { field: "user_id", .. })
        ));
    }

    #[tokio::test]
    async fn author_link_cannot_be_removed_even_by_the_author() {
        let pool = setup_db().await;
        let ada = user(&pool, "ada").await;
        let bob = user(&pool, "bob").await;
        let project_id = project(&pool, ada).await;
        let service = ContributorService::new();
        service
            .add(&pool, ada, project_id, CreateContributor { user_id: bob })
            .await
            .unwrap();

        let author_link = service
            .list(&pool, ada, project_id)
            .await
            .unwrap()
            .into_iter()
            .find(|contributor| contributor.user.id == ada)
            .unwrap();

        for requester in [ada, bob] {
            assert!(matches!(
                service.remove(&pool, requester, project_id, author_link.id).await,
                Err(ServiceError::Forbidden(DenyReason::ProjectAuthorRemoval))
            ));
        }
        assert_eq!(service.list(&pool, ada, project_id).await.unwrap().len(), 2);

        assert!(matches!(
            service.remove(&pool, ada, project_id, Uuid::new_v4()).await,
            Err(ServiceError::NotFound("Contributor"))
        ));
    }
}
