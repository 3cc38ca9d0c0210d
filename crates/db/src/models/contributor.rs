use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{contributor, user},
    is_unique_violation,
    models::{
        ids::{project_id_by_uuid, project_uuid_by_id, require_uuid, user_id_by_uuid},
        user::UserSummary,
    },
};

#[derive(Debug, Error)]
pub enum ContributorError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("User not found")]
    UserNotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("User is already a contributor to this project")]
    AlreadyContributor,
}

/// Membership of a user in a project.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Contributor {
    pub id: Uuid,
    pub user: UserSummary,
    pub project_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateContributor {
    pub user_id: Uuid,
}

impl Contributor {
    fn from_parts(model: contributor::Model, user: UserSummary, project_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            user,
            project_id,
            created_at: model.created_at.into(),
        }
    }

    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<contributor::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let user_ids: Vec<i64> = models.iter().map(|model| model.user_id).collect();
        let users: HashMap<i64, UserSummary> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|model| {
                    (
                        model.id,
                        UserSummary {
                            id: model.uuid,
                            username: model.username,
                        },
                    )
                })
                .collect()
        };

        let mut contributors = Vec::with_capacity(models.len());
        for model in models {
            let user = users
                .get(&model.user_id)
                .cloned()
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
            let project_id = require_uuid(project_uuid_by_id(db, model.project_id).await?, "Project")?;
            contributors.push(Self::from_parts(model, user, project_id));
        }
        Ok(contributors)
    }

    /// Contributors of a project, newest first.
    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(project_row_id) = project_id_by_uuid(db, project_id).await? else {
            return Ok(Vec::new());
        };
        let records = contributor::Entity::find()
            .filter(contributor::Column::ProjectId.eq(project_row_id))
            .order_by_desc(contributor::Column::CreatedAt)
            .order_by_desc(contributor::Column::Id)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    /// Looks up a contributor row, but only if it belongs to the given project.
    pub async fn find_in_project<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        contributor_id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let Some(project_row_id) = project_id_by_uuid(db, project_id).await? else {
            return Ok(None);
        };
        let record = contributor::Entity::find()
            .filter(contributor::Column::Uuid.eq(contributor_id))
            .filter(contributor::Column::ProjectId.eq(project_row_id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Self::from_models(db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn exists<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, DbErr> {
        let (Some(user_row_id), Some(project_row_id)) = (
            user_id_by_uuid(db, user_id).await?,
            project_id_by_uuid(db, project_id).await?,
        ) else {
            return Ok(false);
        };
        let count = contributor::Entity::find()
            .filter(contributor::Column::UserId.eq(user_row_id))
            .filter(contributor::Column::ProjectId.eq(project_row_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        project_id: Uuid,
        contributor_id: Uuid,
    ) -> Result<Self, ContributorError> {
        let user = user::Entity::find()
            .filter(user::Column::Uuid.eq(user_id))
            .one(db)
            .await?
            .ok_or(ContributorError::UserNotFound)?;
        let project_row_id = project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ContributorError::ProjectNotFound)?;

        let existing = contributor::Entity::find()
            .filter(contributor::Column::UserId.eq(user.id))
            .filter(contributor::Column::ProjectId.eq(project_row_id))
            .count(db)
            .await?;
        if existing > 0 {
            return Err(ContributorError::AlreadyContributor);
        }

        let model = Self::insert_link(db, user.id, project_row_id, contributor_id).await?;

        let summary = UserSummary {
            id: user.uuid,
            username: user.username,
        };
        Ok(Self::from_parts(model, summary, project_id))
    }

    /// Inserts the link row. A concurrent insert of the same pair that slipped
    /// past the existence check surfaces as `AlreadyContributor`.
    async fn insert_link<C: ConnectionTrait>(
        db: &C,
        user_row_id: i64,
        project_row_id: i64,
        contributor_id: Uuid,
    ) -> Result<contributor::Model, ContributorError> {
        let active = contributor::ActiveModel {
            uuid: Set(contributor_id),
            user_id: Set(user_row_id),
            project_id: Set(project_row_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        match active.insert(db).await {
            Ok(model) => Ok(model),
            Err(err) if is_unique_violation(&err) => Err(ContributorError::AlreadyContributor),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = contributor::Entity::delete_many()
            .filter(contributor::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        models::{
            project::{CreateProject, Project},
            user::{CreateUser, User},
        },
        test_support::setup_db,
        types::ProjectType,
    };

    async fn user(db: &sea_orm::DatabaseConnection, name: &str) -> User {
        User::create(
            db,
            &CreateUser::new(name, "hash", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn project(db: &sea_orm::DatabaseConnection, author: Uuid) -> Project {
        Project::create(
            db,
            &CreateProject {
                name: "Tracker".to_string(),
                description: String::new(),
                project_type: ProjectType::Frontend,
            },
            author,
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_membership_is_rejected() {
        let db = setup_db().await;
        let ada = user(&db, "ada").await;
        let project = project(&db, ada.id).await;

        let first = Contributor::create(&db, ada.id, project.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(first.user.username, "ada");
        assert_eq!(first.project_id, project.id);

        let second = Contributor::create(&db, ada.id, project.id, Uuid::new_v4()).await;
        assert!(matches!(second, Err(ContributorError::AlreadyContributor)));
        assert_eq!(
            Contributor::find_by_project_id(&db, project.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn racing_duplicate_insert_maps_to_already_contributor() {
        let db = setup_db().await;
        let ada = user(&db, "ada").await;
        let project = project(&db, ada.id).await;
        let user_row = user_id_by_uuid(&db, ada.id).await.unwrap().unwrap();
        let project_row = project_id_by_uuid(&db, project.id).await.unwrap().unwrap();

        Contributor::create(&db, ada.id, project.id, Uuid::new_v4())
            .await
            .unwrap();

        // a raw duplicate row trips the unique index
        let raw = contributor::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            user_id: Set(user_row),
            project_id: Set(project_row),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap_err();
        assert!(is_unique_violation(&raw));

        let lost_race = Contributor::insert_link(&db, user_row, project_row, Uuid::new_v4()).await;
        assert!(matches!(lost_race, Err(ContributorError::AlreadyContributor)));
        assert_eq!(Project::contributors_count(&db, project.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_user_or_project_is_reported() {
        let db = setup_db().await;
        let ada = user(&db, "ada").await;
        let project = project(&db, ada.id).await;

        let missing_user = Contributor::create(&db, Uuid::new_v4(), project.id, Uuid::new_v4()).await;
        assert!(matches!(missing_user, Err(ContributorError::UserNotFound)));

        let missing_project = Contributor::create(&db, ada.id, Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(missing_project, Err(ContributorError::ProjectNotFound)));
    }

    #[tokio::test]
    async fn find_in_project_scopes_to_the_parent() {
        let db = setup_db().await;
        let ada = user(&db, "ada").await;
        let first = project(&db, ada.id).await;
        let second = project(&db, ada.id).await;
        let membership = Contributor::create(&db, ada.id, first.id, Uuid::new_v4())
            .await
            .unwrap();

        assert!(
            Contributor::find_in_project(&db, first.id, membership.id)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            Contributor::find_in_project(&db, second.id, membership.id)
                .await
                .unwrap()
                .is_none()
        );

        assert_eq!(Contributor::delete(&db, membership.id).await.unwrap(), 1);
        assert!(!Contributor::exists(&db, ada.id, first.id).await.unwrap());
    }
}
