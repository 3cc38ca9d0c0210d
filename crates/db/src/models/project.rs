use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{contributor, issue, project},
    models::{
        ids::{require, require_uuid, user_id_by_uuid, user_uuid_by_id, user_uuids_by_ids},
        issue::Issue,
    },
    types::ProjectType,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub author_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectWithContributorCount {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub contributors_count: u64,
}

impl std::ops::Deref for ProjectWithContributorCount {
    type Target = Project;
    fn deref(&self) -> &Self::Target {
        &self.project
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
}

#[derive(Debug, Default, Deserialize, TS)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: Option<ProjectType>,
}

impl Project {
    fn from_parts(model: project::Model, author_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            description: model.description,
            project_type: model.project_type,
            author_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let author_id = require_uuid(user_uuid_by_id(db, model.author_id).await?, "User")?;
        Ok(Self::from_parts(model, author_id))
    }

    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<project::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let author_ids: Vec<i64> = models.iter().map(|model| model.author_id).collect();
        let authors = user_uuids_by_ids(db, &author_ids).await?;
        models
            .into_iter()
            .map(|model| {
                let author_id = require_uuid(authors.get(&model.author_id).copied(), "User")?;
                Ok(Self::from_parts(model, author_id))
            })
            .collect()
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Projects the user contributes to, newest first.
    pub async fn find_for_contributor<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(user_row_id) = user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };
        let project_ids: Vec<i64> = contributor::Entity::find()
            .filter(contributor::Column::UserId.eq(user_row_id))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.project_id)
            .collect();
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = project::Entity::find()
            .filter(project::Column::Id.is_in(project_ids))
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn contributors_count<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(row_id) = super::ids::project_id_by_uuid(db, id).await? else {
            return Ok(0);
        };
        contributor::Entity::find()
            .filter(contributor::Column::ProjectId.eq(row_id))
            .count(db)
            .await
    }

    pub async fn with_contributor_count<C: ConnectionTrait>(
        self,
        db: &C,
    ) -> Result<ProjectWithContributorCount, DbErr> {
        let contributors_count = Self::contributors_count(db, self.id).await?;
        Ok(ProjectWithContributorCount {
            project: self,
            contributors_count,
        })
    }

    /// Inserts the project row only; the author's contributor row is added by the caller
    /// within the same transaction.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        author_id: Uuid,
        project_id: Uuid,
    ) -> Result<Self, DbErr> {
        let author_row_id = require(user_id_by_uuid(db, author_id).await?, "User")?;
        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            project_type: Set(data.project_type),
            author_id: Set(author_row_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_parts(model, author_id))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateProject,
    ) -> Result<Self, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        if let Some(project_type) = payload.project_type {
            active.project_type = Set(project_type);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Deletes the project with its contributors, issues and their comments.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(row_id) = super::ids::project_id_by_uuid(db, id).await? else {
            return Ok(0);
        };
        Self::delete_rows(db, &[row_id]).await
    }

    pub(crate) async fn delete_rows<C: ConnectionTrait>(
        db: &C,
        row_ids: &[i64],
    ) -> Result<u64, DbErr> {
        if row_ids.is_empty() {
            return Ok(0);
        }

        let issue_ids: Vec<i64> = issue::Entity::find()
            .filter(issue::Column::ProjectId.is_in(row_ids.to_vec()))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();
        Issue::delete_rows(db, &issue_ids).await?;

        contributor::Entity::delete_many()
            .filter(contributor::Column::ProjectId.is_in(row_ids.to_vec()))
            .exec(db)
            .await?;

        let result = project::Entity::delete_many()
            .filter(project::Column::Id.is_in(row_ids.to_vec()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
