use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{comment, issue, project},
    models::ids::{
        issue_id_by_uuid, project_id_by_uuid, require, require_uuid, user_id_by_uuid,
        user_uuids_by_ids,
    },
    types::{IssuePriority, IssueStatus, IssueTag},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Issue {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub priority: IssuePriority,
    pub tag: IssueTag,
    pub status: IssueStatus,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct IssueWithDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub issue: Issue,
    pub project_name: String,
    pub comments_count: u64,
}

impl std::ops::Deref for IssueWithDetails {
    type Target = Issue;
    fn deref(&self) -> &Self::Target {
        &self.issue
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateIssue {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tag: IssueTag,
    #[serde(default)]
    pub priority: IssuePriority,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
}

/// Partial update. `assignee_id` distinguishes an absent field (keep) from an
/// explicit `null` (clear).
#[derive(Debug, Default, Deserialize, TS)]
pub struct UpdateIssue {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<IssuePriority>,
    pub tag: Option<IssueTag>,
    pub status: Option<IssueStatus>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[ts(type = "string | null")]
    pub assignee_id: Option<Option<Uuid>>,
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Issue {
    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<issue::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut user_ids: Vec<i64> = models.iter().map(|model| model.author_id).collect();
        user_ids.extend(models.iter().filter_map(|model| model.assignee_id));
        let users = user_uuids_by_ids(db, &user_ids).await?;

        let mut projects: HashMap<i64, Uuid> = HashMap::new();
        let mut issues = Vec::with_capacity(models.len());
        for model in models {
            let project_id = match projects.get(&model.project_id) {
                Some(id) => *id,
                None => {
                    let id = require_uuid(
                        super::ids::project_uuid_by_id(db, model.project_id).await?,
                        "Project",
                    )?;
                    projects.insert(model.project_id, id);
                    id
                }
            };
            let author_id = require_uuid(users.get(&model.author_id).copied(), "User")?;
            let assignee_id = model
                .assignee_id
                .and_then(|row_id| users.get(&row_id).copied());
            issues.push(Self {
                id: model.uuid,
                name: model.name,
                description: model.description,
                project_id,
                author_id,
                assignee_id,
                priority: model.priority,
                tag: model.tag,
                status: model.status,
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
            });
        }
        Ok(issues)
    }

    async fn from_model<C: ConnectionTrait>(db: &C, model: issue::Model) -> Result<Self, DbErr> {
        Self::from_models(db, vec![model])
            .await?
            .pop()
            .ok_or(DbErr::RecordNotFound("Issue not found".to_string()))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = issue::Entity::find()
            .filter(issue::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Looks up an issue, but only if it belongs to the given project.
    pub async fn find_in_project<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        issue_id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let Some(project_row_id) = project_id_by_uuid(db, project_id).await? else {
            return Ok(None);
        };
        let record = issue::Entity::find()
            .filter(issue::Column::Uuid.eq(issue_id))
            .filter(issue::Column::ProjectId.eq(project_row_id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Issues of a project, newest first.
    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(project_row_id) = project_id_by_uuid(db, project_id).await? else {
            return Ok(Vec::new());
        };
        let records = issue::Entity::find()
            .filter(issue::Column::ProjectId.eq(project_row_id))
            .order_by_desc(issue::Column::CreatedAt)
            .order_by_desc(issue::Column::Id)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn comments_count<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(row_id) = issue_id_by_uuid(db, id).await? else {
            return Ok(0);
        };
        comment::Entity::find()
            .filter(comment::Column::IssueId.eq(row_id))
            .count(db)
            .await
    }

    pub async fn with_details<C: ConnectionTrait>(self, db: &C) -> Result<IssueWithDetails, DbErr> {
        let project_name = project::Entity::find()
            .filter(project::Column::Uuid.eq(self.project_id))
            .one(db)
            .await?
            .map(|model| model.name)
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let comments_count = Self::comments_count(db, self.id).await?;
        Ok(IssueWithDetails {
            issue: self,
            project_name,
            comments_count,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateIssue,
        project_id: Uuid,
        author_id: Uuid,
        issue_id: Uuid,
    ) -> Result<Self, DbErr> {
        let project_row_id = require(project_id_by_uuid(db, project_id).await?, "Project")?;
        let author_row_id = require(user_id_by_uuid(db, author_id).await?, "User")?;
        let assignee_row_id = match data.assignee_id {
            Some(assignee) => Some(require(user_id_by_uuid(db, assignee).await?, "User")?),
            None => None,
        };

        let now = Utc::now();
        let active = issue::ActiveModel {
            uuid: Set(issue_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            project_id: Set(project_row_id),
            author_id: Set(author_row_id),
            assignee_id: Set(assignee_row_id),
            priority: Set(data.priority),
            tag: Set(data.tag),
            status: Set(data.status),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateIssue,
    ) -> Result<Self, DbErr> {
        let record = issue::Entity::find()
            .filter(issue::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Issue not found".to_string()))?;

        let mut active: issue::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        if let Some(priority) = payload.priority {
            active.priority = Set(priority);
        }
        if let Some(tag) = payload.tag {
            active.tag = Set(tag);
        }
        if let Some(status) = payload.status {
            active.status = Set(status);
        }
        match payload.assignee_id {
            Some(Some(assignee)) => {
                let row_id = require(user_id_by_uuid(db, assignee).await?, "User")?;
                active.assignee_id = Set(Some(row_id));
            }
            Some(None) => active.assignee_id = Set(None),
            None => {}
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Deletes the issue and its comments.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(row_id) = issue_id_by_uuid(db, id).await? else {
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
        comment::Entity::delete_many()
            .filter(comment::Column::IssueId.is_in(row_ids.to_vec()))
            .exec(db)
            .await?;
        let result = issue::Entity::delete_many()
            .filter(issue::Column::Id.is_in(row_ids.to_vec()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
