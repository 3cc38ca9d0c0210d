use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{comment, issue},
    models::ids::{
        issue_id_by_uuid, issue_uuid_by_id, require, require_uuid, user_id_by_uuid,
        user_uuids_by_ids,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Comment {
    pub id: Uuid,
    pub description: String,
    pub issue_id: Uuid,
    pub author_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CommentWithIssueName {
    #[serde(flatten)]
    #[ts(flatten)]
    pub comment: Comment,
    pub issue_name: String,
}

impl std::ops::Deref for CommentWithIssueName {
    type Target = Comment;
    fn deref(&self) -> &Self::Target {
        &self.comment
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateComment {
    pub description: String,
}

#[derive(Debug, Default, Deserialize, TS)]
pub struct UpdateComment {
    pub description: Option<String>,
}

impl Comment {
    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<comment::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let author_ids: Vec<i64> = models.iter().map(|model| model.author_id).collect();
        let authors = user_uuids_by_ids(db, &author_ids).await?;

        let mut comments = Vec::with_capacity(models.len());
        for model in models {
            let issue_id = require_uuid(issue_uuid_by_id(db, model.issue_id).await?, "Issue")?;
            let author_id = require_uuid(authors.get(&model.author_id).copied(), "User")?;
            comments.push(Self {
                id: model.uuid,
                description: model.description,
                issue_id,
                author_id,
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
            });
        }
        Ok(comments)
    }

    async fn from_model<C: ConnectionTrait>(db: &C, model: comment::Model) -> Result<Self, DbErr> {
        Self::from_models(db, vec![model])
            .await?
            .pop()
            .ok_or(DbErr::RecordNotFound("Comment not found".to_string()))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = comment::Entity::find()
            .filter(comment::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Looks up a comment, but only if it belongs to the given issue.
    pub async fn find_in_issue<C: ConnectionTrait>(
        db: &C,
        issue_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let Some(issue_row_id) = issue_id_by_uuid(db, issue_id).await? else {
            return Ok(None);
        };
        let record = comment::Entity::find()
            .filter(comment::Column::Uuid.eq(comment_id))
            .filter(comment::Column::IssueId.eq(issue_row_id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Comments of an issue, newest first.
    pub async fn find_by_issue_id<C: ConnectionTrait>(
        db: &C,
        issue_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(issue_row_id) = issue_id_by_uuid(db, issue_id).await? else {
            return Ok(Vec::new());
        };
        let records = comment::Entity::find()
            .filter(comment::Column::IssueId.eq(issue_row_id))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn with_issue_name<C: ConnectionTrait>(
        self,
        db: &C,
    ) -> Result<CommentWithIssueName, DbErr> {
        let issue_name = issue::Entity::find()
            .filter(issue::Column::Uuid.eq(self.issue_id))
            .one(db)
            .await?
            .map(|model| model.name)
            .ok_or(DbErr::RecordNotFound("Issue not found".to_string()))?;
        Ok(CommentWithIssueName {
            comment: self,
            issue_name,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateComment,
        issue_id: Uuid,
        author_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Self, DbErr> {
        let issue_row_id = require(issue_id_by_uuid(db, issue_id).await?, "Issue")?;
        let author_row_id = require(user_id_by_uuid(db, author_id).await?, "User")?;
        let now = Utc::now();
        let active = comment::ActiveModel {
            uuid: Set(comment_id),
            description: Set(data.description.clone()),
            issue_id: Set(issue_row_id),
            author_id: Set(author_row_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self {
            id: model.uuid,
            description: model.description,
            issue_id,
            author_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateComment,
    ) -> Result<Self, DbErr> {
        let record = comment::Entity::find()
            .filter(comment::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Comment not found".to_string()))?;

        let mut active: comment::ActiveModel = record.into();
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = comment::Entity::delete_many()
            .filter(comment::Column::Uuid.eq(id))
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
            issue::{CreateIssue, Issue},
            project::{CreateProject, Project},
            user::{CreateUser, User},
        },
        test_support::setup_db,
        types::{IssuePriority, IssueStatus, IssueTag, ProjectType},
    };

    #[tokio::test]
    async fn comments_follow_their_issue() {
        let db = setup_db().await;
        let ada = User::create(
            &db,
            &CreateUser::new("ada", "hash", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Tracker".to_string(),
                description: String::new(),
                project_type: ProjectType::Backend,
            },
            ada.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let issue = Issue::create(
            &db,
            &CreateIssue {
                name: "Crash".to_string(),
                description: String::new(),
                tag: IssueTag::Bug,
                priority: IssuePriority::High,
                status: IssueStatus::ToDo,
                assignee_id: None,
            },
            project.id,
            ada.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let comment = Comment::create(
            &db,
            &CreateComment {
                description: "Repro attached".to_string(),
            },
            issue.id,
            ada.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert_eq!(comment.issue_id, issue.id);

        let named = comment.clone().with_issue_name(&db).await.unwrap();
        assert_eq!(named.issue_name, "Crash");

        let updated = Comment::update(
            &db,
            comment.id,
            &UpdateComment {
                description: Some("Repro attached, see log".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.description, "Repro attached, see log");

        assert_eq!(Comment::find_by_issue_id(&db, issue.id).await.unwrap().len(), 1);
        Issue::delete(&db, issue.id).await.unwrap();
        assert!(Comment::find_by_id(&db, comment.id).await.unwrap().is_none());
    }
}
