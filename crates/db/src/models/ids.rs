use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{issue, project, user};

pub async fn user_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn user_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Uuid)
        .filter(user::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

/// Batch lookup of public user ids, keyed by row id.
pub async fn user_uuids_by_ids<C: ConnectionTrait>(
    db: &C,
    ids: &[i64],
) -> Result<HashMap<i64, Uuid>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i64, Uuid)> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Uuid)
        .filter(user::Column::Id.is_in(ids.to_vec()))
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

pub async fn project_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Id)
        .filter(project::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn project_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Uuid)
        .filter(project::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn issue_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    issue::Entity::find()
        .select_only()
        .column(issue::Column::Id)
        .filter(issue::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn issue_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    issue::Entity::find()
        .select_only()
        .column(issue::Column::Uuid)
        .filter(issue::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

/// Resolves a public id that must exist, reporting which kind of record was missing.
pub(crate) fn require(id: Option<i64>, what: &str) -> Result<i64, DbErr> {
    id.ok_or_else(|| DbErr::RecordNotFound(format!("{what} not found")))
}

pub(crate) fn require_uuid(id: Option<Uuid>, what: &str) -> Result<Uuid, DbErr> {
    id.ok_or_else(|| DbErr::RecordNotFound(format!("{what} not found")))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        models::{
            project::{CreateProject, Project},
            user::{CreateUser, User},
        },
        test_support::setup_db,
        types::ProjectType,
    };

    use super::*;

    #[tokio::test]
    async fn ids_roundtrip_and_uuid_resolution() {
        let db = setup_db().await;

        let user = User::create(
            &db,
            &CreateUser::new("ada", "hash", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let user_row_id = user_id_by_uuid(&db, user.id)
            .await
            .unwrap()
            .expect("user row id");
        assert_eq!(user_uuid_by_id(&db, user_row_id).await.unwrap(), Some(user.id));

        let project_id = Uuid::new_v4();
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Tracker".to_string(),
                description: String::new(),
                project_type: ProjectType::Backend,
            },
            user.id,
            project_id,
        )
        .await
        .unwrap();
        assert_eq!(project.id, project_id);
        assert_eq!(project.author_id, user.id);

        let project_row_id = project_id_by_uuid(&db, project_id)
            .await
            .unwrap()
            .expect("project row id");
        assert_eq!(
            project_uuid_by_id(&db, project_row_id).await.unwrap(),
            Some(project_id)
        );

        assert_eq!(issue_id_by_uuid(&db, Uuid::new_v4()).await.unwrap(), None);
        assert!(require(None, "Issue").is_err());
    }
}
