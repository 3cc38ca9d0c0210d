use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{comment, contributor, issue, project, user},
    is_unique_violation,
    models::{issue::Issue, project::Project},
};

/// Youngest age at which an account may exist.
pub const MINIMUM_AGE: i32 = 15;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("User not found")]
    UserNotFound,
    #[error("A user with that username already exists")]
    UsernameTaken,
    #[error("Users must be at least {MINIMUM_AGE} years old")]
    Underage,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub can_be_contacted: bool,
    pub can_data_be_shared: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user embedded in other records.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub birth_date: NaiveDate,
    pub can_be_contacted: bool,
    pub can_data_be_shared: bool,
}

impl CreateUser {
    pub fn new(username: &str, password_hash: &str, birth_date: NaiveDate) -> Self {
        Self {
            username: username.to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: password_hash.to_string(),
            birth_date,
            can_be_contacted: false,
            can_data_be_shared: false,
        }
    }
}

#[derive(Debug, Default, Deserialize, TS)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub can_be_contacted: Option<bool>,
    pub can_data_be_shared: Option<bool>,
}

/// Whole years elapsed between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn ensure_minimum_age(birth_date: NaiveDate, today: NaiveDate) -> Result<(), UserError> {
    if age_on(birth_date, today) < MINIMUM_AGE {
        return Err(UserError::Underage);
    }
    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            age: age_on(model.birth_date, today()),
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            birth_date: model.birth_date,
            can_be_contacted: model.can_be_contacted,
            can_data_be_shared: model.can_data_be_shared,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Returns the user together with the stored password hash, for credential checks.
    pub async fn find_credentials<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?;
        Ok(record.map(|model| {
            let hash = model.password_hash.clone();
            (Self::from_model(model), hash)
        }))
    }

    pub async fn username_exists<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<bool, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?;
        Ok(record.is_some())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        ensure_minimum_age(data.birth_date, today())?;
        if Self::username_exists(db, &data.username).await? {
            return Err(UserError::UsernameTaken);
        }

        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            username: Set(data.username.clone()),
            email: Set(data.email.clone()),
            first_name: Set(data.first_name.clone()),
            last_name: Set(data.last_name.clone()),
            password_hash: Set(data.password_hash.clone()),
            birth_date: Set(data.birth_date),
            can_be_contacted: Set(data.can_be_contacted),
            can_data_be_shared: Set(data.can_data_be_shared),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        match active.insert(db).await {
            Ok(model) => Ok(Self::from_model(model)),
            Err(err) if is_unique_violation(&err) => Err(UserError::UsernameTaken),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Self, UserError> {
        if let Some(birth_date) = data.birth_date {
            ensure_minimum_age(birth_date, today())?;
        }

        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(UserError::UserNotFound)?;

        let mut active: user::ActiveModel = record.into();
        if let Some(email) = data.email.clone() {
            active.email = Set(email);
        }
        if let Some(first_name) = data.first_name.clone() {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = data.last_name.clone() {
            active.last_name = Set(last_name);
        }
        if let Some(birth_date) = data.birth_date {
            active.birth_date = Set(birth_date);
        }
        if let Some(can_be_contacted) = data.can_be_contacted {
            active.can_be_contacted = Set(can_be_contacted);
        }
        if let Some(can_data_be_shared) = data.can_data_be_shared {
            active.can_data_be_shared = Set(can_data_be_shared);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Removes the user and everything they own: authored projects with their
    /// whole subtree, authored issues and comments, and all memberships.
    /// Issues merely assigned to the user lose their assignee.
    /// Callers run this inside a transaction so erasure is all-or-nothing.
    pub async fn erase<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(record) = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
        else {
            return Ok(0);
        };
        let row_id = record.id;

        let authored_projects: Vec<i64> = project::Entity::find()
            .filter(project::Column::AuthorId.eq(row_id))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();
        Project::delete_rows(db, &authored_projects).await?;

        let authored_issues: Vec<i64> = issue::Entity::find()
            .filter(issue::Column::AuthorId.eq(row_id))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();
        Issue::delete_rows(db, &authored_issues).await?;

        comment::Entity::delete_many()
            .filter(comment::Column::AuthorId.eq(row_id))
            .exec(db)
            .await?;
        contributor::Entity::delete_many()
            .filter(contributor::Column::UserId.eq(row_id))
            .exec(db)
            .await?;
        issue::Entity::update_many()
            .col_expr(issue::Column::AssigneeId, Expr::value(Option::<i64>::None))
            .filter(issue::Column::AssigneeId.eq(row_id))
            .exec(db)
            .await?;

        let result = user::Entity::delete_by_id(row_id).exec(db).await?;
        Ok(result.rows_affected)
    }
}
