use sea_orm::entity::prelude::*;

use crate::types::{IssuePriority, IssueStatus, IssueTag};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    pub project_id: i64,
    pub author_id: i64,
    pub assignee_id: Option<i64>,
    pub priority: IssuePriority,
    pub tag: IssueTag,
    pub status: IssueStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
