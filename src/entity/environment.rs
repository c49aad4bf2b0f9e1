use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "environments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub web_app_id: Uuid,
    pub name: String,
    pub branch: String,
    pub port: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub env_vars: Json,
    pub status: String,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::web_app::Entity",
        from = "Column::WebAppId",
        to = "super::web_app::Column::Id"
    )]
    WebApp,
    #[sea_orm(has_one = "super::instance::Entity")]
    Instance,
    #[sea_orm(has_many = "super::deployment::Entity")]
    Deployments,
}

impl Related<super::web_app::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebApp.def()
    }
}

impl Related<super::instance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instance.def()
    }
}

impl Related<super::deployment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deployments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
