//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Google `OpenID` subject, if the account was linked
    #[sea_orm(unique, nullable)]
    pub google_id: Option<String>,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(unique)]
    pub username: String,

    pub first_name: String,

    pub last_name: String,

    /// Free-form profile text
    #[sea_orm(column_type = "Text", nullable)]
    pub about: Option<String>,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    /// Storage key of the avatar picture
    #[sea_orm(nullable)]
    pub user_pic: Option<String>,

    /// Storage key of the background picture
    #[sea_orm(nullable)]
    pub bg_pic: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::link::Entity")]
    Links,
}

impl Related<super::link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Links.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
