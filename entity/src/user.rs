use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, indexed, column_type = "String(StringLen::N(320))")]
    pub email: String,
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub name: String,
    /// The password in hashed PHC form
    pub password_hash: String,
    #[sea_orm(default_value = false)]
    pub confirmed: bool,
    pub member_since: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::snippet::Entity")]
    Snippet,
}

impl Related<super::snippet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snippet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
