use sea_orm::entity::prelude::*;

/// One user's status update for one ISO week.
///
/// `(user_id, year, week)` is unique, see [`crate::schema`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "snippets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    pub year: i32,
    pub week: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::tagged_snippet::Entity")]
    TaggedSnippet,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::tagged_snippet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TaggedSnippet.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::tagged_snippet::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::tagged_snippet::Relation::Snippet.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
