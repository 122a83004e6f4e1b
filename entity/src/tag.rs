use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "Text")]
    pub text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tagged_snippet::Entity")]
    TaggedSnippet,
}

impl Related<super::tagged_snippet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TaggedSnippet.def()
    }
}

impl Related<super::snippet::Entity> for Entity {
    fn to() -> RelationDef {
        super::tagged_snippet::Relation::Snippet.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::tagged_snippet::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
