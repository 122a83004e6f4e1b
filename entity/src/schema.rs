//! Table bootstrap for a fresh database.

use sea_orm::{sea_query::Index, ConnectionTrait, DbErr, EntityTrait, Schema};

use crate::{
    prelude::{Snippet, Tag, TaggedSnippet, User},
    snippet,
};

/// Name of the unique index over `(user_id, year, week)` on `snippets`.
pub const SNIPPET_WEEK_INDEX: &str = "snippets_user_iso_week";

/// Create every table and index that does not exist yet.
///
/// Tables are created parents first so the foreign keys resolve.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Tag).await?;
    create_table(db, &schema, Snippet).await?;
    create_table(db, &schema, TaggedSnippet).await?;

    let backend = db.get_database_backend();
    let unique_week = Index::create()
        .name(SNIPPET_WEEK_INDEX)
        .table(Snippet)
        .col(snippet::Column::UserId)
        .col(snippet::Column::Year)
        .col(snippet::Column::Week)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&unique_week)).await?;

    let iso_week_date = Index::create()
        .name("iso_week_date")
        .table(Snippet)
        .col(snippet::Column::Year)
        .col(snippet::Column::Week)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&iso_week_date)).await?;

    tracing::debug!("database schema is up to date");
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tag, tagged_snippet, user};
    use sea_orm::{ActiveModelTrait, Database, EntityTrait, ModelTrait, Set};

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        create_schema(&db).await.unwrap();
        create_schema(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_snippet_week_is_unique_per_user() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        create_schema(&db).await.unwrap();

        let user = user::ActiveModel {
            email: Set("bob@example.com".to_owned()),
            name: Set("Bob".to_owned()),
            password_hash: Set("x".to_owned()),
            confirmed: Set(true),
            member_since: Set(chrono_date(2021, 4, 22)),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let snippet = |text: &str| snippet::ActiveModel {
            user_id: Set(user.id),
            text: Set(text.to_owned()),
            year: Set(2017),
            week: Set(9),
            ..Default::default()
        };

        snippet("first").insert(&db).await.unwrap();
        let err = snippet("second").insert(&db).await.unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_snippet_tags_through_join_table() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        create_schema(&db).await.unwrap();

        let user = user::ActiveModel {
            email: Set("bob@example.com".to_owned()),
            name: Set("Bob".to_owned()),
            password_hash: Set("x".to_owned()),
            confirmed: Set(true),
            member_since: Set(chrono_date(2021, 4, 22)),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let snippet = snippet::ActiveModel {
            user_id: Set(user.id),
            text: Set("foo".to_owned()),
            year: Set(2017),
            week: Set(9),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let blue = tag::ActiveModel {
            text: Set("blue".to_owned()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        tagged_snippet::Entity::insert(tagged_snippet::ActiveModel {
            snippet_id: Set(snippet.id),
            tag_id: Set(blue.id),
        })
        .exec_without_returning(&db)
        .await
        .unwrap();

        let tags = snippet.find_related(tag::Entity).all(&db).await.unwrap();
        assert_eq!(tags, vec![blue.clone()]);
        let snippets = blue.find_related(snippet::Entity).all(&db).await.unwrap();
        assert_eq!(snippets, vec![snippet.clone()]);
        let joins = snippet
            .find_related(tagged_snippet::Entity)
            .all(&db)
            .await
            .unwrap();
        assert_eq!(joins.len(), 1);
        let owner = joins[0]
            .find_related(snippet::Entity)
            .one(&db)
            .await
            .unwrap();
        assert_eq!(owner, Some(snippet));
    }

    fn chrono_date(y: i32, m: u32, d: u32) -> sea_orm::prelude::Date {
        sea_orm::prelude::Date::from_ymd_opt(y, m, d).unwrap()
    }
}
