use entity::{snippet, tag as tag_entity, tagged_snippet};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    JoinType, LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use serde::Serialize;

use crate::{error::ServerError, models::is_unique_violation, models::tag, week::IsoWeek};

/// A snippet as read by the views: a stored row with its tags, or the empty
/// placeholder for a week nothing was written for yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub week: IsoWeek,
    pub text: String,
    /// Sorted
    pub tags: Vec<String>,
    /// Whether the snippet exists in the database
    pub saved: bool,
}

/// A snippet as the API shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetJson {
    pub year: i32,
    pub week: u32,
    pub text: String,
    pub tags: Vec<String>,
    pub url: String,
}

impl Snippet {
    pub fn placeholder(week: IsoWeek) -> Self {
        Self {
            week,
            text: String::new(),
            tags: Vec::new(),
            saved: false,
        }
    }

    fn from_row(row: snippet::Model, tags: Vec<tag_entity::Model>) -> Self {
        let mut tags: Vec<String> = tags.into_iter().map(|tag| tag.text).collect();
        tags.sort();
        Self {
            week: IsoWeek::new(row.year, row.week as u32),
            text: row.text,
            tags,
            saved: true,
        }
    }

    pub fn url(&self) -> String {
        format!("/api/weeks/{}/{}", self.week.year, self.week.week)
    }

    pub fn to_json(&self) -> SnippetJson {
        SnippetJson {
            year: self.week.year,
            week: self.week.week,
            text: self.text.clone(),
            tags: self.tags.clone(),
            url: self.url(),
        }
    }
}

/// One page of a user's snippets, newest week first.
#[derive(Debug, Clone)]
pub struct SnippetPage {
    pub snippets: Vec<Snippet>,
    /// 1-based
    pub page: u64,
    pub num_pages: u64,
    /// Total number of matching snippets
    pub count: u64,
}

impl SnippetPage {
    fn empty() -> Self {
        Self {
            snippets: Vec::new(),
            page: 1,
            num_pages: 0,
            count: 0,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }
}

async fn find_row<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    week: IsoWeek,
) -> Result<Option<snippet::Model>, DbErr> {
    snippet::Entity::find()
        .filter(snippet::Column::UserId.eq(user_id))
        .filter(snippet::Column::Year.eq(week.year))
        .filter(snippet::Column::Week.eq(week.week as i32))
        .one(db)
        .await
}

/// Tag texts of a stored snippet, sorted.
pub async fn tags_of<C: ConnectionTrait>(db: &C, row: &snippet::Model) -> Result<Vec<String>, DbErr> {
    Ok(row
        .find_related(tag_entity::Entity)
        .order_by_asc(tag_entity::Column::Text)
        .all(db)
        .await?
        .into_iter()
        .map(|tag| tag.text)
        .collect())
}

pub async fn get_by_week<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    week: IsoWeek,
) -> Result<Option<Snippet>, DbErr> {
    match find_row(db, user_id, week).await? {
        Some(row) => {
            let tags = tags_of(db, &row).await?;
            Ok(Some(Snippet {
                week,
                text: row.text,
                tags,
                saved: true,
            }))
        }
        None => Ok(None),
    }
}

/// The snippet for `week`, or an unsaved placeholder.
pub async fn get_or_placeholder<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    week: IsoWeek,
) -> Result<Snippet, DbErr> {
    Ok(get_by_week(db, user_id, week)
        .await?
        .unwrap_or_else(|| Snippet::placeholder(week)))
}

/// Write `text` and exactly the tags `tags` to the user's snippet for `week`,
/// creating it if needed.
///
/// A concurrent writer creating the same snippet first makes the insert fail
/// on the unique week index; the write is then retried once, as an update.
pub async fn update<S: AsRef<str>>(
    db: &DatabaseConnection,
    user_id: i32,
    week: IsoWeek,
    text: &str,
    tags: &[S],
) -> Result<Snippet, ServerError> {
    match try_update(db, user_id, week, text, tags).await {
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!("snippet {week} of user {user_id} was created concurrently, retrying");
            Ok(try_update(db, user_id, week, text, tags).await?)
        }
        result => Ok(result?),
    }
}

async fn try_update<S: AsRef<str>>(
    db: &DatabaseConnection,
    user_id: i32,
    week: IsoWeek,
    text: &str,
    tags: &[S],
) -> Result<Snippet, DbErr> {
    let txn = db.begin().await?;

    let tags = tag::get_all(&txn, tags).await?;

    let row = match find_row(&txn, user_id, week).await? {
        Some(row) => {
            let mut active: snippet::ActiveModel = row.into();
            active.text = Set(text.to_owned());
            active.update(&txn).await?
        }
        None => {
            snippet::ActiveModel {
                user_id: Set(user_id),
                text: Set(text.to_owned()),
                year: Set(week.year),
                week: Set(week.week as i32),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    tagged_snippet::Entity::delete_many()
        .filter(tagged_snippet::Column::SnippetId.eq(row.id))
        .exec(&txn)
        .await?;
    if !tags.is_empty() {
        tagged_snippet::Entity::insert_many(tags.iter().map(|tag| tagged_snippet::ActiveModel {
            snippet_id: Set(row.id),
            tag_id: Set(tag.id),
        }))
        .exec_without_returning(&txn)
        .await?;
    }

    txn.commit().await?;
    tracing::debug!("saved snippet {week} of user {user_id}");
    Ok(Snippet::from_row(row, tags))
}

/// Page `page` (1-based) of the user's snippets, optionally only those tagged
/// `tag`, ordered by year then week, newest first.
///
/// Pages past the last one are [`ServerError::NotFound`], except the first,
/// which is empty when nothing matches.
pub async fn get_all<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    tag: Option<&str>,
    page: u64,
    per_page: u64,
) -> Result<SnippetPage, ServerError> {
    if page < 1 {
        return Err(ServerError::NotFound);
    }

    let mut query = snippet::Entity::find()
        .filter(snippet::Column::UserId.eq(user_id))
        .order_by_desc(snippet::Column::Year)
        .order_by_desc(snippet::Column::Week);

    if let Some(text) = tag {
        match tag::find_by_text(db, text).await? {
            Some(tag) => {
                query = query
                    .join(JoinType::InnerJoin, snippet::Relation::TaggedSnippet.def())
                    .filter(tagged_snippet::Column::TagId.eq(tag.id));
            }
            None if page == 1 => return Ok(SnippetPage::empty()),
            None => return Err(ServerError::NotFound),
        }
    }

    let paginator = query.paginate(db, per_page.max(1));
    let count = paginator.num_items().await?;
    let num_pages = paginator.num_pages().await?;
    if page > num_pages.max(1) {
        return Err(ServerError::NotFound);
    }
    let rows = paginator.fetch_page(page - 1).await?;

    let tags = rows
        .load_many_to_many(tag_entity::Entity, tagged_snippet::Entity, db)
        .await?;
    let snippets = rows
        .into_iter()
        .zip(tags)
        .map(|(row, tags)| Snippet::from_row(row, tags))
        .collect();

    Ok(SnippetPage {
        snippets,
        page,
        num_pages,
        count,
    })
}
