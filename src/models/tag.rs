use entity::tag;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};

pub use entity::tag::Model;

/// Trim tag texts and drop empty and repeated ones, keeping first-seen order.
pub fn normalize<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
    let mut seen = Vec::with_capacity(texts.len());
    for text in texts {
        let text = text.as_ref().trim();
        if !text.is_empty() && !seen.iter().any(|t: &String| t == text) {
            seen.push(text.to_owned());
        }
    }
    seen
}

/// Split a comma separated tag list as typed into the web form.
pub fn split(tags: &str) -> Vec<String> {
    normalize(&tags.split(',').collect::<Vec<_>>())
}

pub async fn find_by_text<C: ConnectionTrait>(db: &C, text: &str) -> Result<Option<Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::Text.eq(text))
        .one(db)
        .await
}

/// Look up every tag in `texts`, creating the ones that don't exist yet.
///
/// The result holds one tag per distinct text, in the order of [`normalize`].
pub async fn get_all<C: ConnectionTrait, S: AsRef<str>>(
    db: &C,
    texts: &[S],
) -> Result<Vec<Model>, DbErr> {
    let texts = normalize(texts);
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let existing = tag::Entity::find()
        .filter(tag::Column::Text.is_in(texts.clone()))
        .all(db)
        .await?;

    let mut tags = Vec::with_capacity(texts.len());
    for text in texts {
        match existing.iter().find(|tag| tag.text == text) {
            Some(tag) => tags.push(tag.clone()),
            None => {
                let tag = tag::ActiveModel {
                    text: Set(text),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                tracing::debug!("created tag {:?}", tag.text);
                tags.push(tag);
            }
        }
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&["a", "a"]), vec!["a"]);
        assert_eq!(normalize(&[" red", "blue ", "red", ""]), vec!["red", "blue"]);
        assert!(normalize::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_split() {
        assert_eq!(split("blue, red,,blue "), vec!["blue", "red"]);
        assert!(split("").is_empty());
        assert!(split(" , ").is_empty());
    }
}
