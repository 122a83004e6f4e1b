use chrono::{NaiveDate, Utc};
use entity::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::Serialize;

pub use entity::user::Model;

use crate::{
    error::ServerError,
    models::is_unique_violation,
    tokens::{self, Purpose},
    utils::pass::{hash_password, verify_password},
};

/// A user as the API shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserJson {
    pub name: String,
    pub email: String,
    pub member_since: NaiveDate,
}

impl From<&Model> for UserJson {
    fn from(user: &Model) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            member_since: user.member_since,
        }
    }
}

pub const EMAIL_TAKEN: &str = "Email already registered";

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a user, failing with [`ServerError::Conflict`] when the email is taken.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    email: &str,
    name: &str,
    password: &str,
    confirmed: bool,
) -> Result<Model, ServerError> {
    let user = user::ActiveModel {
        email: Set(normalize_email(email)),
        name: Set(name.trim().to_owned()),
        password_hash: Set(hash_password(password)?),
        confirmed: Set(confirmed),
        member_since: Set(Utc::now().date_naive()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            ServerError::Conflict(EMAIL_TAKEN)
        } else {
            err.into()
        }
    })?;

    tracing::info!("created user {} <{}>", user.id, user.email);
    Ok(user)
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Model>, DbErr> {
    user::Entity::find_by_id(id).one(db).await
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
}

/// The user with this email, if `password` is theirs.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> Result<Option<Model>, DbErr> {
    Ok(find_by_email(db, email)
        .await?
        .filter(|user| verify_password(password, &user.password_hash)))
}

pub async fn set_password<C: ConnectionTrait>(
    db: &C,
    user: Model,
    password: &str,
) -> Result<Model, ServerError> {
    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(password)?);
    Ok(active.update(db).await?)
}

/// Confirm `user` with a confirmation token.
///
/// Returns `false` if the token is invalid, expired, or was issued to
/// someone else.
pub async fn confirm<C: ConnectionTrait>(
    db: &C,
    key: &[u8; 32],
    user: &Model,
    token: &str,
) -> Result<bool, DbErr> {
    if tokens::open(key, Purpose::Confirm, token) != Some(user.id) {
        return Ok(false);
    }
    if !user.confirmed {
        let mut active: user::ActiveModel = user.clone().into();
        active.confirmed = Set(true);
        active.update(db).await?;
        tracing::info!("user {} confirmed their account", user.id);
    }
    Ok(true)
}

/// Set a new password for whoever a reset token was issued to.
///
/// Returns `false` if the token is invalid or expired, or its user is gone.
pub async fn reset_password<C: ConnectionTrait>(
    db: &C,
    key: &[u8; 32],
    token: &str,
    new_password: &str,
) -> Result<bool, ServerError> {
    let Some(id) = tokens::open(key, Purpose::Reset, token) else {
        return Ok(false);
    };
    let Some(user) = find_by_id(db, id).await? else {
        return Ok(false);
    };
    set_password(db, user, new_password).await?;
    tracing::info!("user {} reset their password", id);
    Ok(true)
}
