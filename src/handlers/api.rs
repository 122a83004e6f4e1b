//! The JSON API under `/api`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, Query},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    auth::ApiUser,
    error::ServerError,
    handlers::checked_week,
    models::{
        snippet::{self, SnippetJson, SnippetPage},
        user::UserJson,
    },
    pages::url_with_query,
    server::State,
    tokens::{self, Purpose, AUTH_TOKEN_EXPIRATION},
    week::{this_week, IsoWeek},
};

#[derive(Debug, Serialize)]
pub struct TokenJson {
    token: String,
    expiration: u64,
}

/// The body of a snippet update. Both fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SnippetInput {
    #[validate(length(max = 100000, message = "Maximum length is 100000 characters"))]
    text: String,
    #[validate(custom(function = "validate_tags"))]
    tags: Vec<String>,
}

/// Tags get the same limit as the comma separated tag field of the web form.
fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    let length = tags.iter().map(|tag| tag.chars().count()).sum::<usize>()
        + tags.len().saturating_sub(1);
    if length > 1000 {
        let mut error = ValidationError::new("length");
        error.message = Some("Maximum length is 1000 characters".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct WeeksQuery {
    page: Option<u64>,
    tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeeksJson {
    weeks: Vec<SnippetJson>,
    prev_url: Option<String>,
    next_url: Option<String>,
    count: u64,
}

impl WeeksJson {
    fn new(page: SnippetPage, path: &str, tag: Option<&str>) -> Self {
        let url = |number: u64| {
            url_with_query(
                path,
                &[
                    ("page", Some(number.to_string())),
                    ("tag", tag.map(str::to_owned)),
                ],
            )
        };
        Self {
            prev_url: page.has_prev().then(|| url(page.page - 1)),
            next_url: page.has_next().then(|| url(page.page + 1)),
            count: page.count,
            weeks: page.snippets.iter().map(|s| s.to_json()).collect(),
        }
    }
}

/// Handler for `POST /api/login` and `POST /api/tokens/`
pub async fn get_token(
    api_user: ApiUser,
    Extension(state): Extension<Arc<State>>,
) -> Result<Json<TokenJson>, ServerError> {
    api_user.require_password()?;
    let token = tokens::seal(
        &state.config.secret_key,
        Purpose::Auth,
        api_user.user.id,
        AUTH_TOKEN_EXPIRATION,
    )?;
    tracing::debug!("issued api token for user {}", api_user.user.id);
    Ok(Json(TokenJson {
        token,
        expiration: AUTH_TOKEN_EXPIRATION,
    }))
}

/// Handler for `GET /api/user`
pub async fn get_user(ApiUser { user, .. }: ApiUser) -> Json<UserJson> {
    Json(UserJson::from(&user))
}

async fn weeks_of(
    state: &State,
    user_id: i32,
    query: WeeksQuery,
    path: &str,
) -> Result<Json<WeeksJson>, ServerError> {
    let tag = query.tag.as_deref().filter(|tag| !tag.is_empty());
    let page = snippet::get_all(
        &state.db,
        user_id,
        tag,
        query.page.unwrap_or(1),
        state.config.snippets_per_page,
    )
    .await?;
    Ok(Json(WeeksJson::new(page, path, tag)))
}

/// Handler for `GET /api/weeks/`
pub async fn get_weeks(
    ApiUser { user, .. }: ApiUser,
    WithRejection(Query(query), _): WithRejection<Query<WeeksQuery>, ServerError>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Json<WeeksJson>, ServerError> {
    weeks_of(&state, user.id, query, "/api/weeks/").await
}

async fn read_week(state: &State, user_id: i32, week: IsoWeek) -> Result<Json<SnippetJson>, ServerError> {
    let snippet = snippet::get_or_placeholder(&state.db, user_id, week).await?;
    Ok(Json(snippet.to_json()))
}

async fn write_week(
    state: &State,
    user_id: i32,
    week: IsoWeek,
    input: SnippetInput,
) -> Result<Json<SnippetJson>, ServerError> {
    input.validate()?;
    let snippet = snippet::update(&state.db, user_id, week, &input.text, &input.tags).await?;
    Ok(Json(snippet.to_json()))
}

/// Handler for `GET /api/weeks/current`
pub async fn get_current_week(
    ApiUser { user, .. }: ApiUser,
    Extension(state): Extension<Arc<State>>,
) -> Result<Json<SnippetJson>, ServerError> {
    read_week(&state, user.id, this_week()).await
}

/// Handler for `PUT|POST /api/weeks/current`
pub async fn update_current_week(
    ApiUser { user, .. }: ApiUser,
    Extension(state): Extension<Arc<State>>,
    WithRejection(Json(input), _): WithRejection<Json<SnippetInput>, ServerError>,
) -> Result<Json<SnippetJson>, ServerError> {
    write_week(&state, user.id, this_week(), input).await
}

/// Handler for `GET /api/weeks/:year/:week`
pub async fn get_week(
    ApiUser { user, .. }: ApiUser,
    WithRejection(Path((year, week)), _): WithRejection<Path<(i32, i32)>, ServerError>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Json<SnippetJson>, ServerError> {
    read_week(&state, user.id, checked_week(year, week)?).await
}

/// Handler for `PUT|POST /api/weeks/:year/:week`
pub async fn update_week(
    ApiUser { user, .. }: ApiUser,
    WithRejection(Path((year, week)), _): WithRejection<Path<(i32, i32)>, ServerError>,
    Extension(state): Extension<Arc<State>>,
    WithRejection(Json(input), _): WithRejection<Json<SnippetInput>, ServerError>,
) -> Result<Json<SnippetJson>, ServerError> {
    write_week(&state, user.id, checked_week(year, week)?, input).await
}

/// Callers may only read their own user resources.
fn require_self(api_user: &ApiUser, user_id: i32) -> Result<(), ServerError> {
    if api_user.user.id != user_id {
        return Err(ServerError::Unauthorized("Invalid credentials"));
    }
    Ok(())
}

/// Handler for `GET /api/users/:id`
pub async fn get_user_by_id(
    api_user: ApiUser,
    WithRejection(Path(user_id), _): WithRejection<Path<i32>, ServerError>,
) -> Result<Json<UserJson>, ServerError> {
    require_self(&api_user, user_id)?;
    Ok(Json(UserJson::from(&api_user.user)))
}

/// Handler for `GET /api/users/:id/weeks/`
pub async fn get_user_weeks(
    api_user: ApiUser,
    WithRejection(Path(user_id), _): WithRejection<Path<i32>, ServerError>,
    WithRejection(Query(query), _): WithRejection<Query<WeeksQuery>, ServerError>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Json<WeeksJson>, ServerError> {
    require_self(&api_user, user_id)?;
    let path = format!("/api/users/{}/weeks/", user_id);
    weeks_of(&state, user_id, query, &path).await
}

/// Handler for `GET /api/users/:id/weeks/:year/:week`
pub async fn get_user_week(
    api_user: ApiUser,
    WithRejection(Path((user_id, year, week)), _): WithRejection<Path<(i32, i32, i32)>, ServerError>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Json<SnippetJson>, ServerError> {
    require_self(&api_user, user_id)?;
    read_week(&state, user_id, checked_week(year, week)?).await
}

/// Fallback for unknown `/api` paths.
pub async fn not_found() -> impl IntoResponse {
    ServerError::NotFound
}
