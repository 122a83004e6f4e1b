use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::{Redirect, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use validator::Validate;

use crate::{
    auth::{Auth, Session, WebUser},
    constants::FLASH_INVALID_WEEK,
    error::{PageError, ServerError},
    handlers::{checked_week, ValidatedForm},
    models::{snippet, tag},
    pages,
    server::State,
    week::{this_week, IsoWeek},
};

fn edit_url(week: IsoWeek) -> String {
    format!("/edit/{}/{}", week.year, week.week)
}

/// Handler for `GET /`
pub async fn index(
    mut session: Session,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    if let Auth::KnownUser(_) = session.auth(&state).await? {
        return Ok(session.finish(&state, Redirect::to("/edit")).await?);
    }
    let flashes = session.take_flashes();
    Ok(session.finish(&state, pages::index(&flashes)).await?)
}

/// Handler for `GET /edit`
pub async fn edit_current(_: WebUser) -> Redirect {
    Redirect::to(&edit_url(this_week()))
}

/// Handler for `GET /edit/:year/:week`
pub async fn edit(
    WebUser { user, mut session }: WebUser,
    WithRejection(Path((year, week)), _): WithRejection<Path<(i32, i32)>, PageError>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    let week = match checked_week(year, week) {
        Ok(week) => week,
        Err(_) => {
            session.flash(FLASH_INVALID_WEEK);
            let redirect = Redirect::to(&edit_url(this_week()));
            return Ok(session.finish(&state, redirect).await?);
        }
    };

    let snippet = snippet::get_or_placeholder(&state.db, user.id, week).await?;
    let week_begin = week.monday().ok_or(ServerError::InvalidWeek)?;
    let flashes = session.take_flashes();
    let page = pages::edit(&user, &flashes, &snippet, week_begin);
    Ok(session.finish(&state, page).await?)
}

/// The form input of a `POST /edit/:year/:week` request.
#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct SnippetForm {
    #[validate(length(max = 100000, message = "Maximum length is 100000 characters"))]
    text: String,
    /// Comma separated
    #[validate(length(max = 1000, message = "Maximum length is 1000 characters"))]
    tags: String,
}

/// Handler for `POST /edit/:year/:week`
pub async fn save(
    WebUser { user, mut session }: WebUser,
    WithRejection(Path((year, week)), _): WithRejection<Path<(i32, i32)>, PageError>,
    Extension(state): Extension<Arc<State>>,
    ValidatedForm(input): ValidatedForm<SnippetForm>,
) -> Result<Response, PageError> {
    let week = match checked_week(year, week) {
        Ok(week) => week,
        Err(_) => {
            session.flash(FLASH_INVALID_WEEK);
            let redirect = Redirect::to(&edit_url(this_week()));
            return Ok(session.finish(&state, redirect).await?);
        }
    };

    let tags = tag::split(&input.tags);
    snippet::update(&state.db, user.id, week, &input.text, &tags).await?;
    Ok(session.finish(&state, Redirect::to(&edit_url(week))).await?)
}

/// The query of a `GET /history` request.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    page: Option<u64>,
    tag: Option<String>,
}

/// Handler for `GET /history`
pub async fn history(
    WebUser { user, mut session }: WebUser,
    WithRejection(Query(query), _): WithRejection<Query<HistoryQuery>, PageError>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    let tag = query.tag.as_deref().filter(|tag| !tag.is_empty());
    let page = snippet::get_all(
        &state.db,
        user.id,
        tag,
        query.page.unwrap_or(1),
        state.config.snippets_per_page,
    )
    .await?;

    let flashes = session.take_flashes();
    let html = pages::history(&user, &flashes, &page, tag);
    Ok(session.finish(&state, html).await?)
}
