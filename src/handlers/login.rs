use std::sync::Arc;

use axum::{
    extract::{Extension, Form, Query},
    response::{Redirect, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use validator::Validate;

use crate::{
    auth::{safe_next, PendingUser, Session},
    constants::{FLASH_BAD_CREDENTIALS, FLASH_LOGGED_OUT, FLASH_LOGIN_REQUIRED},
    error::PageError,
    handlers::validation_messages,
    models::user,
    pages,
    server::State,
};

/// The form input of a `POST /login` request.
#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    #[validate(
        length(min = 1, max = 320, message = "Email is required"),
        email(message = "Invalid email address")
    )]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

/// Messages for the login page: queued flashes, plus a notice when the user
/// was sent here from a page that requires logging in.
fn login_flashes(session: &mut Session, query: &LoginQuery) -> Vec<String> {
    let mut flashes = session.take_flashes();
    if query.next.is_some() {
        flashes.push(FLASH_LOGIN_REQUIRED.to_owned());
    }
    flashes
}

/// Handler for `GET /login`
pub async fn login_page(
    mut session: Session,
    WithRejection(Query(query), _): WithRejection<Query<LoginQuery>, PageError>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    let flashes = login_flashes(&mut session, &query);
    Ok(session
        .finish(&state, pages::login(&flashes, &[], ""))
        .await?)
}

/// Handler for `POST /login`
pub async fn login(
    mut session: Session,
    WithRejection(Query(query), _): WithRejection<Query<LoginQuery>, PageError>,
    Extension(state): Extension<Arc<State>>,
    WithRejection(Form(input), _): WithRejection<Form<LoginForm>, PageError>,
) -> Result<Response, PageError> {
    let mut flashes = session.take_flashes();
    if let Err(errors) = input.validate() {
        let page = pages::login(&flashes, &validation_messages(&errors), &input.email);
        return Ok(session.finish(&state, page).await?);
    }

    let Some(user) = user::authenticate(&state.db, &input.email, &input.password).await? else {
        tracing::debug!("failed login for {:?}", input.email);
        flashes.push(FLASH_BAD_CREDENTIALS.to_owned());
        let page = pages::login(&flashes, &[], &input.email);
        return Ok(session.finish(&state, page).await?);
    };

    session.login(user.id);
    tracing::info!("user {} logged in", user.id);
    let next = safe_next(query.next.as_deref());
    Ok(session.finish(&state, Redirect::to(next)).await?)
}

/// Handler for `GET /logout`
pub async fn logout(
    PendingUser { user, mut session }: PendingUser,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    session.logout();
    session.flash(FLASH_LOGGED_OUT);
    tracing::info!("user {} logged out", user.id);
    Ok(session.finish(&state, Redirect::to("/")).await?)
}
