use std::sync::Arc;

use axum::{
    extract::{Extension, Form, Path},
    response::{Redirect, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use validator::Validate;

use crate::{
    auth::{Auth, PendingUser, Session},
    constants::{
        FLASH_BAD_CONFIRMATION, FLASH_CONFIRMATION_RESENT, FLASH_CONFIRMED,
        FLASH_PASSWORD_UPDATED, FLASH_REGISTERED, FLASH_RESET_FAILED, FLASH_RESET_SENT,
        FLASH_WRONG_PASSWORD,
    },
    error::{PageError, ServerError},
    handlers::validation_messages,
    models::user::{self, EMAIL_TAKEN},
    pages,
    server::State,
    tokens::{self, Purpose, ACCOUNT_TOKEN_EXPIRATION},
    utils::{
        mail::{send_confirmation, send_reset},
        pass::verify_password,
    },
};

/// The form input for `POST /register`
#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters long"))]
    name: String,
    #[validate(
        length(min = 1, max = 320, message = "Email must be 1 to 320 characters long"),
        email(message = "Invalid email address")
    )]
    email: String,
    #[validate(
        length(min = 1, message = "Password is required"),
        must_match(other = "password2", message = "Passwords must match!")
    )]
    password: String,
    password2: String,
}

/// The form input for `POST /settings`
#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct ChangePasswordForm {
    #[validate(length(min = 1, message = "Current password is required"))]
    old_password: String,
    #[validate(
        length(min = 1, message = "New password is required"),
        must_match(other = "new_password2", message = "Passwords must match!")
    )]
    new_password: String,
    new_password2: String,
}

/// The form input for `POST /request_reset`
#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct RequestResetForm {
    #[validate(
        length(min = 1, max = 320, message = "Email must be 1 to 320 characters long"),
        email(message = "Invalid email address")
    )]
    email: String,
}

/// The form input for `POST /reset/:token`
#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct ResetForm {
    #[validate(
        length(min = 1, message = "New password is required"),
        must_match(other = "new_password2", message = "Passwords must match!")
    )]
    new_password: String,
    new_password2: String,
}

/// Handler for `GET /register`
pub async fn register_page(
    mut session: Session,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    let flashes = session.take_flashes();
    Ok(session
        .finish(&state, pages::register(&flashes, &[], "", ""))
        .await?)
}

/// Handler for `POST /register`
pub async fn register(
    mut session: Session,
    Extension(state): Extension<Arc<State>>,
    WithRejection(Form(input), _): WithRejection<Form<RegisterForm>, PageError>,
) -> Result<Response, PageError> {
    let mut errors = match input.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => validation_messages(&errors),
    };
    if user::find_by_email(&state.db, &input.email).await?.is_some() {
        errors.push(EMAIL_TAKEN.to_owned());
    }
    if errors.is_empty() {
        match user::create(&state.db, &input.email, &input.name, &input.password, false).await {
            Ok(user) => return registered(session, &state, user).await,
            // lost a race against another registration for the same email
            Err(ServerError::Conflict(message)) => errors.push(message.to_owned()),
            Err(err) => return Err(err.into()),
        }
    }

    let flashes = session.take_flashes();
    let page = pages::register(&flashes, &errors, &input.name, &input.email);
    Ok(session.finish(&state, page).await?)
}

async fn registered(
    mut session: Session,
    state: &State,
    user: user::Model,
) -> Result<Response, PageError> {
    let token = tokens::seal(
        &state.config.secret_key,
        Purpose::Confirm,
        user.id,
        ACCOUNT_TOKEN_EXPIRATION,
    )?;
    send_confirmation(&state.mailer, &state.config, &user, &token).await?;

    session.flash(FLASH_REGISTERED);
    Ok(session.finish(state, Redirect::to("/login")).await?)
}

/// Handler for `GET /unconfirmed`
pub async fn unconfirmed(
    mut session: Session,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    match session.auth(&state).await? {
        Auth::KnownUser(user) if !user.confirmed => {
            let flashes = session.take_flashes();
            Ok(session
                .finish(&state, pages::unconfirmed(&user, &flashes))
                .await?)
        }
        _ => Ok(session.finish(&state, Redirect::to("/")).await?),
    }
}

/// Handler for `GET /confirm`, sends a new confirmation email.
pub async fn resend_confirmation(
    PendingUser { user, mut session }: PendingUser,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    let token = tokens::seal(
        &state.config.secret_key,
        Purpose::Confirm,
        user.id,
        ACCOUNT_TOKEN_EXPIRATION,
    )?;
    send_confirmation(&state.mailer, &state.config, &user, &token).await?;

    session.flash(FLASH_CONFIRMATION_RESENT);
    Ok(session.finish(&state, Redirect::to("/")).await?)
}

/// Handler for `GET /confirm/:token`
pub async fn confirm(
    PendingUser { user, mut session }: PendingUser,
    Path(token): Path<String>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    if user.confirmed {
        return Ok(session.finish(&state, Redirect::to("/")).await?);
    }
    if user::confirm(&state.db, &state.config.secret_key, &user, &token).await? {
        session.flash(FLASH_CONFIRMED);
    } else {
        session.flash(FLASH_BAD_CONFIRMATION);
    }
    Ok(session.finish(&state, Redirect::to("/")).await?)
}

/// Handler for `GET /settings`
pub async fn settings_page(
    PendingUser { user, mut session }: PendingUser,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    let flashes = session.take_flashes();
    Ok(session
        .finish(&state, pages::settings(&user, &flashes, &[]))
        .await?)
}

/// Handler for `POST /settings`, changes the password.
pub async fn settings(
    PendingUser { user, mut session }: PendingUser,
    Extension(state): Extension<Arc<State>>,
    WithRejection(Form(input), _): WithRejection<Form<ChangePasswordForm>, PageError>,
) -> Result<Response, PageError> {
    let mut flashes = session.take_flashes();
    if let Err(errors) = input.validate() {
        let page = pages::settings(&user, &flashes, &validation_messages(&errors));
        return Ok(session.finish(&state, page).await?);
    }
    if !verify_password(&input.old_password, &user.password_hash) {
        flashes.push(FLASH_WRONG_PASSWORD.to_owned());
        let page = pages::settings(&user, &flashes, &[]);
        return Ok(session.finish(&state, page).await?);
    }

    let user = user::set_password(&state.db, user, &input.new_password).await?;
    tracing::info!("user {} changed their password", user.id);
    session.flash(FLASH_PASSWORD_UPDATED);
    Ok(session.finish(&state, Redirect::to("/settings")).await?)
}

/// Handler for `GET /request_reset`
pub async fn request_reset_page(
    mut session: Session,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    if let Auth::KnownUser(_) = session.auth(&state).await? {
        return Ok(session.finish(&state, Redirect::to("/")).await?);
    }
    let flashes = session.take_flashes();
    Ok(session
        .finish(&state, pages::request_reset(&flashes, &[]))
        .await?)
}

/// Handler for `POST /request_reset`
pub async fn request_reset(
    mut session: Session,
    Extension(state): Extension<Arc<State>>,
    WithRejection(Form(input), _): WithRejection<Form<RequestResetForm>, PageError>,
) -> Result<Response, PageError> {
    if let Auth::KnownUser(_) = session.auth(&state).await? {
        return Ok(session.finish(&state, Redirect::to("/")).await?);
    }
    if let Err(errors) = input.validate() {
        let flashes = session.take_flashes();
        let page = pages::request_reset(&flashes, &validation_messages(&errors));
        return Ok(session.finish(&state, page).await?);
    }

    // the answer is the same whether the account exists or not
    if let Some(user) = user::find_by_email(&state.db, &input.email).await? {
        let token = tokens::seal(
            &state.config.secret_key,
            Purpose::Reset,
            user.id,
            ACCOUNT_TOKEN_EXPIRATION,
        )?;
        send_reset(&state.mailer, &state.config, &user, &token).await?;
    }
    session.flash(FLASH_RESET_SENT);
    Ok(session.finish(&state, Redirect::to("/login")).await?)
}

/// Handler for `GET /reset/:token`
pub async fn reset_page(
    mut session: Session,
    Path(_token): Path<String>,
    Extension(state): Extension<Arc<State>>,
) -> Result<Response, PageError> {
    if let Auth::KnownUser(_) = session.auth(&state).await? {
        return Ok(session.finish(&state, Redirect::to("/")).await?);
    }
    let flashes = session.take_flashes();
    Ok(session.finish(&state, pages::reset(&flashes, &[])).await?)
}

/// Handler for `POST /reset/:token`
pub async fn reset(
    mut session: Session,
    Path(token): Path<String>,
    Extension(state): Extension<Arc<State>>,
    WithRejection(Form(input), _): WithRejection<Form<ResetForm>, PageError>,
) -> Result<Response, PageError> {
    if let Auth::KnownUser(_) = session.auth(&state).await? {
        return Ok(session.finish(&state, Redirect::to("/")).await?);
    }
    if let Err(errors) = input.validate() {
        let flashes = session.take_flashes();
        let page = pages::reset(&flashes, &validation_messages(&errors));
        return Ok(session.finish(&state, page).await?);
    }

    if user::reset_password(&state.db, &state.config.secret_key, &token, &input.new_password)
        .await?
    {
        session.flash(FLASH_PASSWORD_UPDATED);
    } else {
        session.flash(FLASH_RESET_FAILED);
    }
    Ok(session.finish(&state, Redirect::to("/login")).await?)
}
