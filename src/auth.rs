//! Who is making a request.
//!
//! Web pages authenticate with a session cookie ([`Session`], [`WebUser`],
//! [`PendingUser`]); the JSON API with basic or bearer
//! credentials ([`ApiUser`]).

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{Extension, FromRequestParts},
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    headers::{
        authorization::{Basic, Bearer},
        Authorization, Cookie,
    },
    TypedHeader,
};

use crate::{
    config::Config,
    constants::{SESSION_COOKIE_NAME, SESSION_DURATION_SECS},
    error::{PageError, ServerError},
    models::user,
    pages::url_with_query,
    server::State,
    sessions::SessionData,
    tokens::{self, Purpose},
};

async fn state_from_parts(parts: &mut Parts) -> Result<Arc<State>, ServerError> {
    let Extension(state) = Extension::<Arc<State>>::from_request_parts(parts, &())
        .await
        .map_err(|_| anyhow::format_err!("State extension missing"))?;
    Ok(state)
}

/// The web session of a request.
///
/// Changes are only stored when the response passes through
/// [`Session::finish`].
#[derive(Debug)]
pub struct Session {
    key: Option<String>,
    stale_key: Option<String>,
    pub data: SessionData,
    dirty: bool,
}

impl Session {
    pub async fn load(state: &State, cookie: Option<&Cookie>) -> Result<Self, ServerError> {
        let key = cookie.and_then(|cookie| cookie.get(SESSION_COOKIE_NAME));
        let (key, data) = match key {
            Some(key) => match state.sessions.load(key).await? {
                Some(data) => (Some(key.to_owned()), data),
                None => (None, SessionData::default()),
            },
            None => (None, SessionData::default()),
        };
        Ok(Self {
            key,
            stale_key: None,
            data,
            dirty: false,
        })
    }

    pub fn user_id(&self) -> Option<i32> {
        self.data.user_id
    }

    /// Who this session is logged in as.
    pub async fn auth(&self, state: &State) -> Result<Auth, ServerError> {
        match self.user_id() {
            Some(id) => match user::find_by_id(&state.db, id).await? {
                Some(user) => Ok(Auth::KnownUser(user)),
                None => Ok(Auth::UnknownUser),
            },
            None => Ok(Auth::UnknownUser),
        }
    }

    /// Queue a message for the next rendered page.
    pub fn flash(&mut self, message: impl Into<String>) {
        self.data.flashes.push(message.into());
        self.dirty = true;
    }

    /// Messages queued by earlier requests, removed from the session.
    pub fn take_flashes(&mut self) -> Vec<String> {
        if !self.data.flashes.is_empty() {
            self.dirty = true;
        }
        std::mem::take(&mut self.data.flashes)
    }

    /// Log `user_id` in under a fresh session key.
    pub fn login(&mut self, user_id: i32) {
        self.rotate();
        self.data.user_id = Some(user_id);
    }

    /// Forget the user and the old session key.
    pub fn logout(&mut self) {
        self.rotate();
        self.data = SessionData::default();
    }

    fn rotate(&mut self) {
        if let Some(key) = self.key.take() {
            self.stale_key = Some(key);
        }
        self.dirty = true;
    }

    /// Store the session, attaching a cookie to `response` if the session key changed.
    pub async fn finish(
        self,
        state: &State,
        response: impl IntoResponse,
    ) -> Result<Response, ServerError> {
        let mut response = response.into_response();
        if let Some(stale_key) = &self.stale_key {
            state.sessions.remove(stale_key).await?;
        }
        if !self.dirty {
            return Ok(response);
        }

        let cookie = match &self.key {
            Some(key) => {
                state
                    .sessions
                    .save(key, &self.data, SESSION_DURATION_SECS)
                    .await?;
                None
            }
            None if self.data == SessionData::default() => {
                self.stale_key.as_ref().map(|_| expired_cookie(&state.config))
            }
            None => {
                let key = state
                    .sessions
                    .create(&self.data, SESSION_DURATION_SECS)
                    .await?;
                Some(session_cookie(&state.config, &key))
            }
        };

        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| anyhow::format_err!("invalid session cookie: {}", e))?;
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Ok(response)
    }
}

fn cookie_attributes(config: &Config) -> String {
    let mut attributes = String::from("HttpOnly; SameSite=Lax; Path=/");
    if config.secure_cookies {
        attributes.push_str("; Secure");
    }
    if let Some(domain) = &config.domain {
        attributes.push_str(&format!("; Domain={}", domain));
    }
    attributes
}

fn session_cookie(config: &Config, key: &str) -> String {
    format!(
        "{cname}={cval}; {attrs}; Max-Age={sd}",
        cname = SESSION_COOKIE_NAME,
        cval = key,
        attrs = cookie_attributes(config),
        sd = SESSION_DURATION_SECS
    )
}

fn expired_cookie(config: &Config) -> String {
    format!(
        "{cname}=expired; {attrs}; Max-Age=0",
        cname = SESSION_COOKIE_NAME,
        attrs = cookie_attributes(config),
    )
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let state = state_from_parts(parts).await?;
        let cookie = Option::<TypedHeader<Cookie>>::from_request_parts(parts, &())
            .await
            .unwrap_or(None);
        Ok(Session::load(&state, cookie.as_ref().map(|TypedHeader(c)| c)).await?)
    }
}

/// The authorization of a web user making a request.
#[derive(Debug)]
pub enum Auth {
    KnownUser(user::Model),
    UnknownUser,
}

/// Where to go after logging in: local paths only.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/",
    }
}

/// Load the logged in user, or redirect to the login page and back.
async fn logged_in(parts: &mut Parts) -> Result<(user::Model, Session), Response> {
    let state = state_from_parts(parts)
        .await
        .map_err(|e| PageError(e).into_response())?;
    let cookie = Option::<TypedHeader<Cookie>>::from_request_parts(parts, &())
        .await
        .unwrap_or(None);
    let session = Session::load(&state, cookie.as_ref().map(|TypedHeader(c)| c))
        .await
        .map_err(|e| PageError(e).into_response())?;

    let user = match session.user_id() {
        Some(id) => user::find_by_id(&state.db, id)
            .await
            .map_err(|e| PageError::from(e).into_response())?,
        None => None,
    };
    match user {
        Some(user) => Ok((user, session)),
        None => {
            let next = parts
                .uri
                .path_and_query()
                .map(|p| p.as_str())
                .unwrap_or("/");
            // the login page shows the notice when `next` is set
            let login = url_with_query("/login", &[("next", Some(next.to_owned()))]);
            Err(Redirect::to(&login).into_response())
        }
    }
}

/// A logged in user, confirmed or not, with their session.
#[derive(Debug)]
pub struct PendingUser {
    pub user: user::Model,
    pub session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for PendingUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let (user, session) = logged_in(parts).await?;
        Ok(PendingUser { user, session })
    }
}

/// A logged in user who confirmed their account, with their session.
///
/// Unconfirmed users are sent to `/unconfirmed`.
#[derive(Debug)]
pub struct WebUser {
    pub user: user::Model,
    pub session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for WebUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let (user, session) = logged_in(parts).await?;
        if !user.confirmed {
            return Err(Redirect::to("/unconfirmed").into_response());
        }
        Ok(WebUser { user, session })
    }
}

/// The API caller, authenticated by basic auth (`email:password`, or a
/// token as the username with an empty password) or by a bearer token.
#[derive(Debug)]
pub struct ApiUser {
    pub user: user::Model,
    /// Whether a token rather than a password was presented
    pub token_used: bool,
}

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[async_trait]
impl<S> FromRequestParts<S> for ApiUser
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let state = state_from_parts(parts).await?;

        let basic = Option::<TypedHeader<Authorization<Basic>>>::from_request_parts(parts, &())
            .await
            .unwrap_or(None);
        let bearer = Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, &())
            .await
            .unwrap_or(None);

        let (user, token_used) = match (basic, bearer) {
            (Some(TypedHeader(Authorization(basic))), _) if basic.username().is_empty() => {
                (None, false)
            }
            (Some(TypedHeader(Authorization(basic))), _) if basic.password().is_empty() => {
                (user_from_token(&state, basic.username()).await?, true)
            }
            (Some(TypedHeader(Authorization(basic))), _) => (
                user::authenticate(&state.db, basic.username(), basic.password()).await?,
                false,
            ),
            (None, Some(TypedHeader(Authorization(bearer)))) => {
                (user_from_token(&state, bearer.token()).await?, true)
            }
            (None, None) => (None, false),
        };

        let user = user.ok_or(ServerError::Unauthorized(INVALID_CREDENTIALS))?;
        if !user.confirmed {
            return Err(ServerError::Forbidden("Unconfirmed account"));
        }
        Ok(ApiUser { user, token_used })
    }
}

async fn user_from_token(state: &State, token: &str) -> Result<Option<user::Model>, ServerError> {
    match tokens::open(&state.config.secret_key, Purpose::Auth, token) {
        Some(id) => Ok(user::find_by_id(&state.db, id).await?),
        None => Ok(None),
    }
}

impl ApiUser {
    /// Refuse token-authenticated callers, for endpoints that issue tokens.
    pub fn require_password(&self) -> Result<(), ServerError> {
        if self.token_used {
            return Err(ServerError::Unauthorized(INVALID_CREDENTIALS));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/edit/2017/9")), "/edit/2017/9");
        assert_eq!(safe_next(Some("http://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_session_cookie_attributes() {
        let mut config = Config::with_secret([0; 32]);
        let cookie = session_cookie(&config, "abc");
        assert!(cookie.starts_with("lwsessid=abc; HttpOnly"));
        assert!(!cookie.contains("Secure"));

        config.secure_cookies = true;
        config.domain = Some("example.com".into());
        let cookie = session_cookie(&config, "abc");
        assert!(cookie.contains("; Secure"));
        assert!(cookie.contains("; Domain=example.com"));
    }
}
