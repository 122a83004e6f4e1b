use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pages;

const INTERNAL_SERVER_ERROR_MESSAGE: &str = "something went wrong on our side";

/// Any possible server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("invalid ISO week date")]
    InvalidWeek,

    #[error(transparent)]
    AxumFormRejection(#[from] FormRejection),

    #[error(transparent)]
    AxumJsonRejection(#[from] JsonRejection),

    #[error(transparent)]
    AxumQueryRejection(#[from] QueryRejection),

    #[error(transparent)]
    AxumPathRejection(#[from] PathRejection),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("resource not found")]
    NotFound,

    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    DbError(#[from] sea_orm::DbErr),

    #[error(transparent)]
    RedisError(#[from] redis::RedisError),

    #[error(transparent)]
    MailError(#[from] lettre::error::Error),

    #[error(transparent)]
    SmtpError(#[from] lettre::transport::smtp::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::ValidationError(_)
            | ServerError::InvalidWeek
            | ServerError::AxumFormRejection(_)
            | ServerError::AxumJsonRejection(_)
            | ServerError::AxumQueryRejection(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            // a path that doesn't parse is a route that doesn't exist
            ServerError::AxumPathRejection(_) | ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::DbError(_)
            | ServerError::RedisError(_)
            | ServerError::MailError(_)
            | ServerError::SmtpError(_)
            | ServerError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client. Internal details are logged, never sent.
    pub fn message(&self) -> String {
        match self {
            ServerError::ValidationError(_) => {
                format!("Input validation error: [{}]", self).replace('\n', ", ")
            }
            _ if self.status().is_server_error() => {
                tracing::error!("internal error occurred: {:?}", self);
                INTERNAL_SERVER_ERROR_MESSAGE.into()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = status
            .canonical_reason()
            .unwrap_or("error")
            .to_lowercase();
        let body = json!({
            "error": error,
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

/// A [`ServerError`] raised by a web page, rendered as HTML instead of JSON.
#[derive(Debug)]
pub struct PageError(pub ServerError);

macro_rules! impl_page_error_from {
    ($( $t:ty ),+) => {
        $(
            impl From<$t> for PageError {
                fn from(err: $t) -> Self {
                    PageError(err.into())
                }
            }
        )+
    };
}

impl_page_error_from!(
    ServerError,
    validator::ValidationErrors,
    FormRejection,
    QueryRejection,
    PathRejection,
    sea_orm::DbErr,
    redis::RedisError,
    lettre::error::Error,
    lettre::transport::smtp::Error,
    anyhow::Error
);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let message = self.0.message();
        (status, pages::error_page(status, &message)).into_response()
    }
}
