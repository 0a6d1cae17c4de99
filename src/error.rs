use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error as ThisError;
use tracing::{error, warn};

#[derive(Debug, ThisError)]
pub enum TilError {
    #[error("record not found")]
    NotFound,

    #[error("form token mismatch")]
    FormTokenMismatch,

    #[error("not the owner of this record")]
    Forbidden,

    #[error("OAuth flow error: {message}")]
    OauthFlow { code: String, message: String },

    #[error("Google rejected the access token; consent required again")]
    OauthReauth,

    #[error("upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("actor error: {0}")]
    Ractor(String),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    #[error("password hash error: {0}")]
    PasswordHash(String),
}

impl IntoResponse for TilError {
    fn into_response(self) -> Response {
        match self {
            TilError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),

            TilError::FormTokenMismatch => {
                warn!("rejected form submission with a stale or missing token");
                (StatusCode::BAD_REQUEST, "Bad Request").into_response()
            }

            TilError::OauthFlow { code, message } => {
                warn!(code = %code, "OAuth flow rejected: {message}");
                (StatusCode::BAD_REQUEST, "Bad Request").into_response()
            }

            // A rejected access token means the consent screen must run again.
            TilError::OauthReauth => Redirect::to("/login-google").into_response(),

            TilError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),

            TilError::UpstreamStatus(status) => {
                error!("upstream returned {status}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }

            err @ (TilError::Reqwest(_)
            | TilError::Database(_)
            | TilError::Ractor(_)
            | TilError::Template(_)
            | TilError::PasswordHash(_)) => {
                error!("internal error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
