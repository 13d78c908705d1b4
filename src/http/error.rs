use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::email;

#[derive(Debug)]
pub enum Error {
    EmailRequired,
    InvalidBody(String),
    Dispatch(email::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Error::EmailRequired => "Email address is required.",
            Error::InvalidBody(msg) => msg.as_str(),
            Error::Dispatch(_) => "Failed to send email!",
        };

        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::EmailRequired | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail passed through to the caller, verbatim.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Dispatch(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl From<email::Error> for Error {
    fn from(e: email::Error) -> Self {
        error!("Email sending error: {e}");
        Error::Dispatch(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}
