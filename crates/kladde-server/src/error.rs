use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Request-level failure classification.
///
/// `NotFound` covers both a malformed identifier and a genuinely absent
/// record so the two cannot be told apart from outside. `Internal`
/// keeps the full error chain for the server-side log line; the client
/// only ever sees the generic status text.
#[derive(Debug)]
pub enum AppError {
    NotFound,
    BadRequest,
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            AppError::BadRequest => (StatusCode::BAD_REQUEST, "Bad Request").into_response(),
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// Lets handlers bubble any infrastructure error up with `?`; domain
/// conditions that map to other statuses are matched out before this
/// conversion applies.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::Internal(err.into())
    }
}
