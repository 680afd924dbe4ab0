//! Translation of engine failures into HTTP responses.
//!
//! The mapping is fixed by the error taxonomy: a rejected caller is the
//! caller's fault (400), every clock-safety fault is node-internal (500),
//! and configuration faults never reach a handler because the process
//! refuses to start with a bad identity.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snowdrift::Error;
use snowdrift_wire::ErrorBody;

/// A failed generation request.
#[derive(Debug)]
pub enum ApiError {
    /// The engine refused to issue an ID.
    Engine(Error),
    /// The request machinery itself failed (e.g., a panicked worker task).
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Engine(Error::RejectedCaller) => {
                tracing::warn!("rejected caller identity");
                (StatusCode::BAD_REQUEST, Error::RejectedCaller.to_string())
            }
            Self::Engine(err) => {
                tracing::error!(%err, "id generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            Self::Internal(context) => {
                tracing::error!(context, "request handling failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("internal error"),
                )
            }
        };

        let body = ErrorBody {
            code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
