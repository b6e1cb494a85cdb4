//! HTTP adapter mapping for domain errors.
//!
//! Handlers return `domain::Error` directly. Each [`ErrorCode`] maps to one
//! status; server-side failures are logged here and their message and
//! details are replaced before the envelope leaves the process. Extractor
//! failures (malformed JSON, non-numeric path ids) are folded into the same
//! envelope through [`json_config`] and [`path_config`].

use actix_web::error::{JsonPayloadError, PathError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use tracing::{debug, error};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const REDACTED_INTERNAL: &str = "Internal server error";
const REDACTED_UNAVAILABLE: &str = "Service temporarily unavailable";

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest | ErrorCode::RuleViolation => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing copy of `error`.
///
/// Storage and internal failures keep only their code and trace id.
fn public_envelope(error: &Error) -> Error {
    let message = match error.code() {
        ErrorCode::ServiceUnavailable => REDACTED_UNAVAILABLE,
        code if status_for(code).is_server_error() => REDACTED_INTERNAL,
        _ => return error.clone(),
    };
    let redacted = Error::new(error.code(), message);
    match error.trace_id() {
        Some(id) => redacted.with_trace_id(id.to_owned()),
        None => redacted,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = ?self.code(), trace_id = ?self.trace_id(), detail = %self.message(),
                "request failed");
        } else {
            debug!(code = ?self.code(), detail = %self.message(), "request rejected");
        }

        let mut builder = HttpResponse::build(status);
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(public_envelope(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Self::internal(REDACTED_INTERNAL)
    }
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let reason = match &err {
        JsonPayloadError::ContentType => "content type must be application/json",
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            "request body is too large"
        }
        _ => "request body is not valid JSON for this endpoint",
    };
    Error::invalid_request(reason)
        .with_details(json!({ "code": "invalid_body", "cause": err.to_string() }))
        .into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    Error::invalid_request("path identifiers must be integers")
        .with_details(json!({ "code": "invalid_path", "cause": err.to_string() }))
        .into()
}

/// JSON extractor configuration emitting the error envelope on bad bodies.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error)
}

/// Path extractor configuration emitting the error envelope on bad ids.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(path_error)
}

#[cfg(test)]
mod tests;
