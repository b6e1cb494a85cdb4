//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay free of `utoipa` derives. The wrappers here mirror their
//! serialised shape and are registered under the domain type names.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// No session is attached to the request.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// The caller may not act on the ride.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The ride, passenger or account does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The ride or passenger is in a state that blocks the operation.
    #[schema(rename = "conflict")]
    Conflict,
    /// The requested passenger status change is not allowed.
    #[schema(rename = "rule_violation")]
    RuleViolation,
    /// The database could not be reached.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(dead_code, reason = "Used only for OpenAPI schema generation via utoipa")]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "conflict")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "driver is already searching for passengers")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Supplementary details, such as the id of an existing ride.
    details: Option<serde_json::Value>,
}
