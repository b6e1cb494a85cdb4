//! Tests for HTTP error mapping.

use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, ResponseError, test as actix_test, web};
use rstest::{fixture, rstest};
use serde::Deserialize;
use serde_json::{Value, json};

use super::*;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error_case() -> Error {
    Error::internal("settlement query failed")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"table": "payments"}))
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::rule_violation("waiting to done"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no session"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("not your ride"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("already searching"), StatusCode::CONFLICT)]
#[case(Error::service_unavailable("pool"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] err: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&err), status);
}

async fn response_payload(error: &Error) -> (StatusCode, Option<String>, Error) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .map(|value| value.to_str().expect("ascii header").to_owned());
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let payload = serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds");
    (status, header, payload)
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(internal_error_case: Error) {
    let (status, header, payload) = response_payload(&internal_error_case).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(payload.code(), ErrorCode::InternalError);
    assert_eq!(payload.message(), "Internal server error");
    assert_eq!(payload.trace_id(), Some(TRACE_ID));
    assert!(payload.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn unavailable_errors_hide_storage_messages() {
    let error = Error::service_unavailable("connection refused by 10.0.0.5:5432");

    let (status, _, payload) = response_payload(&error).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(payload.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(payload.message(), "Service temporarily unavailable");
}

#[rstest]
#[actix_web::test]
async fn rule_violations_keep_their_code_and_details() {
    let error = Error::rule_violation("cannot move passenger from waiting to done")
        .with_details(json!({"currentStatus": 1, "requestedStatus": 5}));

    let (status, header, payload) = response_payload(&error).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(header.is_none());
    assert_eq!(payload.code(), ErrorCode::RuleViolation);
    assert_eq!(
        payload.details(),
        Some(&json!({"currentStatus": 1, "requestedStatus": 5}))
    );
}

#[rstest]
fn from_actix_error_is_redacted_internal_error() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}

#[derive(Deserialize)]
struct StatusBody {
    #[expect(dead_code, reason = "Only deserialisation is exercised")]
    status: i16,
}

async fn echo(_path: web::Path<i64>, _body: web::Json<StatusBody>) -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[rstest]
#[case::malformed_json("/rides/1", "{\"status\": ", "invalid_body")]
#[case::wrong_type("/rides/1", "{\"status\": \"done\"}", "invalid_body")]
#[case::non_numeric_id("/rides/abc", "{\"status\": 2}", "invalid_path")]
#[actix_web::test]
async fn extractor_failures_use_the_error_envelope(
    #[case] uri: &str,
    #[case] body: &'static str,
    #[case] detail_code: &str,
) {
    let app = actix_test::init_service(
        App::new()
            .app_data(json_config())
            .app_data(path_config())
            .route("/rides/{id}", web::put().to(echo)),
    )
    .await;

    let request = actix_test::TestRequest::put()
        .uri(uri)
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload: Value = actix_test::read_body_json(response).await;
    assert_eq!(payload.get("code").and_then(Value::as_str), Some("invalid_request"));
    assert_eq!(
        payload.pointer("/details/code").and_then(Value::as_str),
        Some(detail_code)
    );
}
