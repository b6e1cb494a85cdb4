//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{HttpResponse, Resource, test, web};

use crate::domain::{Error, Requester};
use crate::inbound::http::session::SessionContext;

/// Route that stands in for the identity service during tests.
pub const SIGN_IN_PATH: &str = "/test/sign-in";

/// Build a session middleware configured for tests.
///
/// Uses a fresh key per invocation, the `session` cookie name and no
/// `Secure` flag so plain HTTP test requests carry the cookie.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

async fn sign_in(
    session: SessionContext,
    payload: web::Json<Requester>,
) -> Result<HttpResponse, Error> {
    session.persist_requester(&payload.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

/// Resource writing the posted [`Requester`] into the session.
pub fn sign_in_resource() -> Resource {
    web::resource(SIGN_IN_PATH).route(web::post().to(sign_in))
}

/// Extract the session cookie set by a response.
pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Sign `requester` in through [`sign_in_resource`] and return the cookie.
pub async fn signed_in_cookie<S>(app: &S, requester: Requester) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = test::TestRequest::post()
        .uri(SIGN_IN_PATH)
        .set_json(requester)
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "sign-in route succeeds");
    session_cookie(&response)
}
