//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The session cookie is issued by the identity service that shares the
//! cookie key. It carries the caller's user id and driver flag, which
//! handlers read back as a [`Requester`].

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, Requester, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const IS_DRIVER_KEY: &str = "is_driver";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store the caller identity in the session cookie.
    pub fn persist_requester(&self, requester: &Requester) -> Result<(), Error> {
        let persist = |error| Error::internal(format!("failed to persist session: {error}"));
        self.0
            .insert(USER_ID_KEY, requester.id.get())
            .map_err(persist)?;
        self.0
            .insert(IS_DRIVER_KEY, requester.is_driver)
            .map_err(persist)
    }

    /// Read the caller identity, if the session carries one.
    ///
    /// Values that fail to decode are treated as an anonymous session.
    pub fn requester(&self) -> Result<Option<Requester>, Error> {
        let decoded = self.0.get::<i64>(USER_ID_KEY).and_then(|user_id| {
            let is_driver = self.0.get::<bool>(IS_DRIVER_KEY)?;
            Ok(user_id.map(|id| Requester {
                id: UserId::new(id),
                is_driver: is_driver.unwrap_or(false),
            }))
        });
        match decoded {
            Ok(requester) => Ok(requester),
            Err(error) => {
                warn!(%error, "invalid identity in session cookie");
                Ok(None)
            }
        }
    }

    /// Require a caller identity or return `401 Unauthorized`.
    pub fn require_requester(&self) -> Result<Requester, Error> {
        self.requester()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use actix_session::Session;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    use super::*;
    use crate::inbound::http::test_utils::{session_cookie, test_session_middleware};

    async fn whoami(session: SessionContext) -> Result<HttpResponse, Error> {
        let requester = session.require_requester()?;
        Ok(HttpResponse::Ok().body(format!("{}:{}", requester.id, requester.is_driver)))
    }

    #[rstest]
    #[case(Requester::driver(UserId::new(7)), "7:true")]
    #[case(Requester::rider(UserId::new(8)), "8:false")]
    #[actix_web::test]
    async fn round_trips_requester(#[case] requester: Requester, #[case] expected: &str) {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set",
                    web::get().to(move |session: SessionContext| async move {
                        session.persist_requester(&requester)?;
                        Ok::<_, Error>(HttpResponse::Ok())
                    }),
                )
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let set_res =
            test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        let cookie = session_cookie(&set_res);
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/whoami")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, expected.as_bytes());
    }

    #[actix_web::test]
    async fn missing_identity_is_unauthorised() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn tampered_user_id_is_rejected() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set-invalid",
                    web::get().to(|session: Session| async move {
                        session
                            .insert(USER_ID_KEY, "not-a-number")
                            .expect("set invalid user id");
                        HttpResponse::Ok()
                    }),
                )
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let set_res = test::call_service(
            &app,
            test::TestRequest::get().uri("/set-invalid").to_request(),
        )
        .await;
        let cookie = session_cookie(&set_res);
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/whoami")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
