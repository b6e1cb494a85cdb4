//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub use state_builders::build_http_state;
#[cfg(test)]
use state_builders::http_state_from_service;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use carpool::Trace;
#[cfg(debug_assertions)]
use carpool::doc::ApiDoc;
use carpool::inbound::http::error::{json_config, path_config};
use carpool::inbound::http::health::{HealthState, live, ready};
use carpool::inbound::http::share_rides::{
    active_ride_for_driver, active_ride_for_passenger, find_driver, find_passenger,
    finish_find_passenger, update_passenger_status,
};
use carpool::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .service(find_passenger)
        .service(finish_find_passenger)
        .service(find_driver)
        .service(update_passenger_status)
        .service(active_ride_for_driver)
        .service(active_ride_for_passenger);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .app_data(path_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server over the given handler state.
///
/// Readiness is marked once the listener is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use carpool::domain::ShareRideService;
    use carpool::domain::TRACE_ID_HEADER;
    use carpool::test_support::clock::{FixedClock, fixed_timestamp};
    use carpool::test_support::memory_store::InMemoryCarpoolStore;
    use rstest::rstest;
    use serde_json::Value;

    use super::*;

    fn deps() -> AppDependencies {
        let store = Arc::new(InMemoryCarpoolStore::new());
        let service = ShareRideService::new(
            Arc::clone(&store),
            store,
            Arc::new(FixedClock::new(fixed_timestamp())),
            0,
        );
        AppDependencies {
            health_state: web::Data::new(HealthState::new()),
            http_state: http_state_from_service(Arc::new(service)),
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }
    }

    #[rstest]
    #[case("/health/live", StatusCode::OK)]
    #[case("/health/ready", StatusCode::SERVICE_UNAVAILABLE)]
    #[actix_web::test]
    async fn health_probes_are_mounted(#[case] path: &str, #[case] expected: StatusCode) {
        let app = actix_test::init_service(build_app(deps())).await;

        let request = actix_test::TestRequest::get().uri(path).to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), expected);
    }

    #[actix_web::test]
    async fn api_requires_session_and_echoes_trace_id() {
        let app = actix_test::init_service(build_app(deps())).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/share-rides/driver")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let header = response
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .expect("trace id header");
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body.get("traceId").and_then(Value::as_str), Some(header.as_str()));
    }

    #[actix_web::test]
    async fn malformed_body_is_rejected_before_the_session_check() {
        let app = actix_test::init_service(build_app(deps())).await;

        let request = actix_test::TestRequest::post()
            .uri("/api/v1/share-rides/find-driver")
            .insert_header(("content-type", "application/json"))
            .set_payload("not json")
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body.get("code").and_then(Value::as_str), Some("invalid_request"));
    }

    #[test]
    fn same_site_can_be_tightened() {
        let config = ServerConfig::new(Key::generate(), true, ([127, 0, 0, 1], 0).into())
            .with_same_site(SameSite::Strict);

        assert_eq!(config.same_site, SameSite::Strict);
        assert_eq!(config.bind_addr().ip().to_string(), "127.0.0.1");
    }
}
