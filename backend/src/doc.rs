//! OpenAPI document for the carpool API.
//!
//! Handlers carry their own `#[utoipa::path]` annotations; [`ApiDoc`] only
//! gathers them with the body schemas and declares the `session` cookie that
//! guards every `/api/v1` route. Debug builds serve the document through
//! Swagger UI at `/docs`, and the `openapi-dump` binary prints it as JSON.

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::share_rides::{
    CoordinateBody, DriverBody, FindDriverRequestBody, FindDriverResponseBody,
    FindPassengerResponseBody, FinishFindPassengerResponseBody, PassengerBody, PaymentBody,
    PaymentDetailBody, ShareRideBody, UpdatePassengerStatusRequestBody,
    UpdatePassengerStatusResponseBody,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the `SessionCookie` scheme referenced by the ride endpoints.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by the identity service.",
            ))),
        );
    }
}

/// Aggregated OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Carpool backend API",
        description = "Share ride matching, passenger lifecycle and health probes.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::share_rides::find_passenger,
        crate::inbound::http::share_rides::finish_find_passenger,
        crate::inbound::http::share_rides::find_driver,
        crate::inbound::http::share_rides::update_passenger_status,
        crate::inbound::http::share_rides::active_ride_for_driver,
        crate::inbound::http::share_rides::active_ride_for_passenger,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        CoordinateBody,
        FindDriverRequestBody,
        FindDriverResponseBody,
        FindPassengerResponseBody,
        FinishFindPassengerResponseBody,
        UpdatePassengerStatusRequestBody,
        UpdatePassengerStatusResponseBody,
        ShareRideBody,
        PassengerBody,
        PaymentBody,
        PaymentDetailBody,
        DriverBody,
    )),
    tags(
        (name = "share-rides", description = "Driver searches, bookings and passenger status"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
