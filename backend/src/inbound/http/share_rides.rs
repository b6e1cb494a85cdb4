//! Share ride HTTP handlers.
//!
//! ```text
//! POST /api/v1/share-rides/find-passenger
//! POST /api/v1/share-rides/{id}/find-passenger/finish
//! POST /api/v1/share-rides/find-driver
//! PUT  /api/v1/share-rides/{rideId}/passengers/{passengerId}/status
//! GET  /api/v1/share-rides/driver
//! GET  /api/v1/share-rides/passenger
//! ```
//!
//! Every route requires the session cookie. Handlers only parse bodies and
//! build the [`crate::domain::Requester`]; ride rules live behind the ports.

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::{
    RequestRideRequest, RideBooking, StartSearchingRequest, StopSearchingRequest,
    StopSearchingResponse, UpdatePassengerStatusRequest, UpdatePassengerStatusResponse,
};
use crate::domain::{
    Coordinate, CoordinateValidationError, DriverSummary, Error, Passenger, PassengerId, Payment,
    PaymentDetail, ShareRide, ShareRideId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Destination point in decimal degrees.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateBody {
    #[schema(example = -6.2)]
    pub latitude: f64,
    #[schema(example = 106.8)]
    pub longitude: f64,
}

/// Request payload for finding a driver.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindDriverRequestBody {
    pub destination: CoordinateBody,
    /// Trip distance supplied by the client.
    #[schema(example = 5.0)]
    pub distance: f64,
    /// Price per distance unit in minor currency units.
    #[schema(example = 20)]
    pub rate_per_unit: i64,
}

/// Request payload for a passenger status change.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassengerStatusRequestBody {
    /// Status code: 1 waiting, 2 picked up, 3 arrived, 4 on the way,
    /// 5 done, -2 skipped.
    #[schema(example = 2)]
    pub status: i64,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Response payload when a driver starts searching.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindPassengerResponseBody {
    pub share_ride_id: i64,
}

/// Response payload when a driver stops searching.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinishFindPassengerResponseBody {
    pub share_ride_id: i64,
    #[schema(format = "date-time")]
    pub finished_at: String,
}

/// Response payload for a booked ride.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindDriverResponseBody {
    pub share_ride_id: i64,
    pub passenger_id: i64,
    pub payment_id: i64,
    /// Fare owed to the driver.
    pub fare: i64,
}

/// Response payload for a passenger status change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassengerStatusResponseBody {
    pub share_ride_id: i64,
    pub passenger_id: i64,
    pub status: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverBody {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailBody {
    pub id: i64,
    #[schema(example = "cash")]
    pub payment_method: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub id: i64,
    pub recipient_id: i64,
    pub payer_id: i64,
    #[schema(example = "unpaid")]
    pub status: String,
    pub total_amount: i64,
    #[schema(format = "date-time")]
    pub created_at: String,
    pub details: Vec<PaymentDetailBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassengerBody {
    pub id: i64,
    pub user_id: i64,
    pub status: i16,
    pub destination: CoordinateBody,
    pub distance: f64,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub dropped_at: Option<String>,
    pub payments: Vec<PaymentBody>,
}

/// A share ride with its driver, passengers and payments.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareRideBody {
    pub id: i64,
    pub driver_id: i64,
    pub is_full: bool,
    /// 1 searching, 2 finished.
    pub driver_status: i16,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub finished_at: Option<String>,
    pub driver: Option<DriverBody>,
    pub passengers: Vec<PassengerBody>,
}

impl From<PaymentDetail> for PaymentDetailBody {
    fn from(value: PaymentDetail) -> Self {
        Self {
            id: value.id.get(),
            payment_method: value.method.as_str().to_owned(),
            amount: value.amount,
        }
    }
}

impl From<Payment> for PaymentBody {
    fn from(value: Payment) -> Self {
        Self {
            id: value.id.get(),
            recipient_id: value.recipient_id.get(),
            payer_id: value.payer_id.get(),
            status: value.status.as_str().to_owned(),
            total_amount: value.total_amount,
            created_at: value.created_at.to_rfc3339(),
            details: value.details.into_iter().map(PaymentDetailBody::from).collect(),
        }
    }
}

impl From<Passenger> for PassengerBody {
    fn from(value: Passenger) -> Self {
        Self {
            id: value.id.get(),
            user_id: value.user_id.get(),
            status: value.status.code(),
            destination: CoordinateBody {
                latitude: value.destination.latitude(),
                longitude: value.destination.longitude(),
            },
            distance: value.distance,
            created_at: value.created_at.to_rfc3339(),
            dropped_at: value.dropped_at.map(|at| at.to_rfc3339()),
            payments: value.payments.into_iter().map(PaymentBody::from).collect(),
        }
    }
}

impl From<DriverSummary> for DriverBody {
    fn from(value: DriverSummary) -> Self {
        Self {
            id: value.id.get(),
            name: value.name,
            email: value.email,
            phone_number: value.phone_number,
        }
    }
}

impl From<ShareRide> for ShareRideBody {
    fn from(value: ShareRide) -> Self {
        Self {
            id: value.id.get(),
            driver_id: value.driver_id.get(),
            is_full: value.is_full,
            driver_status: value.driver_status.code(),
            created_at: value.created_at.to_rfc3339(),
            finished_at: value.finished_at.map(|at| at.to_rfc3339()),
            driver: value.driver.map(DriverBody::from),
            passengers: value.passengers.into_iter().map(PassengerBody::from).collect(),
        }
    }
}

impl From<StopSearchingResponse> for FinishFindPassengerResponseBody {
    fn from(value: StopSearchingResponse) -> Self {
        Self {
            share_ride_id: value.share_ride_id.get(),
            finished_at: value.finished_at.to_rfc3339(),
        }
    }
}

impl From<RideBooking> for FindDriverResponseBody {
    fn from(value: RideBooking) -> Self {
        Self {
            share_ride_id: value.share_ride_id.get(),
            passenger_id: value.passenger_id.get(),
            payment_id: value.payment_id.get(),
            fare: value.fare,
        }
    }
}

impl From<UpdatePassengerStatusResponse> for UpdatePassengerStatusResponseBody {
    fn from(value: UpdatePassengerStatusResponse) -> Self {
        Self {
            share_ride_id: value.share_ride_id.get(),
            passenger_id: value.passenger_id.get(),
            status: value.status.code(),
        }
    }
}

fn parse_destination(body: CoordinateBody) -> Result<Coordinate, Error> {
    Coordinate::new(body.latitude, body.longitude).map_err(|err| {
        let (field, value) = match err {
            CoordinateValidationError::Latitude(value) => ("destination.latitude", value),
            CoordinateValidationError::Longitude(value) => ("destination.longitude", value),
        };
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": field,
            "value": value,
            "code": "invalid_coordinate",
        }))
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Start searching for passengers as the signed-in driver.
#[utoipa::path(
    post,
    path = "/api/v1/share-rides/find-passenger",
    responses(
        (status = 201, description = "Search opened", body = FindPassengerResponseBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Not a driver or balance too low", body = ErrorSchema),
        (status = 404, description = "Driver account missing", body = ErrorSchema),
        (
            status = 409,
            description = "Already searching; details carry the open ride",
            body = ErrorSchema
        ),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["share-rides"],
    operation_id = "findPassenger",
    security(("SessionCookie" = []))
)]
#[post("/share-rides/find-passenger")]
pub async fn find_passenger(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let requester = session.require_requester()?;
    let response = state
        .share_rides
        .start_searching(StartSearchingRequest { requester })
        .await?;

    Ok(HttpResponse::Created().json(FindPassengerResponseBody {
        share_ride_id: response.share_ride_id.get(),
    }))
}

/// Stop searching for passengers.
#[utoipa::path(
    post,
    path = "/api/v1/share-rides/{id}/find-passenger/finish",
    params(("id" = i64, Path, description = "Share ride id")),
    responses(
        (status = 200, description = "Search closed", body = FinishFindPassengerResponseBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Ride belongs to another driver", body = ErrorSchema),
        (status = 404, description = "Ride not found", body = ErrorSchema),
        (status = 409, description = "Ride finished or still carrying", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["share-rides"],
    operation_id = "finishFindPassenger",
    security(("SessionCookie" = []))
)]
#[post("/share-rides/{id}/find-passenger/finish")]
pub async fn finish_find_passenger(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
) -> ApiResult<web::Json<FinishFindPassengerResponseBody>> {
    let requester = session.require_requester()?;
    let response = state
        .share_rides
        .stop_searching(StopSearchingRequest {
            requester,
            share_ride_id: ShareRideId::new(path.into_inner()),
        })
        .await?;

    Ok(web::Json(FinishFindPassengerResponseBody::from(response)))
}

/// Book the signed-in rider onto the oldest open ride.
///
/// The fare is `round(ratePerUnit * distance)` and is recorded as an unpaid
/// cash payment to the driver.
#[utoipa::path(
    post,
    path = "/api/v1/share-rides/find-driver",
    request_body = FindDriverRequestBody,
    responses(
        (status = 200, description = "Ride booked", body = FindDriverResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Driver booking own ride", body = ErrorSchema),
        (status = 404, description = "No driver searching", body = ErrorSchema),
        (status = 409, description = "Rider already has an active ride", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["share-rides"],
    operation_id = "findDriver",
    security(("SessionCookie" = []))
)]
#[post("/share-rides/find-driver")]
pub async fn find_driver(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<FindDriverRequestBody>,
) -> ApiResult<web::Json<FindDriverResponseBody>> {
    let requester = session.require_requester()?;
    let payload = payload.into_inner();
    let destination = parse_destination(payload.destination)?;

    let booking = state
        .share_rides
        .request_ride(RequestRideRequest {
            requester,
            destination,
            distance: payload.distance,
            rate_per_unit: payload.rate_per_unit,
        })
        .await?;

    Ok(web::Json(FindDriverResponseBody::from(booking)))
}

/// Move a passenger along the trip lifecycle.
#[utoipa::path(
    put,
    path = "/api/v1/share-rides/{rideId}/passengers/{passengerId}/status",
    params(
        ("rideId" = i64, Path, description = "Share ride id"),
        ("passengerId" = i64, Path, description = "Passenger id")
    ),
    request_body = UpdatePassengerStatusRequestBody,
    responses(
        (status = 200, description = "Status applied", body = UpdatePassengerStatusResponseBody),
        (status = 400, description = "Transition not allowed", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Not the ride's driver", body = ErrorSchema),
        (status = 404, description = "Ride or passenger not found", body = ErrorSchema),
        (status = 409, description = "Concurrent update", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["share-rides"],
    operation_id = "updatePassengerStatus",
    security(("SessionCookie" = []))
)]
#[put("/share-rides/{ride_id}/passengers/{passenger_id}/status")]
pub async fn update_passenger_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(i64, i64)>,
    payload: web::Json<UpdatePassengerStatusRequestBody>,
) -> ApiResult<web::Json<UpdatePassengerStatusResponseBody>> {
    let requester = session.require_requester()?;
    let (ride_id, passenger_id) = path.into_inner();

    let response = state
        .share_rides
        .update_passenger_status(UpdatePassengerStatusRequest {
            requester,
            share_ride_id: ShareRideId::new(ride_id),
            passenger_id: PassengerId::new(passenger_id),
            status: payload.status,
        })
        .await?;

    Ok(web::Json(UpdatePassengerStatusResponseBody::from(response)))
}

/// The signed-in driver's searching ride.
#[utoipa::path(
    get,
    path = "/api/v1/share-rides/driver",
    responses(
        (status = 200, description = "Active ride", body = ShareRideBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Not a driver", body = ErrorSchema),
        (status = 404, description = "No active ride", body = ErrorSchema)
    ),
    tags = ["share-rides"],
    operation_id = "activeRideForDriver",
    security(("SessionCookie" = []))
)]
#[get("/share-rides/driver")]
pub async fn active_ride_for_driver(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ShareRideBody>> {
    let requester = session.require_requester()?;
    let ride = state
        .share_rides_query
        .active_ride_for_driver(requester)
        .await?;
    Ok(web::Json(ShareRideBody::from(ride)))
}

/// The ride the signed-in rider is currently on.
#[utoipa::path(
    get,
    path = "/api/v1/share-rides/passenger",
    responses(
        (status = 200, description = "Active ride", body = ShareRideBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "No active ride", body = ErrorSchema)
    ),
    tags = ["share-rides"],
    operation_id = "activeRideForPassenger",
    security(("SessionCookie" = []))
)]
#[get("/share-rides/passenger")]
pub async fn active_ride_for_passenger(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ShareRideBody>> {
    let requester = session.require_requester()?;
    let ride = state
        .share_rides_query
        .active_ride_for_passenger(requester)
        .await?;
    Ok(web::Json(ShareRideBody::from(ride)))
}

#[cfg(test)]
#[path = "share_rides_tests.rs"]
mod tests;
