//! Driving port for share ride mutations.
//!
//! Drivers open and close searches, riders request a seat, and drivers move
//! each passenger through the pickup lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Coordinate, Error, PassengerId, PassengerStatus, PaymentId, Requester, ShareRideId,
};

/// Request to open a search for passengers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSearchingRequest {
    pub requester: Requester,
}

/// Identifier of the newly opened ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSearchingResponse {
    pub share_ride_id: ShareRideId,
}

/// Request to close a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSearchingRequest {
    pub requester: Requester,
    pub share_ride_id: ShareRideId,
}

/// Closed ride and its closing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSearchingResponse {
    pub share_ride_id: ShareRideId,
    pub finished_at: DateTime<Utc>,
}

/// Rider's request for a seat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRideRequest {
    pub requester: Requester,
    pub destination: Coordinate,
    pub distance: f64,
    pub rate_per_unit: i64,
}

/// Outcome of a successful match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideBooking {
    pub share_ride_id: ShareRideId,
    pub passenger_id: PassengerId,
    pub payment_id: PaymentId,
    pub fare: i64,
}

/// Request to move a passenger to `status`.
///
/// `status` is the raw code; codes outside the status set are rejected as
/// rule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassengerStatusRequest {
    pub requester: Requester,
    pub share_ride_id: ShareRideId,
    pub passenger_id: PassengerId,
    pub status: i64,
}

/// Passenger status after a successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassengerStatusResponse {
    pub share_ride_id: ShareRideId,
    pub passenger_id: PassengerId,
    pub status: PassengerStatus,
}

/// Driving port for share ride mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareRideCommand: Send + Sync {
    /// Open a search for passengers on behalf of a driver.
    async fn start_searching(
        &self,
        request: StartSearchingRequest,
    ) -> Result<StartSearchingResponse, Error>;

    /// Close the driver's search.
    async fn stop_searching(
        &self,
        request: StopSearchingRequest,
    ) -> Result<StopSearchingResponse, Error>;

    /// Match a rider to the first open ride and create the unpaid fare.
    async fn request_ride(&self, request: RequestRideRequest) -> Result<RideBooking, Error>;

    /// Move a passenger to the requested status and apply its side effects.
    async fn update_passenger_status(
        &self,
        request: UpdatePassengerStatusRequest,
    ) -> Result<UpdatePassengerStatusResponse, Error>;
}
