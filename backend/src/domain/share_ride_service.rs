//! Share ride domain service.
//!
//! Implements the share ride driving ports on top of the matching and
//! transition engines and maps their outcomes to the API error taxonomy.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, error, info};

use crate::domain::ports::{
    RequestRideRequest, RideBooking, ShareRideCommand, ShareRideQuery, ShareRideRepository,
    StartSearchingRequest, StartSearchingResponse, StopSearchingRequest, StopSearchingResponse,
    UpdatePassengerStatusRequest, UpdatePassengerStatusResponse, UserAccountRepository,
};
use crate::domain::{
    Error, MatchingEngine, Requester, ShareRide, ShareRideError, TransitionEngine,
};

fn report(operation: &'static str, requester: Requester, err: ShareRideError) -> Error {
    if err.is_storage_failure() {
        error!(operation, user_id = %requester.id, error = %err, "share ride store failure");
    } else {
        debug!(operation, user_id = %requester.id, reason = %err, "share ride request rejected");
    }
    Error::from(err)
}

fn validate_ride_request(request: &RequestRideRequest) -> Result<(), Error> {
    if !request.distance.is_finite() || request.distance < 0.0 {
        return Err(
            Error::invalid_request("distance must be a finite, non-negative number")
                .with_details(json!({ "field": "distance", "code": "invalid_distance" })),
        );
    }
    if request.rate_per_unit < 0 {
        return Err(Error::invalid_request("ratePerUnit must not be negative")
            .with_details(json!({ "field": "ratePerUnit", "code": "invalid_rate" })));
    }
    Ok(())
}

/// Share ride service implementing the command and query driving ports.
#[derive(Clone)]
pub struct ShareRideService<R, A> {
    rides: Arc<R>,
    matching: MatchingEngine<R, A>,
    transitions: TransitionEngine<R>,
}

impl<R, A> ShareRideService<R, A> {
    /// Create a service over the ride and account stores.
    ///
    /// # Examples
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use carpool::domain::ShareRideService;
    /// # use carpool::test_support::memory_store::InMemoryCarpoolStore;
    /// # use mockable::DefaultClock;
    /// let store = Arc::new(InMemoryCarpoolStore::new());
    /// let service = ShareRideService::new(
    ///     Arc::clone(&store),
    ///     Arc::clone(&store),
    ///     Arc::new(DefaultClock),
    ///     10,
    /// );
    /// # drop(service);
    /// ```
    pub fn new(
        rides: Arc<R>,
        accounts: Arc<A>,
        clock: Arc<dyn Clock>,
        minimum_balance: i64,
    ) -> Self {
        Self {
            matching: MatchingEngine::new(
                Arc::clone(&rides),
                accounts,
                Arc::clone(&clock),
                minimum_balance,
            ),
            transitions: TransitionEngine::new(Arc::clone(&rides), clock),
            rides,
        }
    }
}

#[async_trait]
impl<R, A> ShareRideCommand for ShareRideService<R, A>
where
    R: ShareRideRepository,
    A: UserAccountRepository,
{
    async fn start_searching(
        &self,
        request: StartSearchingRequest,
    ) -> Result<StartSearchingResponse, Error> {
        let requester = request.requester;
        let share_ride_id = self
            .matching
            .start_searching(requester)
            .await
            .map_err(|err| report("start_searching", requester, err))?;

        info!(%share_ride_id, driver_id = %requester.id, "driver started searching");
        Ok(StartSearchingResponse { share_ride_id })
    }

    async fn stop_searching(
        &self,
        request: StopSearchingRequest,
    ) -> Result<StopSearchingResponse, Error> {
        let StopSearchingRequest {
            requester,
            share_ride_id,
        } = request;
        let finished_at = self
            .matching
            .stop_searching(requester, share_ride_id)
            .await
            .map_err(|err| report("stop_searching", requester, err))?;

        info!(%share_ride_id, driver_id = %requester.id, "driver stopped searching");
        Ok(StopSearchingResponse {
            share_ride_id,
            finished_at,
        })
    }

    async fn request_ride(&self, request: RequestRideRequest) -> Result<RideBooking, Error> {
        validate_ride_request(&request)?;
        let requester = request.requester;
        let booking = self
            .matching
            .request_ride(request)
            .await
            .map_err(|err| report("request_ride", requester, err))?;

        info!(
            share_ride_id = %booking.share_ride_id,
            passenger_id = %booking.passenger_id,
            user_id = %requester.id,
            fare = booking.fare,
            "passenger matched"
        );
        Ok(booking)
    }

    async fn update_passenger_status(
        &self,
        request: UpdatePassengerStatusRequest,
    ) -> Result<UpdatePassengerStatusResponse, Error> {
        let UpdatePassengerStatusRequest {
            requester,
            share_ride_id,
            passenger_id,
            status,
        } = request;
        let status = self
            .transitions
            .apply(requester, share_ride_id, passenger_id, status)
            .await
            .map_err(|err| report("update_passenger_status", requester, err))?;

        info!(%share_ride_id, %passenger_id, %status, "passenger status updated");
        Ok(UpdatePassengerStatusResponse {
            share_ride_id,
            passenger_id,
            status,
        })
    }
}

#[async_trait]
impl<R, A> ShareRideQuery for ShareRideService<R, A>
where
    R: ShareRideRepository,
    A: UserAccountRepository,
{
    async fn active_ride_for_driver(&self, requester: Requester) -> Result<ShareRide, Error> {
        if !requester.is_driver {
            return Err(Error::forbidden("only drivers have searching rides"));
        }
        self.rides
            .find_searching_by_driver(requester.id)
            .await
            .map_err(|err| report("active_ride_for_driver", requester, err.into()))?
            .ok_or_else(|| Error::not_found("driver has no active share ride"))
    }

    async fn active_ride_for_passenger(&self, requester: Requester) -> Result<ShareRide, Error> {
        self.rides
            .find_active_by_passenger_user(requester.id)
            .await
            .map_err(|err| report("active_ride_for_passenger", requester, err.into()))?
            .ok_or_else(|| Error::not_found("user has no active share ride"))
    }
}

#[cfg(test)]
#[path = "share_ride_service_tests.rs"]
mod tests;
