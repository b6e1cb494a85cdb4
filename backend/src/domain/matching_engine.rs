//! Pairs drivers with riders.
//!
//! Drivers open a search, riders take a seat on the oldest open ride, and
//! drivers close searches that no longer carry passengers. The checks here
//! give precise errors; the store enforces the same uniqueness rules on
//! write so concurrent requests cannot slip past them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::domain::ports::{
    PassengerBooking, RequestRideRequest, RideBooking, ShareRideRepository, UserAccountRepository,
};
use crate::domain::{NewShareRide, Requester, ShareRideError, ShareRideId, compute_fare};

/// Matching rules over the ride and account stores.
#[derive(Clone)]
pub struct MatchingEngine<R, A> {
    rides: Arc<R>,
    accounts: Arc<A>,
    clock: Arc<dyn Clock>,
    minimum_balance: i64,
}

impl<R, A> MatchingEngine<R, A> {
    /// `minimum_balance` is the coin a driver needs to open a search.
    pub fn new(
        rides: Arc<R>,
        accounts: Arc<A>,
        clock: Arc<dyn Clock>,
        minimum_balance: i64,
    ) -> Self {
        Self {
            rides,
            accounts,
            clock,
            minimum_balance,
        }
    }
}

impl<R, A> MatchingEngine<R, A>
where
    R: ShareRideRepository,
    A: UserAccountRepository,
{
    /// Open a search for passengers.
    pub async fn start_searching(
        &self,
        requester: Requester,
    ) -> Result<ShareRideId, ShareRideError> {
        if !requester.is_driver {
            return Err(ShareRideError::forbidden("only drivers can search for passengers"));
        }
        let account = self
            .accounts
            .find_by_id(requester.id)
            .await?
            .ok_or_else(|| {
                ShareRideError::not_found(format!("user {} not found", requester.id))
            })?;
        if !account.has_balance_for(self.minimum_balance) {
            return Err(ShareRideError::forbidden("top up your coin first"));
        }
        if let Some(existing) = self.rides.find_searching_by_driver(requester.id).await? {
            return Err(ShareRideError::conflict_with_ride(
                "driver is already searching for passengers",
                existing,
            ));
        }

        let ride_id = self
            .rides
            .insert_ride(NewShareRide {
                driver_id: requester.id,
                created_at: self.clock.utc(),
            })
            .await?;
        Ok(ride_id)
    }

    /// Close a search that carries no active passenger.
    ///
    /// Returns the closing time.
    pub async fn stop_searching(
        &self,
        requester: Requester,
        ride_id: ShareRideId,
    ) -> Result<DateTime<Utc>, ShareRideError> {
        let ride = self
            .rides
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| ShareRideError::not_found(format!("share ride {ride_id} not found")))?;
        if !ride.is_driven_by(requester.id) {
            return Err(ShareRideError::forbidden("share ride belongs to another driver"));
        }
        if !ride.is_searching() {
            return Err(ShareRideError::conflict("share ride is already finished"));
        }
        if ride.has_active_passenger() {
            return Err(ShareRideError::conflict("share ride still has active passengers"));
        }

        let finished_at = self.clock.utc();
        self.rides.finish_ride(ride_id, finished_at).await?;
        Ok(finished_at)
    }

    /// Seat the rider on the oldest open ride and create the unpaid fare.
    pub async fn request_ride(
        &self,
        request: RequestRideRequest,
    ) -> Result<RideBooking, ShareRideError> {
        let requester = request.requester;
        let ride = self
            .rides
            .find_open_searching()
            .await?
            .ok_or_else(|| ShareRideError::not_found("no driver is searching for passengers"))?;
        if ride.is_driven_by(requester.id) {
            return Err(ShareRideError::forbidden("drivers cannot ride with themselves"));
        }
        if let Some(current) = self.rides.find_active_passenger_for_user(requester.id).await? {
            return Err(ShareRideError::conflict_with(
                "user already has an active ride",
                current.share_ride_id,
            ));
        }

        let fare = compute_fare(request.rate_per_unit, request.distance);
        let booked = self
            .rides
            .book_passenger(PassengerBooking {
                share_ride_id: ride.id,
                driver_id: ride.driver_id,
                user_id: requester.id,
                destination: request.destination,
                distance: request.distance,
                fare,
                created_at: self.clock.utc(),
            })
            .await?;

        Ok(RideBooking {
            share_ride_id: booked.share_ride_id,
            passenger_id: booked.passenger_id,
            payment_id: booked.payment_id,
            fare,
        })
    }
}
