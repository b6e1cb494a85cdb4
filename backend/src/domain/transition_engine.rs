//! Applies passenger status transitions.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::ShareRideRepository;
use crate::domain::{
    PassengerId, PassengerStatus, Requester, ShareRideError, ShareRideId, plan_transition,
};

/// Drives a passenger through the pickup lifecycle.
#[derive(Clone)]
pub struct TransitionEngine<R> {
    rides: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> TransitionEngine<R> {
    pub fn new(rides: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { rides, clock }
    }
}

impl<R> TransitionEngine<R>
where
    R: ShareRideRepository,
{
    /// Move the passenger to `requested` and persist every side effect
    /// atomically.
    ///
    /// Rejected moves never reach the store.
    pub async fn apply(
        &self,
        requester: Requester,
        ride_id: ShareRideId,
        passenger_id: PassengerId,
        requested: i64,
    ) -> Result<PassengerStatus, ShareRideError> {
        let ride = self
            .rides
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| ShareRideError::not_found(format!("share ride {ride_id} not found")))?;
        if !ride.is_driven_by(requester.id) {
            return Err(ShareRideError::forbidden(
                "only the ride's driver can update passengers",
            ));
        }
        let passenger = self
            .rides
            .find_passenger(ride_id, passenger_id)
            .await?
            .ok_or_else(|| {
                ShareRideError::not_found(format!(
                    "passenger {passenger_id} not found on share ride {ride_id}"
                ))
            })?;

        let plan = plan_transition(passenger.status, requested)?;
        let write = plan.write_for(&ride, &passenger, self.clock.utc())?;
        self.rides.apply_transition(write).await?;
        Ok(plan.to)
    }
}
