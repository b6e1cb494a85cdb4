//! Port for share ride, passenger and payment persistence.
//!
//! Every ride returned by this port is fully loaded: passengers in arrival
//! order, each with its payments and payment details, plus the driver
//! summary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Coordinate, NewShareRide, Passenger, PassengerId, PaymentId, ShareRide, ShareRideId,
    TransitionWrite, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by share ride repository adapters.
    pub enum ShareRideRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "share ride repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "share ride repository query failed: {message}",
        /// A guarded write found the rows in a different state than expected,
        /// or a uniqueness rule rejected it.
        Conflict { message: String } =>
            "share ride repository conflict: {message}",
    }
}

/// Rows written when a rider is matched to a ride.
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerBooking {
    pub share_ride_id: ShareRideId,
    pub driver_id: UserId,
    pub user_id: UserId,
    pub destination: Coordinate,
    pub distance: f64,
    pub fare: i64,
    pub created_at: DateTime<Utc>,
}

/// Identifiers assigned while booking a passenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedPassenger {
    pub share_ride_id: ShareRideId,
    pub passenger_id: PassengerId,
    pub payment_id: PaymentId,
}

/// Port for reading and mutating share rides.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareRideRepository: Send + Sync {
    /// Find a ride by id.
    async fn find_by_id(
        &self,
        ride_id: ShareRideId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError>;

    /// Find the driver's ride that is still searching.
    async fn find_searching_by_driver(
        &self,
        driver_id: UserId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError>;

    /// Find the oldest searching ride that is not full.
    ///
    /// Ties on creation time are broken by the lowest id.
    async fn find_open_searching(&self) -> Result<Option<ShareRide>, ShareRideRepositoryError>;

    /// Find the ride on which `user_id` holds an active passenger record.
    async fn find_active_by_passenger_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError>;

    /// Find a passenger of the given ride, with payments.
    async fn find_passenger(
        &self,
        ride_id: ShareRideId,
        passenger_id: PassengerId,
    ) -> Result<Option<Passenger>, ShareRideRepositoryError>;

    /// Find the user's active passenger record on any ride.
    async fn find_active_passenger_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Passenger>, ShareRideRepositoryError>;

    /// Insert a searching ride and return its id.
    ///
    /// Fails with `Conflict` when the driver already has a searching ride.
    async fn insert_ride(&self, ride: NewShareRide)
    -> Result<ShareRideId, ShareRideRepositoryError>;

    /// Close a searching ride.
    ///
    /// Fails with `Conflict` when the ride is no longer searching or still
    /// carries an active passenger at write time.
    async fn finish_ride(
        &self,
        ride_id: ShareRideId,
        finished_at: DateTime<Utc>,
    ) -> Result<(), ShareRideRepositoryError>;

    /// Insert the passenger, its unpaid payment and the cash detail in one
    /// transaction.
    ///
    /// Fails with `Conflict` when the ride stopped searching, became full, or
    /// the user gained an active passenger record concurrently.
    async fn book_passenger(
        &self,
        booking: PassengerBooking,
    ) -> Result<BookedPassenger, ShareRideRepositoryError>;

    /// Apply every row change of a status transition in one transaction.
    ///
    /// Fails with `Conflict`, leaving all rows untouched, when the passenger
    /// or ride moved on since they were read.
    async fn apply_transition(&self, write: TransitionWrite)
    -> Result<(), ShareRideRepositoryError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ShareRideRepositoryError::connection("refused"), "connection failed: refused")]
    #[case(ShareRideRepositoryError::query("bad sql"), "query failed: bad sql")]
    #[case(ShareRideRepositoryError::conflict("ride finished"), "conflict: ride finished")]
    fn errors_format_message(#[case] err: ShareRideRepositoryError, #[case] fragment: &str) {
        assert!(err.to_string().contains(fragment));
    }
}
