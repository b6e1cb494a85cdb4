//! Driving port for share ride reads.

use async_trait::async_trait;

use crate::domain::{Error, Requester, ShareRide};

/// Driving port for looking up the caller's current ride.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareRideQuery: Send + Sync {
    /// The driver's searching ride, with passengers and payments.
    ///
    /// Only drivers may call this.
    async fn active_ride_for_driver(&self, requester: Requester) -> Result<ShareRide, Error>;

    /// The ride on which the caller holds an active passenger record.
    async fn active_ride_for_passenger(&self, requester: Requester) -> Result<ShareRide, Error>;
}
