//! Passenger records and their status codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Payment;
use crate::domain::{PassengerId, ShareRideId, UserId};

/// Passenger lifecycle status, stored as a signed code.
///
/// `Waiting`, `PickedUp`, `Arrived` and `OnTheWay` are active; `Done` and
/// `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum PassengerStatus {
    Waiting,
    PickedUp,
    Arrived,
    OnTheWay,
    Done,
    Skipped,
}

/// Raised when a stored or requested code has no matching status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown passenger status code {0}")]
pub struct UnknownPassengerStatus(pub i16);

impl PassengerStatus {
    /// Statuses that still hold a seat on a ride.
    pub const ACTIVE: [Self; 4] = [Self::Waiting, Self::PickedUp, Self::Arrived, Self::OnTheWay];

    /// Wire and storage code.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Waiting => 1,
            Self::PickedUp => 2,
            Self::Arrived => 3,
            Self::OnTheWay => 4,
            Self::Done => 5,
            Self::Skipped => -2,
        }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }

    /// Codes of the active statuses, for store filters.
    #[must_use]
    pub fn active_codes() -> [i16; 4] {
        Self::ACTIVE.map(Self::code)
    }
}

impl TryFrom<i16> for PassengerStatus {
    type Error = UnknownPassengerStatus;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Waiting),
            2 => Ok(Self::PickedUp),
            3 => Ok(Self::Arrived),
            4 => Ok(Self::OnTheWay),
            5 => Ok(Self::Done),
            -2 => Ok(Self::Skipped),
            other => Err(UnknownPassengerStatus(other)),
        }
    }
}

impl From<PassengerStatus> for i16 {
    fn from(status: PassengerStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for PassengerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Waiting => "waiting",
            Self::PickedUp => "picked_up",
            Self::Arrived => "arrived",
            Self::OnTheWay => "on_the_way",
            Self::Done => "done",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Validation errors for [`Coordinate`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateValidationError {
    #[error("latitude must be within -90..=90, got {0}")]
    Latitude(f64),
    #[error("longitude must be within -180..=180, got {0}")]
    Longitude(f64),
}

/// Destination point supplied by the rider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Validated constructor. Non-finite values are rejected by the range
    /// checks.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateValidationError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateValidationError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// One rider's participation in a share ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub id: PassengerId,
    pub user_id: UserId,
    pub share_ride_id: ShareRideId,
    pub status: PassengerStatus,
    pub destination: Coordinate,
    pub distance: f64,
    pub created_at: DateTime<Utc>,
    pub dropped_at: Option<DateTime<Utc>>,
    pub payments: Vec<Payment>,
}

impl Passenger {
    /// The payment settled on completion. Only one is ever created per
    /// passenger.
    #[must_use]
    pub fn primary_payment(&self) -> Option<&Payment> {
        self.payments.first()
    }
}
