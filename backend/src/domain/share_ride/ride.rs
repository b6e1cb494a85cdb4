//! Share ride aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Passenger;
use crate::domain::{ShareRideId, UserId};

/// Driver-side state of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum DriverStatus {
    Searching,
    Finished,
}

/// Raised when a stored driver status code is not recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown driver status code {0}")]
pub struct UnknownDriverStatus(pub i16);

impl DriverStatus {
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Searching => 1,
            Self::Finished => 2,
        }
    }
}

impl TryFrom<i16> for DriverStatus {
    type Error = UnknownDriverStatus;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Searching),
            2 => Ok(Self::Finished),
            other => Err(UnknownDriverStatus(other)),
        }
    }
}

impl From<DriverStatus> for i16 {
    fn from(status: DriverStatus) -> Self {
        status.code()
    }
}

/// Contact details of the ride's driver shown to passengers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

/// A driver's open invitation for passengers.
///
/// ## Invariants
/// - `passengers` is in arrival order.
/// - `finished_at` is set once `driver_status` is `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRide {
    pub id: ShareRideId,
    pub driver_id: UserId,
    pub is_full: bool,
    pub driver_status: DriverStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub passengers: Vec<Passenger>,
    pub driver: Option<DriverSummary>,
}

impl ShareRide {
    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.driver_status == DriverStatus::Searching
    }

    #[must_use]
    pub fn is_driven_by(&self, user_id: UserId) -> bool {
        self.driver_id == user_id
    }

    /// Whether any loaded passenger still occupies the ride.
    #[must_use]
    pub fn has_active_passenger(&self) -> bool {
        self.passengers.iter().any(|p| p.status.is_active())
    }
}

/// Values for a freshly opened ride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShareRide {
    pub driver_id: UserId,
    pub created_at: DateTime<Utc>,
}
