//! Caller identity and user accounts as seen by the ride core.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Authenticated caller attached to every core operation.
///
/// The inbound adapter builds this from the session; the core never looks
/// identity up on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub id: UserId,
    pub is_driver: bool,
}

impl Requester {
    /// Caller acting as a driver.
    #[must_use]
    pub const fn driver(id: UserId) -> Self {
        Self {
            id,
            is_driver: true,
        }
    }

    /// Caller acting as a rider.
    #[must_use]
    pub const fn rider(id: UserId) -> Self {
        Self {
            id,
            is_driver: false,
        }
    }
}

/// User account fields the ride core reads.
///
/// `coin` is the driver's balance in minor currency units. It can be negative
/// after settlement; the minimum is only enforced when a search starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub coin: i64,
    pub is_driver: bool,
}

impl UserAccount {
    /// Whether the balance meets `minimum` (inclusive).
    #[must_use]
    pub fn has_balance_for(&self, minimum: i64) -> bool {
        self.coin >= minimum
    }
}
