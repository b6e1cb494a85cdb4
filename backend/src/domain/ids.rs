//! Database-assigned identifiers.
//!
//! Every entity uses a 64-bit key allocated by the store. Each key gets its
//! own newtype so a passenger id can never be handed to a ride lookup.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw key.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// The raw key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id! {
    /// Identifier of a user account (riders and drivers alike).
    UserId
}

define_id! {
    /// Identifier of a share ride.
    ShareRideId
}

define_id! {
    /// Identifier of a passenger record.
    PassengerId
}

define_id! {
    /// Identifier of a payment.
    PaymentId
}

define_id! {
    PaymentDetailId
}
