//! Passenger status transition table and the typed writes it produces.
//!
//! The table is keyed by `(current, requested)` and yields a closed set of
//! effects. Applying an effect to a loaded ride and passenger produces a
//! [`TransitionWrite`], which the store applies in a single transaction.

use chrono::{DateTime, Utc};

use super::{DriverStatus, Passenger, PassengerStatus, ShareRide};
use crate::domain::{PassengerId, ShareRideId, UserId};

/// Side effects attached to an allowed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Waiting to PickedUp: the ride stops accepting passengers.
    PickUp,
    /// Waiting to Skipped: the ride is closed.
    Skip,
    /// PickedUp to Arrived.
    Arrive,
    /// Arrived to OnTheWay.
    Depart,
    /// OnTheWay to Done: ride closed, passenger dropped, payment settled.
    Complete,
}

/// A validated move from one status to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: PassengerStatus,
    pub to: PassengerStatus,
    pub effect: TransitionEffect,
}

/// Requested move is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("passenger status cannot move from {} to {requested}", current.code())]
pub struct TransitionRejected {
    pub current: PassengerStatus,
    pub requested: i64,
}

/// Look up the transition from `current` to the raw `requested` code.
///
/// Unknown codes and moves out of a terminal status are rejected.
///
/// # Examples
/// ```
/// use carpool::domain::{plan_transition, PassengerStatus, TransitionEffect};
///
/// let plan = plan_transition(PassengerStatus::Waiting, 2).expect("allowed");
/// assert_eq!(plan.effect, TransitionEffect::PickUp);
/// assert!(plan_transition(PassengerStatus::Done, 5).is_err());
/// ```
pub fn plan_transition(
    current: PassengerStatus,
    requested: i64,
) -> Result<TransitionPlan, TransitionRejected> {
    use PassengerStatus as S;
    use TransitionEffect as E;

    let rejected = TransitionRejected { current, requested };
    let to = i16::try_from(requested)
        .ok()
        .and_then(|code| PassengerStatus::try_from(code).ok())
        .ok_or(rejected)?;
    let effect = match (current, to) {
        (S::Waiting, S::PickedUp) => E::PickUp,
        (S::Waiting, S::Skipped) => E::Skip,
        (S::PickedUp, S::Arrived) => E::Arrive,
        (S::Arrived, S::OnTheWay) => E::Depart,
        (S::OnTheWay, S::Done) => E::Complete,
        _ => return Err(rejected),
    };
    Ok(TransitionPlan {
        from: current,
        to,
        effect,
    })
}

/// Ride column changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareRideUpdate {
    MarkFull,
    Finish { finished_at: DateTime<Utc> },
}

/// Ride change guarded by the driver status that was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideWrite {
    pub expected_status: DriverStatus,
    pub update: ShareRideUpdate,
}

/// Passenger column changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassengerUpdate {
    pub status: PassengerStatus,
    pub dropped_at: Option<DateTime<Utc>>,
}

/// Payment settlement on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub passenger_id: PassengerId,
    pub driver_id: UserId,
    pub amount: i64,
}

/// Every row change of one transition, applied atomically by the store.
///
/// The passenger update only lands while the passenger is still at
/// `expected_status`; the ride update only while the ride is still at
/// [`RideWrite::expected_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionWrite {
    pub ride_id: ShareRideId,
    pub passenger_id: PassengerId,
    pub expected_status: PassengerStatus,
    pub passenger: PassengerUpdate,
    pub ride: Option<RideWrite>,
    pub settlement: Option<Settlement>,
}

/// A completing passenger has no payment to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("passenger {passenger_id} has no payment to settle")]
pub struct MissingPayment {
    pub passenger_id: PassengerId,
}

impl TransitionPlan {
    /// Build the store write for this plan.
    ///
    /// `now` stamps `finishedAt` and `droppedAt`. Settlement debits the total
    /// of the passenger's first payment.
    pub fn write_for(
        &self,
        ride: &ShareRide,
        passenger: &Passenger,
        now: DateTime<Utc>,
    ) -> Result<TransitionWrite, MissingPayment> {
        let guarded = |update| {
            Some(RideWrite {
                expected_status: ride.driver_status,
                update,
            })
        };
        let mut write = TransitionWrite {
            ride_id: ride.id,
            passenger_id: passenger.id,
            expected_status: self.from,
            passenger: PassengerUpdate {
                status: self.to,
                dropped_at: None,
            },
            ride: None,
            settlement: None,
        };
        match self.effect {
            TransitionEffect::PickUp => write.ride = guarded(ShareRideUpdate::MarkFull),
            TransitionEffect::Skip => {
                write.ride = guarded(ShareRideUpdate::Finish { finished_at: now });
            }
            TransitionEffect::Arrive | TransitionEffect::Depart => {}
            TransitionEffect::Complete => {
                let payment = passenger.primary_payment().ok_or(MissingPayment {
                    passenger_id: passenger.id,
                })?;
                write.ride = guarded(ShareRideUpdate::Finish { finished_at: now });
                write.passenger.dropped_at = Some(now);
                write.settlement = Some(Settlement {
                    passenger_id: passenger.id,
                    driver_id: ride.driver_id,
                    amount: payment.total_amount,
                });
            }
        }
        Ok(write)
    }
}
