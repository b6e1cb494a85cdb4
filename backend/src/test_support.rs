//! Test utilities for the carpool crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is compiled for tests and behind the
//! `test-support` feature.

pub mod memory_store;

pub mod clock {
    //! Deterministic clocks.

    use std::sync::{Mutex, PoisonError};

    use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
    use mockable::Clock;

    /// Timestamp used across fixtures.
    ///
    /// # Panics
    /// Never; the date is a constant valid instant.
    #[must_use]
    pub fn fixed_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .single()
            .expect("valid fixture timestamp")
    }

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        #[must_use]
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        pub fn advance(&self, delta: TimeDelta) {
            *self.0.lock().unwrap_or_else(PoisonError::into_inner) += delta;
        }
    }

    impl Clock for FixedClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

pub mod fixtures {
    //! Builders for rides, passengers and accounts.

    use super::clock::fixed_timestamp;
    use crate::domain::{
        Coordinate, DriverStatus, DriverSummary, Passenger, PassengerId, PassengerStatus,
        Payment, PaymentDetail, PaymentDetailId, PaymentId, PaymentMethod, PaymentStatus,
        ShareRide, ShareRideId, UserAccount, UserId,
    };

    /// Searching, non-full ride with no passengers.
    #[must_use]
    pub fn sample_ride(id: ShareRideId, driver_id: UserId) -> ShareRide {
        ShareRide {
            id,
            driver_id,
            is_full: false,
            driver_status: DriverStatus::Searching,
            created_at: fixed_timestamp(),
            finished_at: None,
            passengers: Vec::new(),
            driver: Some(DriverSummary {
                id: driver_id,
                name: format!("driver-{driver_id}"),
                email: format!("driver-{driver_id}@example.com"),
                phone_number: "0800000000".to_owned(),
            }),
        }
    }

    /// Passenger with a fixed destination and distance and no payments.
    ///
    /// # Panics
    /// Never; the coordinate is in range.
    #[must_use]
    pub fn sample_passenger(
        id: PassengerId,
        share_ride_id: ShareRideId,
        user_id: UserId,
        status: PassengerStatus,
    ) -> Passenger {
        Passenger {
            id,
            user_id,
            share_ride_id,
            status,
            destination: Coordinate::new(-6.2, 106.8).expect("valid coordinate"),
            distance: 5.0,
            created_at: fixed_timestamp(),
            dropped_at: None,
            payments: Vec::new(),
        }
    }

    /// Attach an unpaid cash payment of `amount` owed to `recipient`.
    #[must_use]
    pub fn with_payment(mut passenger: Passenger, recipient: UserId, amount: i64) -> Passenger {
        let payment_id = PaymentId::new(passenger.id.get() * 10);
        passenger.payments.push(Payment {
            id: payment_id,
            passenger_id: passenger.id,
            recipient_id: recipient,
            payer_id: passenger.user_id,
            status: PaymentStatus::Unpaid,
            total_amount: amount,
            created_at: fixed_timestamp(),
            details: vec![PaymentDetail {
                id: PaymentDetailId::new(payment_id.get()),
                payment_id,
                method: PaymentMethod::Cash,
                amount,
            }],
        });
        passenger
    }

    /// Account with the given role and balance.
    #[must_use]
    pub fn sample_account(id: UserId, is_driver: bool, coin: i64) -> UserAccount {
        UserAccount {
            id,
            name: format!("user-{id}"),
            email: format!("user-{id}@example.com"),
            phone_number: "0800000000".to_owned(),
            coin,
            is_driver,
        }
    }
}
