//! In-memory ride and account store.
//!
//! Implements both store ports over a single mutex-guarded state. Every
//! mutation works on a staged copy that replaces the live state only when the
//! whole operation succeeds, mirroring the transactional Diesel adapter.
//! Failures can be injected at named steps to exercise rollback.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    BookedPassenger, PassengerBooking, ShareRideRepository, ShareRideRepositoryError,
    UserAccountRepository, UserAccountRepositoryError,
};
use crate::domain::{
    DriverStatus, DriverSummary, NewShareRide, Passenger, PassengerId, PassengerStatus, Payment,
    PaymentDetail, PaymentDetailId, PaymentId, PaymentMethod, PaymentStatus, ShareRide,
    ShareRideId, ShareRideUpdate, TransitionWrite, UserAccount, UserId,
};

/// Steps at which a write can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// After the passenger row is staged, before its payment.
    PaymentInsert,
    /// After status and payment updates are staged, before the balance debit.
    BalanceDebit,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    users: BTreeMap<UserId, UserAccount>,
    rides: BTreeMap<ShareRideId, ShareRide>,
    passengers: BTreeMap<PassengerId, Passenger>,
    payments: BTreeMap<PaymentId, Payment>,
    details: BTreeMap<PaymentDetailId, PaymentDetail>,
    last_id: i64,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn payments_for(&self, passenger_id: PassengerId) -> Vec<Payment> {
        self.payments
            .values()
            .filter(|payment| payment.passenger_id == passenger_id)
            .map(|payment| {
                let mut payment = payment.clone();
                payment.details = self
                    .details
                    .values()
                    .filter(|detail| detail.payment_id == payment.id)
                    .cloned()
                    .collect();
                payment
            })
            .collect()
    }

    fn load_passenger(&self, passenger: &Passenger) -> Passenger {
        let mut loaded = passenger.clone();
        loaded.payments = self.payments_for(passenger.id);
        loaded
    }

    fn load_ride(&self, ride: &ShareRide) -> ShareRide {
        let mut loaded = ride.clone();
        loaded.passengers = self
            .passengers
            .values()
            .filter(|passenger| passenger.share_ride_id == ride.id)
            .map(|passenger| self.load_passenger(passenger))
            .collect();
        loaded.driver = self.users.get(&ride.driver_id).map(|user| DriverSummary {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
        });
        loaded
    }

    fn active_passenger_of(&self, user_id: UserId) -> Option<&Passenger> {
        self.passengers
            .values()
            .find(|passenger| passenger.user_id == user_id && passenger.status.is_active())
    }

    fn ride_has_active_passenger(&self, ride_id: ShareRideId) -> bool {
        self.passengers
            .values()
            .any(|passenger| passenger.share_ride_id == ride_id && passenger.status.is_active())
    }
}

/// Shared in-memory store for the ride and account ports.
#[derive(Debug, Default)]
pub struct InMemoryCarpoolStore {
    state: Mutex<StoreState>,
    failure: Mutex<Option<FailurePoint>>,
}

impl InMemoryCarpoolStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn should_fail(&self, point: FailurePoint) -> bool {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if *failure == Some(point) {
            *failure = None;
            true
        } else {
            false
        }
    }

    fn injected(point: FailurePoint) -> ShareRideRepositoryError {
        ShareRideRepositoryError::query(format!("injected failure at {point:?}"))
    }

    /// Make the next write reaching `point` fail.
    pub fn fail_at(&self, point: FailurePoint) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    /// Insert or replace a user account.
    pub fn insert_account(&self, account: UserAccount) {
        let mut state = self.lock();
        state.last_id = state.last_id.max(account.id.get());
        state.users.insert(account.id, account);
    }

    /// Current view of an account.
    #[must_use]
    pub fn account(&self, user_id: UserId) -> Option<UserAccount> {
        self.lock().users.get(&user_id).cloned()
    }

    /// Current fully loaded view of a ride.
    #[must_use]
    pub fn ride(&self, ride_id: ShareRideId) -> Option<ShareRide> {
        let state = self.lock();
        state.rides.get(&ride_id).map(|ride| state.load_ride(ride))
    }

    /// Current view of a passenger with payments.
    #[must_use]
    pub fn passenger(&self, passenger_id: PassengerId) -> Option<Passenger> {
        let state = self.lock();
        state
            .passengers
            .get(&passenger_id)
            .map(|passenger| state.load_passenger(passenger))
    }

    #[must_use]
    pub fn ride_count(&self) -> usize {
        self.lock().rides.len()
    }

    #[must_use]
    pub fn passenger_count(&self) -> usize {
        self.lock().passengers.len()
    }

    #[must_use]
    pub fn payment_count(&self) -> usize {
        self.lock().payments.len()
    }
}

fn stage_transition(
    state: &mut StoreState,
    write: &TransitionWrite,
) -> Result<(), ShareRideRepositoryError> {
    if let Some(ride_write) = write.ride {
        let ride = state
            .rides
            .get_mut(&write.ride_id)
            .filter(|ride| ride.driver_status == ride_write.expected_status)
            .ok_or_else(|| ShareRideRepositoryError::conflict("share ride changed concurrently"))?;
        match ride_write.update {
            ShareRideUpdate::MarkFull => ride.is_full = true,
            ShareRideUpdate::Finish { finished_at } => {
                ride.driver_status = DriverStatus::Finished;
                ride.finished_at = Some(finished_at);
            }
        }
    }

    let passenger = state
        .passengers
        .get_mut(&write.passenger_id)
        .filter(|p| p.share_ride_id == write.ride_id && p.status == write.expected_status)
        .ok_or_else(|| {
            ShareRideRepositoryError::conflict("passenger status changed concurrently")
        })?;
    passenger.status = write.passenger.status;
    if let Some(dropped_at) = write.passenger.dropped_at {
        passenger.dropped_at = Some(dropped_at);
    }

    if let Some(settlement) = write.settlement {
        for payment in state
            .payments
            .values_mut()
            .filter(|payment| payment.passenger_id == settlement.passenger_id)
        {
            payment.status = PaymentStatus::Paid;
        }
    }
    Ok(())
}

#[async_trait]
impl ShareRideRepository for InMemoryCarpoolStore {
    async fn find_by_id(
        &self,
        ride_id: ShareRideId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        Ok(self.ride(ride_id))
    }

    async fn find_searching_by_driver(
        &self,
        driver_id: UserId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        let state = self.lock();
        Ok(state
            .rides
            .values()
            .find(|ride| ride.driver_id == driver_id && ride.is_searching())
            .map(|ride| state.load_ride(ride)))
    }

    async fn find_open_searching(&self) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        let state = self.lock();
        Ok(state
            .rides
            .values()
            .filter(|ride| ride.is_searching() && !ride.is_full)
            .min_by_key(|ride| (ride.created_at, ride.id))
            .map(|ride| state.load_ride(ride)))
    }

    async fn find_active_by_passenger_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        let state = self.lock();
        Ok(state
            .active_passenger_of(user_id)
            .and_then(|passenger| state.rides.get(&passenger.share_ride_id))
            .map(|ride| state.load_ride(ride)))
    }

    async fn find_passenger(
        &self,
        ride_id: ShareRideId,
        passenger_id: PassengerId,
    ) -> Result<Option<Passenger>, ShareRideRepositoryError> {
        let state = self.lock();
        Ok(state
            .passengers
            .get(&passenger_id)
            .filter(|passenger| passenger.share_ride_id == ride_id)
            .map(|passenger| state.load_passenger(passenger)))
    }

    async fn find_active_passenger_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Passenger>, ShareRideRepositoryError> {
        let state = self.lock();
        Ok(state
            .active_passenger_of(user_id)
            .map(|passenger| state.load_passenger(passenger)))
    }

    async fn insert_ride(
        &self,
        ride: NewShareRide,
    ) -> Result<ShareRideId, ShareRideRepositoryError> {
        let mut state = self.lock();
        if state
            .rides
            .values()
            .any(|existing| existing.driver_id == ride.driver_id && existing.is_searching())
        {
            return Err(ShareRideRepositoryError::conflict(
                "driver already has a searching share ride",
            ));
        }
        let id = ShareRideId::new(state.next_id());
        state.rides.insert(
            id,
            ShareRide {
                id,
                driver_id: ride.driver_id,
                is_full: false,
                driver_status: DriverStatus::Searching,
                created_at: ride.created_at,
                finished_at: None,
                passengers: Vec::new(),
                driver: None,
            },
        );
        Ok(id)
    }

    async fn finish_ride(
        &self,
        ride_id: ShareRideId,
        finished_at: DateTime<Utc>,
    ) -> Result<(), ShareRideRepositoryError> {
        let mut state = self.lock();
        if state.ride_has_active_passenger(ride_id) {
            return Err(ShareRideRepositoryError::conflict(
                "share ride still has active passengers",
            ));
        }
        let ride = state
            .rides
            .get_mut(&ride_id)
            .filter(|ride| ride.is_searching())
            .ok_or_else(|| ShareRideRepositoryError::conflict("share ride is not searching"))?;
        ride.driver_status = DriverStatus::Finished;
        ride.finished_at = Some(finished_at);
        Ok(())
    }

    async fn book_passenger(
        &self,
        booking: PassengerBooking,
    ) -> Result<BookedPassenger, ShareRideRepositoryError> {
        let mut live = self.lock();
        let mut staged = live.clone();

        let open = staged
            .rides
            .get(&booking.share_ride_id)
            .is_some_and(|ride| ride.is_searching() && !ride.is_full);
        if !open {
            return Err(ShareRideRepositoryError::conflict(
                "share ride is no longer accepting passengers",
            ));
        }
        if staged.active_passenger_of(booking.user_id).is_some() {
            return Err(ShareRideRepositoryError::conflict(
                "user already has an active passenger record",
            ));
        }

        let passenger_id = PassengerId::new(staged.next_id());
        staged.passengers.insert(
            passenger_id,
            Passenger {
                id: passenger_id,
                user_id: booking.user_id,
                share_ride_id: booking.share_ride_id,
                status: PassengerStatus::Waiting,
                destination: booking.destination,
                distance: booking.distance,
                created_at: booking.created_at,
                dropped_at: None,
                payments: Vec::new(),
            },
        );
        if self.should_fail(FailurePoint::PaymentInsert) {
            return Err(Self::injected(FailurePoint::PaymentInsert));
        }

        let payment_id = PaymentId::new(staged.next_id());
        staged.payments.insert(
            payment_id,
            Payment {
                id: payment_id,
                passenger_id,
                recipient_id: booking.driver_id,
                payer_id: booking.user_id,
                status: PaymentStatus::Unpaid,
                total_amount: booking.fare,
                created_at: booking.created_at,
                details: Vec::new(),
            },
        );
        let detail_id = PaymentDetailId::new(staged.next_id());
        staged.details.insert(
            detail_id,
            PaymentDetail {
                id: detail_id,
                payment_id,
                method: PaymentMethod::Cash,
                amount: booking.fare,
            },
        );

        *live = staged;
        Ok(BookedPassenger {
            share_ride_id: booking.share_ride_id,
            passenger_id,
            payment_id,
        })
    }

    async fn apply_transition(
        &self,
        write: TransitionWrite,
    ) -> Result<(), ShareRideRepositoryError> {
        let mut live = self.lock();
        let mut staged = live.clone();

        stage_transition(&mut staged, &write)?;
        if let Some(settlement) = write.settlement {
            if self.should_fail(FailurePoint::BalanceDebit) {
                return Err(Self::injected(FailurePoint::BalanceDebit));
            }
            let driver = staged
                .users
                .get_mut(&settlement.driver_id)
                .ok_or_else(|| ShareRideRepositoryError::query("driver account missing"))?;
            driver.coin -= settlement.amount;
        }

        *live = staged;
        Ok(())
    }
}

#[async_trait]
impl UserAccountRepository for InMemoryCarpoolStore {
    async fn find_by_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserAccount>, UserAccountRepositoryError> {
        Ok(self.account(user_id))
    }
}
