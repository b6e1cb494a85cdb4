//! PostgreSQL-backed `ShareRideRepository` implementation using Diesel ORM.
//!
//! Reads assemble the full ride aggregate from five tables. Multi-row writes
//! run in one transaction each: bookings and closures lock the ride row with
//! `FOR UPDATE` and re-check its state, while status transitions use updates
//! guarded by the status that was read. A guard that matches no row rolls the
//! whole transaction back and surfaces as a conflict.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{
    BookedPassenger, PassengerBooking, ShareRideRepository, ShareRideRepositoryError,
};
use crate::domain::{
    Coordinate, DriverStatus, DriverSummary, NewShareRide, Passenger, PassengerId,
    PassengerStatus, Payment, PaymentDetail, PaymentDetailId, PaymentId, PaymentMethod,
    PaymentStatus, ShareRide, ShareRideId, ShareRideUpdate, TransitionWrite, UserId,
};

use super::diesel_basic_error_mapping::{map_basic_pool_error, map_guarded_diesel_error};
use super::models::{
    NewPassengerRow, NewPaymentDetailRow, NewPaymentRow, NewShareRideRow, PassengerChangeset,
    PassengerRow, PaymentDetailRow, PaymentRow, ShareRideChangeset, ShareRideRow, UserRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{passengers, payment_details, payments, share_rides, users};

/// Diesel-backed implementation of the share ride repository port.
#[derive(Clone)]
pub struct DieselShareRideRepository {
    pool: DbPool,
}

impl DieselShareRideRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure raised inside a ride transaction.
#[derive(Debug)]
enum TxError {
    Diesel(diesel::result::Error),
    /// A re-checked or guarded row was not in the expected state.
    Conflict(&'static str),
    /// A row the write depends on is missing.
    Missing(&'static str),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_pool_error(error: PoolError) -> ShareRideRepositoryError {
    map_basic_pool_error(error, |message| {
        ShareRideRepositoryError::connection(message)
    })
}

fn map_diesel_error(error: diesel::result::Error) -> ShareRideRepositoryError {
    map_guarded_diesel_error(
        error,
        ShareRideRepositoryError::query,
        ShareRideRepositoryError::connection,
        ShareRideRepositoryError::conflict,
    )
}

fn map_tx_error(error: TxError) -> ShareRideRepositoryError {
    match error {
        TxError::Diesel(error) => map_diesel_error(error),
        TxError::Conflict(message) => ShareRideRepositoryError::conflict(message),
        TxError::Missing(message) => ShareRideRepositoryError::query(message),
    }
}

/// Fail the transaction when a guarded write touched nothing.
fn require_updated(rows: usize, message: &'static str) -> Result<(), TxError> {
    if rows == 0 {
        Err(TxError::Conflict(message))
    } else {
        Ok(())
    }
}

fn corrupt(err: impl std::fmt::Display) -> ShareRideRepositoryError {
    ShareRideRepositoryError::query(format!("stored row is invalid: {err}"))
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn row_to_detail(row: PaymentDetailRow) -> Result<PaymentDetail, ShareRideRepositoryError> {
    Ok(PaymentDetail {
        id: PaymentDetailId::new(row.id),
        payment_id: PaymentId::new(row.payment_id),
        method: row.payment_method.parse::<PaymentMethod>().map_err(corrupt)?,
        amount: row.amount,
    })
}

fn row_to_payment(
    row: PaymentRow,
    details: Vec<PaymentDetail>,
) -> Result<Payment, ShareRideRepositoryError> {
    Ok(Payment {
        id: PaymentId::new(row.id),
        passenger_id: PassengerId::new(row.passenger_id),
        recipient_id: UserId::new(row.recipient_id),
        payer_id: UserId::new(row.user_id),
        status: row.status.parse::<PaymentStatus>().map_err(corrupt)?,
        total_amount: row.total_amount,
        created_at: row.created_at,
        details,
    })
}

fn row_to_passenger(
    row: PassengerRow,
    payments: Vec<Payment>,
) -> Result<Passenger, ShareRideRepositoryError> {
    Ok(Passenger {
        id: PassengerId::new(row.id),
        user_id: UserId::new(row.user_id),
        share_ride_id: ShareRideId::new(row.share_ride_id),
        status: PassengerStatus::try_from(row.status).map_err(corrupt)?,
        destination: Coordinate::new(row.destination_latitude, row.destination_longitude)
            .map_err(corrupt)?,
        distance: row.distance,
        created_at: row.created_at,
        dropped_at: row.dropped_at,
        payments,
    })
}

fn row_to_ride(
    row: ShareRideRow,
    passengers: Vec<Passenger>,
    driver: Option<DriverSummary>,
) -> Result<ShareRide, ShareRideRepositoryError> {
    Ok(ShareRide {
        id: ShareRideId::new(row.id),
        driver_id: UserId::new(row.driver_id),
        is_full: row.is_full,
        driver_status: DriverStatus::try_from(row.driver_status).map_err(corrupt)?,
        created_at: row.created_at,
        finished_at: row.finished_at,
        passengers,
        driver,
    })
}

fn row_to_driver(row: UserRow) -> DriverSummary {
    DriverSummary {
        id: UserId::new(row.id),
        name: row.name,
        email: row.email,
        phone_number: row.phone_number,
    }
}

// ---------------------------------------------------------------------------
// Aggregate loading
// ---------------------------------------------------------------------------

/// Load payments, with their details, keyed by passenger id.
async fn load_payments(
    conn: &mut AsyncPgConnection,
    passenger_ids: &[i64],
) -> Result<HashMap<i64, Vec<Payment>>, ShareRideRepositoryError> {
    let payment_rows: Vec<PaymentRow> = payments::table
        .filter(payments::passenger_id.eq_any(passenger_ids))
        .order(payments::id.asc())
        .select(PaymentRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;
    let payment_ids: Vec<i64> = payment_rows.iter().map(|row| row.id).collect();

    let detail_rows: Vec<PaymentDetailRow> = payment_details::table
        .filter(payment_details::payment_id.eq_any(&payment_ids))
        .order(payment_details::id.asc())
        .select(PaymentDetailRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;

    let mut details: HashMap<i64, Vec<PaymentDetail>> = HashMap::new();
    for row in detail_rows {
        details.entry(row.payment_id).or_default().push(row_to_detail(row)?);
    }

    let mut by_passenger: HashMap<i64, Vec<Payment>> = HashMap::new();
    for row in payment_rows {
        let passenger_id = row.passenger_id;
        let lines = details.remove(&row.id).unwrap_or_default();
        by_passenger
            .entry(passenger_id)
            .or_default()
            .push(row_to_payment(row, lines)?);
    }
    Ok(by_passenger)
}

async fn load_passengers(
    conn: &mut AsyncPgConnection,
    rows: Vec<PassengerRow>,
) -> Result<Vec<Passenger>, ShareRideRepositoryError> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut payments = load_payments(conn, &ids).await?;
    rows.into_iter()
        .map(|row| {
            let owned = payments.remove(&row.id).unwrap_or_default();
            row_to_passenger(row, owned)
        })
        .collect()
}

/// Attach passengers, payments and the driver summary to ride rows.
async fn load_rides(
    conn: &mut AsyncPgConnection,
    rows: Vec<ShareRideRow>,
) -> Result<Vec<ShareRide>, ShareRideRepositoryError> {
    let ride_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let driver_ids: Vec<i64> = rows.iter().map(|row| row.driver_id).collect();

    let mut drivers: HashMap<i64, DriverSummary> = users::table
        .filter(users::id.eq_any(&driver_ids))
        .select(UserRow::as_select())
        .load::<UserRow>(conn)
        .await
        .map_err(map_diesel_error)?
        .into_iter()
        .map(|row| (row.id, row_to_driver(row)))
        .collect();

    let passenger_rows: Vec<PassengerRow> = passengers::table
        .filter(passengers::share_ride_id.eq_any(&ride_ids))
        .order((passengers::created_at.asc(), passengers::id.asc()))
        .select(PassengerRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;

    let mut by_ride: HashMap<ShareRideId, Vec<Passenger>> = HashMap::new();
    for passenger in load_passengers(conn, passenger_rows).await? {
        by_ride.entry(passenger.share_ride_id).or_default().push(passenger);
    }

    rows.into_iter()
        .map(|row| {
            let seated = by_ride.remove(&ShareRideId::new(row.id)).unwrap_or_default();
            let driver = drivers.remove(&row.driver_id);
            row_to_ride(row, seated, driver)
        })
        .collect()
}

async fn load_ride(
    conn: &mut AsyncPgConnection,
    row: Option<ShareRideRow>,
) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(load_rides(conn, vec![row]).await?.pop())
}

async fn load_passenger(
    conn: &mut AsyncPgConnection,
    row: Option<PassengerRow>,
) -> Result<Option<Passenger>, ShareRideRepositoryError> {
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(load_passengers(conn, vec![row]).await?.pop())
}

async fn find_active_passenger_row(
    conn: &mut AsyncPgConnection,
    user_id: UserId,
) -> Result<Option<PassengerRow>, ShareRideRepositoryError> {
    passengers::table
        .filter(passengers::user_id.eq(user_id.get()))
        .filter(passengers::status.eq_any(PassengerStatus::active_codes()))
        .select(PassengerRow::as_select())
        .first::<PassengerRow>(conn)
        .await
        .optional()
        .map_err(map_diesel_error)
}

// ---------------------------------------------------------------------------
// Transactional writes
// ---------------------------------------------------------------------------

/// Lock the ride row for the rest of the transaction.
async fn lock_ride(
    conn: &mut AsyncPgConnection,
    ride_id: ShareRideId,
) -> Result<Option<ShareRideRow>, TxError> {
    let row = share_rides::table
        .filter(share_rides::id.eq(ride_id.get()))
        .select(ShareRideRow::as_select())
        .for_update()
        .get_result::<ShareRideRow>(conn)
        .await
        .optional()?;
    Ok(row)
}

async fn count_active_passengers(
    conn: &mut AsyncPgConnection,
    ride_id: ShareRideId,
) -> Result<i64, TxError> {
    let count = passengers::table
        .filter(passengers::share_ride_id.eq(ride_id.get()))
        .filter(passengers::status.eq_any(PassengerStatus::active_codes()))
        .count()
        .get_result::<i64>(conn)
        .await?;
    Ok(count)
}

async fn write_booking(
    conn: &mut AsyncPgConnection,
    booking: &PassengerBooking,
) -> Result<BookedPassenger, TxError> {
    let open = lock_ride(conn, booking.share_ride_id)
        .await?
        .is_some_and(|ride| ride.driver_status == DriverStatus::Searching.code() && !ride.is_full);
    if !open {
        return Err(TxError::Conflict("share ride is no longer accepting passengers"));
    }

    let passenger_id: i64 = diesel::insert_into(passengers::table)
        .values(&NewPassengerRow {
            user_id: booking.user_id.get(),
            share_ride_id: booking.share_ride_id.get(),
            status: PassengerStatus::Waiting.code(),
            destination_latitude: booking.destination.latitude(),
            destination_longitude: booking.destination.longitude(),
            distance: booking.distance,
            created_at: booking.created_at,
        })
        .returning(passengers::id)
        .get_result(conn)
        .await?;

    let payment_id: i64 = diesel::insert_into(payments::table)
        .values(&NewPaymentRow {
            passenger_id,
            recipient_id: booking.driver_id.get(),
            user_id: booking.user_id.get(),
            status: PaymentStatus::Unpaid.as_str(),
            total_amount: booking.fare,
            created_at: booking.created_at,
        })
        .returning(payments::id)
        .get_result(conn)
        .await?;

    diesel::insert_into(payment_details::table)
        .values(&NewPaymentDetailRow {
            payment_id,
            payment_method: PaymentMethod::Cash.as_str(),
            amount: booking.fare,
        })
        .execute(conn)
        .await?;

    Ok(BookedPassenger {
        share_ride_id: booking.share_ride_id,
        passenger_id: PassengerId::new(passenger_id),
        payment_id: PaymentId::new(payment_id),
    })
}

async fn write_transition(
    conn: &mut AsyncPgConnection,
    write: &TransitionWrite,
) -> Result<(), TxError> {
    if let Some(ride_write) = write.ride {
        let changes = match ride_write.update {
            ShareRideUpdate::MarkFull => ShareRideChangeset {
                is_full: Some(true),
                ..ShareRideChangeset::default()
            },
            ShareRideUpdate::Finish { finished_at } => ShareRideChangeset {
                driver_status: Some(DriverStatus::Finished.code()),
                finished_at: Some(finished_at),
                ..ShareRideChangeset::default()
            },
        };
        let rows = diesel::update(
            share_rides::table
                .filter(share_rides::id.eq(write.ride_id.get()))
                .filter(share_rides::driver_status.eq(ride_write.expected_status.code())),
        )
        .set(&changes)
        .execute(conn)
        .await?;
        require_updated(rows, "share ride changed concurrently")?;
    }

    let rows = diesel::update(
        passengers::table
            .filter(passengers::id.eq(write.passenger_id.get()))
            .filter(passengers::share_ride_id.eq(write.ride_id.get()))
            .filter(passengers::status.eq(write.expected_status.code())),
    )
    .set(&PassengerChangeset {
        status: write.passenger.status.code(),
        dropped_at: write.passenger.dropped_at,
    })
    .execute(conn)
    .await?;
    require_updated(rows, "passenger status changed concurrently")?;

    if let Some(settlement) = write.settlement {
        let owed = payments::table.filter(payments::passenger_id.eq(settlement.passenger_id.get()));
        diesel::update(owed)
            .set(payments::status.eq(PaymentStatus::Paid.as_str()))
            .execute(conn)
            .await?;

        let rows = diesel::update(users::table.filter(users::id.eq(settlement.driver_id.get())))
            .set(users::coin.eq(users::coin - settlement.amount))
            .execute(conn)
            .await?;
        if rows == 0 {
            return Err(TxError::Missing("driver account missing"));
        }
    }
    Ok(())
}

#[async_trait]
impl ShareRideRepository for DieselShareRideRepository {
    async fn find_by_id(
        &self,
        ride_id: ShareRideId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = share_rides::table
            .filter(share_rides::id.eq(ride_id.get()))
            .select(ShareRideRow::as_select())
            .first::<ShareRideRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        load_ride(&mut conn, row).await
    }

    async fn find_searching_by_driver(
        &self,
        driver_id: UserId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = share_rides::table
            .filter(share_rides::driver_id.eq(driver_id.get()))
            .filter(share_rides::driver_status.eq(DriverStatus::Searching.code()))
            .select(ShareRideRow::as_select())
            .first::<ShareRideRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        load_ride(&mut conn, row).await
    }

    async fn find_open_searching(&self) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = share_rides::table
            .filter(share_rides::driver_status.eq(DriverStatus::Searching.code()))
            .filter(share_rides::is_full.eq(false))
            .order((share_rides::created_at.asc(), share_rides::id.asc()))
            .select(ShareRideRow::as_select())
            .first::<ShareRideRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        load_ride(&mut conn, row).await
    }

    async fn find_active_by_passenger_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ShareRide>, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let Some(passenger) = find_active_passenger_row(&mut conn, user_id).await? else {
            return Ok(None);
        };
        let row = share_rides::table
            .filter(share_rides::id.eq(passenger.share_ride_id))
            .select(ShareRideRow::as_select())
            .first::<ShareRideRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        load_ride(&mut conn, row).await
    }

    async fn find_passenger(
        &self,
        ride_id: ShareRideId,
        passenger_id: PassengerId,
    ) -> Result<Option<Passenger>, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = passengers::table
            .filter(passengers::id.eq(passenger_id.get()))
            .filter(passengers::share_ride_id.eq(ride_id.get()))
            .select(PassengerRow::as_select())
            .first::<PassengerRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        load_passenger(&mut conn, row).await
    }

    async fn find_active_passenger_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Passenger>, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = find_active_passenger_row(&mut conn, user_id).await?;
        load_passenger(&mut conn, row).await
    }

    async fn insert_ride(
        &self,
        ride: NewShareRide,
    ) -> Result<ShareRideId, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let id: i64 = diesel::insert_into(share_rides::table)
            .values(&NewShareRideRow {
                driver_id: ride.driver_id.get(),
                is_full: false,
                driver_status: DriverStatus::Searching.code(),
                created_at: ride.created_at,
            })
            .returning(share_rides::id)
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(share_ride_id = id, driver_id = %ride.driver_id, "share ride inserted");
        Ok(ShareRideId::new(id))
    }

    async fn finish_ride(
        &self,
        ride_id: ShareRideId,
        finished_at: DateTime<Utc>,
    ) -> Result<(), ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let searching = lock_ride(conn, ride_id)
                    .await?
                    .is_some_and(|ride| ride.driver_status == DriverStatus::Searching.code());
                if !searching {
                    return Err(TxError::Conflict("share ride is not searching"));
                }
                if count_active_passengers(conn, ride_id).await? > 0 {
                    return Err(TxError::Conflict("share ride still has active passengers"));
                }

                let changes = ShareRideChangeset {
                    driver_status: Some(DriverStatus::Finished.code()),
                    finished_at: Some(finished_at),
                    ..ShareRideChangeset::default()
                };
                diesel::update(share_rides::table.filter(share_rides::id.eq(ride_id.get())))
                    .set(&changes)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_tx_error)
    }

    async fn book_passenger(
        &self,
        booking: PassengerBooking,
    ) -> Result<BookedPassenger, ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let booked = conn
            .transaction(|conn| async move { write_booking(conn, &booking).await }.scope_boxed())
            .await
            .map_err(map_tx_error)?;

        debug!(
            share_ride_id = %booked.share_ride_id,
            passenger_id = %booked.passenger_id,
            "passenger booked"
        );
        Ok(booked)
    }

    async fn apply_transition(
        &self,
        write: TransitionWrite,
    ) -> Result<(), ShareRideRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| async move { write_transition(conn, &write).await }.scope_boxed())
            .await
            .map_err(map_tx_error)?;

        debug!(
            share_ride_id = %write.ride_id,
            passenger_id = %write.passenger_id,
            status = %write.passenger.status,
            "passenger transition stored"
        );
        Ok(())
    }
}
