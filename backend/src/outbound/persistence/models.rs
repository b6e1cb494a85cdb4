//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{passengers, payment_details, payments, share_rides, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub coin: i64,
    pub is_driver: bool,
}

// ---------------------------------------------------------------------------
// Share ride models
// ---------------------------------------------------------------------------

/// Row struct for reading from the share_rides table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = share_rides)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ShareRideRow {
    pub id: i64,
    pub driver_id: i64,
    pub is_full: bool,
    pub driver_status: i16,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Insertable struct for opening a ride.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = share_rides)]
pub(crate) struct NewShareRideRow {
    pub driver_id: i64,
    pub is_full: bool,
    pub driver_status: i16,
    pub created_at: DateTime<Utc>,
}

/// Changeset for ride updates; `None` fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = share_rides)]
pub(crate) struct ShareRideChangeset {
    pub is_full: Option<bool>,
    pub driver_status: Option<i16>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Passenger models
// ---------------------------------------------------------------------------

/// Row struct for reading from the passengers table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = passengers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PassengerRow {
    pub id: i64,
    pub user_id: i64,
    pub share_ride_id: i64,
    pub status: i16,
    pub destination_latitude: f64,
    pub destination_longitude: f64,
    pub distance: f64,
    pub created_at: DateTime<Utc>,
    pub dropped_at: Option<DateTime<Utc>>,
}

/// Insertable struct for seating a rider.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = passengers)]
pub(crate) struct NewPassengerRow {
    pub user_id: i64,
    pub share_ride_id: i64,
    pub status: i16,
    pub destination_latitude: f64,
    pub destination_longitude: f64,
    pub distance: f64,
    pub created_at: DateTime<Utc>,
}

/// Changeset for passenger status updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = passengers)]
pub(crate) struct PassengerChangeset {
    pub status: i16,
    pub dropped_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Payment models
// ---------------------------------------------------------------------------

/// Row struct for reading from the payments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentRow {
    pub id: i64,
    pub passenger_id: i64,
    pub recipient_id: i64,
    pub user_id: i64,
    pub status: String,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for a passenger's fare.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub(crate) struct NewPaymentRow<'a> {
    pub passenger_id: i64,
    pub recipient_id: i64,
    pub user_id: i64,
    pub status: &'a str,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Row struct for reading from the payment_details table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payment_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentDetailRow {
    pub id: i64,
    pub payment_id: i64,
    pub payment_method: String,
    pub amount: i64,
}

/// Insertable struct for a payment line.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_details)]
pub(crate) struct NewPaymentDetailRow<'a> {
    pub payment_id: i64,
    pub payment_method: &'a str,
    pub amount: i64,
}
