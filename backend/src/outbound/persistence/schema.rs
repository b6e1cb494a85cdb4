//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// User accounts.
    ///
    /// `coin` is the driver balance in minor units; settlement may drive it
    /// negative.
    users (id) {
        id -> Int8,
        name -> Varchar,
        email -> Varchar,
        phone_number -> Varchar,
        coin -> Int8,
        is_driver -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Driver searches.
    ///
    /// A partial unique index allows one row per driver with
    /// `driver_status = 1` (searching).
    share_rides (id) {
        id -> Int8,
        driver_id -> Int8,
        is_full -> Bool,
        /// 1 searching, 2 finished.
        driver_status -> Int2,
        created_at -> Timestamptz,
        finished_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Riders seated on a share ride.
    ///
    /// A partial unique index allows one row per user in an active status
    /// (1 to 4).
    passengers (id) {
        id -> Int8,
        user_id -> Int8,
        share_ride_id -> Int8,
        status -> Int2,
        destination_latitude -> Float8,
        destination_longitude -> Float8,
        distance -> Float8,
        created_at -> Timestamptz,
        dropped_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Fare owed by a passenger to the driver.
    payments (id) {
        id -> Int8,
        passenger_id -> Int8,
        recipient_id -> Int8,
        user_id -> Int8,
        status -> Varchar,
        total_amount -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Invoice lines of a payment.
    payment_details (id) {
        id -> Int8,
        payment_id -> Int8,
        payment_method -> Varchar,
        amount -> Int8,
    }
}

diesel::joinable!(share_rides -> users (driver_id));
diesel::joinable!(passengers -> share_rides (share_ride_id));
diesel::joinable!(payments -> passengers (passenger_id));
diesel::joinable!(payment_details -> payments (payment_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    share_rides,
    passengers,
    payments,
    payment_details,
);
