//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the ride and account ports, backed by
//! PostgreSQL through `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: repositories translate between Diesel rows and
//!   domain types. Ride rules live in the domain engines.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Atomic writes**: bookings, closures and status transitions each run in
//!   a single transaction and report lost races as conflicts.
//!
//! # Example
//!
//! ```no_run
//! use carpool::outbound::persistence::{
//!     DbPool, DieselShareRideRepository, DieselUserAccountRepository, PoolConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/carpool")).await?;
//! let rides = DieselShareRideRepository::new(pool.clone());
//! let accounts = DieselUserAccountRepository::new(pool);
//! # let _ = (rides, accounts);
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_share_ride_repository;
mod diesel_user_account_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_share_ride_repository::DieselShareRideRepository;
pub use diesel_user_account_repository::DieselUserAccountRepository;
pub use migrations::{MigrationError, migrate, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
