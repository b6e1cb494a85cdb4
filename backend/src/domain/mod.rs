//! Domain primitives, aggregates and services.
//!
//! Purpose: Define strongly typed carpool entities used by the API and
//! persistence layers, the rules that match drivers with riders, and the
//! passenger status lifecycle. Keep types immutable where possible and
//! document invariants and serialisation contracts (serde) in each type's
//! Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - ShareRide, Passenger, Payment: the ride aggregate and its children.
//! - MatchingEngine, TransitionEngine: the two rule engines.
//! - ShareRideService: driving port implementation wiring both engines.

mod account;
pub mod error;
mod ids;
mod matching_engine;
pub mod ports;
mod share_ride;
mod share_ride_error;
mod share_ride_service;
pub mod trace_id;
mod transition_engine;

pub use self::account::{Requester, UserAccount};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{PassengerId, PaymentDetailId, PaymentId, ShareRideId, UserId};
pub use self::matching_engine::MatchingEngine;
pub use self::share_ride::{
    Coordinate, CoordinateValidationError, DriverStatus, DriverSummary, MissingPayment,
    NewShareRide, Passenger, PassengerStatus, PassengerUpdate, Payment, PaymentDetail,
    PaymentMethod, PaymentStatus, RideWrite, Settlement, ShareRide, ShareRideUpdate,
    TransitionEffect, TransitionPlan, TransitionRejected, TransitionWrite, UnknownDriverStatus,
    UnknownPassengerStatus, UnknownPaymentMethod, UnknownPaymentStatus, compute_fare,
    plan_transition,
};
pub use self::share_ride_error::ShareRideError;
pub use self::share_ride_service::ShareRideService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::transition_engine::TransitionEngine;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use carpool::domain::{ApiResult, Error};
///
/// fn lookup() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
