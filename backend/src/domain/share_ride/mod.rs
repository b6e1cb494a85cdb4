//! Share ride entities, fares and the passenger status table.

mod fare;
mod passenger;
mod payment;
mod ride;
mod transition;

pub use self::fare::compute_fare;
pub use self::passenger::{
    Coordinate, CoordinateValidationError, Passenger, PassengerStatus, UnknownPassengerStatus,
};
pub use self::payment::{
    Payment, PaymentDetail, PaymentMethod, PaymentStatus, UnknownPaymentMethod,
    UnknownPaymentStatus,
};
pub use self::ride::{DriverStatus, DriverSummary, NewShareRide, ShareRide, UnknownDriverStatus};
pub use self::transition::{
    MissingPayment, PassengerUpdate, RideWrite, Settlement, ShareRideUpdate, TransitionEffect,
    TransitionPlan, TransitionRejected, TransitionWrite, plan_transition,
};
