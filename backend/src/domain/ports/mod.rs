//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod share_ride_command;
mod share_ride_query;
mod share_ride_repository;
mod user_account_repository;

#[cfg(test)]
pub use share_ride_command::MockShareRideCommand;
pub use share_ride_command::{
    RequestRideRequest, RideBooking, ShareRideCommand, StartSearchingRequest,
    StartSearchingResponse, StopSearchingRequest, StopSearchingResponse,
    UpdatePassengerStatusRequest, UpdatePassengerStatusResponse,
};
#[cfg(test)]
pub use share_ride_query::MockShareRideQuery;
pub use share_ride_query::ShareRideQuery;
#[cfg(test)]
pub use share_ride_repository::MockShareRideRepository;
pub use share_ride_repository::{
    BookedPassenger, PassengerBooking, ShareRideRepository, ShareRideRepositoryError,
};
#[cfg(test)]
pub use user_account_repository::MockUserAccountRepository;
pub use user_account_repository::{UserAccountRepository, UserAccountRepositoryError};
