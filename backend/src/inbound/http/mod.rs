//! HTTP inbound adapter exposing REST endpoints.

pub mod error;
pub mod health;
pub mod schemas;
pub mod session;
pub mod share_rides;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
