//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and depend only on the driving
//! ports, so they can be tested with mocks and without a database.

use std::sync::Arc;

use crate::domain::ports::{ShareRideCommand, ShareRideQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub share_rides: Arc<dyn ShareRideCommand>,
    pub share_rides_query: Arc<dyn ShareRideQuery>,
}

impl HttpState {
    /// Construct state from the command and query ports.
    pub fn new(
        share_rides: Arc<dyn ShareRideCommand>,
        share_rides_query: Arc<dyn ShareRideQuery>,
    ) -> Self {
        Self {
            share_rides,
            share_rides_query,
        }
    }
}
