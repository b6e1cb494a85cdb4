//! Builders wiring persistence adapters into the HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use carpool::domain::ShareRideService;
use carpool::domain::ports::{ShareRideCommand, ShareRideQuery};
use carpool::inbound::http::state::HttpState;
use carpool::outbound::persistence::{
    DbPool, DieselShareRideRepository, DieselUserAccountRepository,
};

/// Expose one service through both driving ports.
pub fn http_state_from_service<S>(service: Arc<S>) -> web::Data<HttpState>
where
    S: ShareRideCommand + ShareRideQuery + 'static,
{
    let command: Arc<dyn ShareRideCommand> = service.clone();
    let query: Arc<dyn ShareRideQuery> = service;
    web::Data::new(HttpState::new(command, query))
}

/// Build the HTTP state backed by PostgreSQL.
pub fn build_http_state(pool: &DbPool, minimum_balance: i64) -> web::Data<HttpState> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let service = ShareRideService::new(
        Arc::new(DieselShareRideRepository::new(pool.clone())),
        Arc::new(DieselUserAccountRepository::new(pool.clone())),
        clock,
        minimum_balance,
    );
    http_state_from_service(Arc::new(service))
}
