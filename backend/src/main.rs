//! Backend entry-point: loads settings, migrates the database and serves the
//! share ride API.

mod server;

use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use carpool::inbound::http::health::HealthState;
use carpool::outbound::persistence::{DbPool, migrate};
use carpool::settings::AppSettings;

use server::{ServerConfig, build_http_state, create_server};

fn startup_error(error: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(error.to_string())
}

fn bind_addr(settings: &AppSettings) -> std::io::Result<SocketAddr> {
    let host: IpAddr = settings.host().parse().map_err(|err| {
        startup_error(format!("invalid host '{}': {err}", settings.host()))
    })?;
    Ok(SocketAddr::new(host, settings.port()))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        AppSettings::load_from_iter(std::env::args_os().collect::<Vec<OsString>>())
            .map_err(startup_error)?;

    let key = settings.session_key().map_err(startup_error)?;
    let pool_config = settings.pool_config().map_err(startup_error)?;

    let applied = migrate(pool_config.database_url().to_owned())
        .await
        .map_err(startup_error)?;
    info!(applied, "database migrations complete");

    let pool = DbPool::new(pool_config).await.map_err(startup_error)?;
    let http_state = build_http_state(&pool, settings.minimum_balance());

    let config = ServerConfig::new(key, settings.cookie_secure(), bind_addr(&settings)?);
    info!(bind_addr = %config.bind_addr(), "starting carpool server");

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), http_state, config)?;

    actix_web::rt::spawn(async move {
        if actix_web::rt::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received; draining");
            health_state.mark_unhealthy();
        }
    });

    server.await
}
