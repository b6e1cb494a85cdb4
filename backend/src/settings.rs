//! Application settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `CARPOOL_*` environment variables and config
//! files. Optional fields fall back to the defaults below through accessor
//! methods.

use std::path::{Path, PathBuf};

use actix_web::cookie::Key;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

use crate::outbound::persistence::PoolConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
/// Shortest key file accepted; cookie keys are derived from at least 64 bytes.
pub const SESSION_KEY_MIN_LEN: usize = 64;

/// Settings for the carpool HTTP service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CARPOOL")]
pub struct AppSettings {
    /// Interface the HTTP server binds to.
    pub host: Option<String>,
    /// Port the HTTP server binds to.
    pub port: Option<u16>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum number of pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Coin balance a driver must hold before opening a search.
    pub minimum_balance: Option<i64>,
    /// File holding the cookie signing key shared with the identity service.
    pub session_key_file: Option<PathBuf>,
    /// Fall back to a random session key when the key file is unreadable.
    pub session_allow_ephemeral: Option<bool>,
    /// Mark session cookies `Secure`; on unless explicitly disabled.
    pub cookie_secure: Option<bool>,
}

/// Errors raised while turning settings into runtime configuration.
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("missing required setting: {name}")]
    Missing { name: &'static str },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

impl AppSettings {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn minimum_balance(&self) -> i64 {
        self.minimum_balance.unwrap_or(0)
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    pub fn session_allow_ephemeral(&self) -> bool {
        self.session_allow_ephemeral.unwrap_or(false)
    }

    pub fn session_key_file(&self) -> &Path {
        self.session_key_file
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_SESSION_KEY_FILE))
    }

    /// The database URL, which has no default.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .ok_or(SettingsError::Missing {
                name: "database_url",
            })
    }

    /// Pool configuration for the configured database.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let max_size = self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE);
        Ok(PoolConfig::new(self.database_url()?).with_max_size(max_size))
    }

    /// Load the session cookie key.
    ///
    /// An unreadable key file is tolerated only when ephemeral keys are
    /// allowed or in debug builds; the generated key invalidates every
    /// cookie on restart.
    pub fn session_key(&self) -> Result<Key, SettingsError> {
        let path = self.session_key_file();
        match std::fs::read(path) {
            Ok(bytes) if bytes.len() < SESSION_KEY_MIN_LEN => Err(SettingsError::KeyTooShort {
                path: path.to_path_buf(),
                length: bytes.len(),
                min_len: SESSION_KEY_MIN_LEN,
            }),
            Ok(bytes) => Ok(Key::derive_from(&bytes)),
            Err(source) if self.session_allow_ephemeral() || cfg!(debug_assertions) => {
                warn!(path = %path.display(), error = %source, "using temporary session key");
                Ok(Key::generate())
            }
            Err(source) => Err(SettingsError::KeyRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;
    use std::io::Write;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 8] = [
        "CARPOOL_HOST",
        "CARPOOL_PORT",
        "CARPOOL_DATABASE_URL",
        "CARPOOL_POOL_MAX_SIZE",
        "CARPOOL_MINIMUM_BALANCE",
        "CARPOOL_SESSION_KEY_FILE",
        "CARPOOL_SESSION_ALLOW_EPHEMERAL",
        "CARPOOL_COOKIE_SECURE",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("carpool")]).expect("config should load")
    }

    fn settings_with_key_file(path: PathBuf, allow_ephemeral: bool) -> AppSettings {
        AppSettings {
            host: None,
            port: None,
            database_url: None,
            pool_max_size: None,
            minimum_balance: None,
            session_key_file: Some(path),
            session_allow_ephemeral: Some(allow_ephemeral),
            cookie_secure: None,
        }
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.host(), DEFAULT_HOST);
        assert_eq!(settings.port(), DEFAULT_PORT);
        assert_eq!(settings.minimum_balance(), 0);
        assert_eq!(settings.session_key_file(), Path::new(DEFAULT_SESSION_KEY_FILE));
        assert!(settings.cookie_secure());
        assert!(!settings.session_allow_ephemeral());
        assert!(matches!(
            settings.database_url(),
            Err(SettingsError::Missing {
                name: "database_url"
            })
        ));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("CARPOOL_HOST", Some("127.0.0.1".to_owned())),
            ("CARPOOL_PORT", Some("9090".to_owned())),
            (
                "CARPOOL_DATABASE_URL",
                Some("postgres://carpool@localhost/carpool".to_owned()),
            ),
            ("CARPOOL_POOL_MAX_SIZE", Some("4".to_owned())),
            ("CARPOOL_MINIMUM_BALANCE", Some("500".to_owned())),
            ("CARPOOL_SESSION_KEY_FILE", None),
            ("CARPOOL_SESSION_ALLOW_EPHEMERAL", None),
            ("CARPOOL_COOKIE_SECURE", Some("false".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.host(), "127.0.0.1");
        assert_eq!(settings.port(), 9090);
        assert_eq!(settings.minimum_balance(), 500);
        assert!(!settings.cookie_secure());

        let pool = settings.pool_config().expect("database url set");
        assert_eq!(pool.database_url(), "postgres://carpool@localhost/carpool");
        assert_eq!(pool.max_size(), 4);
    }

    #[rstest]
    fn short_session_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[b'k'; 16]).expect("write key");
        let settings = settings_with_key_file(file.path().to_path_buf(), true);

        let Err(err) = settings.session_key() else {
            panic!("short key should be rejected");
        };
        assert!(matches!(err, SettingsError::KeyTooShort { length: 16, .. }));
    }

    #[rstest]
    fn session_key_is_derived_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[b'k'; SESSION_KEY_MIN_LEN]).expect("write key");
        let settings = settings_with_key_file(file.path().to_path_buf(), false);

        let first = settings.session_key().expect("key loads");
        let second = settings.session_key().expect("key loads");
        assert_eq!(first.master(), second.master());
    }

    #[rstest]
    fn missing_key_file_falls_back_when_ephemeral_allowed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = settings_with_key_file(dir.path().join("absent"), true);

        assert!(settings.session_key().is_ok());
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("true"), true)]
    #[case(Some("false"), false)]
    fn cookies_stay_secure_unless_disabled(#[case] value: Option<&str>, #[case] secure: bool) {
        let _guard = lock_env(VARS.map(|name| {
            let value = (name == "CARPOOL_COOKIE_SECURE")
                .then(|| value.map(str::to_owned))
                .flatten();
            (name, value)
        }));

        assert_eq!(load_from_empty_args().cookie_secure(), secure);
    }
}
