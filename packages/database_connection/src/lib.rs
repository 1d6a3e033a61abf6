#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Opens the connection handed to the mapping layer.
//!
//! `SQLite` is always available. With the `mysql-sqlx` feature, credentials open a
//! `MySQL` server through `SQLx`; without it they fail with
//! [`InitDbError::UnsupportedBackend`].

use std::path::{Path, PathBuf};

use switchy_database::Database;
use thiserror::Error;

pub mod creds;

pub use creds::GetDbCredsError;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    host: String,
    name: String,
    user: String,
    password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    #[must_use]
    pub const fn new(host: String, name: String, user: String, password: Option<String>) -> Self {
        Self {
            host,
            name,
            user,
            password,
        }
    }

    /// Reads `DB_HOST`, `DB_NAME`, `DB_USER` and `DB_PASSWORD`.
    ///
    /// Returns `Ok(None)` when none of host, name or user is set.
    ///
    /// # Errors
    ///
    /// * If only some of `DB_HOST`, `DB_NAME` and `DB_USER` are set
    pub fn from_env() -> Result<Option<Self>, GetDbCredsError> {
        creds::get_db_creds(|name| std::env::var(name).ok())
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// Which connection [`init`] should open.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// `SQLite` database file. Falls back to the `SQLITE_PATH` environment variable,
    /// then to an in-memory database.
    pub sqlite_path: Option<PathBuf>,
    /// `MySQL` server credentials. Take precedence over `sqlite_path`.
    pub creds: Option<Credentials>,
}

impl InitOptions {
    #[must_use]
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            sqlite_path: Some(path.into()),
            creds: None,
        }
    }

    #[must_use]
    pub const fn memory() -> Self {
        Self {
            sqlite_path: None,
            creds: None,
        }
    }

    #[must_use]
    pub fn with_creds(mut self, creds: Credentials) -> Self {
        self.creds = Some(creds);
        self
    }
}

#[derive(Debug, Error)]
pub enum InitDbError {
    #[error(transparent)]
    InitSqlite(#[from] InitSqliteError),
    #[error(transparent)]
    GetDbCreds(#[from] GetDbCredsError),
    #[cfg(feature = "mysql-sqlx")]
    #[error(transparent)]
    InitMysql(#[from] InitMysqlError),
    #[error("No backend compiled in for server '{host}'")]
    UnsupportedBackend { host: String },
}

/// Opens the database described by `options`.
///
/// # Errors
///
/// * If credentials were supplied but the `mysql-sqlx` feature is disabled
/// * If the `MySQL` server cannot be reached
/// * If the `SQLite` database fails to open
pub fn init(options: InitOptions) -> Result<Box<dyn Database>, InitDbError> {
    if let Some(creds) = options.creds {
        log::debug!("init: credentials given for host={}", creds.host());

        #[cfg(feature = "mysql-sqlx")]
        return Ok(init_mysql_sqlx(&creds)?);
        #[cfg(not(feature = "mysql-sqlx"))]
        return Err(InitDbError::UnsupportedBackend { host: creds.host });
    }

    let path = options
        .sqlite_path
        .or_else(|| std::env::var("SQLITE_PATH").ok().map(PathBuf::from));

    Ok(init_sqlite(path.as_deref())?)
}

#[derive(Debug, Error)]
pub enum InitSqliteError {
    #[error(transparent)]
    Sqlite(#[from] ::rusqlite::Error),
}

/// Opens a `SQLite` database file, or a private in-memory database when `db_location` is
/// `None`.
///
/// # Errors
///
/// * If the database fails to open
/// * If the busy timeout cannot be set
pub fn init_sqlite(db_location: Option<&Path>) -> Result<Box<dyn Database>, InitSqliteError> {
    let connection = match db_location {
        Some(path) => {
            log::debug!("init_sqlite: opening {}", path.display());
            ::rusqlite::Connection::open(path)?
        }
        None => {
            log::debug!("init_sqlite: opening in-memory database");
            ::rusqlite::Connection::open_in_memory()?
        }
    };
    connection.busy_timeout(std::time::Duration::from_millis(10))?;

    Ok(Box::new(
        switchy_database::rusqlite::RusqliteDatabase::new(connection),
    ))
}

#[cfg(feature = "mysql-sqlx")]
#[derive(Debug, Error)]
pub enum InitMysqlError {
    #[error(transparent)]
    MysqlSqlx(#[from] switchy_database::sqlx::mysql::SqlxDatabaseError),
    #[error("Invalid port in host '{0}'")]
    InvalidPort(String),
}

/// Connects to the `MySQL` server described by `creds`. The host may carry a
/// `:port` suffix.
///
/// # Errors
///
/// * If the port is not a number
/// * If the server cannot be reached or rejects the credentials
#[cfg(feature = "mysql-sqlx")]
pub fn init_mysql_sqlx(creds: &Credentials) -> Result<Box<dyn Database>, InitMysqlError> {
    use sqlx::mysql::MySqlConnectOptions;
    use switchy_database::sqlx::mysql::MySqlSqlxDatabase;

    let (host, port) = split_host_port(&creds.host)?;

    let mut connect_options = MySqlConnectOptions::new()
        .host(host)
        .database(&creds.name)
        .username(&creds.user);

    if let Some(port) = port {
        connect_options = connect_options.port(port);
    }
    if let Some(db_password) = &creds.password {
        connect_options = connect_options.password(db_password);
    }

    log::debug!("init_mysql_sqlx: connecting to {host} as {}", creds.user);

    Ok(Box::new(MySqlSqlxDatabase::connect(connect_options)?))
}

#[cfg(feature = "mysql-sqlx")]
fn split_host_port(host: &str) -> Result<(&str, Option<u16>), InitMysqlError> {
    match host.rsplit_once(':') {
        Some((name, port)) => port
            .parse()
            .map(|port| (name, Some(port)))
            .map_err(|_| InitMysqlError::InvalidPort(host.to_string())),
        None => Ok((host, None)),
    }
}
