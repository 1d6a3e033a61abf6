//! Process-wide database handle.
//!
//! Applications that open their connection once at startup register it here with
//! [`init`]; components that were not handed a connection explicitly pick it up with
//! [`database`].

use std::{
    ops::Deref,
    sync::{Arc, OnceLock},
};

use crate::Database;

static DATABASE: OnceLock<Arc<Box<dyn Database>>> = OnceLock::new();

/// Registers the process-wide database.
///
/// The first registration wins. Later calls leave the stored handle untouched and log a
/// warning. Returns whether this call stored the handle.
pub fn init(database: Arc<Box<dyn Database>>) -> bool {
    let stored = DATABASE.set(database).is_ok();

    if stored {
        log::debug!("init: registered process-wide database");
    } else {
        log::warn!("init: process-wide database already registered, ignoring");
    }

    stored
}

/// The database registered with [`init`], if any.
#[must_use]
pub fn database() -> Option<ConfigDatabase> {
    DATABASE.get().cloned().map(ConfigDatabase::from)
}

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone)]
pub struct ConfigDatabase {
    pub database: Arc<Box<dyn Database>>,
}

impl From<ConfigDatabase> for Arc<Box<dyn Database>> {
    fn from(value: ConfigDatabase) -> Self {
        value.database
    }
}

impl From<Arc<Box<dyn Database>>> for ConfigDatabase {
    fn from(value: Arc<Box<dyn Database>>) -> Self {
        Self { database: value }
    }
}

impl Deref for ConfigDatabase {
    type Target = dyn Database;

    fn deref(&self) -> &Self::Target {
        &**self.database
    }
}
