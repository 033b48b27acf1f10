use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::db::queries;

pub const NIGHT_ENABLED_KEY: &str = "night_enabled";

/// Read-only view of workshop settings, injected so handlers and tests
/// don't reach for a global.
pub trait SettingsProvider: Send + Sync {
    fn night_enabled(&self) -> bool;
}

pub struct DbSettings {
    db: Arc<Mutex<Connection>>,
}

impl DbSettings {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

impl SettingsProvider for DbSettings {
    fn night_enabled(&self) -> bool {
        let conn = self.db.lock().unwrap();
        match queries::get_setting(&conn, NIGHT_ENABLED_KEY) {
            Ok(value) => value.map(|v| v == "1").unwrap_or(false),
            Err(e) => {
                tracing::warn!("failed to read {NIGHT_ENABLED_KEY} setting: {e}");
                false
            }
        }
    }
}
