//! Runtime configuration and persisted UI settings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::models::PANEL_WIDTH_KEY;
use crate::store::database::expand_tilde;
use crate::store::debounce::DEFAULT_DEBOUNCE;
use crate::store::history::HISTORY_LIMIT;
use crate::store::kv::{self, KvStore};

pub const MIN_PANEL_WIDTH: i64 = 240;
pub const MAX_PANEL_WIDTH: i64 = 600;
pub const DEFAULT_PANEL_WIDTH: i64 = 320;

/// Upper bound accepted from `TERRITORY_HISTORY_LIMIT`.
pub const MAX_HISTORY_LIMIT: usize = 500;

pub fn clamp_panel_width(width: i64) -> i64 {
    width.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH)
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Session configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// SQLite file backing the session; `None` keeps state in memory.
    pub db_path: Option<PathBuf>,
    pub debounce: Duration,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            debounce: DEFAULT_DEBOUNCE,
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl Config {
    /// Read `TERRITORY_DB_PATH`, `TERRITORY_DEBOUNCE_MS` and
    /// `TERRITORY_HISTORY_LIMIT`, falling back to defaults for anything
    /// missing or invalid.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let db_path = lookup("TERRITORY_DB_PATH")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| expand_tilde(&v));

        let debounce = match lookup("TERRITORY_DEBOUNCE_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    warn!("Ignoring invalid TERRITORY_DEBOUNCE_MS={raw:?}");
                    defaults.debounce
                }
            },
            None => defaults.debounce,
        };

        let history_limit = match lookup("TERRITORY_HISTORY_LIMIT") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) => n.clamp(1, MAX_HISTORY_LIMIT),
                Err(_) => {
                    warn!("Ignoring invalid TERRITORY_HISTORY_LIMIT={raw:?}");
                    defaults.history_limit
                }
            },
            None => defaults.history_limit,
        };

        Self {
            db_path,
            debounce,
            history_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Persisted UI settings.
pub struct Settings {
    panel_width: i64,
    kv: Arc<dyn KvStore>,
}

impl Settings {
    pub fn load(kv: Arc<dyn KvStore>) -> Self {
        let panel_width = kv::load_json::<i64>(kv.as_ref(), PANEL_WIDTH_KEY)
            .map(clamp_panel_width)
            .unwrap_or(DEFAULT_PANEL_WIDTH);
        Self { panel_width, kv }
    }

    pub fn panel_width(&self) -> i64 {
        self.panel_width
    }

    /// Clamp, store, and return the effective width.
    pub fn set_panel_width(&mut self, width: i64) -> i64 {
        self.panel_width = clamp_panel_width(width);
        if let Err(e) = kv::save_json(self.kv.as_ref(), PANEL_WIDTH_KEY, &self.panel_width) {
            warn!("Failed to persist panel width: {e}");
        }
        self.panel_width
    }
}
