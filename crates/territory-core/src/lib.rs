//! Territory core library: the state engine behind the sales territory map.
//!
//! The crate keeps a mapping from regions (U.S. states and Canadian
//! provinces) to sales representatives, with bounded undo/redo history,
//! per-representative ownership reconciliation, debounced persistence to
//! SQLite, and JSON/CSV exchange formats. With the `python` feature it is
//! also built as the `_territory_core` Python extension module.

pub mod errors;
pub mod exchange;
pub mod models;
pub mod regions;
pub mod registry;
pub mod session;
pub mod settings;
pub mod store;

#[cfg(feature = "python")]
pub mod bindings;

pub use errors::{TerritoryError, TerritoryResult};
pub use session::Session;
pub use settings::Config;

// ---------------------------------------------------------------------------
// Top-level Python module: _territory_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pyo3::pymodule]
fn _territory_core(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    use pyo3::prelude::*;

    m.add_class::<bindings::PySession>()?;

    m.add("EXPORT_VERSION", exchange::envelope::EXPORT_VERSION)?;
    m.add("DEFAULT_FILL", exchange::fills::DEFAULT_FILL)?;
    m.add("HISTORY_LIMIT", store::history::HISTORY_LIMIT)?;
    m.add("MIN_PANEL_WIDTH", settings::MIN_PANEL_WIDTH)?;
    m.add("MAX_PANEL_WIDTH", settings::MAX_PANEL_WIDTH)?;
    m.add("DEFAULT_PANEL_WIDTH", settings::DEFAULT_PANEL_WIDTH)?;

    Ok(())
}
