//! Python façade over [`Session`].

use std::path::PathBuf;

use parking_lot::Mutex;
use pyo3::prelude::*;

use crate::errors::TerritoryError;
use crate::models::{format_timestamp, RepId};
use crate::session::Session;
use crate::settings::Config;

#[pyclass(name = "TerritorySession")]
pub struct PySession {
    inner: Mutex<Session>,
}

#[pymethods]
impl PySession {
    /// Open a session. Without `db_path`, configuration comes from the
    /// `TERRITORY_*` environment variables.
    #[new]
    #[pyo3(signature = (db_path=None))]
    pub fn new(db_path: Option<PathBuf>) -> PyResult<Self> {
        let mut config = Config::from_env();
        if db_path.is_some() {
            config.db_path = db_path;
        }
        let session = Session::open(&config)?;
        Ok(Self {
            inner: Mutex::new(session),
        })
    }

    // -- Assignments --------------------------------------------------------

    fn assign(&self, code: &str, rep_name: &str) -> bool {
        self.inner.lock().store_mut().set_one(code, rep_name)
    }

    fn unassign(&self, code: &str) -> bool {
        self.inner.lock().store_mut().remove_one(code)
    }

    fn bulk_assign(&self, codes: Vec<String>, rep_name: &str) -> bool {
        self.inner.lock().store_mut().bulk_assign(&codes[..], rep_name)
    }

    fn sync_ownership(&self, rep_name: &str, desired: Vec<String>) -> bool {
        self.inner.lock().store_mut().sync_ownership(rep_name, &desired[..])
    }

    /// `(code, current_owner)` pairs that `sync_ownership` would take over.
    fn conflicts(&self, rep_name: &str, desired: Vec<String>) -> Vec<(String, String)> {
        self.inner
            .lock()
            .store()
            .conflicts(rep_name, &desired[..])
            .into_iter()
            .map(|c| (c.code, c.current_owner))
            .collect()
    }

    fn clear_all(&self) -> bool {
        self.inner.lock().store_mut().clear_all()
    }

    fn undo(&self) -> bool {
        self.inner.lock().store_mut().undo()
    }

    fn redo(&self) -> bool {
        self.inner.lock().store_mut().redo()
    }

    fn can_undo(&self) -> bool {
        self.inner.lock().store().can_undo()
    }

    fn can_redo(&self) -> bool {
        self.inner.lock().store().can_redo()
    }

    /// `(code, rep_name, assigned_at)` rows in code order.
    fn assignments(&self) -> Vec<(String, String, String)> {
        self.inner
            .lock()
            .store()
            .present()
            .iter()
            .map(|(code, a)| (code.clone(), a.rep_name.clone(), format_timestamp(&a.assigned_at)))
            .collect()
    }

    fn is_dirty(&self) -> bool {
        self.inner.lock().store().is_dirty()
    }

    fn poll_persist(&self) -> bool {
        self.inner.lock().poll_persist()
    }

    fn flush(&self) -> bool {
        self.inner.lock().flush()
    }

    // -- Representatives ----------------------------------------------------

    /// `(id, name, color, territory_name)` in roster order.
    fn representatives(&self) -> Vec<(RepId, String, String, Option<String>)> {
        self.inner
            .lock()
            .registry()
            .iter()
            .map(|r| (r.id, r.name.clone(), r.color.clone(), r.territory_name.clone()))
            .collect()
    }

    fn rename_representative(&self, id: RepId, new_name: &str) -> PyResult<usize> {
        Ok(self.inner.lock().rename_representative(id, new_name)?)
    }

    fn set_color(&self, id: RepId, color: &str) -> PyResult<()> {
        Ok(self.inner.lock().set_representative_color(id, color)?)
    }

    #[pyo3(signature = (id, territory_name=None))]
    fn set_territory_name(&self, id: RepId, territory_name: Option<&str>) -> PyResult<()> {
        Ok(self.inner.lock().set_territory_name(id, territory_name)?)
    }

    fn color_for_region(&self, code: &str) -> Option<String> {
        self.inner.lock().color_for_region(code).map(str::to_string)
    }

    // -- Exchange -----------------------------------------------------------

    fn export_json(&self) -> PyResult<String> {
        Ok(self.inner.lock().export_json()?)
    }

    fn export_csv(&self) -> String {
        self.inner.lock().export_csv()
    }

    /// Returns `(accepted, rejected)` entry counts.
    fn import_json(&self, text: &str) -> PyResult<(usize, usize)> {
        let outcome = self.inner.lock().import_json(text)?;
        Ok((outcome.accepted.len(), outcome.rejected.len()))
    }

    /// Fill snapshot as a JSON document.
    fn fill_snapshot(&self) -> PyResult<String> {
        let snapshot = self.inner.lock().fill_snapshot();
        serde_json::to_string(&snapshot).map_err(|e| TerritoryError::from(e).into())
    }

    // -- Settings -----------------------------------------------------------

    fn panel_width(&self) -> i64 {
        self.inner.lock().settings().panel_width()
    }

    fn set_panel_width(&self, width: i64) -> i64 {
        self.inner.lock().settings_mut().set_panel_width(width)
    }

    fn backup_to(&self, destination: PathBuf) -> PyResult<String> {
        let path = self.inner.lock().backup_to(destination)?;
        Ok(path.to_string_lossy().into_owned())
    }
}
