//! A territory editing session.
//!
//! `Session` is the explicit context object: it owns the roster, the
//! assignment store, the UI settings and the region catalog, all sharing one
//! key-value store. Representative renames go through
//! [`Session::rename_representative`] so assignments keyed by name follow
//! along.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{TerritoryError, TerritoryResult};
use crate::exchange::envelope::{self, ImportOutcome};
use crate::exchange::{csv, fills};
use crate::models::{now_utc, RepId, Representative};
use crate::regions::RegionCatalog;
use crate::registry::{default_roster, RepresentativeRegistry};
use crate::settings::{Config, Settings};
use crate::store::assignments::AssignmentStore;
use crate::store::database::Database;
use crate::store::kv::{KvStore, MemoryKv};

pub struct Session {
    registry: RepresentativeRegistry,
    store: AssignmentStore,
    settings: Settings,
    catalog: RegionCatalog,
    database: Option<Arc<Database>>,
}

impl Session {
    /// Open a session backed by `config.db_path`, or by memory when unset.
    /// Uses the North American catalog and the default roster.
    pub fn open(config: &Config) -> TerritoryResult<Self> {
        match &config.db_path {
            Some(path) => {
                let database = Arc::new(Database::open(path)?);
                info!(
                    "Opened territory session at {} (schema v{})",
                    database.db_path().display(),
                    database.schema_version()?
                );
                let kv: Arc<dyn KvStore> = database.clone();
                let mut session = Self::with_store(kv, config, RegionCatalog::north_america(), default_roster());
                session.database = Some(database);
                Ok(session)
            }
            None => {
                debug!("Opened in-memory territory session");
                Ok(Self::with_store(
                    Arc::new(MemoryKv::new()),
                    config,
                    RegionCatalog::north_america(),
                    default_roster(),
                ))
            }
        }
    }

    pub fn with_store(
        kv: Arc<dyn KvStore>,
        config: &Config,
        catalog: RegionCatalog,
        seed: Vec<Representative>,
    ) -> Self {
        Self {
            registry: RepresentativeRegistry::load(kv.clone(), seed),
            store: AssignmentStore::load_with(kv.clone(), config.debounce, config.history_limit),
            settings: Settings::load(kv),
            catalog,
            database: None,
        }
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &RepresentativeRegistry {
        &self.registry
    }

    pub fn store(&self) -> &AssignmentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AssignmentStore {
        &mut self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    // -----------------------------------------------------------------------
    // Representatives
    // -----------------------------------------------------------------------

    /// Rename a representative and move their assignments to the new name.
    /// Returns how many assignments were rewritten.
    pub fn rename_representative(&mut self, id: RepId, new_name: &str) -> TerritoryResult<usize> {
        let previous = self.registry.set_name(id, new_name)?;
        let current = self
            .registry
            .get(id)
            .map(|r| r.name.clone())
            .ok_or_else(|| TerritoryError::NotFound(format!("representative {id}")))?;
        let moved = self.store.rename_representative_everywhere(&previous, &current);
        debug!("Renamed {previous:?} to {current:?}, {moved} assignments moved");
        Ok(moved)
    }

    pub fn set_representative_color(&mut self, id: RepId, color: &str) -> TerritoryResult<()> {
        self.registry.set_color(id, color)
    }

    pub fn set_territory_name(&mut self, id: RepId, territory: Option<&str>) -> TerritoryResult<()> {
        self.registry.set_territory_name(id, territory)
    }

    /// Colour of the region's owner, `None` when unassigned or when the owner
    /// is not on the roster.
    pub fn color_for_region(&self, code: &str) -> Option<&str> {
        fills::region_color(code, self.store.present(), self.registry.all())
    }

    // -----------------------------------------------------------------------
    // Exchange
    // -----------------------------------------------------------------------

    pub fn export_json(&self) -> TerritoryResult<String> {
        let envelope = envelope::build_envelope(
            self.store.present(),
            self.registry.all(),
            self.catalog.len(),
            now_utc(),
        );
        envelope::export_json(&envelope)
    }

    pub fn export_csv(&self) -> String {
        csv::export_csv(self.store.present(), &self.catalog, self.registry.all())
    }

    pub fn fill_snapshot(&self) -> fills::FillSnapshot {
        fills::fill_snapshot(self.store.present(), self.registry.all(), &self.catalog)
    }

    /// Replace the assignments with the accepted entries of `text` as one
    /// undoable step. Legacy territory labels are copied onto representatives
    /// that do not have one yet.
    pub fn import_json(&mut self, text: &str) -> TerritoryResult<ImportOutcome> {
        let catalog = (!self.catalog.is_empty()).then_some(&self.catalog);
        let outcome = envelope::decode_import(text, catalog, now_utc())?;
        self.store.import_snapshot(outcome.to_map());

        let labels: Vec<(RepId, &str)> = outcome
            .legacy_territories
            .iter()
            .filter_map(|legacy| {
                self.registry
                    .by_name(&legacy.rep_name)
                    .filter(|rep| rep.territory_name.is_none())
                    .map(|rep| (rep.id, legacy.territory_name.as_str()))
            })
            .collect();
        for (id, territory) in labels {
            self.registry.set_territory_name(id, Some(territory))?;
        }

        info!(
            "Imported {} assignments ({} rejected)",
            outcome.accepted.len(),
            outcome.rejected.len()
        );
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write pending assignments if the debounce deadline has passed.
    pub fn poll_persist(&mut self) -> bool {
        self.store.poll_persist()
    }

    pub fn flush(&mut self) -> bool {
        self.store.flush()
    }

    /// Copy the backing database to `destination`.
    pub fn backup_to(&mut self, destination: impl AsRef<Path>) -> TerritoryResult<PathBuf> {
        self.store.flush();
        match &self.database {
            Some(database) => database.backup_to(destination),
            None => Err(TerritoryError::Validation("in-memory sessions cannot be backed up".into())),
        }
    }

    /// Flush pending writes and end the session.
    pub fn close(mut self) {
        self.store.flush();
    }
}
