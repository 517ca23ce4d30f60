//! Representative roster.
//!
//! The roster is created from a fixed seed list and never grows or shrinks;
//! only names, colours, and territory labels change. Persisted values are
//! overlaid on the seed by id, so a stored entry for an id that is no longer
//! seeded is ignored.
//!
//! Names double as the key into the assignment map. Renaming here does not
//! touch assignments; use `Session::rename_representative` for that.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{TerritoryError, TerritoryResult};
use crate::models::{RepId, Representative, StoredRepresentative, REPRESENTATIVES_KEY};
use crate::store::kv::{self, KvStore};

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap());

static FUNC_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:rgba?|hsla?)\(\s*[-+0-9.%deg]+(?:\s*[,\s/]\s*[-+0-9.%deg]+){2,3}\s*\)$").unwrap()
});

static NAMED_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z]{3,20}$").unwrap());

/// Accepts hex, `rgb[a]()`/`hsl[a]()` and keyword colours.
pub fn is_valid_color(value: &str) -> bool {
    let value = value.trim();
    HEX_COLOR_RE.is_match(value) || FUNC_COLOR_RE.is_match(value) || NAMED_COLOR_RE.is_match(value)
}

/// The roster every new session starts from.
pub fn default_roster() -> Vec<Representative> {
    [
        (1, "Alice Johnson", "#e6194b"),
        (2, "Bob Smith", "#3cb44b"),
        (3, "Carol Davis", "#4363d8"),
        (4, "Dan Miller", "#f58231"),
        (5, "Erin Wilson", "#911eb4"),
        (6, "Frank Moore", "#42d4f4"),
    ]
    .into_iter()
    .map(|(id, name, color)| Representative::new(id, name, color))
    .collect()
}

pub struct RepresentativeRegistry {
    reps: Vec<Representative>,
    kv: Arc<dyn KvStore>,
}

impl RepresentativeRegistry {
    /// Build from `seed` and overlay whatever is stored. Malformed storage
    /// leaves the seed untouched.
    pub fn load(kv: Arc<dyn KvStore>, seed: Vec<Representative>) -> Self {
        let mut reps = seed;
        let stored: BTreeMap<RepId, StoredRepresentative> =
            kv::load_json(kv.as_ref(), REPRESENTATIVES_KEY).unwrap_or_default();
        let mut names: Vec<String> = reps
            .iter()
            .map(|rep| {
                stored
                    .get(&rep.id)
                    .map(|saved| saved.name.trim())
                    .filter(|name| !name.is_empty())
                    .map_or_else(|| rep.name.clone(), str::to_string)
            })
            .collect();
        // Stored names must stay unique; a clashing override falls back to
        // the seed name.
        loop {
            let clash = (0..reps.len()).find(|&i| {
                names[i] != reps[i].name && names.iter().enumerate().any(|(j, n)| j != i && *n == names[i])
            });
            let Some(i) = clash else {
                break;
            };
            warn!(
                "Ignoring stored name {:?} for representative {}: already in use",
                names[i], reps[i].id
            );
            names[i] = reps[i].name.clone();
        }

        for (rep, name) in reps.iter_mut().zip(names) {
            rep.name = name;
            let Some(saved) = stored.get(&rep.id) else {
                continue;
            };
            if is_valid_color(&saved.color) {
                rep.color = saved.color.trim().to_string();
            } else {
                warn!("Ignoring stored colour {:?} for representative {}", saved.color, rep.id);
            }
            rep.territory_name = normalize_label(saved.territory_name.as_deref());
        }
        debug!("Loaded {} representatives", reps.len());
        Self { reps, kv }
    }

    pub fn get(&self, id: RepId) -> Option<&Representative> {
        self.reps.iter().find(|r| r.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Representative> {
        self.reps.iter().find(|r| r.name == name)
    }

    /// Representatives in seed order.
    pub fn iter(&self) -> impl Iterator<Item = &Representative> {
        self.reps.iter()
    }

    pub fn all(&self) -> &[Representative] {
        &self.reps
    }

    pub fn len(&self) -> usize {
        self.reps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reps.is_empty()
    }

    /// Rename a representative and return the previous name.
    ///
    /// The name is trimmed; it must be non-empty and not used by another
    /// representative.
    pub fn set_name(&mut self, id: RepId, name: &str) -> TerritoryResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TerritoryError::Validation("representative name cannot be empty".into()));
        }
        if self.reps.iter().any(|r| r.id != id && r.name == name) {
            return Err(TerritoryError::Validation(format!(
                "representative name {name:?} is already in use"
            )));
        }
        let rep = self.get_mut(id)?;
        let previous = std::mem::replace(&mut rep.name, name.to_string());
        self.persist();
        Ok(previous)
    }

    pub fn set_color(&mut self, id: RepId, color: &str) -> TerritoryResult<()> {
        if !is_valid_color(color) {
            return Err(TerritoryError::Validation(format!("invalid colour {color:?}")));
        }
        self.get_mut(id)?.color = color.trim().to_string();
        self.persist();
        Ok(())
    }

    /// Set or clear (with `None` or a blank string) the territory label.
    pub fn set_territory_name(&mut self, id: RepId, territory: Option<&str>) -> TerritoryResult<()> {
        self.get_mut(id)?.territory_name = normalize_label(territory);
        self.persist();
        Ok(())
    }

    fn get_mut(&mut self, id: RepId) -> TerritoryResult<&mut Representative> {
        self.reps
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| TerritoryError::NotFound(format!("representative {id}")))
    }

    /// Failed writes are logged; the in-memory roster stays authoritative.
    fn persist(&self) {
        let stored: IndexMap<RepId, StoredRepresentative> = self
            .reps
            .iter()
            .map(|r| (r.id, StoredRepresentative::from(r)))
            .collect();
        if let Err(e) = kv::save_json(self.kv.as_ref(), REPRESENTATIVES_KEY, &stored) {
            warn!("Failed to persist representatives: {e}");
        }
    }
}

fn normalize_label(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
