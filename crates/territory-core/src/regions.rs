//! Region catalog: the read-only set of states and provinces that can be
//! assigned, plus the lookup tables derived from it.
//!
//! Boundary geometry is carried through untouched for the map and export
//! layers; the core only ever reads region codes and display names.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{TerritoryError, TerritoryResult};

/// U.S. states plus the District of Columbia.
pub const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Canadian provinces and territories.
pub const CANADIAN_PROVINCES: &[(&str, &str)] = &[
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("NT", "Northwest Territories"),
    ("NU", "Nunavut"),
    ("ON", "Ontario"),
    ("PE", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
    ("YT", "Yukon"),
];

/// Property names checked (in order) for a feature's display name.
const NAME_PROPERTIES: &[&str] = &["name", "NAME", "prov_name_en", "PRENAME"];

/// Property names checked (in order) for an explicit region code.
const CODE_PROPERTIES: &[&str] = &["code", "postal", "STUSPS", "PREABBR"];

/// A state or province.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub code: String,
    pub display_name: String,
    /// Raw GeoJSON geometry, opaque to the core.
    pub geometry: Option<Value>,
}

/// Region records keyed by code, with a case-insensitive name index.
#[derive(Clone, Debug, Default)]
pub struct RegionCatalog {
    regions: IndexMap<String, Region>,
    name_to_code: HashMap<String, String>,
}

impl RegionCatalog {
    pub fn from_regions(regions: impl IntoIterator<Item = Region>) -> Self {
        let mut catalog = Self::default();
        for region in regions {
            catalog.insert(region);
        }
        catalog
    }

    /// All U.S. states (plus DC) and Canadian provinces, without geometry.
    pub fn north_america() -> Self {
        Self::from_regions(
            US_STATES
                .iter()
                .chain(CANADIAN_PROVINCES.iter())
                .map(|(code, name)| Region {
                    code: (*code).to_string(),
                    display_name: (*name).to_string(),
                    geometry: None,
                }),
        )
    }

    /// Build a catalog from a GeoJSON `FeatureCollection`.
    ///
    /// Each feature needs a display name. The code comes from an explicit
    /// code property, then from the built-in name table, and is otherwise
    /// generated from the name's initials.
    pub fn from_geojson(text: &str) -> TerritoryResult<Self> {
        let doc: Value = serde_json::from_str(text)?;
        let features = doc
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| TerritoryError::Validation("GeoJSON has no features array".into()))?;

        let known = Self::north_america();
        let mut catalog = Self::default();
        for (idx, feature) in features.iter().enumerate() {
            let props = feature.get("properties");
            let Some(name) = first_string(props, NAME_PROPERTIES) else {
                warn!("GeoJSON feature {idx} has no name property; skipping");
                continue;
            };
            let code = first_string(props, CODE_PROPERTIES)
                .map(|c| c.to_uppercase())
                .or_else(|| known.code_for(&name).map(str::to_string))
                .unwrap_or_else(|| generate_code(&name, &catalog));
            catalog.insert(Region {
                code,
                display_name: name,
                geometry: feature.get("geometry").cloned(),
            });
        }
        debug!("Loaded {} regions from GeoJSON", catalog.len());
        Ok(catalog)
    }

    /// Add every region of `other`; codes already present are replaced.
    pub fn merge(&mut self, other: RegionCatalog) {
        for region in other.regions.into_values() {
            self.insert(region);
        }
    }

    fn insert(&mut self, region: Region) {
        self.name_to_code
            .insert(region.display_name.to_lowercase(), region.code.clone());
        self.regions.insert(region.code.clone(), region);
    }

    pub fn get(&self, code: &str) -> Option<&Region> {
        self.regions.get(code)
    }

    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.regions.get(code).map(|r| r.display_name.as_str())
    }

    /// Case-insensitive display-name lookup.
    pub fn code_for(&self, name: &str) -> Option<&str> {
        self.name_to_code
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn is_valid(&self, code: &str) -> bool {
        self.regions.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn first_string(props: Option<&Value>, keys: &[&str]) -> Option<String> {
    let props = props?;
    keys.iter()
        .filter_map(|key| props.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Derive a code from the initials of `name`, padding with the next letters
/// of the name and appending a digit if the code is already taken.
fn generate_code(name: &str, catalog: &RegionCatalog) -> String {
    let letters: Vec<char> = name.chars().filter(|c| c.is_alphabetic()).collect();
    let mut base: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphabetic()))
        .collect();
    if base.chars().count() < 2 {
        base = letters.iter().take(2).collect();
    }
    let base = base.to_uppercase();
    if !catalog.is_valid(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}{n}");
        if !catalog.is_valid(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
