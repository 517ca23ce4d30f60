//! Per-region fill colours and legend for the image compositor.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{count_owned, AssignmentMap, Representative};
use crate::regions::RegionCatalog;

/// Fill for unassigned regions, and for regions whose owner is not on the
/// roster.
pub const DEFAULT_FILL: &str = "#d1d5db";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub name: String,
    pub color: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillSnapshot {
    pub fills: Vec<(String, String)>,
    pub legend: Vec<LegendEntry>,
    pub default_fill: String,
}

/// Colour of the representative owning `code`.
pub fn region_color<'a>(code: &str, assignments: &AssignmentMap, reps: &'a [Representative]) -> Option<&'a str> {
    let owner = &assignments.get(code)?.rep_name;
    reps.iter()
        .find(|r| &r.name == owner)
        .map(|r| r.color.as_str())
}

/// Fill for every catalog region plus any assigned code the catalog does not
/// know. Legend follows roster order and omits representatives with nothing
/// assigned.
pub fn fill_snapshot(assignments: &AssignmentMap, reps: &[Representative], catalog: &RegionCatalog) -> FillSnapshot {
    let mut seen = BTreeSet::new();
    let codes = catalog
        .codes()
        .chain(assignments.keys().map(String::as_str))
        .filter(|code| seen.insert(*code))
        .collect::<Vec<_>>();

    let fills = codes
        .into_iter()
        .map(|code| {
            let color = region_color(code, assignments, reps).unwrap_or(DEFAULT_FILL);
            (code.to_string(), color.to_string())
        })
        .collect();

    let legend = reps
        .iter()
        .map(|rep| LegendEntry {
            name: rep.name.clone(),
            color: rep.color.clone(),
            count: count_owned(assignments, &rep.name),
        })
        .filter(|entry| entry.count > 0)
        .collect();

    FillSnapshot {
        fills,
        legend,
        default_fill: DEFAULT_FILL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{now_utc, Assignment};
    use crate::regions::Region;

    fn reps() -> Vec<Representative> {
        vec![
            Representative::new(1, "Alice", "#ff0000"),
            Representative::new(2, "Bob", "#00ff00"),
            Representative::new(3, "Carol", "#0000ff"),
        ]
    }

    fn catalog() -> RegionCatalog {
        RegionCatalog::from_regions(["CA", "TX", "NY"].map(|code| Region {
            code: code.to_string(),
            display_name: code.to_string(),
            geometry: None,
        }))
    }

    #[test]
    fn region_color_follows_owner() {
        let mut map = AssignmentMap::new();
        map.insert("CA".into(), Assignment::new("Bob", now_utc()));
        map.insert("TX".into(), Assignment::new("Nobody", now_utc()));
        let reps = reps();
        assert_eq!(region_color("CA", &map, &reps), Some("#00ff00"));
        assert_eq!(region_color("TX", &map, &reps), None);
        assert_eq!(region_color("NY", &map, &reps), None);
    }

    #[test]
    fn snapshot_covers_catalog_and_stray_codes() {
        let mut map = AssignmentMap::new();
        map.insert("CA".into(), Assignment::new("Alice", now_utc()));
        map.insert("TX".into(), Assignment::new("Alice", now_utc()));
        map.insert("ZZ".into(), Assignment::new("Carol", now_utc()));

        let snap = fill_snapshot(&map, &reps(), &catalog());
        assert_eq!(
            snap.fills,
            vec![
                ("CA".to_string(), "#ff0000".to_string()),
                ("TX".to_string(), "#ff0000".to_string()),
                ("NY".to_string(), DEFAULT_FILL.to_string()),
                ("ZZ".to_string(), "#0000ff".to_string()),
            ]
        );
        assert_eq!(
            snap.legend,
            vec![
                LegendEntry { name: "Alice".into(), color: "#ff0000".into(), count: 2 },
                LegendEntry { name: "Carol".into(), color: "#0000ff".into(), count: 1 },
            ]
        );
        assert_eq!(snap.default_fill, "#d1d5db");
    }
}
