//! Shared typed models used across the registry, store, and exchange layers.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Persistence keys
// ---------------------------------------------------------------------------

/// Key holding the representative roster overrides.
pub const REPRESENTATIVES_KEY: &str = "representatives";

/// Key holding the live assignment map.
pub const ASSIGNMENTS_KEY: &str = "assignments";

/// Key holding the side-panel width in pixels.
pub const PANEL_WIDTH_KEY: &str = "panel_width";

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current UTC time truncated to millisecond precision.
///
/// Timestamps are written with millisecond precision, so truncating at the
/// source keeps a value identical after an export/import round trip.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Format a timestamp as ISO-8601 with milliseconds and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 / ISO-8601 timestamp into UTC, truncated to the
/// millisecond precision timestamps are written with.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(3))
}

/// Serde adapter storing `DateTime<Utc>` as an ISO-8601 millisecond string.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(de)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// The fact that one region is owned by one representative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub rep_name: String,
    #[serde(with = "iso_millis")]
    pub assigned_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(rep_name: impl Into<String>, assigned_at: DateTime<Utc>) -> Self {
        Self {
            rep_name: rep_name.into(),
            assigned_at,
        }
    }
}

/// Region code -> assignment. Absence of a code means "unassigned".
///
/// Ordered so that snapshots compare and serialize deterministically.
pub type AssignmentMap = BTreeMap<String, Assignment>;

/// Codes currently owned by `rep_name`, in code order.
pub fn owned_by<'a>(map: &'a AssignmentMap, rep_name: &str) -> Vec<&'a str> {
    map.iter()
        .filter(|(_, a)| a.rep_name == rep_name)
        .map(|(code, _)| code.as_str())
        .collect()
}

/// Number of regions owned by `rep_name`.
pub fn count_owned(map: &AssignmentMap, rep_name: &str) -> usize {
    map.values().filter(|a| a.rep_name == rep_name).count()
}

// ---------------------------------------------------------------------------
// Representative
// ---------------------------------------------------------------------------

/// Stable representative identifier, assigned once at creation.
pub type RepId = u32;

/// A salesperson who can own zero or more regions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Representative {
    pub id: RepId,
    pub name: String,
    pub color: String,
    pub territory_name: Option<String>,
}

impl Representative {
    pub fn new(id: RepId, name: &str, color: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: color.to_string(),
            territory_name: None,
        }
    }
}

/// Persisted shape of a representative (the id is the map key).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRepresentative {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub territory_name: Option<String>,
}

impl From<&Representative> for StoredRepresentative {
    fn from(rep: &Representative) -> Self {
        Self {
            name: rep.name.clone(),
            color: rep.color.clone(),
            territory_name: rep.territory_name.clone(),
        }
    }
}
