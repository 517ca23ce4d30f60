//! JSON export envelope and import decoding.
//!
//! Export always writes the current envelope shape. Import accepts two
//! top-level shapes:
//!
//! * **Envelope**: an object carrying both `version` and an `assignments`
//!   object. Version 1 files attached `territoryName` to each assignment;
//!   those labels are collected so the caller can move them onto
//!   representatives.
//! * **Bare**: the assignment map itself, `{ [code]: {repName, assignedAt} }`.
//!
//! Entries are validated one by one; bad entries are returned separately
//! instead of failing the whole file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{TerritoryError, TerritoryResult};
use crate::models::{count_owned, format_timestamp, parse_timestamp, Assignment, AssignmentMap, Representative};
use crate::regions::RegionCatalog;

/// Envelope version written by `export_json`.
pub const EXPORT_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub territory_name: Option<String>,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub total_states: usize,
    pub total_assigned: usize,
    pub rep_summary: Vec<RepSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub version: String,
    pub exported_at: String,
    pub assignments: AssignmentMap,
    pub metadata: ExportMetadata,
}

/// Snapshot `assignments` into an envelope. `rep_summary` follows roster
/// order and skips representatives with no regions.
pub fn build_envelope(
    assignments: &AssignmentMap,
    reps: &[Representative],
    total_states: usize,
    exported_at: DateTime<Utc>,
) -> ExportEnvelope {
    let rep_summary = reps
        .iter()
        .map(|rep| RepSummary {
            name: rep.name.clone(),
            territory_name: rep.territory_name.clone(),
            count: count_owned(assignments, &rep.name),
        })
        .filter(|summary| summary.count > 0)
        .collect();

    ExportEnvelope {
        version: EXPORT_VERSION.to_string(),
        exported_at: format_timestamp(&exported_at),
        assignments: assignments.clone(),
        metadata: ExportMetadata {
            total_states,
            total_assigned: assignments.len(),
            rep_summary,
        },
    }
}

/// Pretty-printed JSON for an export file.
pub fn export_json(envelope: &ExportEnvelope) -> TerritoryResult<String> {
    Ok(serde_json::to_string_pretty(envelope)?)
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Which top-level shape an import file used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportShape {
    Envelope { version: String },
    Bare,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RejectReason {
    BlankCode,
    NotAnObject,
    MissingRepName,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RejectedEntry {
    pub code: String,
    pub raw: Value,
    pub reason: RejectReason,
}

/// A territory label found on a legacy assignment entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTerritory {
    pub rep_name: String,
    pub territory_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportOutcome {
    pub shape: ImportShape,
    pub accepted: Vec<(String, Assignment)>,
    pub rejected: Vec<RejectedEntry>,
    /// First legacy label seen per representative.
    pub legacy_territories: Vec<LegacyTerritory>,
}

impl ImportOutcome {
    pub fn to_map(&self) -> AssignmentMap {
        self.accepted.iter().cloned().collect()
    }
}

/// Decode and validate an import file.
///
/// Codes are taken verbatim, so anything the store held survives a round
/// trip; `catalog`, when given, only flags codes it does not know in the log.
/// Entries without a usable `assignedAt` are stamped with `now`. Fails only
/// when the text is not a JSON object, or when it has entries and none of
/// them are usable.
pub fn decode_import(
    text: &str,
    catalog: Option<&RegionCatalog>,
    now: DateTime<Utc>,
) -> TerritoryResult<ImportOutcome> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| TerritoryError::Import(format!("file is not valid JSON: {e}")))?;
    let Value::Object(root) = doc else {
        return Err(TerritoryError::Import("expected a JSON object at the top level".into()));
    };

    let (shape, entries) = split_shape(root);
    let mut outcome = ImportOutcome {
        shape,
        accepted: Vec::new(),
        rejected: Vec::new(),
        legacy_territories: Vec::new(),
    };

    for (code, raw) in entries {
        match validate_entry(&code, &raw, now) {
            Ok((assignment, territory)) => {
                if let Some(territory_name) = territory {
                    let seen = outcome
                        .legacy_territories
                        .iter()
                        .any(|t| t.rep_name == assignment.rep_name);
                    if !seen {
                        outcome.legacy_territories.push(LegacyTerritory {
                            rep_name: assignment.rep_name.clone(),
                            territory_name,
                        });
                    }
                }
                if catalog.is_some_and(|c| !c.is_valid(&code)) {
                    debug!("Imported code {code:?} is not in the region catalog");
                }
                outcome.accepted.push((code, assignment));
            }
            Err(reason) => {
                debug!("Rejected import entry {code:?}: {reason:?}");
                outcome.rejected.push(RejectedEntry {
                    code,
                    raw,
                    reason,
                });
            }
        }
    }

    outcome.accepted.sort_by(|a, b| a.0.cmp(&b.0));

    if outcome.accepted.is_empty() && !outcome.rejected.is_empty() {
        return Err(TerritoryError::Import(format!(
            "no valid assignments found ({} entries rejected)",
            outcome.rejected.len()
        )));
    }
    if !outcome.rejected.is_empty() {
        warn!(
            "Import accepted {} entries and rejected {}",
            outcome.accepted.len(),
            outcome.rejected.len()
        );
    }
    Ok(outcome)
}

fn split_shape(mut root: Map<String, Value>) -> (ImportShape, Map<String, Value>) {
    let version = root.get("version").and_then(version_string);
    let is_envelope = version.is_some() && root.get("assignments").is_some_and(Value::is_object);
    if is_envelope {
        if let (Some(version), Some(Value::Object(entries))) = (version, root.remove("assignments")) {
            return (ImportShape::Envelope { version }, entries);
        }
    }
    (ImportShape::Bare, root)
}

fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn validate_entry(
    code: &str,
    raw: &Value,
    now: DateTime<Utc>,
) -> Result<(Assignment, Option<String>), RejectReason> {
    if code.is_empty() {
        return Err(RejectReason::BlankCode);
    }
    let entry = raw.as_object().ok_or(RejectReason::NotAnObject)?;
    let rep_name = entry
        .get("repName")
        .and_then(Value::as_str)
        .ok_or(RejectReason::MissingRepName)?;
    let assigned_at = entry
        .get("assignedAt")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(now);
    let territory = entry
        .get("territoryName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Ok((Assignment::new(rep_name, assigned_at), territory))
}
