//! Per-representative ownership reconciliation.
//!
//! `sync_ownership` makes a representative own exactly a desired set of
//! regions. It is not a union: regions the representative held that are no
//! longer desired are released, and desired regions held by someone else are
//! taken over (last writer wins).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::models::{Assignment, AssignmentMap};

/// A desired region currently owned by a different representative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub code: String,
    pub current_owner: String,
}

/// Return `map` with `owned(rep_name) == desired`.
///
/// Every desired code is re-stamped with `now`, including codes the
/// representative already owned.
pub fn sync_ownership<S: AsRef<str>>(
    map: &AssignmentMap,
    rep_name: &str,
    desired: &[S],
    now: DateTime<Utc>,
) -> AssignmentMap {
    let desired: BTreeSet<&str> = desired.iter().map(|c| c.as_ref()).collect();

    let mut next: AssignmentMap = map
        .iter()
        .filter(|(code, a)| a.rep_name != rep_name || desired.contains(code.as_str()))
        .map(|(code, a)| (code.clone(), a.clone()))
        .collect();

    for code in desired {
        next.insert(code.to_string(), Assignment::new(rep_name, now));
    }
    next
}

/// Desired codes that `sync_ownership` would take from other representatives.
pub fn conflicts<S: AsRef<str>>(map: &AssignmentMap, rep_name: &str, desired: &[S]) -> Vec<Conflict> {
    let desired: BTreeSet<&str> = desired.iter().map(|c| c.as_ref()).collect();
    desired
        .into_iter()
        .filter_map(|code| {
            map.get(code)
                .filter(|a| a.rep_name != rep_name)
                .map(|a| Conflict {
                    code: code.to_string(),
                    current_owner: a.rep_name.clone(),
                })
        })
        .collect()
}
