//! CSV export of the assignment map.

use std::borrow::Cow;

use crate::models::{format_timestamp, AssignmentMap, Representative};
use crate::regions::RegionCatalog;

pub const CSV_HEADER: [&str; 5] = [
    "State Code",
    "State Name",
    "Rep Name",
    "Territory Name",
    "Assigned At",
];

/// Quote a field if it contains a comma, quote, or line break, doubling any
/// embedded quotes.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let line = fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

/// One row per assignment, sorted by region code. Unknown region codes get
/// an empty name; territory labels come from the owning representative.
pub fn export_csv(assignments: &AssignmentMap, catalog: &RegionCatalog, reps: &[Representative]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER);
    for (code, assignment) in assignments {
        let name = catalog.name_for(code).unwrap_or("");
        let territory = reps
            .iter()
            .find(|r| r.name == assignment.rep_name)
            .and_then(|r| r.territory_name.as_deref())
            .unwrap_or("");
        let assigned_at = format_timestamp(&assignment.assigned_at);
        push_row(
            &mut out,
            [code.as_str(), name, assignment.rep_name.as_str(), territory, assigned_at.as_str()],
        );
    }
    out
}
