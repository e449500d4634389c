use std::collections::HashSet;

use crate::progress::{Event, Observer};
use crate::record::{CanonicalRow, Dataset};

/// Finalize accumulated rows: normalize the identity key, drop rows without
/// one, then keep only the first row per `reference_code` in fetch order.
///
/// Rows are never dropped for missing non-identity fields.
pub fn clean<O: Observer + ?Sized>(rows: Vec<CanonicalRow>, observer: &mut O) -> Dataset {
    let before = rows.len();
    let rows: Vec<CanonicalRow> = rows
        .into_iter()
        .map(|mut row| {
            row.reference_code = row.reference_code.trim().to_uppercase();
            row
        })
        .filter(|row| !row.reference_code.is_empty())
        .collect();
    observer.observe(&Event::DroppedEmptyReference {
        before,
        after: rows.len(),
    });

    let before = rows.len();
    let mut seen = HashSet::new();
    let rows: Vec<CanonicalRow> = rows
        .into_iter()
        .filter(|row| seen.insert(row.reference_code.clone()))
        .collect();
    observer.observe(&Event::Deduplicated {
        before,
        after: rows.len(),
    });

    Dataset::from_clean_rows(rows)
}
