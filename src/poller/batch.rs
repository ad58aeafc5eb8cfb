//! Cursor advancement and batch assembly.

use crate::types::{ConvoId, LogEntry, Revision};

/// Move `cursor` forward to `rev` if it is newer.
///
/// An unset cursor is seeded with `rev`; seeding does not count as an
/// advance. Returns true only when an existing cursor moved forward.
pub fn advance_cursor(cursor: &mut Option<Revision>, rev: &Revision) -> bool {
    match cursor {
        None => {
            *cursor = Some(rev.clone());
            false
        }
        Some(current) if rev > current => {
            *current = rev.clone();
            true
        }
        Some(_) => false,
    }
}

/// Walk a page of log entries in order and keep the ones that advanced the
/// cursor. Entries without a revision are dropped.
pub fn collect_batch(cursor: &mut Option<Revision>, entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries
        .into_iter()
        .filter(|entry| match &entry.rev {
            Some(rev) => advance_cursor(cursor, rev),
            None => false,
        })
        .collect()
}

/// Entries of `batch` that belong to `convo_id`.
pub fn filter_convo(batch: &[LogEntry], convo_id: &ConvoId) -> Vec<LogEntry> {
    batch
        .iter()
        .filter(|entry| entry.is_for(convo_id))
        .cloned()
        .collect()
}
