//! In-memory record table shared by every backend.
//!
//! The [`RecordIndex`] owns records in insertion order and maintains two
//! secondary indexes of positions into that table:
//!
//! - `current -> desired -> [positions]`, serving `find_by` / `find_one_by`
//! - `desired -> [positions]`, serving `find_by_desired`
//!
//! Position lists are appended to on every push, so they are always sorted by
//! insertion order and the first entry is the earliest record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use swap_types::SwapRequest;

/// Insertion-ordered record table with pair and desired-section indexes.
#[derive(Debug, Default)]
pub struct RecordIndex {
    records: Vec<SwapRequest>,
    by_pair: HashMap<String, HashMap<String, Vec<usize>>>,
    by_desired: HashMap<String, Vec<usize>>,
    newest: Option<DateTime<Utc>>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no record has been pushed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Creation time for the next record.
    ///
    /// Returns `now` unless the wall clock has stepped back behind the newest
    /// record, in which case the newest record's time is reused so that
    /// `createdAt` stays non-decreasing in insertion order.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.newest {
            Some(newest) if now < newest => newest,
            _ => now,
        }
    }

    /// Append a record and index it.
    pub fn push(&mut self, record: SwapRequest) {
        let pos = self.records.len();
        let (current, desired) = record.pair();
        self.by_pair
            .entry(current.to_owned())
            .or_default()
            .entry(desired.to_owned())
            .or_default()
            .push(pos);
        self.by_desired
            .entry(desired.to_owned())
            .or_default()
            .push(pos);
        self.newest = Some(match self.newest {
            Some(newest) if newest > record.created_at => newest,
            _ => record.created_at,
        });
        self.records.push(record);
    }

    /// All records, insertion order.
    pub fn records(&self) -> &[SwapRequest] {
        &self.records
    }

    /// All records by `createdAt` descending, latest insertion first on ties.
    pub fn newest_first(&self) -> Vec<SwapRequest> {
        let mut out: Vec<SwapRequest> = self.records.iter().rev().cloned().collect();
        // Stable: equal timestamps keep the reversed insertion order.
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Records holding `current` and wanting `desired`, insertion order.
    pub fn find_by(&self, current: &str, desired: &str) -> Vec<SwapRequest> {
        self.collect(self.pair_positions(current, desired))
    }

    /// Earliest record holding `current` and wanting `desired`.
    pub fn find_one_by(&self, current: &str, desired: &str) -> Option<SwapRequest> {
        self.pair_positions(current, desired)
            .first()
            .map(|&pos| self.records[pos].clone())
    }

    /// Records wanting `desired`, insertion order.
    pub fn find_by_desired(&self, desired: &str) -> Vec<SwapRequest> {
        let positions = self
            .by_desired
            .get(desired)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        self.collect(positions)
    }

    fn pair_positions(&self, current: &str, desired: &str) -> &[usize] {
        self.by_pair
            .get(current)
            .and_then(|wants| wants.get(desired))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn collect(&self, positions: &[usize]) -> Vec<SwapRequest> {
        positions
            .iter()
            .map(|&pos| self.records[pos].clone())
            .collect()
    }
}
