//! Position-keyed row cache for one grid instance
//!
//! Rows live here by absolute position under the current sort/filter only.
//! The cache never talks to the data source itself: `plan_range` hands out
//! tickets for the batches that must be fetched, and the owner feeds results
//! back through `complete`/`fail`. Every ticket carries the epoch it was
//! issued in, so anything that lands after a `reset` is dropped.

use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, trace};

use crate::data::row::RowRecord;

/// Rows requested per data source call
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Distinct batches allowed in flight at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// One planned data source call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTicket {
    pub epoch: u64,
    pub start_row: usize,
    pub num_rows: usize,
}

impl BatchTicket {
    pub fn range(&self) -> Range<usize> {
        self.start_row..self.start_row.saturating_add(self.num_rows)
    }
}

/// What happened to a completed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Applied { rows: usize, exhausted: bool },
    /// Issued before the last reset; nothing was written
    Stale,
}

#[derive(Debug)]
pub struct WindowCache {
    rows: BTreeMap<usize, RowRecord>,
    /// start -> end (exclusive) of every batch awaiting a response
    in_flight: BTreeMap<usize, usize>,
    epoch: u64,
    /// Set once a batch came back short; nothing at or past it exists
    known_end: Option<usize>,
    /// First position not covered by the contiguous run starting at 0
    contiguous_end: usize,
    batch_size: usize,
    max_in_flight: usize,
}

impl Default for WindowCache {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_MAX_IN_FLIGHT)
    }
}

impl WindowCache {
    pub fn new(batch_size: usize, max_in_flight: usize) -> Self {
        Self {
            rows: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            epoch: 0,
            known_end: None,
            contiguous_end: 0,
            batch_size: batch_size.max(1),
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn get(&self, position: usize) -> Option<&RowRecord> {
        self.rows.get(&position)
    }

    pub fn contains(&self, position: usize) -> bool {
        self.rows.contains_key(&position)
    }

    /// Rows resident across every fetched batch
    pub fn rows_loaded(&self) -> usize {
        self.rows.len()
    }

    /// One past the highest resident position. Gaps left by failed batches
    /// count; they render as pending rows and get retried.
    pub fn extent(&self) -> usize {
        self.rows
            .last_key_value()
            .map(|(position, _)| position + 1)
            .unwrap_or(0)
    }

    pub fn contiguous_end(&self) -> usize {
        self.contiguous_end
    }

    pub fn is_exhausted(&self) -> bool {
        self.known_end.is_some()
    }

    /// Total row count, known only once the data source ran dry
    pub fn known_total(&self) -> Option<usize> {
        self.known_end
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Iterate resident rows in position order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RowRecord)> {
        self.rows.iter().map(|(position, row)| (*position, row))
    }

    /// Drop everything and start a new epoch. Responses to tickets issued
    /// before this call will be discarded on arrival.
    pub fn reset(&mut self) -> u64 {
        self.rows.clear();
        self.in_flight.clear();
        self.known_end = None;
        self.contiguous_end = 0;
        self.epoch += 1;
        debug!(target: "cache", "Cache reset, now at epoch {}", self.epoch);
        self.epoch
    }

    /// Plan the fetches needed so that `[start, start + count)` becomes
    /// resident. Each ticket starts at the first position that is neither
    /// resident nor in flight and asks for a full batch, cut short where
    /// resident rows or another in-flight batch begin. Positions it covers
    /// are skipped, so overlapping calls share one in-flight batch.
    pub fn plan_range(&mut self, start: usize, count: usize) -> Vec<BatchTicket> {
        let mut end = start.saturating_add(count);
        if let Some(known_end) = self.known_end {
            end = end.min(known_end);
        }

        let mut tickets = Vec::new();
        let mut position = start;
        while position < end {
            if self.rows.contains_key(&position) {
                position += 1;
                continue;
            }
            if let Some(flight_end) = self.in_flight_covering(position) {
                position = flight_end;
                continue;
            }
            if self.in_flight.len() >= self.max_in_flight {
                trace!(target: "cache", "In-flight bound {} reached, deferring position {}",
                    self.max_in_flight, position);
                break;
            }

            let batch_end = position
                .saturating_add(self.batch_size)
                .min(self.next_covered_after(position));
            let ticket = BatchTicket {
                epoch: self.epoch,
                start_row: position,
                num_rows: batch_end - position,
            };
            self.in_flight.insert(position, batch_end);
            tickets.push(ticket);
            position = batch_end;
        }

        if !tickets.is_empty() {
            debug!(target: "cache", "Planned {} batch(es) for {}..{} at epoch {}",
                tickets.len(), start, start.saturating_add(count), self.epoch);
        }
        tickets
    }

    /// First position after `position` that is resident or where an
    /// in-flight batch starts; a new batch stops there
    fn next_covered_after(&self, position: usize) -> usize {
        let next_row = self
            .rows
            .range(position.saturating_add(1)..)
            .next()
            .map(|(&start, _)| start);
        let next_flight = self
            .in_flight
            .range(position.saturating_add(1)..)
            .next()
            .map(|(&start, _)| start);
        next_row
            .into_iter()
            .chain(next_flight)
            .min()
            .unwrap_or(usize::MAX)
    }

    fn in_flight_covering(&self, position: usize) -> Option<usize> {
        self.in_flight
            .range(..=position)
            .filter(|(_, &end)| end > position)
            .map(|(_, &end)| end)
            .max()
    }

    /// Apply a fetched batch if it belongs to the current epoch
    pub fn complete(&mut self, ticket: BatchTicket, rows: Vec<RowRecord>) -> BatchOutcome {
        if ticket.epoch != self.epoch {
            debug!(target: "cache", "Dropping stale batch at {} (epoch {} != {})",
                ticket.start_row, ticket.epoch, self.epoch);
            return BatchOutcome::Stale;
        }

        self.in_flight.remove(&ticket.start_row);

        let mut rows = rows;
        rows.truncate(ticket.num_rows);
        if let Some(known_end) = self.known_end {
            rows.truncate(known_end.saturating_sub(ticket.start_row));
        }

        let received = rows.len();
        for (offset, row) in rows.into_iter().enumerate() {
            self.rows.insert(ticket.start_row + offset, row);
        }

        if received < ticket.num_rows {
            let end = ticket.start_row + received;
            let known_end = self.known_end.map_or(end, |known| known.min(end));
            self.known_end = Some(known_end);
            // A short batch is authoritative about the end of data
            let _beyond_end = self.rows.split_off(&known_end);
            self.in_flight.retain(|&start, _| start < known_end);
            debug!(target: "cache", "Data source exhausted at {} rows", known_end);
        }

        while self.rows.contains_key(&self.contiguous_end) {
            self.contiguous_end += 1;
        }

        BatchOutcome::Applied {
            rows: received,
            exhausted: self.is_exhausted(),
        }
    }

    /// Release a failed batch without marking anything fetched, so the next
    /// pass over the range plans it again. Returns false for stale tickets.
    pub fn fail(&mut self, ticket: BatchTicket) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        self.in_flight.remove(&ticket.start_row);
        true
    }
}
