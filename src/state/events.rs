//! Messages into the grid and events out of it

use anyhow::Result;

use crate::data::row::RowRecord;
use crate::data::window_cache::BatchTicket;

/// Posted by fetch tasks back to the grid that spawned them
#[derive(Debug)]
pub enum GridMessage {
    /// A batch finished, successfully or not
    BatchLoaded {
        ticket: BatchTicket,
        result: Result<Vec<RowRecord>>,
    },
}

/// What changed after the grid applied a message, reported to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
    /// A batch landed in the cache
    RowsLoaded { start_row: usize, count: usize },

    /// The data source ran dry; `total` rows exist under the current sort/filter
    Exhausted { total: usize },

    /// A batch failed; its range stays unfetched
    FetchFailed { start_row: usize, message: String },

    /// A pending End jump resolved and focus moved to the last row
    EndReached { row: usize },
}
