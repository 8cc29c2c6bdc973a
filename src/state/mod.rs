//! Grid state
//!
//! `Grid` owns every piece of per-instance state; the sort/filter controller
//! and the message types live next to it.

pub mod events;
pub mod grid;
pub mod sort_filter;

pub use events::{GridEvent, GridMessage};
pub use grid::Grid;
