//! A virtualized, server-paginated data grid
//!
//! `state::grid::Grid` is the headless engine: it pages rows out of any
//! [`data::DataSource`] in fixed-size batches, keeps them in a
//! position-keyed window cache and discards responses that arrive after a
//! sort, filter or configuration change. The `ui` module renders a grid with
//! ratatui and hosts it in a terminal.

pub mod config;
pub mod data;
pub mod debouncer;
pub mod handlers;
pub mod state;
pub mod ui;
pub mod utils;
