//! Sort and filter state for one grid
//!
//! Owns the single active sort key and the filter text. It only decides
//! *whether* the row set changed; resetting the cache and reloading is the
//! grid's job.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::grid_config::GridConfig;
use crate::data::data_source::{SortDirection, SortKey};
use crate::debouncer::Debouncer;

/// Default quiet period before typed filter text is applied
pub const DEFAULT_FILTER_DEBOUNCE_MS: u64 = 300;

#[derive(Debug)]
pub struct SortFilterController {
    sort: Option<SortKey>,
    /// Text the current cache contents were fetched with
    filter: String,
    /// Latest typed text waiting for the debounce window to close
    pending_filter: Option<String>,
    debouncer: Debouncer,
}

impl Default for SortFilterController {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_DEBOUNCE_MS)
    }
}

impl SortFilterController {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            sort: None,
            filter: String::new(),
            pending_filter: None,
            debouncer: Debouncer::new(debounce_ms),
        }
    }

    pub fn sort(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    /// Sort keys in the shape the data source expects
    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.sort.iter().cloned().collect()
    }

    pub fn direction_for(&self, column: &str) -> Option<SortDirection> {
        self.sort
            .as_ref()
            .filter(|key| key.key == column)
            .map(|key| key.direction)
    }

    /// Filter the cache contents were fetched with
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// What the filter input shows: the typed text if any, else the applied one
    pub fn input_text(&self) -> &str {
        self.pending_filter.as_deref().unwrap_or(&self.filter)
    }

    pub fn has_pending_filter(&self) -> bool {
        self.pending_filter.is_some()
    }

    /// Cycle the sort on `column`: ascending, descending, none. A different
    /// column always starts at ascending. Returns false, changing nothing,
    /// for columns that are not sortable.
    pub fn toggle_sort(&mut self, config: &GridConfig, column: &str) -> bool {
        if !config.is_sortable(column) {
            trace!(target: "grid", "Ignoring sort request on non-sortable column '{}'", column);
            return false;
        }

        self.sort = match self.direction_for(column) {
            None => Some(SortKey::ascending(column)),
            Some(SortDirection::Ascending) => Some(SortKey::descending(column)),
            Some(SortDirection::Descending) => None,
        };
        debug!(target: "grid", "Sort is now {:?}", self.sort);
        true
    }

    /// Drop a sort whose column vanished from the configuration.
    /// Returns true if the sort was cleared.
    pub fn retain_sort_for(&mut self, config: &GridConfig) -> bool {
        match &self.sort {
            Some(key) if !config.is_sortable(&key.key) => {
                self.sort = None;
                true
            }
            _ => false,
        }
    }

    /// Record typed filter text. Each call restarts the debounce window, so
    /// only the last text of a burst is ever applied.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        let text = text.into();
        trace!(target: "filter", "Filter input now '{}'", text);
        self.pending_filter = Some(text);
        self.debouncer.trigger();
    }

    /// Apply the pending filter once its debounce window closed. Returns true
    /// when the applied filter actually changed.
    pub fn poll_filter(&mut self) -> bool {
        if !self.debouncer.should_execute() {
            return false;
        }
        match self.pending_filter.take() {
            Some(text) => self.replace_filter(text),
            None => false,
        }
    }

    /// Apply text immediately, cancelling any pending debounce
    pub fn apply_filter_now(&mut self, text: impl Into<String>) -> bool {
        self.debouncer.reset();
        self.pending_filter = None;
        self.replace_filter(text.into())
    }

    fn replace_filter(&mut self, text: String) -> bool {
        if text == self.filter {
            debug!(target: "filter", "Filter settled on unchanged text '{}'", text);
            return false;
        }
        debug!(target: "filter", "Applying filter '{}'", text);
        self.filter = text;
        true
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn time_until_filter(&self) -> Option<Duration> {
        self.debouncer.time_remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::grid_config::ColumnDescriptor;

    fn config() -> GridConfig {
        GridConfig {
            name: "g".to_string(),
            key_column: "id".to_string(),
            title: "G".to_string(),
            max_visible_rows: 10,
            filterable: true,
            findable: true,
            columns: vec![
                ColumnDescriptor::new("id", "ID", true),
                ColumnDescriptor::new("name", "Name", true),
                ColumnDescriptor::new("value", "Value", false),
            ],
        }
    }

    #[test]
    fn test_sort_cycle() {
        let config = config();
        let mut controller = SortFilterController::default();

        assert!(controller.toggle_sort(&config, "name"));
        assert_eq!(controller.sort(), Some(&SortKey::ascending("name")));
        assert!(controller.toggle_sort(&config, "name"));
        assert_eq!(controller.sort(), Some(&SortKey::descending("name")));
        assert!(controller.toggle_sort(&config, "name"));
        assert_eq!(controller.sort(), None);
        assert!(controller.sort_keys().is_empty());
    }

    #[test]
    fn test_other_column_starts_ascending() {
        let config = config();
        let mut controller = SortFilterController::default();
        controller.toggle_sort(&config, "name");
        controller.toggle_sort(&config, "name");

        controller.toggle_sort(&config, "id");
        assert_eq!(controller.sort(), Some(&SortKey::ascending("id")));
        assert_eq!(controller.direction_for("name"), None);
    }

    #[test]
    fn test_non_sortable_is_noop() {
        let config = config();
        let mut controller = SortFilterController::default();
        controller.toggle_sort(&config, "name");

        assert!(!controller.toggle_sort(&config, "value"));
        assert_eq!(controller.sort(), Some(&SortKey::ascending("name")));
    }

    #[test]
    fn test_retain_sort_drops_vanished_column() {
        let mut config = config();
        let mut controller = SortFilterController::default();
        controller.toggle_sort(&config, "name");

        config.columns.retain(|c| c.name != "name");
        assert!(controller.retain_sort_for(&config));
        assert_eq!(controller.sort(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_burst_collapses_to_final_text() {
        let mut controller = SortFilterController::new(300);
        for text in ["I", "It", "Ite", "Item"] {
            controller.set_filter(text);
            tokio::time::advance(Duration::from_millis(50)).await;
            assert!(!controller.poll_filter());
        }
        assert_eq!(controller.input_text(), "Item");
        assert_eq!(controller.filter(), "");

        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(controller.poll_filter());
        assert_eq!(controller.filter(), "Item");
        assert!(!controller.has_pending_filter());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_filter_does_not_reload() {
        let mut controller = SortFilterController::new(10);
        controller.set_filter("x");
        controller.set_filter("");
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(!controller.poll_filter());
    }

    #[tokio::test]
    async fn test_apply_now_skips_debounce() {
        let mut controller = SortFilterController::new(1000);
        controller.set_filter("abc");
        assert!(controller.apply_filter_now("abc"));
        assert_eq!(controller.filter(), "abc");
        assert_eq!(controller.next_deadline(), None);
    }
}
