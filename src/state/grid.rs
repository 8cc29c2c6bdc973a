//! The grid engine
//!
//! A `Grid` owns everything one mounted grid needs: the window cache, the
//! sort/filter controller, the viewport and the channel fetch tasks report
//! back on. It is driven from a single task; fetches run concurrently on
//! tokio and every completion comes back through `handle_message`, the only
//! place the cache is written.

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use crate::config::config::GridSettings;
use crate::config::grid_config::GridConfig;
use crate::data::data_source::{DataSource, SortKey};
use crate::data::fetch_gateway::FetchGateway;
use crate::data::row::RowRecord;
use crate::data::window_cache::{BatchOutcome, BatchTicket, WindowCache};
use crate::state::events::{GridEvent, GridMessage};
use crate::state::sort_filter::SortFilterController;
use crate::ui::actions::NavigateAction;
use crate::ui::viewport::Viewport;

pub struct Grid {
    config: GridConfig,
    gateway: FetchGateway,
    cache: WindowCache,
    sort_filter: SortFilterController,
    viewport: Viewport,
    /// Column the header sort key acts on
    selected_column: usize,
    tx: UnboundedSender<GridMessage>,
    rx: UnboundedReceiver<GridMessage>,
    mounted: bool,
    /// End was pressed before the data source ran dry
    pending_end: bool,
    status: Option<String>,
}

impl Grid {
    pub fn new(
        source: Arc<dyn DataSource>,
        config: GridConfig,
        settings: &GridSettings,
    ) -> Result<Self> {
        config.validate()?;
        settings.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            gateway: FetchGateway::new(source, &config),
            cache: WindowCache::new(settings.batch_size, settings.max_in_flight_batches),
            sort_filter: SortFilterController::new(settings.filter_debounce_ms),
            viewport: Viewport::new(config.max_visible_rows, settings.overscan),
            config,
            selected_column: 0,
            tx,
            rx,
            mounted: false,
            pending_end: false,
            status: None,
        })
    }

    pub fn with_defaults(source: Arc<dyn DataSource>, config: GridConfig) -> Result<Self> {
        Self::new(source, config, &GridSettings::default())
    }

    // ---- lifecycle ----

    /// Start loading from row 0. Must be called inside a tokio runtime.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        info!(target: "grid", "Mounting grid '{}' ({} columns)",
            self.config.name, self.config.columns.len());
        self.load_from_start();
    }

    /// Stop accepting results. Fetches still running complete into the void.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.pending_end = false;
        self.cache.reset();
        self.viewport.reset();
        info!(target: "grid", "Unmounted grid '{}'", self.config.name);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Swap in a new configuration. This is a full re-initialization: new
    /// column keys, a sort on a vanished column is dropped, and everything
    /// reloads under a new epoch.
    pub fn reconfigure(&mut self, config: GridConfig) -> Result<()> {
        config.validate()?;
        self.gateway.reconfigure(&config);
        self.config = config;
        if self.sort_filter.retain_sort_for(&self.config) {
            debug!(target: "grid", "Sort column no longer configured, sort cleared");
        }
        self.selected_column = self
            .selected_column
            .min(self.config.columns.len().saturating_sub(1));
        self.reset_and_reload("reconfigure");
        Ok(())
    }

    /// Throw away every loaded row and fetch again from the top
    pub fn reload(&mut self) {
        self.reset_and_reload("refresh");
    }

    fn reset_and_reload(&mut self, reason: &str) {
        let epoch = self.cache.reset();
        self.viewport.reset();
        self.pending_end = false;
        self.status = None;
        debug!(target: "grid", "Reset to epoch {} ({})", epoch, reason);
        if self.mounted {
            self.load_from_start();
        }
    }

    fn load_from_start(&mut self) {
        let batch_size = self.cache.batch_size();
        self.ensure_range(0, batch_size);
        self.sync_viewport();
    }

    // ---- fetching ----

    /// Make `[start, start + count)` resident, spawning a fetch task per
    /// planned batch. Returns how many batches were started.
    pub fn ensure_range(&mut self, start: usize, count: usize) -> usize {
        if !self.mounted {
            return 0;
        }
        let tickets = self.cache.plan_range(start, count);
        for ticket in &tickets {
            self.spawn_fetch(*ticket);
        }
        tickets.len()
    }

    fn spawn_fetch(&self, ticket: BatchTicket) {
        let request = self.gateway.request(
            ticket.start_row,
            ticket.num_rows,
            self.sort_filter.sort(),
            self.sort_filter.filter(),
        );
        let fetch = self.gateway.fetch(request);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let result = fetch.await;
            if tx.send(GridMessage::BatchLoaded { ticket, result }).is_err() {
                trace!(target: "grid", "Grid dropped before batch at {} completed", ticket.start_row);
            }
        });
    }

    /// Ensure the rows the viewport needs
    fn sync_viewport(&mut self) {
        let (start, count) = self.viewport.resident_range();
        self.ensure_range(start, count);
    }

    /// Apply one fetch completion. Anything from an older epoch, or arriving
    /// after unmount, is dropped without touching state.
    pub fn handle_message(&mut self, message: GridMessage) -> Vec<GridEvent> {
        let GridMessage::BatchLoaded { ticket, result } = message;

        if !self.mounted {
            debug!(target: "grid", "Dropping batch at {}: grid is unmounted", ticket.start_row);
            return Vec::new();
        }
        if ticket.epoch != self.cache.epoch() {
            debug!(target: "grid", "Dropping stale batch at {} (epoch {}, current {})",
                ticket.start_row, ticket.epoch, self.cache.epoch());
            return Vec::new();
        }

        let mut events = Vec::new();
        match result {
            Ok(rows) => {
                let was_exhausted = self.cache.is_exhausted();
                if let BatchOutcome::Applied { rows, exhausted } = self.cache.complete(ticket, rows)
                {
                    self.status = None;
                    events.push(GridEvent::RowsLoaded {
                        start_row: ticket.start_row,
                        count: rows,
                    });
                    if exhausted && !was_exhausted {
                        let total = self.cache.extent();
                        info!(target: "grid", "Data source exhausted, {} rows in total", total);
                        events.push(GridEvent::Exhausted { total });
                    }

                    self.viewport.clamp(self.cache.extent());
                    if self.pending_end {
                        if let Some(row) = self.continue_end_sweep() {
                            events.push(GridEvent::EndReached { row });
                        }
                    }
                    self.sync_viewport();
                }
            }
            Err(err) => {
                self.cache.fail(ticket);
                self.pending_end = false;
                let message = format!("{:#}", err);
                error!(target: "grid", "Fetch of rows {}..{} failed: {}",
                    ticket.start_row, ticket.range().end, message);
                self.status = Some(format!(
                    "Failed to load rows from {}: {}",
                    ticket.start_row, message
                ));
                events.push(GridEvent::FetchFailed {
                    start_row: ticket.start_row,
                    message,
                });
            }
        }
        events
    }

    /// Run due timers and apply every completion already queued
    pub fn tick(&mut self) -> Vec<GridEvent> {
        if self.sort_filter.poll_filter() {
            self.reset_and_reload("filter");
        }

        let mut events = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            events.extend(self.handle_message(message));
        }
        events
    }

    /// When the next `tick` has timed work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sort_filter.next_deadline()
    }

    /// Wait for one fetch completion and apply it
    pub async fn process_next(&mut self) -> Vec<GridEvent> {
        match self.rx.recv().await {
            Some(message) => self.handle_message(message),
            None => Vec::new(),
        }
    }

    /// Nothing in flight and no filter waiting on its debounce
    pub fn is_idle(&self) -> bool {
        !self.cache.has_in_flight() && !self.sort_filter.has_pending_filter()
    }

    /// Drive fetches and the filter debounce until the grid is idle
    pub async fn settle(&mut self) -> Vec<GridEvent> {
        let mut events = self.tick();
        while !self.is_idle() {
            let message = match self.next_deadline() {
                Some(deadline) => tokio::select! {
                    message = self.rx.recv() => message,
                    _ = tokio::time::sleep_until(deadline) => None,
                },
                None => self.rx.recv().await,
            };
            if let Some(message) = message {
                events.extend(self.handle_message(message));
            }
            events.extend(self.tick());
        }
        events
    }

    // ---- sort & filter ----

    /// Cycle the sort on `column`. Returns false for non-sortable columns.
    pub fn toggle_sort(&mut self, column: &str) -> bool {
        if !self.sort_filter.toggle_sort(&self.config, column) {
            return false;
        }
        self.reset_and_reload("sort");
        true
    }

    pub fn toggle_sort_at(&mut self, index: usize) -> bool {
        match self.config.columns.get(index) {
            Some(column) => {
                let name = column.name.clone();
                self.selected_column = index;
                self.toggle_sort(&name)
            }
            None => false,
        }
    }

    pub fn toggle_sort_selected(&mut self) -> bool {
        self.toggle_sort_at(self.selected_column)
    }

    /// Record typed filter text; it applies once typing pauses
    pub fn set_filter(&mut self, text: impl Into<String>) -> bool {
        if !self.config.filterable {
            trace!(target: "filter", "Grid '{}' is not filterable", self.config.name);
            return false;
        }
        self.sort_filter.set_filter(text);
        true
    }

    /// Apply filter text immediately, skipping the debounce
    pub fn apply_filter_now(&mut self, text: impl Into<String>) -> bool {
        if !self.config.filterable {
            return false;
        }
        if !self.sort_filter.apply_filter_now(text) {
            return false;
        }
        self.reset_and_reload("filter");
        true
    }

    pub fn clear_filter(&mut self) -> bool {
        self.apply_filter_now("")
    }

    // ---- navigation ----

    pub fn navigate(&mut self, action: NavigateAction) {
        if action != NavigateAction::End && self.pending_end {
            debug!(target: "navigation", "Pending End cancelled by {:?}", action);
            self.pending_end = false;
        }

        let total = self.cache.extent();
        let focused = self.viewport.focused();
        let page = self.viewport.visible_rows();

        match action {
            NavigateAction::Up(n) => self.viewport.focus(focused.saturating_sub(n), total),
            NavigateAction::Down(n) => self.viewport.focus(focused.saturating_add(n), total),
            NavigateAction::PageUp => self.viewport.focus(focused.saturating_sub(page), total),
            NavigateAction::PageDown => self.viewport.focus(focused.saturating_add(page), total),
            NavigateAction::Home => self.viewport.focus(0, total),
            NavigateAction::End => self.jump_to_end(),
            NavigateAction::Left(n) => {
                self.selected_column = self.selected_column.saturating_sub(n);
            }
            NavigateAction::Right(n) => {
                let last = self.config.columns.len().saturating_sub(1);
                self.selected_column = self.selected_column.saturating_add(n).min(last);
            }
        }
        trace!(target: "navigation", "{:?} -> row {}, column {}",
            action, self.viewport.focused(), self.selected_column);

        self.sync_viewport();
    }

    fn jump_to_end(&mut self) {
        if self.cache.is_exhausted() {
            let total = self.cache.extent();
            self.viewport.focus(total.saturating_sub(1), total);
            return;
        }
        let from = self.cache.extent();
        debug!(target: "navigation", "End before exhaustion, sweeping forward from {}", from);
        self.pending_end = true;
        self.ensure_range(from, self.cache.batch_size());
    }

    /// Keep fetching forward until the source runs dry, then focus the last
    /// row. Returns the row once the sweep resolved.
    fn continue_end_sweep(&mut self) -> Option<usize> {
        let total = self.cache.extent();
        if self.cache.is_exhausted() {
            self.pending_end = false;
            let last = total.saturating_sub(1);
            self.viewport.focus(last, total);
            debug!(target: "navigation", "End resolved at row {}", last);
            return Some(last);
        }
        self.ensure_range(total, self.cache.batch_size());
        None
    }

    /// Scroll the window; focus follows into view
    pub fn scroll(&mut self, delta: isize) {
        self.pending_end = false;
        self.viewport.scroll_by(delta, self.cache.extent());
        self.sync_viewport();
    }

    pub fn scroll_to(&mut self, offset: usize) {
        self.pending_end = false;
        self.viewport.scroll_to(offset, self.cache.extent());
        self.sync_viewport();
    }

    /// The host reports how many rows fit on screen
    pub fn resize(&mut self, visible_rows: usize) {
        if self.viewport.resize(visible_rows, self.cache.extent()) {
            debug!(target: "viewport", "Viewport now {} rows", self.viewport.visible_rows());
            self.sync_viewport();
        }
    }

    pub fn select_column(&mut self, index: usize) {
        if index < self.config.columns.len() {
            self.selected_column = index;
        }
    }

    /// Move focus to the next loaded row (after the focused one, wrapping)
    /// with a cell containing `text`. Only resident rows are searched.
    pub fn find_next(&mut self, text: &str) -> Option<usize> {
        if !self.config.findable {
            return None;
        }
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let columns = self.config.column_names();
        let focused = self.viewport.focused();
        let hit = self
            .cache
            .iter()
            .filter(|&(position, _)| position > focused)
            .chain(self.cache.iter().filter(|&(position, _)| position <= focused))
            .find(|(_, row)| row.contains_text(&columns, &needle))
            .map(|(position, _)| position);

        match hit {
            Some(position) => {
                self.pending_end = false;
                self.status = None;
                self.viewport.focus(position, self.cache.extent());
                self.sync_viewport();
                debug!(target: "navigation", "Found '{}' at row {}", text, position);
            }
            None => {
                self.status = Some(format!("No loaded row matches '{}'", text.trim()));
            }
        }
        hit
    }

    // ---- host-facing state ----

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn cache(&self) -> &WindowCache {
        &self.cache
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn row(&self, position: usize) -> Option<&RowRecord> {
        self.cache.get(position)
    }

    /// Rows resident across every fetched batch
    pub fn rows_loaded(&self) -> usize {
        self.cache.rows_loaded()
    }

    /// Known once the data source ran dry
    pub fn known_total(&self) -> Option<usize> {
        self.cache.known_total()
    }

    pub fn focused_row(&self) -> usize {
        self.viewport.focused()
    }

    pub fn focused_record(&self) -> Option<&RowRecord> {
        self.cache.get(self.viewport.focused())
    }

    /// Key column value of the focused row
    pub fn focused_key(&self) -> Option<&Value> {
        self.focused_record()?.get(&self.config.key_column)
    }

    pub fn selected_column(&self) -> usize {
        self.selected_column
    }

    pub fn sort(&self) -> Option<&SortKey> {
        self.sort_filter.sort()
    }

    pub fn sort_filter(&self) -> &SortFilterController {
        &self.sort_filter
    }

    /// Applied filter text
    pub fn filter(&self) -> &str {
        self.sort_filter.filter()
    }

    pub fn epoch(&self) -> u64 {
        self.cache.epoch()
    }

    pub fn is_end_pending(&self) -> bool {
        self.pending_end
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn footer_text(&self) -> String {
        format!("{} rows loaded", self.rows_loaded())
    }
}
