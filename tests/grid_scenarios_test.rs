use anyhow::{anyhow, Result};
use async_trait::async_trait;
use paged_grid::config::config::GridSettings;
use paged_grid::config::grid_config::{ColumnDescriptor, GridConfig};
use paged_grid::data::data_source::{DataSource, FetchRequest, SortKey};
use paged_grid::data::memory_source::MemoryDataSource;
use paged_grid::data::row::RowRecord;
use paged_grid::state::events::GridEvent;
use paged_grid::state::grid::Grid;
use paged_grid::ui::actions::NavigateAction;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Serves rows from memory and records every request it sees
struct RecordingSource {
    inner: MemoryDataSource,
    calls: Mutex<Vec<FetchRequest>>,
    /// The first unfiltered call waits on this before answering
    hold_unfiltered: Mutex<Option<oneshot::Receiver<()>>>,
    /// Zero-based call index that fails, if any
    fail_call: Option<usize>,
    call_count: AtomicUsize,
}

impl RecordingSource {
    fn new(rows: usize) -> Self {
        Self {
            inner: MemoryDataSource::sample(rows),
            calls: Mutex::new(Vec::new()),
            hold_unfiltered: Mutex::new(None),
            fail_call: None,
            call_count: AtomicUsize::new(0),
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.inner = self.inner.with_latency(latency);
        self
    }

    fn failing_call(mut self, index: usize) -> Self {
        self.fail_call = Some(index);
        self
    }

    /// Hold the first unfiltered call until the returned sender fires
    fn gated(self) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        *self.hold_unfiltered.lock().unwrap() = Some(rx);
        (self, tx)
    }

    fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn last_call(&self) -> FetchRequest {
        self.calls().last().cloned().expect("no calls recorded")
    }
}

#[async_trait]
impl DataSource for RecordingSource {
    async fn fetch(&self, request: FetchRequest) -> Result<Vec<RowRecord>> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request.clone());

        let gate = if request.filter.is_none() {
            self.hold_unfiltered.lock().unwrap().take()
        } else {
            None
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.fail_call == Some(index) {
            return Err(anyhow!("connection reset"));
        }
        self.inner.fetch(request).await
    }
}

fn grid_config() -> GridConfig {
    GridConfig {
        name: "items".to_string(),
        key_column: "id".to_string(),
        title: "Items".to_string(),
        max_visible_rows: 20,
        filterable: true,
        findable: true,
        columns: vec![
            ColumnDescriptor::new("id", "ID", false),
            ColumnDescriptor::new("name", "Name", true),
            ColumnDescriptor::new("value", "Value", true),
        ],
    }
}

fn mounted_grid(source: &Arc<RecordingSource>) -> Grid {
    let mut grid = Grid::with_defaults(source.clone(), grid_config()).unwrap();
    grid.mount();
    grid
}

fn snapshot(grid: &Grid) -> Vec<(usize, RowRecord)> {
    grid.cache()
        .iter()
        .map(|(position, row)| (position, row.clone()))
        .collect()
}

#[tokio::test]
async fn test_small_data_set_needs_one_call() {
    let source = Arc::new(RecordingSource::new(5));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    let calls = source.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].start_row, 0);
    assert_eq!(calls[0].num_rows, 100);
    assert_eq!(calls[0].column_keys, vec!["id", "id", "name", "value"]);
    assert!(calls[0].sort_keys.is_empty());
    assert_eq!(calls[0].filter, None);
    assert_eq!(grid.footer_text(), "5 rows loaded");
    assert_eq!(grid.known_total(), Some(5));
}

#[tokio::test]
async fn test_scrolling_to_bottom_loads_second_batch() {
    let source = Arc::new(RecordingSource::new(200));
    let mut grid = mounted_grid(&source);
    grid.settle().await;
    assert_eq!(grid.footer_text(), "100 rows loaded");

    grid.scroll_to(usize::MAX);
    // Clamped to the loaded rows; only the overscan reaches past them
    assert_eq!(grid.viewport().scroll_offset(), 80);
    grid.settle().await;

    let starts: Vec<usize> = source.calls().iter().map(|c| c.start_row).collect();
    assert_eq!(starts, vec![0, 100]);
    assert_eq!(grid.footer_text(), "200 rows loaded");

    // One more pass past the end finds nothing and marks exhaustion
    grid.scroll_to(usize::MAX);
    grid.settle().await;
    assert_eq!(grid.known_total(), Some(200));
    assert_eq!(source.calls().len(), 3);

    grid.scroll_to(usize::MAX);
    grid.navigate(NavigateAction::Down(50));
    grid.settle().await;
    assert_eq!(source.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_typing_filter_reloads_once_from_start() {
    let source = Arc::new(RecordingSource::new(200));
    let mut grid = mounted_grid(&source);
    grid.settle().await;
    assert_eq!(source.calls().len(), 1);

    let text = "Item 1";
    for end in 1..=text.len() {
        grid.set_filter(&text[..end]);
        tokio::time::advance(Duration::from_millis(40)).await;
        grid.tick();
    }
    assert_eq!(grid.filter(), "");
    grid.settle().await;

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    let last = source.last_call();
    assert_eq!(last.start_row, 0);
    assert_eq!(last.filter.as_deref(), Some("Item 1"));

    assert_eq!(grid.filter(), "Item 1");
    assert!(grid.rows_loaded() > 0);
    assert!(grid
        .cache()
        .iter()
        .all(|(_, row)| row.cell_text("name").starts_with("Item 1")));
}

#[tokio::test]
async fn test_header_sort_cycles_asc_desc_off() {
    let source = Arc::new(RecordingSource::new(50));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    assert!(grid.toggle_sort("value"));
    grid.settle().await;
    let last = source.last_call();
    assert_eq!(last.sort_keys, vec![SortKey::ascending("value")]);
    assert_eq!(last.start_row, 0);

    assert!(grid.toggle_sort("value"));
    grid.settle().await;
    let last = source.last_call();
    assert_eq!(last.sort_keys, vec![SortKey::descending("value")]);
    assert_eq!(last.start_row, 0);
    assert_eq!(grid.row(0).unwrap().cell_text("value"), "500");

    assert!(grid.toggle_sort("value"));
    grid.settle().await;
    assert!(source.last_call().sort_keys.is_empty());
    assert_eq!(source.calls().len(), 4);
}

#[tokio::test]
async fn test_non_sortable_header_is_ignored() {
    let source = Arc::new(RecordingSource::new(50));
    let mut grid = mounted_grid(&source);
    grid.settle().await;
    let epoch = grid.epoch();

    assert!(!grid.toggle_sort("id"));
    assert!(!grid.toggle_sort("missing"));
    grid.settle().await;
    assert_eq!(grid.epoch(), epoch);
    assert_eq!(source.calls().len(), 1);
}

#[tokio::test]
async fn test_stale_batch_is_discarded() {
    let (source, release) = RecordingSource::new(300).gated();
    let source = Arc::new(source);
    let mut grid = mounted_grid(&source);

    // The unfiltered first batch is still held when the filter changes
    assert!(grid.apply_filter_now("Item 2"));
    grid.settle().await;
    let filtered = snapshot(&grid);
    assert!(!filtered.is_empty());

    release.send(()).unwrap();
    let events = grid.process_next().await;
    assert!(events.is_empty());
    assert_eq!(snapshot(&grid), filtered);
    assert!(grid
        .cache()
        .iter()
        .all(|(_, row)| row.cell_text("name").contains("Item 2")));
}

#[tokio::test]
async fn test_footer_is_monotonic_and_resets_on_sort() {
    let source = Arc::new(RecordingSource::new(350));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    let mut previous = grid.rows_loaded();
    for _ in 0..30 {
        grid.scroll(15);
        grid.settle().await;
        assert!(grid.rows_loaded() >= previous);
        previous = grid.rows_loaded();
    }
    assert_eq!(grid.footer_text(), "350 rows loaded");

    grid.toggle_sort("name");
    assert_eq!(grid.footer_text(), "0 rows loaded");
    assert_eq!(grid.focused_row(), 0);
    assert_eq!(grid.viewport().scroll_offset(), 0);
    grid.settle().await;
    assert_eq!(grid.footer_text(), "100 rows loaded");
}

#[tokio::test]
async fn test_final_content_depends_only_on_final_state() {
    let first = Arc::new(RecordingSource::new(400));
    let mut a = mounted_grid(&first);
    a.settle().await;
    a.toggle_sort("name");
    a.settle().await;
    a.apply_filter_now("Item 1");
    a.settle().await;
    a.toggle_sort("name");
    a.settle().await;

    let second = Arc::new(RecordingSource::new(400));
    let mut b = mounted_grid(&second);
    b.apply_filter_now("x");
    b.toggle_sort("name");
    b.apply_filter_now("Item 1");
    b.toggle_sort("name");
    b.settle().await;

    assert_eq!(a.sort(), Some(&SortKey::descending("name")));
    assert_eq!(b.sort(), a.sort());
    assert_eq!(snapshot(&a), snapshot(&b));
}

#[tokio::test]
async fn test_ensure_range_respects_batch_bound() {
    let source = Arc::new(RecordingSource::new(1000));
    let settings = GridSettings {
        max_in_flight_batches: 16,
        ..GridSettings::default()
    };
    let mut grid = Grid::new(source.clone(), grid_config(), &settings).unwrap();
    grid.mount();
    grid.settle().await;

    assert_eq!(grid.ensure_range(150, 350), 4);
    grid.settle().await;

    let calls = source.calls();
    let mut planned: Vec<(usize, usize)> = calls[1..]
        .iter()
        .map(|c| (c.start_row, c.num_rows))
        .collect();
    planned.sort_unstable();
    assert_eq!(planned, vec![(150, 100), (250, 100), (350, 100), (450, 100)]);

    // Only the gap before the loaded rows is fetched
    assert_eq!(grid.ensure_range(100, 400), 1);
    grid.settle().await;
    let last = source.last_call();
    assert_eq!((last.start_row, last.num_rows), (100, 50));
    assert_eq!(grid.rows_loaded(), 550);
    assert_eq!(grid.known_total(), None);
    assert_eq!(grid.ensure_range(0, 550), 0);
}

#[tokio::test]
async fn test_overlapping_ranges_share_in_flight_batches() {
    let source = Arc::new(RecordingSource::new(1000));
    let settings = GridSettings {
        max_in_flight_batches: 16,
        ..GridSettings::default()
    };
    let mut grid = Grid::new(source.clone(), grid_config(), &settings).unwrap();
    grid.mount();
    grid.settle().await;

    assert_eq!(grid.ensure_range(150, 100), 1);
    assert_eq!(grid.ensure_range(100, 100), 1);
    assert_eq!(grid.ensure_range(100, 150), 0);
    grid.settle().await;

    let mut planned: Vec<(usize, usize)> = source.calls()[1..]
        .iter()
        .map(|c| (c.start_row, c.num_rows))
        .collect();
    planned.sort_unstable();
    assert_eq!(planned, vec![(100, 50), (150, 100)]);
    assert_eq!(grid.rows_loaded(), 250);
    assert_eq!(grid.known_total(), None);
}

#[tokio::test]
async fn test_end_sweeps_until_exhausted() {
    let source = Arc::new(RecordingSource::new(250));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    grid.navigate(NavigateAction::End);
    assert!(grid.is_end_pending());
    assert_eq!(grid.focused_row(), 0);

    let events = grid.settle().await;
    assert!(events.contains(&GridEvent::EndReached { row: 249 }));
    assert!(events.contains(&GridEvent::Exhausted { total: 250 }));
    assert_eq!(grid.focused_row(), 249);
    assert!(!grid.is_end_pending());

    let starts: Vec<usize> = source.calls().iter().map(|c| c.start_row).collect();
    assert_eq!(starts, vec![0, 100, 200]);

    // Exhausted: End is immediate and nothing past the end is requested
    grid.navigate(NavigateAction::Home);
    grid.navigate(NavigateAction::End);
    grid.settle().await;
    assert_eq!(grid.focused_row(), 249);
    assert_eq!(source.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_other_navigation_cancels_end() {
    let source = Arc::new(RecordingSource::new(1000).with_latency(Duration::from_millis(100)));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    grid.navigate(NavigateAction::End);
    grid.navigate(NavigateAction::Down(1));
    assert!(!grid.is_end_pending());

    grid.settle().await;
    assert_eq!(grid.focused_row(), 1);
    // The batch already started finishes, but the sweep goes no further
    assert_eq!(source.calls().len(), 2);
    assert_eq!(grid.known_total(), None);
}

#[tokio::test]
async fn test_failed_batch_is_retried_on_next_pass() {
    let source = Arc::new(RecordingSource::new(300).failing_call(1));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    grid.scroll_to(usize::MAX);
    let events = grid.settle().await;
    assert!(events.contains(&GridEvent::FetchFailed {
        start_row: 100,
        message: "connection reset".to_string(),
    }));
    assert_eq!(grid.rows_loaded(), 100);
    assert!(grid.status().unwrap().contains("connection reset"));

    // No automatic retry
    assert_eq!(source.calls().len(), 2);

    grid.scroll(1);
    grid.settle().await;
    assert_eq!(source.calls().len(), 3);
    assert_eq!(source.last_call().start_row, 100);
    assert_eq!(grid.rows_loaded(), 200);
    assert_eq!(grid.status(), None);
}

#[tokio::test(start_paused = true)]
async fn test_results_after_unmount_are_dropped() {
    let source = Arc::new(RecordingSource::new(50).with_latency(Duration::from_millis(100)));
    let mut grid = mounted_grid(&source);
    grid.unmount();

    let events = grid.process_next().await;
    assert!(events.is_empty());
    assert_eq!(grid.rows_loaded(), 0);
    assert_eq!(source.calls().len(), 1);
}

#[tokio::test]
async fn test_find_wraps_through_loaded_rows() {
    let source = Arc::new(RecordingSource::new(30));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    assert_eq!(grid.find_next("item 3"), Some(2));
    // Item 30 comes next, then wrap back to Item 3
    assert_eq!(grid.find_next("item 3"), Some(29));
    assert_eq!(grid.find_next("item 3"), Some(2));
    assert_eq!(grid.find_next("nothing like this"), None);
    assert_eq!(grid.focused_row(), 2);
    assert_eq!(source.calls().len(), 1);
}

#[tokio::test]
async fn test_focused_selection_state() {
    let source = Arc::new(RecordingSource::new(30));
    let mut grid = mounted_grid(&source);
    grid.settle().await;

    grid.navigate(NavigateAction::Down(4));
    assert_eq!(grid.focused_row(), 4);
    assert_eq!(grid.focused_key(), Some(&serde_json::json!(5)));
    assert_eq!(
        grid.focused_record().unwrap().cell_text("name"),
        "Item 5"
    );
}
