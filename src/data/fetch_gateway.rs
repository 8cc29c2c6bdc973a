use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::grid_config::GridConfig;
use crate::data::data_source::{DataSource, FetchRequest, SortKey};
use crate::data::row::RowRecord;

/// Normalizes every call the grid makes into its data source.
///
/// The column list is built once per configuration and handed to the source
/// verbatim on each request.
#[derive(Clone)]
pub struct FetchGateway {
    source: Arc<dyn DataSource>,
    column_keys: Vec<String>,
}

impl FetchGateway {
    pub fn new(source: Arc<dyn DataSource>, config: &GridConfig) -> Self {
        Self {
            source,
            column_keys: config.column_keys(),
        }
    }

    pub fn column_keys(&self) -> &[String] {
        &self.column_keys
    }

    /// Rebuild the column list after the host swapped configurations
    pub fn reconfigure(&mut self, config: &GridConfig) {
        self.column_keys = config.column_keys();
    }

    /// Build the request for one batch
    pub fn request(
        &self,
        start_row: usize,
        num_rows: usize,
        sort: Option<&SortKey>,
        filter: &str,
    ) -> FetchRequest {
        FetchRequest {
            column_keys: self.column_keys.clone(),
            start_row,
            num_rows: num_rows.max(1),
            sort_keys: sort.cloned().into_iter().collect(),
            filter: if filter.is_empty() {
                None
            } else {
                Some(filter.to_string())
            },
        }
    }

    /// Issue a request. The returned future owns everything it needs so it can
    /// be moved onto a task; it never yields more rows than were requested.
    pub fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<RowRecord>>> + Send + 'static {
        let source = Arc::clone(&self.source);
        async move {
            let start_row = request.start_row;
            let requested = request.num_rows;
            let started = Instant::now();
            debug!(target: "fetch", "Fetching rows {}..{} sort={:?} filter={:?}",
                start_row, start_row.saturating_add(requested), request.sort_keys, request.filter);

            let mut rows = source.fetch(request).await?;

            if rows.len() > requested {
                warn!(target: "fetch", "Data source returned {} rows for a request of {}, truncating",
                    rows.len(), requested);
                rows.truncate(requested);
            }

            debug!(target: "fetch", "Fetched {} rows at {} in {:?}",
                rows.len(), start_row, started.elapsed());
            Ok(rows)
        }
    }
}
