//! Data source boundary
//!
//! The grid knows nothing about storage. Hosts hand it something that can
//! answer "give me `num_rows` rows starting at `start_row` of the filtered,
//! sorted row set". Everything else (query building, persistence) lives on
//! the other side of this trait.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

use crate::data::row::RowRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// The single active sort column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub key: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Descending,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.direction.as_str())
    }
}

/// Arguments of one data source call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Key column followed by every configured column, passed verbatim
    pub column_keys: Vec<String>,
    pub start_row: usize,
    pub num_rows: usize,
    /// Empty or exactly one entry
    pub sort_keys: Vec<SortKey>,
    /// Active filter text, `None` when the filter is empty
    pub filter: Option<String>,
}

/// Anything that can serve row batches to a grid.
///
/// Returning fewer than `num_rows` rows (zero included) tells the grid there
/// is nothing beyond them. Implementations must be safe to call concurrently;
/// the grid does not serialize calls.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<Vec<RowRecord>>;
}

/// Adapts an async closure into a `DataSource`
pub struct FnDataSource<F> {
    func: F,
}

impl<F> FnDataSource<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> DataSource for FnDataSource<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<RowRecord>>> + Send,
{
    async fn fetch(&self, request: FetchRequest) -> Result<Vec<RowRecord>> {
        (self.func)(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_wire_format() {
        let key = SortKey::descending("name");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"key":"name","direction":"desc"}"#);
        assert_eq!(key.to_string(), "name desc");
    }

    #[tokio::test]
    async fn test_fn_data_source_forwards_request() {
        let source = FnDataSource::new(|request: FetchRequest| async move {
            let rows: Vec<RowRecord> = (request.start_row..request.start_row + request.num_rows)
                .map(|i| RowRecord::new().with("id", i as u64))
                .collect();
            Ok::<Vec<RowRecord>, anyhow::Error>(rows)
        });

        let rows = source
            .fetch(FetchRequest {
                column_keys: vec!["id".to_string()],
                start_row: 5,
                num_rows: 2,
                sort_keys: vec![],
                filter: None,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cell_text("id"), "5");
    }
}
