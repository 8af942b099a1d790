//! Fetch side of a refresh tick.
//!
//! `ReadingStore` is the store contract; `DataWindowFetcher` binds it to the
//! configured table and bounds every call with a timeout.

use std::{future::Future, time::Duration};

use serde::Serialize;

use crate::{error::FetchError, models::RawRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreQuery {
    pub table: String,
    pub order_by: String,
    pub direction: SortDirection,
    pub limit: usize,
}

/// A store that can hand back its most recent rows.
pub trait ReadingStore: Send + Sync + 'static {
    fn fetch_rows(
        &self,
        query: &StoreQuery,
    ) -> impl Future<Output = Result<Vec<RawRecord>, FetchError>> + Send;
}

pub struct DataWindowFetcher<S> {
    store: S,
    table: String,
    timestamp_field: String,
    timeout: Duration,
}

impl<S: ReadingStore> DataWindowFetcher<S> {
    pub fn new(
        store: S,
        table: impl Into<String>,
        timestamp_field: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            timestamp_field: timestamp_field.into(),
            timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn query(&self, limit: usize) -> StoreQuery {
        StoreQuery {
            table: self.table.clone(),
            order_by: self.timestamp_field.clone(),
            direction: SortDirection::Descending,
            limit,
        }
    }

    /// Most recent `limit` rows, newest first as the store returns them.
    /// Ordering is not guaranteed to callers.
    pub async fn fetch(&self, limit: usize) -> Result<Vec<RawRecord>, FetchError> {
        let query = self.query(limit);
        match tokio::time::timeout(self.timeout, self.store.fetch_rows(&query)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }
}
