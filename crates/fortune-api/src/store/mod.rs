//! Table gateway: typed fortune operations over the backing key-value table.
//!
//! # Lifecycle
//!
//! 1. At startup, [`ensure_table`] checks whether the table exists and creates
//!    it (blocking until active) when it does not.
//! 2. The resulting [`FortuneStore`] is wrapped in an `Arc` and handed to the
//!    HTTP layer; handlers only read through it.
//!
//! Every operation logs its own failure and returns a [`StoreError`]. Nothing
//! is retried here beyond what the SDK does on its own.

pub mod conversions;
pub mod dynamo;

pub use dynamo::DynamoTable;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::TableDescription;
use common::Fortune;
use thiserror::Error;
use tracing::{info, warn};

/// Errors produced by the table gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend call failed (network, throttling, missing table, ...).
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored item could not be decoded into a [`Fortune`].
    #[error("invalid item: {0}")]
    InvalidItem(String),

    /// A newly created table did not become active in time.
    #[error("table {table} not active after {secs}s")]
    Timeout { table: String, secs: u64 },

    /// The wait-for-active bound cannot be represented as a deadline.
    #[error("table ready timeout of {0}s is out of range")]
    TimeoutOutOfRange(u64),
}

/// Typed operations on the fortune table.
///
/// Implementations must be safe to share across request tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FortuneStore: Send + Sync {
    /// Returns `Ok(false)` if the table does not exist.
    async fn exists(&self) -> Result<bool, StoreError>;

    /// Create the table and wait until it is active.
    async fn create_table(&self) -> Result<TableDescription, StoreError>;

    /// Insert or replace a fortune by id. Last write wins.
    async fn put(&self, fortune: &Fortune) -> Result<(), StoreError>;

    /// Point lookup. `Ok(None)` when no item has this id.
    async fn get(&self, id: i64) -> Result<Option<Fortune>, StoreError>;

    /// Single-page scan projected onto `id` and `name`.
    async fn scan(&self) -> Result<Vec<Fortune>, StoreError>;

    /// Delete by id. Deleting a missing id succeeds.
    async fn delete(&self, fortune: &Fortune) -> Result<(), StoreError>;
}

/// Make sure the table behind `store` exists, creating it if needed.
///
/// An inconclusive existence check (any error other than "not found") is
/// logged and followed by a creation attempt; if the table does exist the
/// backend rejects the create and startup aborts with that error.
///
/// # Errors
///
/// Returns an error if table creation fails or times out.
pub async fn ensure_table(store: &dyn FortuneStore, table_name: &str) -> Result<()> {
    match store.exists().await {
        Ok(true) => {
            info!(table = table_name, "table already exists");
            return Ok(());
        }
        Ok(false) => info!(table = table_name, "table not found; creating"),
        Err(e) => warn!(table = table_name, error = %e, "existence check failed; attempting create"),
    }

    let desc = store
        .create_table()
        .await
        .with_context(|| format!("failed to create table {table_name}"))?;
    info!(
        table = table_name,
        arn = desc.table_arn().unwrap_or_default(),
        "table created and active"
    );
    Ok(())
}
