//! Seams to the external register and tracked-table sources.
//!
//! The core never talks HTTP. The spreadsheet and workspace-database clients implement these
//! traits in their own crates; tests implement them over in-memory tables.

use crate::table::Table;
use crate::SyncResult;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by source reads, so the traits stay object safe.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = SyncResult<T>> + Send + 'a>>;

/// Reads a named register (worksheet) as a table with its header row as columns.
pub trait RegisterSource: Send + Sync {
    fn fetch_register<'a>(&'a self, worksheet: &'a str) -> SourceFuture<'a, Table>;
}

/// Reads every row of a tracked table (workspace database) as a projected table.
pub trait TrackedSource: Send + Sync {
    fn fetch_tracked<'a>(&'a self, database_id: &'a str) -> SourceFuture<'a, Table>;
}
