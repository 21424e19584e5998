//! # Sync Core
//!
//! Core logic for reconciling patient registers against tracked tables.
//!
//! This crate contains pure data operations:
//! - the uniform [`Table`] shape both sources normalise into
//! - identifier canonicalisation and the intervention-list set difference
//! - CSV export (and import for offline comparisons)
//! - startup configuration and the [`Reconciler`] that drives a sync
//!
//! **No API or HTTP concerns**: the spreadsheet and workspace-database clients live in the
//! `sheets` and `notion` crates and plug in through [`RegisterSource`] and [`TrackedSource`];
//! passcode sessions and the REST surface belong in `api-shared` and `api-rest`.

pub mod cohort;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod identifier;
pub mod intervention;
pub mod reconcile;
pub mod source;
pub mod table;
pub mod validation;

pub use cohort::{Cohort, CohortConfig};
pub use config::{SheetsCredential, SyncConfig};
pub use error::{SourceError, SyncError, SyncResult};
pub use export::{read_csv, to_csv, write_csv};
pub use identifier::IdentifierKey;
pub use intervention::{compute_intervention, compute_intervention_keyed};
pub use reconcile::{CohortOutcome, Reconciler, SyncOutcome};
pub use source::{RegisterSource, SourceFuture, TrackedSource};
pub use table::{Row, Scalar, Table};
