//! Google Sheets boundary support for registers.
//!
//! A register is one worksheet of a shared spreadsheet: a header row followed by one patient per
//! row. This crate reads worksheets through the values API and normalises them into
//! [`sync_core::Table`]s via [`SheetsClient`], which implements [`sync_core::RegisterSource`].

pub mod client;
pub mod values;

pub use client::{sheet_range, SheetsClient, DEFAULT_BASE_URL};
pub use values::{register_table, ValueRangeWire};
