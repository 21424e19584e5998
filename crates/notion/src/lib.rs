//! Notion boundary support for tracked tables.
//!
//! This crate provides **wire models** and a **read client** for the Notion databases that list
//! patients already being followed up:
//! - a tagged union over page property kinds with a total projection to table cells
//! - schema-driven projection of query pages into a [`sync_core::Table`]
//! - a paginating client implementing [`sync_core::TrackedSource`]
//!
//! Nothing here writes to Notion.

pub mod client;
pub mod database;
pub mod property;

pub use client::{NotionClient, DEFAULT_BASE_URL, NOTION_VERSION};
pub use database::{project_pages, DatabaseWire, PageWire, QueryResponseWire};
pub use property::{PropertyKind, PropertyValue};
