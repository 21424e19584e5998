//! Database schema, query pages and the tracked-table projection.
//!
//! The database schema fixes the column set: every allow-listed property, ordered by name. Pages
//! are then projected onto those columns, so a database with no pages still yields a table with
//! the right header and the identifier column can be checked before any rows exist.

use crate::property::{PropertyKind, PropertyValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use sync_core::{Scalar, SyncResult, Table};

/// `GET /v1/databases/{id}` response (only the parts we read).
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseWire {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaPropertyWire>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SchemaPropertyWire {
    #[serde(rename = "type")]
    pub kind: String,
}

/// One page of a `POST /v1/databases/{id}/query` response.
#[derive(Clone, Debug, Deserialize)]
pub struct QueryResponseWire {
    #[serde(default)]
    pub results: Vec<PageWire>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PageWire {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl DatabaseWire {
    /// Allow-listed columns in name order.
    pub fn columns(&self) -> Vec<(String, PropertyKind)> {
        self.properties
            .iter()
            .filter_map(|(name, prop)| {
                PropertyKind::from_wire(&prop.kind).map(|kind| (name.clone(), kind))
            })
            .collect()
    }
}

/// Projects query pages onto the schema's allow-listed columns.
///
/// A page property that is missing, or whose kind is not allow-listed, takes the column kind's
/// default cell.
///
/// # Errors
///
/// Returns a `SyncError::DuplicateColumn` only if the schema repeats a property name, which the
/// map representation rules out in practice.
pub fn project_pages(schema: &DatabaseWire, pages: &[PageWire]) -> SyncResult<Table> {
    let columns = schema.columns();
    let mut table = Table::new(
        format!("Notion database {}", schema.id),
        columns.iter().map(|(name, _)| name.clone()).collect(),
    )?;

    for page in pages {
        let cells: Vec<Scalar> = columns
            .iter()
            .map(|(name, kind)| {
                page.properties
                    .get(name)
                    .and_then(PropertyValue::to_scalar)
                    .unwrap_or_else(|| kind.default_scalar())
            })
            .collect();
        table.push_row(cells)?;
    }

    Ok(table)
}
