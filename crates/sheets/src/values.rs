//! Values API wire model and register projection.
//!
//! `spreadsheets.values.get` returns a worksheet as rows of JSON values. The first row is the
//! header; header names and cells are kept as the API returns them. The API omits trailing empty
//! cells, so short rows are padded, and wholly blank rows (spacer lines in the sheet) are skipped.
//! Cells typed past the last named column (a note beside the register, say) are kept under
//! unnamed columns so no data is dropped.

use serde::Deserialize;
use serde_json::Value;
use sync_core::{Scalar, SyncError, SyncResult, Table};

/// `GET /v4/spreadsheets/{id}/values/{range}` response.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRangeWire {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

fn to_scalar(value: &Value) -> Scalar {
    match value {
        Value::String(s) if s.is_empty() => Scalar::Empty,
        Value::String(s) => Scalar::text(s.as_str()),
        Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Empty),
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Null => Scalar::Empty,
        // Arrays and objects never appear in a values response; keep their JSON text.
        other => Scalar::text(other.to_string()),
    }
}

fn header_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => to_scalar(other).to_string(),
    }
}

/// Builds a register table named after the worksheet.
///
/// The header is widened with blank column names to the widest populated row.
///
/// # Errors
///
/// Returns `SyncError::MissingHeader` for an empty worksheet and `SyncError::DuplicateColumn` for
/// repeated non-blank header names.
pub fn register_table(worksheet: &str, wire: &ValueRangeWire) -> SyncResult<Table> {
    let mut rows = wire.values.iter();
    let header = rows.next().ok_or_else(|| SyncError::MissingHeader {
        table: worksheet.to_owned(),
    })?;

    let body: Vec<Vec<Scalar>> = rows
        .map(|row| row.iter().map(to_scalar).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(Scalar::is_empty))
        .collect();

    let mut columns: Vec<String> = header.iter().map(header_name).collect();
    let width = body.iter().map(Vec::len).max().unwrap_or(0);
    if width > columns.len() {
        tracing::debug!(
            worksheet,
            named = columns.len(),
            width,
            "keeping cells beyond the header under unnamed columns"
        );
        columns.resize(width, String::new());
    }

    let mut table = Table::new(worksheet, columns)?;
    for cells in body {
        table.push_row(cells)?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(values: Value) -> ValueRangeWire {
        serde_json::from_value(json!({
            "range": "Diabetes!A1:Z1000",
            "majorDimension": "ROWS",
            "values": values
        }))
        .expect("wire")
    }

    #[test]
    fn header_row_becomes_columns_and_cells_stay_verbatim() {
        let table = register_table(
            "Diabetes",
            &wire(json!([
                ["NHS number", "Name", "HbA1c"],
                ["943 476 5919", "Jane Doe", "48"],
                ["943 476 5920", "John Roe", 52.5]
            ])),
        )
        .expect("table");

        assert_eq!(table.name(), "Diabetes");
        assert_eq!(table.columns(), &["NHS number", "Name", "HbA1c"]);
        assert_eq!(table.rows()[0].cells()[0], Scalar::text("943 476 5919"));
        assert_eq!(table.rows()[0].cells()[2], Scalar::text("48"));
        assert_eq!(table.rows()[1].cells()[2], Scalar::Number(52.5));
    }

    #[test]
    fn pads_trimmed_rows_and_skips_blank_rows() {
        let table = register_table(
            "SMI",
            &wire(json!([
                ["NHS number", "Name", "Notes"],
                ["111"],
                [],
                ["", ""],
                ["222", "B", "ok"]
            ])),
        )
        .expect("table");

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows()[0].cells(),
            &[Scalar::text("111"), Scalar::Empty, Scalar::Empty]
        );
    }

    #[test]
    fn empty_worksheet_has_no_header() {
        let err = register_table("SMI", &wire(json!([]))).expect_err("no header");
        assert!(matches!(err, SyncError::MissingHeader { .. }));

        let missing: ValueRangeWire =
            serde_json::from_value(json!({"range": "SMI!A1:Z1000", "majorDimension": "ROWS"}))
                .expect("wire");
        assert!(register_table("SMI", &missing).is_err());
    }

    #[test]
    fn cells_beyond_the_header_are_kept_under_unnamed_columns() {
        let table = register_table(
            "Diabetes",
            &wire(json!([
                ["NHS number", "Name"],
                ["111", "A"],
                ["222", "B", "call back Tue"]
            ])),
        )
        .expect("table");

        assert_eq!(table.columns(), &["NHS number", "Name", ""]);
        assert_eq!(
            table.rows()[0].cells(),
            &[Scalar::text("111"), Scalar::text("A"), Scalar::Empty]
        );
        assert_eq!(table.rows()[1].cells()[2], Scalar::text("call back Tue"));
        assert_eq!(
            sync_core::to_csv(&table).expect("csv"),
            "NHS number,Name,\n111,A,\n222,B,call back Tue\n"
        );
    }

    #[test]
    fn blank_rows_do_not_widen_the_header() {
        let table = register_table(
            "SMI",
            &wire(json!([["NHS number", "Name"], ["", "", "", ""], ["111", "A"]])),
        )
        .expect("table");
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn header_names_are_kept_verbatim_and_still_match() {
        let table =
            register_table("SMI", &wire(json!([[" NHS number ", "Name"], ["111", "A"]])))
                .expect("table");
        assert_eq!(table.columns()[0], " NHS number ");
        assert_eq!(table.require_column("NHS number").expect("lookup"), 0);
    }

    #[test]
    fn duplicate_header_names_are_rejected() {
        let err = register_table("SMI", &wire(json!([["NHS number", "NHS number"]])))
            .expect_err("duplicate");
        assert!(matches!(err, SyncError::DuplicateColumn { .. }));
    }
}
