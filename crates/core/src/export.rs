//! CSV import and export of [`Table`]s.
//!
//! Export writes the header row in column order and one record per row with `\n` terminators,
//! quoting only fields that need it. Import is used by the offline `diff` command to read local
//! CSV exports back into tables; every imported cell is text.

use crate::table::{Scalar, Table};
use crate::{SyncError, SyncResult};
use std::io::{Read, Write};

/// Serialises a table to a CSV string.
///
/// # Errors
///
/// Returns [`SyncError::Csv`] if a record cannot be written.
pub fn to_csv(table: &Table) -> SyncResult<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes a table as CSV to any writer.
///
/// # Errors
///
/// Returns [`SyncError::Csv`] if a record cannot be written or the writer fails to flush.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> SyncResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(table.columns())?;
    for row in table.rows() {
        csv_writer.write_record(row.cells().iter().map(Scalar::to_string))?;
    }
    csv_writer
        .flush()
        .map_err(|e| SyncError::Csv(csv::Error::from(e)))?;
    Ok(())
}

/// Reads a CSV document with a header row into a table named `name`.
///
/// Empty fields become [`Scalar::Empty`]; everything else is kept as text exactly as written.
///
/// # Errors
///
/// Returns [`SyncError::MissingHeader`] for an empty document, [`SyncError::DuplicateColumn`] for
/// repeated header names, [`SyncError::RaggedRow`] for rows longer than the header, and
/// [`SyncError::Csv`] for malformed CSV.
pub fn read_csv<R: Read>(name: &str, reader: R) -> SyncResult<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => {
            return Err(SyncError::MissingHeader {
                table: name.to_owned(),
            })
        }
    };

    let mut table = Table::new(name, header.iter().map(str::to_owned).collect())?;
    for record in records {
        let record = record?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Scalar::Empty
                } else {
                    Scalar::text(field)
                }
            })
            .collect();
        table.push_row(cells)?;
    }

    Ok(table)
}
