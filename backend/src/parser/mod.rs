//! Delimited text parser.
//!
//! Turns uploaded bytes into a [`Table`]: the first record is the header,
//! every following record becomes a row in file order. No catalog-specific
//! logic here.

use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::table::Table;

/// Default field delimiter for catalog uploads.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Decode raw bytes to text.
///
/// UTF-8 is assumed unless a byte-order mark says otherwise. The BOM is
/// stripped. Malformed sequences are an error, never replaced.
pub fn decode_content(bytes: &[u8]) -> CsvResult<Cow<'_, str>> {
    let (encoding, bom_len): (&'static Encoding, usize) =
        Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));

    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .ok_or(CsvError::Encoding(encoding.name()))
}

/// Parse delimited bytes into a table.
///
/// Fields are trimmed and empty fields become missing cells. Lines with
/// only empty fields are skipped.
///
/// # Example
/// ```ignore
/// use catalog_relay::parser::parse_bytes;
///
/// let table = parse_bytes(b"shop;name\nShopA;Chair", b';').unwrap();
/// assert_eq!(table.row_count(), 1);
/// ```
pub fn parse_bytes(bytes: &[u8], delimiter: u8) -> CsvResult<Table> {
    let content = decode_content(bytes)?;
    parse_str(&content, delimiter)
}

/// Parse already-decoded text.
pub fn parse_str(content: &str, delimiter: u8) -> CsvResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    if headers.iter().all(String::is_empty) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row = (0..headers.len())
            .map(|i| record.get(i).map(str::to_string))
            .collect();
        rows.push(row);
    }

    tracing::debug!(
        columns = headers.len(),
        rows = rows.len(),
        "parsed delimited content"
    );

    Ok(Table::from_rows(headers, rows))
}

/// Parse a file from disk.
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: u8) -> CsvResult<Table> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, delimiter)
}
