//! Upload schema validation.
//!
//! Only presence is checked: every column of [`CATALOG_COLUMNS`] must be in
//! the header. Extra columns and column order are accepted.

use std::collections::BTreeSet;

use crate::error::SchemaError;
use crate::models::CATALOG_COLUMNS;
use crate::table::Table;

/// Names of all required upload columns.
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    CATALOG_COLUMNS.iter().map(|spec| spec.name)
}

/// Check that `table` has every column in `required`.
///
/// The error lists the missing names sorted, so messages are stable.
pub fn validate_columns<'a, I>(table: &Table, required: I) -> Result<(), SchemaError>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: BTreeSet<&str> = table.column_names().collect();
    let missing: BTreeSet<&str> = required
        .into_iter()
        .filter(|name| !present.contains(*name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(
            missing.into_iter().map(str::to_string).collect(),
        ))
    }
}

/// Validate against the catalog schema, handing the table back on success.
pub fn validate_schema(table: Table) -> Result<Table, SchemaError> {
    validate_columns(&table, required_columns())?;
    Ok(table)
}
