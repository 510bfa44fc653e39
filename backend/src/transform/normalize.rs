//! Type coercion and normalization of a validated upload table.
//!
//! Undeclared columns are dropped first. Steps then run column-wise, in
//! this order:
//!
//! 1. cast every declared column except `shop` to its target type
//! 2. rename `description` to `longDescription`
//! 3. wrap `categories` into a one-element list
//! 4. fill missing cells: `0` for numeric columns, `""` otherwise
//!
//! Casting happens before filling because the default depends on the
//! target type, not on the raw string.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{CoercionError, CoercionResult};
use crate::models::{
    column_type, CatalogProduct, ColumnSpec, ProductRecord, CATALOG_COLUMNS, CATEGORIES_COLUMN,
    DESCRIPTION_COLUMN, LONG_DESCRIPTION_FIELD, SHOP_COLUMN,
};
use crate::table::{Cell, ColumnType, Table};

/// Run all normalization steps and extract one record per row.
pub fn normalize(mut table: Table) -> CoercionResult<Vec<ProductRecord>> {
    // An undeclared column must not shadow a renamed one.
    table.retain_columns(|name| CATALOG_COLUMNS.iter().any(|spec| spec.name == name));
    cast_columns(&mut table)?;
    table.rename_column(DESCRIPTION_COLUMN, LONG_DESCRIPTION_FIELD);
    wrap_categories(&mut table);
    fill_missing(&mut table);
    build_records(&table)
}

// =============================================================================
// Step 1: cast
// =============================================================================

/// Cast every declared column except the partition key.
pub fn cast_columns(table: &mut Table) -> CoercionResult<()> {
    for spec in CATALOG_COLUMNS.iter().filter(|s| s.name != SHOP_COLUMN) {
        table.try_map_column(spec.name, |row, cell| cast_cell(spec, row, cell))?;
    }
    Ok(())
}

/// Cast a single cell. Missing cells stay missing, except for booleans.
pub fn cast_cell(spec: &ColumnSpec, row: usize, cell: Cell) -> CoercionResult<Cell> {
    let raw = match cell {
        Cell::Missing if spec.ty == ColumnType::Boolean => {
            return Err(CoercionError::MissingValue {
                column: spec.name.to_string(),
                row,
                expected: spec.ty,
            });
        }
        Cell::Text(raw) if spec.ty == ColumnType::Text => return Ok(Cell::Text(raw)),
        Cell::Text(raw) => raw,
        other => return Ok(other),
    };

    let invalid = || CoercionError::InvalidValue {
        column: spec.name.to_string(),
        row,
        value: raw.clone(),
        expected: spec.ty,
    };

    let cast = match spec.ty {
        ColumnType::Text => Some(Cell::Text(raw.clone())),
        ColumnType::Integer => parse_integer(&raw).map(Cell::Integer),
        ColumnType::Decimal => parse_decimal(&raw).map(Cell::Decimal),
        ColumnType::Boolean => parse_bool(&raw).map(Cell::Boolean),
    }
    .ok_or_else(invalid)?;

    if spec.non_negative {
        let negative = match &cast {
            Cell::Integer(v) => *v < 0,
            Cell::Decimal(v) => v.is_sign_negative() && !v.is_zero(),
            _ => false,
        };
        if negative {
            return Err(CoercionError::OutOfRange {
                column: spec.name.to_string(),
                row,
                message: format!("'{raw}' must not be negative"),
            });
        }
    }

    Ok(cast)
}

/// Plain integers, or decimals with a zero fractional part ("19.0").
fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        let value = parse_decimal(raw)?;
        if value.fract().is_zero() {
            value.to_i64()
        } else {
            None
        }
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Step 3: wrap categories
// =============================================================================

/// One category per record: the raw value is wrapped, never split.
pub fn wrap_categories(table: &mut Table) {
    table.map_column(CATEGORIES_COLUMN, |cell| Cell::List(vec![cell]));
}

// =============================================================================
// Step 4: fill
// =============================================================================

/// Replace missing cells of declared columns with their type's default.
pub fn fill_missing(table: &mut Table) {
    let names: Vec<String> = table.column_names().map(str::to_string).collect();

    for name in names {
        let Some(ty) = column_type(&name) else {
            continue;
        };
        table.map_column(&name, |cell| fill_cell(ty, cell));
    }
}

fn fill_cell(ty: ColumnType, cell: Cell) -> Cell {
    match cell {
        Cell::Missing => default_for(ty),
        Cell::List(items) => Cell::List(items.into_iter().map(|c| fill_cell(ty, c)).collect()),
        other => other,
    }
}

/// Default for a missing value. Booleans have none.
pub fn default_for(ty: ColumnType) -> Cell {
    match ty {
        ColumnType::Integer => Cell::Integer(0),
        ColumnType::Decimal => Cell::Decimal(Decimal::ZERO),
        ColumnType::Text => Cell::Text(String::new()),
        ColumnType::Boolean => Cell::Missing,
    }
}

// =============================================================================
// Record extraction
// =============================================================================

fn build_records(table: &Table) -> CoercionResult<Vec<ProductRecord>> {
    (0..table.row_count())
        .map(|row| RowView { table, row }.to_record())
        .collect()
}

/// Typed accessors over one normalized row.
struct RowView<'a> {
    table: &'a Table,
    row: usize,
}

impl RowView<'_> {
    fn cell(&self, column: &str) -> CoercionResult<&Cell> {
        self.table
            .cell(self.row, column)
            .ok_or_else(|| CoercionError::UnexpectedShape(column.to_string()))
    }

    fn text(&self, column: &str) -> CoercionResult<String> {
        match self.cell(column)? {
            Cell::Text(v) => Ok(v.clone()),
            _ => Err(CoercionError::UnexpectedShape(column.to_string())),
        }
    }

    fn integer(&self, column: &str) -> CoercionResult<i64> {
        match self.cell(column)? {
            Cell::Integer(v) => Ok(*v),
            _ => Err(CoercionError::UnexpectedShape(column.to_string())),
        }
    }

    fn decimal(&self, column: &str) -> CoercionResult<Decimal> {
        match self.cell(column)? {
            Cell::Decimal(v) => Ok(*v),
            _ => Err(CoercionError::UnexpectedShape(column.to_string())),
        }
    }

    fn boolean(&self, column: &str) -> CoercionResult<bool> {
        match self.cell(column)? {
            Cell::Boolean(v) => Ok(*v),
            _ => Err(CoercionError::UnexpectedShape(column.to_string())),
        }
    }

    fn text_list(&self, column: &str) -> CoercionResult<Vec<String>> {
        let Cell::List(items) = self.cell(column)? else {
            return Err(CoercionError::UnexpectedShape(column.to_string()));
        };
        items
            .iter()
            .map(|item| match item {
                Cell::Text(v) => Ok(v.clone()),
                _ => Err(CoercionError::UnexpectedShape(column.to_string())),
            })
            .collect()
    }

    fn to_record(&self) -> CoercionResult<ProductRecord> {
        Ok(ProductRecord {
            row: self.row,
            shop: self.text(SHOP_COLUMN)?,
            product: CatalogProduct {
                product_number: self.text("productNumber")?,
                name: self.text("name")?,
                long_description: self.text(LONG_DESCRIPTION_FIELD)?,
                price_gross: self.decimal("priceGross")?,
                price_net: self.decimal("priceNet")?,
                country_tax: self.integer("countryTax")?,
                measure_unit: self.text("measureUnit")?,
                base_measure_unit: self.text("baseMeasureUnit")?,
                measure_quantity: self.decimal("measureQuantity")?,
                base_measure_quantity: self.decimal("baseMeasureQuantity")?,
                categories: self.text_list(CATEGORIES_COLUMN)?,
                images: self.text("images")?,
                keywords: self.text("keywords")?,
                stock: self.decimal("stock")?,
                ean: self.text("ean")?,
                active: self.boolean("active")?,
                force_images_update: self.boolean("force_images_update")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_bytes;

    const HEADER: &str = "shop;productNumber;name;description;priceGross;priceNet;countryTax;\
measureUnit;baseMeasureUnit;measureQuantity;baseMeasureQuantity;categories;images;keywords;\
stock;ean;active;force_images_update";

    fn normalize_csv(rows: &[&str]) -> CoercionResult<Vec<ProductRecord>> {
        let content = format!("{HEADER}\n{}", rows.join("\n"));
        let table = parse_bytes(content.as_bytes(), b';').unwrap();
        normalize(table)
    }

    const FULL_ROW: &str = "ShopA;P-1;Chair;Oak chair;119.00;100.00;19;piece;piece;1;1;Furniture;\
https://cdn.example.com/a.jpg;chair;5;04006381333931;true;false";

    #[test]
    fn test_full_row() {
        let records = normalize_csv(&[FULL_ROW]).unwrap();
        let record = &records[0];

        assert_eq!(record.row, 0);
        assert_eq!(record.shop, "ShopA");
        assert_eq!(record.product.long_description, "Oak chair");
        assert_eq!(record.product.price_gross, Decimal::new(11900, 2));
        assert_eq!(record.product.country_tax, 19);
        assert_eq!(record.product.categories, vec!["Furniture".to_string()]);
        assert_eq!(record.product.ean, "04006381333931");
        assert!(record.product.active);
        assert!(!record.product.force_images_update);
    }

    #[test]
    fn test_missing_values_get_typed_defaults() {
        let row = format!("ShopA{}false;0", ";".repeat(16));
        let records = normalize_csv(&[&row]).unwrap();
        let p = &records[0].product;

        assert_eq!(p.product_number, "");
        assert_eq!(p.name, "");
        assert_eq!(p.long_description, "");
        assert_eq!(p.price_gross, Decimal::ZERO);
        assert_eq!(p.price_net, Decimal::ZERO);
        assert_eq!(p.country_tax, 0);
        assert_eq!(p.measure_quantity, Decimal::ZERO);
        assert_eq!(p.base_measure_quantity, Decimal::ZERO);
        assert_eq!(p.stock, Decimal::ZERO);
        assert_eq!(p.images, "");
        assert_eq!(p.keywords, "");
        assert_eq!(p.categories, vec![String::new()]);
    }

    #[test]
    fn test_missing_shop_becomes_empty_string() {
        let row = format!(";P-1{}true;true", ";".repeat(15));
        let records = normalize_csv(&[&row]).unwrap();
        assert_eq!(records[0].shop, "");
    }

    #[test]
    fn test_categories_never_split() {
        let row = FULL_ROW.replace("Furniture", "Furniture,Outdoor");
        let records = normalize_csv(&[&row]).unwrap();
        assert_eq!(records[0].product.categories, vec!["Furniture,Outdoor".to_string()]);
    }

    #[test]
    fn test_extra_column_cannot_shadow_renamed_description() {
        let content = format!("longDescription;{HEADER};supplier\nSTALE;{FULL_ROW};ACME");
        let table = parse_bytes(content.as_bytes(), b';').unwrap();

        let records = normalize(table).unwrap();
        assert_eq!(records[0].product.long_description, "Oak chair");
        assert_eq!(records[0].shop, "ShopA");
    }

    #[test]
    fn test_text_columns_keep_numeric_looking_values() {
        let row = FULL_ROW.replace("P-1", "00042");
        let records = normalize_csv(&[&row]).unwrap();
        assert_eq!(records[0].product.product_number, "00042");
    }

    #[test]
    fn test_missing_boolean_is_error() {
        let row = FULL_ROW.replace(";true;false", ";;false");
        let err = normalize_csv(&[&row]).unwrap_err();
        assert!(
            matches!(err, CoercionError::MissingValue { ref column, row: 0, .. } if column == "active"),
            "got {err:?}"
        );
    }

    #[test]
    fn test_bad_decimal_names_column_and_value() {
        let ok = FULL_ROW;
        let bad = FULL_ROW.replace("119.00", "12,50");
        let err = normalize_csv(&[ok, &bad]).unwrap_err();
        assert_eq!(
            err,
            CoercionError::InvalidValue {
                column: "priceGross".into(),
                row: 1,
                value: "12,50".into(),
                expected: ColumnType::Decimal,
            }
        );
    }

    #[test]
    fn test_negative_price_rejected() {
        let row = FULL_ROW.replace("100.00", "-1");
        let err = normalize_csv(&[&row]).unwrap_err();
        assert!(matches!(err, CoercionError::OutOfRange { ref column, .. } if column == "priceNet"));
    }

    #[test]
    fn test_negative_stock_allowed() {
        let row = FULL_ROW.replace(";chair;5;", ";chair;-2;");
        let records = normalize_csv(&[&row]).unwrap();
        assert_eq!(records[0].product.stock, Decimal::new(-2, 0));
    }

    #[test]
    fn test_parse_integer_variants() {
        assert_eq!(parse_integer("19"), Some(19));
        assert_eq!(parse_integer("19.0"), Some(19));
        assert_eq!(parse_integer("19.5"), None);
        assert_eq!(parse_integer("abc"), None);
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_decimal_scientific() {
        assert_eq!(parse_decimal("1e3"), Some(Decimal::new(1000, 0)));
        assert_eq!(parse_decimal("2.5"), Some(Decimal::new(25, 1)));
    }

    #[test]
    fn test_shop_is_not_cast() {
        let mut table = parse_bytes(format!("{HEADER}\n{FULL_ROW}").as_bytes(), b';').unwrap();
        cast_columns(&mut table).unwrap();
        assert_eq!(table.cell(0, "shop"), Some(&Cell::Text("ShopA".into())));
        assert_eq!(table.cell(0, "countryTax"), Some(&Cell::Integer(19)));
    }

    #[test]
    fn test_default_for() {
        assert_eq!(default_for(ColumnType::Integer), Cell::Integer(0));
        assert_eq!(default_for(ColumnType::Decimal), Cell::Decimal(Decimal::ZERO));
        assert_eq!(default_for(ColumnType::Text), Cell::Text(String::new()));
        assert_eq!(default_for(ColumnType::Boolean), Cell::Missing);
    }
}
