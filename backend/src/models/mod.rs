//! Domain models for the catalog relay pipeline.
//!
//! - [`CATALOG_COLUMNS`] - the fixed upload schema
//! - [`ProductRecord`] - one normalized row, still carrying its shop
//! - [`CatalogProduct`] - the payload sent to the upstream catalog API
//! - [`FailureDetail`] / [`IntegrationReport`] - the per-shop failure report

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::table::ColumnType;

// =============================================================================
// Upload Schema
// =============================================================================

/// Partition key column.
pub const SHOP_COLUMN: &str = "shop";

/// Column holding the long description in the upload.
pub const DESCRIPTION_COLUMN: &str = "description";

/// Name of the description field in the upstream vocabulary.
pub const LONG_DESCRIPTION_FIELD: &str = "longDescription";

/// Column wrapped into a one-element list.
pub const CATEGORIES_COLUMN: &str = "categories";

/// A declared upload column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    /// Reject negative values (numeric columns only).
    pub non_negative: bool,
}

const fn col(name: &'static str, ty: ColumnType) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        non_negative: false,
    }
}

const fn price(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: ColumnType::Decimal,
        non_negative: true,
    }
}

/// The 18 required upload columns, pre-rename.
pub const CATALOG_COLUMNS: [ColumnSpec; 18] = [
    col(SHOP_COLUMN, ColumnType::Text),
    col("productNumber", ColumnType::Text),
    col("name", ColumnType::Text),
    col(DESCRIPTION_COLUMN, ColumnType::Text),
    price("priceGross"),
    price("priceNet"),
    col("countryTax", ColumnType::Integer),
    col("measureUnit", ColumnType::Text),
    col("baseMeasureUnit", ColumnType::Text),
    col("measureQuantity", ColumnType::Decimal),
    col("baseMeasureQuantity", ColumnType::Decimal),
    col(CATEGORIES_COLUMN, ColumnType::Text),
    col("images", ColumnType::Text),
    col("keywords", ColumnType::Text),
    col("stock", ColumnType::Decimal),
    col("ean", ColumnType::Text),
    col("active", ColumnType::Boolean),
    col("force_images_update", ColumnType::Boolean),
];

/// Target type of a column by its post-rename name.
pub fn column_type(name: &str) -> Option<ColumnType> {
    let name = if name == LONG_DESCRIPTION_FIELD {
        DESCRIPTION_COLUMN
    } else {
        name
    };
    CATALOG_COLUMNS
        .iter()
        .find(|spec| spec.name == name)
        .map(|spec| spec.ty)
}

// =============================================================================
// Product Records
// =============================================================================

/// One product as accepted by the upstream catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub product_number: String,
    pub name: String,
    pub long_description: String,
    pub price_gross: Decimal,
    pub price_net: Decimal,
    pub country_tax: i64,
    pub measure_unit: String,
    pub base_measure_unit: String,
    pub measure_quantity: Decimal,
    pub base_measure_quantity: Decimal,
    /// Always exactly one element.
    pub categories: Vec<String>,
    /// Opaque; may encode several URLs.
    pub images: String,
    pub keywords: String,
    pub stock: Decimal,
    pub ean: String,
    pub active: bool,
    #[serde(rename = "force_images_update")]
    pub force_images_update: bool,
}

/// A normalized upload row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    /// Zero-based data row index in the upload; identifies the record in reports.
    pub row: usize,
    pub shop: String,
    pub product: CatalogProduct,
}

/// A record once its shop has been factored out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedProduct {
    pub row: usize,
    pub product: CatalogProduct,
}

/// All records for one shop, in upload order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopPartition {
    pub shop: String,
    pub records: Vec<IndexedProduct>,
}

// =============================================================================
// Dispatch Report
// =============================================================================

/// Why one record was not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Response body: JSON when it parses, raw text otherwise.
    pub content: Value,
    pub status_code: u16,
}

/// Failures for a shop keyed by row index. Empty when everything succeeded.
pub type ShopFailures = BTreeMap<usize, FailureDetail>;

/// Dispatch result for one shop.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopOutcome {
    pub shop: String,
    pub failures: ShopFailures,
}

/// Response body of a completed integration.
///
/// Serializes as `{"detail": {"failed": {<shop>: {<row>: {...}}}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationReport {
    pub detail: ReportDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetail {
    pub failed: BTreeMap<String, ShopFailures>,
}

impl IntegrationReport {
    /// Number of failed records across all shops.
    pub fn failure_count(&self) -> usize {
        self.detail.failed.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn product() -> CatalogProduct {
        CatalogProduct {
            product_number: "P-1".into(),
            name: "Chair".into(),
            long_description: "Oak chair".into(),
            price_gross: Decimal::new(11900, 2),
            price_net: Decimal::new(10000, 2),
            country_tax: 19,
            measure_unit: "piece".into(),
            base_measure_unit: "piece".into(),
            measure_quantity: Decimal::ONE,
            base_measure_quantity: Decimal::ONE,
            categories: vec!["Furniture".into()],
            images: "https://cdn.example.com/chair.jpg".into(),
            keywords: "chair,oak".into(),
            stock: Decimal::new(5, 0),
            ean: "4006381333931".into(),
            active: true,
            force_images_update: false,
        }
    }

    #[test]
    fn test_schema_has_eighteen_unique_columns() {
        let mut names: Vec<_> = CATALOG_COLUMNS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 18);
    }

    #[test]
    fn test_column_type_follows_rename() {
        assert_eq!(column_type(LONG_DESCRIPTION_FIELD), Some(ColumnType::Text));
        assert_eq!(column_type("countryTax"), Some(ColumnType::Integer));
        assert_eq!(column_type("unknown"), None);
    }

    #[test]
    fn test_product_uses_upstream_field_names() {
        let value = serde_json::to_value(product()).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 17);
        assert_eq!(value["productNumber"], "P-1");
        assert_eq!(value["longDescription"], "Oak chair");
        assert_eq!(value["countryTax"], 19);
        assert_eq!(value["priceGross"], json!(119.0));
        assert_eq!(value["categories"], json!(["Furniture"]));
        assert_eq!(value["force_images_update"], false);
        assert!(obj.get("shop").is_none());
        assert!(obj.get("description").is_none());
    }

    #[test]
    fn test_report_shape() {
        let mut failures = ShopFailures::new();
        failures.insert(
            2,
            FailureDetail {
                content: json!({"error": "duplicate"}),
                status_code: 409,
            },
        );
        let mut failed = BTreeMap::new();
        failed.insert("ShopA".to_string(), ShopFailures::new());
        failed.insert("ShopB".to_string(), failures);
        let report = IntegrationReport {
            detail: ReportDetail { failed },
        };

        assert_eq!(report.failure_count(), 1);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"detail": {"failed": {
                "ShopA": {},
                "ShopB": {"2": {"content": {"error": "duplicate"}, "status_code": 409}}
            }}})
        );
    }
}
