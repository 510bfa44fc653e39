//! End-to-end integration of one upload.
//!
//! ```text
//! bytes ─▶ parse ─▶ validate_schema ─▶ normalize ─▶ partition_by_shop ─▶ dispatch ─▶ aggregate
//! ```
//!
//! Everything up to partitioning is synchronous and fails the whole upload
//! on the first error. Dispatch never fails the upload; per-record failures
//! end up in the [`IntegrationReport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_relay::{integrate_bytes, Dispatcher, PipelineOptions};
//!
//! let report = integrate_bytes(&bytes, &PipelineOptions::default(), &dispatcher).await?;
//! println!("{} records failed", report.failure_count());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use super::normalize::normalize;
use super::partition::partition_by_shop;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::models::{IntegrationReport, ProductRecord, ReportDetail, ShopOutcome, ShopPartition};
use crate::parser::{parse_bytes, parse_file, DEFAULT_DELIMITER};
use crate::table::Table;
use crate::validation::validate_schema;

/// Options for the integration pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Field delimiter of the upload.
    pub delimiter: u8,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Validate and normalize a parsed table.
pub fn prepare_table(table: Table) -> Result<Vec<ProductRecord>, PipelineError> {
    let table = validate_schema(table)?;
    Ok(normalize(table)?)
}

/// Parse, validate, normalize and partition an upload.
pub fn prepare_bytes(
    bytes: &[u8],
    options: &PipelineOptions,
) -> Result<Vec<ShopPartition>, PipelineError> {
    let table = parse_bytes(bytes, options.delimiter)?;
    log_info(format!(
        "Parsed {} rows, {} columns",
        table.row_count(),
        table.columns().len()
    ));

    let records = prepare_table(table)?;
    let partitions = partition_by_shop(records);
    log_success(format!(
        "Validated {} records across {} shops",
        partitions.iter().map(|p| p.records.len()).sum::<usize>(),
        partitions.len()
    ));

    Ok(partitions)
}

/// Same as [`prepare_bytes`] for a file on disk.
pub fn prepare_file<P: AsRef<Path>>(
    path: P,
    options: &PipelineOptions,
) -> Result<Vec<ShopPartition>, PipelineError> {
    let table = parse_file(path, options.delimiter)?;
    let records = prepare_table(table)?;
    Ok(partition_by_shop(records))
}

/// Run the whole pipeline for one upload.
pub async fn integrate_bytes(
    bytes: &[u8],
    options: &PipelineOptions,
    dispatcher: &Dispatcher,
) -> Result<IntegrationReport, PipelineError> {
    let partitions = prepare_bytes(bytes, options)?;
    let outcomes = dispatcher.dispatch(partitions).await;
    let report = aggregate(outcomes);

    let failed = report.failure_count();
    if failed == 0 {
        log_success("All records accepted upstream");
    } else {
        log_warning(format!("{failed} records rejected upstream"));
    }

    Ok(report)
}

/// Fold per-shop outcomes into the report. Every shop gets a key.
pub fn aggregate(outcomes: Vec<ShopOutcome>) -> IntegrationReport {
    let failed: BTreeMap<_, _> = outcomes
        .into_iter()
        .map(|outcome| (outcome.shop, outcome.failures))
        .collect();

    IntegrationReport {
        detail: ReportDetail { failed },
    }
}
