//! Relay shop partitions to the upstream catalog API.
//!
//! For each shop, independently:
//!
//! 1. resolve credentials; without them every record of the shop fails
//!    and nothing is sent
//! 2. POST every record through a per-shop client, at most
//!    `max_concurrency` in flight
//! 3. wait for all submissions, then keep only the failures
//!
//! Shops are dispatched concurrently. No retries.

pub mod client;
pub mod credentials;

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::api::logs::{log_info_indent, log_success_indent, log_warning_indent};
use crate::error::DispatchError;
use crate::models::{IndexedProduct, ShopFailures, ShopOutcome, ShopPartition};

pub use client::CatalogClient;
pub use credentials::{
    credential_key, resolve_credentials, CredentialSource, EnvCredentials, ShopCredentials,
    StaticCredentials,
};

/// Upstream endpoint and fan-out limits.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub endpoint: String,
    pub timeout: Duration,
    /// Maximum in-flight submissions per shop (at least 1).
    pub max_concurrency: usize,
}

/// Sends shop partitions upstream using an injected credential source.
#[derive(Clone)]
pub struct Dispatcher {
    settings: DispatchSettings,
    credentials: Arc<dyn CredentialSource>,
}

impl Dispatcher {
    pub fn new(settings: DispatchSettings, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    /// Dispatch every partition. Outcomes come back in partition order.
    pub async fn dispatch(&self, partitions: Vec<ShopPartition>) -> Vec<ShopOutcome> {
        futures::future::join_all(partitions.into_iter().map(|p| self.dispatch_shop(p))).await
    }

    /// Dispatch a single shop's records.
    pub async fn dispatch_shop(&self, partition: ShopPartition) -> ShopOutcome {
        let ShopPartition { shop, records } = partition;

        let credentials = match resolve_credentials(self.credentials.as_ref(), &shop) {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!(shop = %shop, records = records.len(), "no upstream credentials for shop");
                log_warning_indent(format!("{shop}: {e}, {} records skipped", records.len()), 1);
                return fail_all(shop, &records, &e);
            }
        };

        let client = match CatalogClient::new(&self.settings.endpoint, self.settings.timeout) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(shop = %shop, error = %e, "could not build upstream client");
                return fail_all(shop, &records, &e);
            }
        };

        log_info_indent(format!("{shop}: sending {} records", records.len()), 1);
        let total = records.len();

        let client = &client;
        let credentials = &credentials;
        let failures: ShopFailures = stream::iter(records)
            .map(|record| async move {
                let result = client.submit(credentials, &record.product).await;
                (record.row, result)
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .filter_map(|(row, result)| async move {
                result.err().map(|e| {
                    tracing::debug!(row, error = %e, "record rejected upstream");
                    (row, e.to_failure())
                })
            })
            .collect()
            .await;

        if failures.is_empty() {
            tracing::info!(shop = %shop, records = total, "all records accepted");
            log_success_indent(format!("{shop}: {total}/{total} accepted"), 1);
        } else {
            tracing::warn!(shop = %shop, records = total, failed = failures.len(), "some records rejected");
            log_warning_indent(format!("{shop}: {}/{total} rejected", failures.len()), 1);
        }

        ShopOutcome { shop, failures }
    }
}

/// Record every row of a shop as failed with the same error.
fn fail_all(shop: String, records: &[IndexedProduct], error: &DispatchError) -> ShopOutcome {
    let failure = error.to_failure();
    let failures = records
        .iter()
        .map(|record| (record.row, failure.clone()))
        .collect();
    ShopOutcome { shop, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::product;

    fn partition(shop: &str, rows: &[usize]) -> ShopPartition {
        ShopPartition {
            shop: shop.to_string(),
            records: rows
                .iter()
                .map(|&row| IndexedProduct {
                    row,
                    product: product(),
                })
                .collect(),
        }
    }

    fn dispatcher(credentials: StaticCredentials) -> Dispatcher {
        Dispatcher::new(
            DispatchSettings {
                // Nothing listens here; only credential failures are exercised.
                endpoint: "http://127.0.0.1:9/products".into(),
                timeout: Duration::from_secs(1),
                max_concurrency: 2,
            },
            Arc::new(credentials),
        )
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_every_record() {
        let outcome = dispatcher(StaticCredentials::new())
            .dispatch_shop(partition("ShopB", &[1, 4]))
            .await;

        assert_eq!(outcome.shop, "ShopB");
        assert_eq!(outcome.failures.keys().copied().collect::<Vec<_>>(), vec![1, 4]);
        assert!(outcome.failures.values().all(|f| f.status_code == 401));
    }

    #[tokio::test]
    async fn test_empty_partition_has_empty_failures() {
        let creds = StaticCredentials::new().with_shop("ShopA", "acc", "key");
        let outcome = dispatcher(creds).dispatch_shop(partition("ShopA", &[])).await;
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_follow_partition_order() {
        let outcomes = dispatcher(StaticCredentials::new())
            .dispatch(vec![partition("B", &[0]), partition("A", &[1])])
            .await;
        let shops: Vec<_> = outcomes.iter().map(|o| o.shop.as_str()).collect();
        assert_eq!(shops, vec!["B", "A"]);
    }

    #[test]
    fn test_fail_all_uses_row_keys() {
        let err = DispatchError::MissingCredentials { shop: "S".into() };
        let outcome = fail_all("S".into(), &partition("S", &[7, 9]).records, &err);
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.failures.contains_key(&7));
    }
}
