//! HTTP client for the upstream product-ingestion endpoint.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use super::credentials::ShopCredentials;
use crate::error::DispatchError;
use crate::models::{CatalogProduct, FailureDetail};

/// Header carrying the upstream account id.
pub const ACCOUNT_HEADER: &str = "X-Account";

/// Status recorded when a submission got no HTTP response at all.
pub const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Status recorded for every record of a shop without credentials.
pub const MISSING_CREDENTIALS_STATUS: u16 = 401;

/// Status recorded when the shop's HTTP client could not be created.
pub const CLIENT_FAILURE_STATUS: u16 = 500;

/// One connection pool toward the upstream API.
///
/// The dispatcher builds one per shop so connection faults stay isolated.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CatalogClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// POST one product. Any non-2xx status is an error carrying the body.
    pub async fn submit(
        &self,
        credentials: &ShopCredentials,
        product: &CatalogProduct,
    ) -> Result<(), DispatchError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCOUNT_HEADER, &credentials.account_id)
            .header(AUTHORIZATION, format!("ApiKey {}", credentials.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "*/*")
            .json(product)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Err(DispatchError::UpstreamRejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl DispatchError {
    /// Failure-map entry for a record that hit this error.
    pub fn to_failure(&self) -> FailureDetail {
        match self {
            DispatchError::UpstreamRejected { status, body } => FailureDetail {
                content: body_content(body),
                status_code: *status,
            },
            DispatchError::MissingCredentials { .. } => FailureDetail {
                content: Value::String(self.to_string()),
                status_code: MISSING_CREDENTIALS_STATUS,
            },
            DispatchError::Transport(_) => FailureDetail {
                content: Value::String(self.to_string()),
                status_code: TRANSPORT_FAILURE_STATUS,
            },
            DispatchError::ClientBuild(_) => FailureDetail {
                content: Value::String(self.to_string()),
                status_code: CLIENT_FAILURE_STATUS,
            },
        }
    }
}

/// JSON bodies are kept structured, anything else as text.
fn body_content(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
