//! Per-shop upstream credentials.
//!
//! A shop name maps to a lookup key by upper-casing it and removing all
//! whitespace (`"My Shop"` → `MYSHOP`). The account id is read from
//! `{KEY}_POA` and the API key from `{KEY}_API_KEY`.

use std::collections::HashMap;

use crate::error::DispatchError;

/// Read-only key/value source for shop credentials.
pub trait CredentialSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory credentials, e.g. for tests or a preloaded secrets file.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register both credentials for a shop under its derived key.
    pub fn with_shop(
        mut self,
        shop: &str,
        account_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let key = credential_key(shop);
        self.values.insert(format!("{key}_POA"), account_id.into());
        self.values.insert(format!("{key}_API_KEY"), api_key.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticCredentials {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Resolved credentials for one shop.
#[derive(Clone, PartialEq, Eq)]
pub struct ShopCredentials {
    pub account_id: String,
    pub api_key: String,
}

impl std::fmt::Debug for ShopCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopCredentials")
            .field("account_id", &self.account_id)
            .field("api_key", &"[redacted]")
            .finish()
    }
}

/// Environment-style key for a shop name.
pub fn credential_key(shop: &str) -> String {
    shop.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Look up both credentials for `shop`. Empty values count as absent.
pub fn resolve_credentials(
    source: &dyn CredentialSource,
    shop: &str,
) -> Result<ShopCredentials, DispatchError> {
    let key = credential_key(shop);
    let fetch = |suffix: &str| {
        source
            .get(&format!("{key}_{suffix}"))
            .filter(|v| !v.trim().is_empty())
    };

    match (fetch("POA"), fetch("API_KEY")) {
        (Some(account_id), Some(api_key)) => Ok(ShopCredentials {
            account_id,
            api_key,
        }),
        _ => Err(DispatchError::MissingCredentials {
            shop: shop.to_string(),
        }),
    }
}
