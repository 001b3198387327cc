//! Report cache: a get-or-compute wrapper around a key-value store
//!
//! Cache failures never reach the caller. A failing `get` is treated as a
//! miss and a failing `set` is logged and ignored.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

pub mod store;

pub use store::{CacheError, CacheStore, InMemoryStore, RedisStore};

/// Time-to-live by report volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTtl {
    /// Dashboard stats
    Dashboard,
    /// Points and consumption records
    Consumption,
    /// Revenue and COGS breakdowns
    Revenue,
    /// Customer segments, category and product distribution
    Distribution,
    /// Yearly aggregates
    Yearly,
}

impl ReportTtl {
    pub fn duration(&self) -> Duration {
        let secs = match self {
            ReportTtl::Dashboard => 5 * 60,
            ReportTtl::Consumption => 15 * 60,
            ReportTtl::Revenue => 30 * 60,
            ReportTtl::Distribution => 60 * 60,
            ReportTtl::Yearly => 2 * 60 * 60,
        };
        Duration::from_secs(secs)
    }
}

/// Build `<namespace>:<report>:<k1>:<v1>:<k2>:<v2>...` with parameters sorted by name.
///
/// Parameters are serialized to a JSON object first; string values are
/// rendered without quotes and everything else in its JSON form.
pub fn cache_key<P: Serialize>(
    namespace: &str,
    report: &str,
    params: &P,
) -> Result<String, CacheError> {
    let value = serde_json::to_value(params)?;
    let mut key = format!("{}:{}", namespace, report);

    if let serde_json::Value::Object(map) = value {
        let mut fields: Vec<(String, serde_json::Value)> = map.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, value) in fields {
            let rendered = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            key.push(':');
            key.push_str(&name);
            key.push(':');
            key.push_str(&rendered);
        }
    }

    Ok(key)
}

/// Get-or-compute wrapper shared by every reporting entry point
#[derive(Clone)]
pub struct ReportCache {
    store: Option<Arc<dyn CacheStore>>,
    namespace: String,
}

impl ReportCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            namespace: namespace.into(),
        }
    }

    /// A cache that always computes
    pub fn disabled() -> Self {
        Self {
            store: None,
            namespace: "reports".to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn key<P: Serialize>(&self, report: &str, params: &P) -> Result<String, CacheError> {
        cache_key(&self.namespace, report, params)
    }

    /// Return the cached value for `report` + `params`, computing and
    /// storing it with `ttl` on a miss.
    pub async fn get_or_compute<T, P, E, F, Fut>(
        &self,
        report: &str,
        params: &P,
        ttl: ReportTtl,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(store) = &self.store else {
            return compute().await;
        };

        let key = match self.key(report, params) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Cache key for {} could not be built: {}", report, e);
                return compute().await;
            }
        };

        match store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!("Cache hit: {}", key);
                    return Ok(value);
                }
                Err(e) => tracing::warn!("Discarding unreadable cache entry {}: {}", key, e),
            },
            Ok(None) => tracing::debug!("Cache miss: {}", key),
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = store.set(&key, &raw, ttl.duration()).await {
                    tracing::warn!("Cache write failed for {}: {}", key, e);
                }
            }
            Err(e) => {
                tracing::warn!("Report {} could not be serialized for caching: {}", report, e)
            }
        }

        Ok(value)
    }

    /// Drop a cached report, ignoring store failures
    pub async fn invalidate<P: Serialize>(&self, report: &str, params: &P) {
        let Some(store) = &self.store else {
            return;
        };
        if let Ok(key) = self.key(report, params) {
            if let Err(e) = store.delete(&key).await {
                tracing::warn!("Cache delete failed for {}: {}", key, e);
            }
        }
    }
}
