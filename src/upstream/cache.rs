use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::UpstreamError;
use crate::upstream::{UpstreamResolver, UpstreamVersion};

#[derive(Debug, Clone)]
struct CachedVersion {
    captured_at: DateTime<Utc>,
    version: UpstreamVersion,
}

/// Keeps successful lookups for `ttl`. Errors pass through uncached so the
/// next refresh retries them.
pub struct Cached<R> {
    inner: R,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedVersion>>,
}

impl<R: UpstreamResolver> Cached<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Stale entries are evicted on sight.
    fn get(&self, chart_name: &str) -> Option<UpstreamVersion> {
        let mut guard = self.entries.lock().expect("upstream cache mutex poisoned");
        let entry = guard.get(chart_name)?;
        if Utc::now() - entry.captured_at < self.ttl {
            return Some(entry.version.clone());
        }
        guard.remove(chart_name);
        None
    }

    fn put(&self, chart_name: &str, version: UpstreamVersion) {
        let mut guard = self.entries.lock().expect("upstream cache mutex poisoned");
        guard.insert(
            chart_name.to_string(),
            CachedVersion {
                captured_at: Utc::now(),
                version,
            },
        );
    }
}

#[async_trait]
impl<R: UpstreamResolver> UpstreamResolver for Cached<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn latest(&self, chart_name: &str) -> Result<UpstreamVersion, UpstreamError> {
        if let Some(hit) = self.get(chart_name) {
            debug!(chart = chart_name, "upstream cache hit");
            return Ok(hit);
        }
        let fresh = self.inner.latest(chart_name).await?;
        self.put(chart_name, fresh.clone());
        Ok(fresh)
    }
}
