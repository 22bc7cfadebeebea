use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::domain::ports::{CacheProvider, SideEffectError};

/// How long an invalidation is remembered. Fills from reads that started
/// before it are refused for this long.
const INVALIDATION_MEMORY: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Entries {
    values: HashMap<String, (String, Instant)>,
    invalidated: HashMap<String, Instant>,
}

/// Process-local cache with per-entry expiry.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<Entries>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> SideEffectError {
        SideEffectError::Cache("cache lock poisoned".to_string())
    }
}

impl CacheProvider for InMemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, SideEffectError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries
            .values
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        read_at: Instant,
    ) -> Result<(), SideEffectError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let now = Instant::now();
        entries.values.retain(|_, (_, expires_at)| *expires_at > now);
        entries
            .invalidated
            .retain(|_, at| now.duration_since(*at) < INVALIDATION_MEMORY);

        if entries.invalidated.get(key).is_some_and(|at| *at >= read_at) {
            log::debug!("skipping fill of {}: invalidated after the read", key);
            return Ok(());
        }
        entries.values.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), SideEffectError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.values.remove(key);
        entries.invalidated.insert(key.to_string(), Instant::now());
        Ok(())
    }
}

/// Stand-in used when caching is disabled: never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl CacheProvider for NoopCache {
    fn get(&self, _key: &str) -> Result<Option<String>, SideEffectError> {
        Ok(None)
    }

    fn set(
        &self,
        _key: &str,
        _value: String,
        _ttl: Duration,
        _read_at: Instant,
    ) -> Result<(), SideEffectError> {
        Ok(())
    }

    fn invalidate(&self, _key: &str) -> Result<(), SideEffectError> {
        Ok(())
    }
}
