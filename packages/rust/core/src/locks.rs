//! Per-site crawl locks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One mutex per site URL. Holding a site's guard across crawl + publish
/// keeps the registry's read-then-write single-writer for that site;
/// distinct sites proceed in parallel.
#[derive(Default)]
pub struct SiteLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SiteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a site, creating it on first use. The guard
    /// is owned so it can be held across awaits.
    pub async fn acquire(&self, site_url: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(site_url.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
