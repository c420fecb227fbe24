use std::collections::BTreeMap;

use tokio::sync::Mutex;

use super::ProbeResult;

#[derive(Debug, Default)]
struct Findings {
    results: BTreeMap<String, ProbeResult>,
    found: usize,
}

/// Collects accepted probe outcomes of one session behind a single lock.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    inner: Mutex<Findings>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted result and returns the running found count.
    ///
    /// A path seen again overwrites its entry without counting twice, so the count always
    /// equals the number of paths that will be harvested.
    pub async fn record(&self, path: String, result: ProbeResult) -> usize {
        let mut inner = self.inner.lock().await;
        if inner.results.insert(path, result).is_none() {
            inner.found += 1;
        }
        inner.found
    }

    /// Drops a path whose latest probe came back >= 400.
    pub async fn reject(&self, path: &str) {
        let mut inner = self.inner.lock().await;
        if inner.results.remove(path).is_some() {
            inner.found -= 1;
        }
    }

    pub async fn found(&self) -> usize {
        self.inner.lock().await.found
    }

    pub async fn snapshot(&self) -> BTreeMap<String, ProbeResult> {
        self.inner.lock().await.results.clone()
    }

    /// Harvests the map once every worker is gone; no lock is taken.
    pub fn into_results(self) -> BTreeMap<String, ProbeResult> {
        self.inner.into_inner().results
    }
}
