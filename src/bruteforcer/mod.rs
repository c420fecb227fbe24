pub mod aggregator;
pub mod progress;
pub mod queue;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::trace;

use crate::events::{EventSink, ScanEvent};
use crate::wordlist::Candidate;

use self::aggregator::ResultAggregator;
use self::progress::ProgressMonitor;
use self::queue::TaskQueue;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0";

/// What was observed for a path that exists (status below 400).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status_code: u16,
    pub content_type: String,
    pub content_length: u64,
    pub redirect_url: String,
}

impl ProbeResult {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot join '{path}' onto {base}: {message}")]
    InvalidUrl {
        base: String,
        path: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Turns a response into a result, or `None` when the path counts as absent.
pub fn classify_response(
    status_code: u16,
    content_type: Option<&str>,
    location: Option<&str>,
    content_length: u64,
) -> Option<ProbeResult> {
    if status_code >= 400 {
        return None;
    }
    let redirect_url = if (300..400).contains(&status_code) {
        location.unwrap_or_default().to_string()
    } else {
        String::new()
    };
    Some(ProbeResult {
        status_code,
        content_type: content_type.unwrap_or_default().to_string(),
        content_length,
        redirect_url,
    })
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

/// Client shared by the preflight and every worker of a run. Redirects are never followed.
pub fn build_probe_client(config: &ClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(redirect::Policy::none())
        .timeout(config.timeout)
        .danger_accept_invalid_hostnames(config.accept_invalid_certs)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
}

/// Single reachability check of a port's base URL. Any HTTP response counts as reachable.
pub async fn preflight(client: &reqwest::Client, base_url: &Url) -> Result<u16, reqwest::Error> {
    let resp = client.get(base_url.clone()).send().await?;
    Ok(resp.status().as_u16())
}

fn header_lossy(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

pub async fn probe(
    client: &reqwest::Client,
    base_url: &Url,
    path: &str,
) -> Result<Option<ProbeResult>, ProbeError> {
    let url = base_url.join(path).map_err(|e| ProbeError::InvalidUrl {
        base: base_url.to_string(),
        path: path.to_string(),
        message: e.to_string(),
    })?;
    let mut resp = client.get(url).send().await?;
    let status_code = resp.status().as_u16();
    if status_code >= 400 {
        return Ok(None);
    }
    let content_type = header_lossy(resp.headers(), CONTENT_TYPE);
    let location = header_lossy(resp.headers(), LOCATION);
    // bodies are counted chunk by chunk, never held whole
    let mut content_length = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        content_length += chunk.len() as u64;
    }
    Ok(classify_response(
        status_code,
        content_type.as_deref(),
        location.as_deref(),
        content_length,
    ))
}

struct Prober {
    client: reqwest::Client,
    base_url: Url,
    port: u16,
    queue: Arc<TaskQueue>,
    aggregator: Arc<ResultAggregator>,
    events: EventSink,
}

// drains the shared queue until it reports empty
async fn run_prober(prober: Prober) {
    while let Some(candidate) = prober.queue.pop() {
        let path = candidate.path();
        match probe(&prober.client, &prober.base_url, &path).await {
            Ok(Some(result)) => {
                let found = prober.aggregator.record(path.clone(), result.clone()).await;
                prober.events.emit(ScanEvent::CandidateFound {
                    port: prober.port,
                    path,
                    result,
                    found,
                });
            }
            Ok(None) => prober.aggregator.reject(&path).await,
            Err(e) => trace!(port = prober.port, %path, error = %e, "probe discarded"),
        }
        prober.queue.mark_processed();
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub port: u16,
    pub base_url: Url,
    pub concurrency: usize,
    pub progress_interval: Duration,
}

#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub results: BTreeMap<String, ProbeResult>,
    pub found: usize,
    pub probed: usize,
    pub elapsed: Duration,
}

/// Probes every candidate once against one port with a bounded pool of workers.
///
/// The calling task samples progress while the pool runs and emits a final sample once
/// every worker has joined. A worker that dies fails the whole session; the remaining
/// workers are aborted when the pool is dropped.
pub async fn run_session(
    client: &reqwest::Client,
    config: SessionConfig,
    candidates: Vec<Candidate>,
    events: &EventSink,
) -> Result<SessionOutcome, JoinError> {
    let SessionConfig {
        port,
        base_url,
        concurrency,
        progress_interval,
    } = config;

    let queue = Arc::new(TaskQueue::new(candidates));
    let aggregator = Arc::new(ResultAggregator::new());
    let total = queue.total();
    let pool_size = concurrency.min(total);
    let monitor = ProgressMonitor::new(port, total);

    events.emit(ScanEvent::SessionStarted {
        port,
        base_url: base_url.to_string(),
        candidates: total,
        workers: pool_size,
    });

    let mut pool = JoinSet::new();
    for _ in 0..pool_size {
        pool.spawn(run_prober(Prober {
            client: client.clone(),
            base_url: base_url.clone(),
            port,
            queue: queue.clone(),
            aggregator: aggregator.clone(),
            events: events.clone(),
        }));
    }

    let period = progress_interval.max(Duration::from_millis(10));
    let mut ticker = tokio::time::interval_at(monitor.started_at() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            joined = pool.join_next() => match joined {
                Some(Ok(())) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            },
            _ = ticker.tick() => {
                events.emit(ScanEvent::Progress(monitor.sample(queue.processed())));
            }
        }
    }

    let probed = queue.processed();
    events.emit(ScanEvent::Progress(monitor.sample(probed)));

    let found = aggregator.found().await;
    let results = match Arc::try_unwrap(aggregator) {
        Ok(aggregator) => aggregator.into_results(),
        Err(shared) => shared.snapshot().await,
    };
    let elapsed = monitor.started_at().elapsed();

    events.emit(ScanEvent::SessionCompleted {
        port,
        found,
        elapsed,
    });

    Ok(SessionOutcome {
        results,
        found,
        probed,
        elapsed,
    })
}
