use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bruteforcer::progress::DEFAULT_PROGRESS_INTERVAL;
use crate::bruteforcer::{self, ClientConfig, ProbeResult, SessionConfig};
use crate::events::{EventSink, ScanEvent};
use crate::target;
use crate::wordlist::{self, WordlistSource};

/// path -> result for one port.
pub type PortResults = BTreeMap<String, ProbeResult>;

#[derive(Clone, Debug)]
pub struct Options {
    pub wordlist: WordlistSource,
    pub extensions: Vec<String>,
    pub concurrency: usize,
    pub timeout: Duration,
    pub secure_ports: BTreeSet<u16>,
    /// Recon mode: TLS certificates and hostnames are not verified.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub progress_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            wordlist: WordlistSource::default(),
            extensions: wordlist::default_extensions(),
            concurrency: 10,
            timeout: Duration::from_secs(5),
            secure_ports: target::default_secure_ports(),
            accept_invalid_certs: true,
            user_agent: bruteforcer::DEFAULT_USER_AGENT.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no target provided")]
    NoTarget,

    #[error("invalid concurrency {value}, expected positive integer")]
    InvalidConcurrency { value: usize },

    #[error("invalid timeout, expected a non-zero duration")]
    InvalidTimeout,

    #[error("invalid URL: {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("task join failed: {source}")]
    TaskJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSession {
    pub target: String,
    pub ports: Vec<u16>,
    /// port (as string) -> path -> result. Every port that was attempted has an entry.
    pub results: BTreeMap<String, PortResults>,
    /// Set when the run was cut short; only fully processed ports are present.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl ScanSession {
    fn new(target: &str, ports: &[u16]) -> Self {
        Self {
            target: target.to_string(),
            ports: ports.to_vec(),
            results: BTreeMap::new(),
            interrupted: false,
        }
    }

    pub fn port_results(&self, port: u16) -> Option<&PortResults> {
        self.results.get(&port.to_string())
    }

    pub fn total_found(&self) -> usize {
        self.results.values().map(BTreeMap::len).sum()
    }
}

#[derive(Clone, Debug)]
pub struct Runner {
    options: Options,
    client: reqwest::Client,
    events: EventSink,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        if options.concurrency == 0 {
            return Err(RunnerError::InvalidConcurrency {
                value: options.concurrency,
            });
        }
        if options.timeout.is_zero() {
            return Err(RunnerError::InvalidTimeout);
        }
        let client = bruteforcer::build_probe_client(&ClientConfig {
            timeout: options.timeout,
            user_agent: options.user_agent.clone(),
            accept_invalid_certs: options.accept_invalid_certs,
        })
        .map_err(|e| RunnerError::HttpClientBuild { source: e })?;
        Ok(Self {
            options,
            client,
            events: EventSink::disabled(),
        })
    }

    /// Routes scan events to `events`; without it they are dropped.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Scans every port in order and returns the merged results.
    pub async fn discover(&self, target: &str, ports: &[u16]) -> Result<ScanSession, RunnerError> {
        self.discover_until(target, ports, std::future::pending::<()>())
            .await
    }

    /// Like [`Runner::discover`], but stops as soon as `shutdown` resolves.
    ///
    /// The session in flight at that moment is abandoned and its workers aborted; ports
    /// merged before it are returned with `interrupted` set.
    pub async fn discover_until<F>(
        &self,
        target: &str,
        ports: &[u16],
        shutdown: F,
    ) -> Result<ScanSession, RunnerError>
    where
        F: Future<Output = ()>,
    {
        let target = target.trim();
        if target.is_empty() {
            return Err(RunnerError::NoTarget);
        }

        let started_at = Instant::now();
        let mut session = ScanSession::new(target, ports);
        tokio::pin!(shutdown);

        for &port in ports {
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(port, "interrupted, returning results of completed ports");
                    session.interrupted = true;
                    break;
                }
                outcome = self.scan_port(target, port) => outcome,
            };

            let results = match outcome {
                Ok(results) => results,
                Err(e) => {
                    error!(port, error = %e, "port session failed");
                    self.events.emit(ScanEvent::SessionFailed {
                        port,
                        reason: e.to_string(),
                    });
                    PortResults::new()
                }
            };
            session.results.insert(port.to_string(), results);
        }

        info!(
            target,
            ports = session.results.len(),
            found = session.total_found(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "discovery finished"
        );
        Ok(session)
    }

    async fn scan_port(&self, target: &str, port: u16) -> Result<PortResults, RunnerError> {
        let base = target::resolve_base_url(target, port, &self.options.secure_ports);
        let base_url = reqwest::Url::parse(&base).map_err(|e| RunnerError::InvalidUrl {
            url: base.clone(),
            message: e.to_string(),
        })?;

        match bruteforcer::preflight(&self.client, &base_url).await {
            Ok(status) => debug!(port, %base_url, status, "preflight ok"),
            Err(e) => {
                warn!(port, %base_url, error = %e, "target unreachable, skipping port");
                self.events.emit(ScanEvent::PortSkipped {
                    port,
                    base_url: base_url.to_string(),
                    reason: e.to_string(),
                });
                return Ok(PortResults::new());
            }
        }

        let words = match self.options.wordlist.load().await {
            Ok(words) => words,
            Err(e) => {
                warn!(port, source = %self.options.wordlist.describe(), error = %e, "wordlist unavailable");
                self.events.emit(ScanEvent::WordlistMissing {
                    port,
                    source: self.options.wordlist.describe(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };
        let candidates: Vec<_> =
            wordlist::expand_candidates(words, &self.options.extensions).collect();

        info!(port, %base_url, candidates = candidates.len(), "starting path discovery");
        let outcome = bruteforcer::run_session(
            &self.client,
            SessionConfig {
                port,
                base_url,
                concurrency: self.options.concurrency,
                progress_interval: self.options.progress_interval,
            },
            candidates,
            &self.events,
        )
        .await
        .map_err(|e| RunnerError::TaskJoin { source: e })?;

        info!(
            port,
            found = outcome.found,
            probed = outcome.probed,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "path discovery completed"
        );
        Ok(outcome.results)
    }
}
