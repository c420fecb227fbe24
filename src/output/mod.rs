use std::collections::BTreeMap;

use serde::Serialize;

use crate::runner::{PortResults, ScanSession};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Only the port -> path -> result mapping.
    Results,
    /// The whole session, including target, port order and the interrupted flag.
    Session,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "results" | "json" => Some(Self::Results),
            "session" | "full" => Some(Self::Session),
            _ => None,
        }
    }
}

pub fn render_results_json(
    results: &BTreeMap<String, PortResults>,
) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = serde_json::to_vec_pretty(results)?;
    out.push(b'\n');
    Ok(out)
}

pub fn render_session_json(session: &ScanSession) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = serde_json::to_vec_pretty(session)?;
    out.push(b'\n');
    Ok(out)
}

pub fn render(session: &ScanSession, format: OutputFormat) -> Result<Vec<u8>, serde_json::Error> {
    match format {
        OutputFormat::Results => render_results_json(&session.results),
        OutputFormat::Session => render_session_json(session),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PortSummary {
    pub port: String,
    pub found: usize,
    pub redirects: usize,
}

/// Per-port counts in port-key order.
pub fn summarize(session: &ScanSession) -> Vec<PortSummary> {
    session
        .results
        .iter()
        .map(|(port, paths)| PortSummary {
            port: port.clone(),
            found: paths.len(),
            redirects: paths.values().filter(|r| r.is_redirect()).count(),
        })
        .collect()
}
