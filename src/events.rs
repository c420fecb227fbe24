use std::time::Duration;

use tokio::sync::mpsc;

use crate::bruteforcer::progress::ProgressSnapshot;
use crate::bruteforcer::ProbeResult;

/// Everything the engine reports while it runs. Rendering is left to the consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum ScanEvent {
    SessionStarted {
        port: u16,
        base_url: String,
        candidates: usize,
        workers: usize,
    },
    CandidateFound {
        port: u16,
        path: String,
        result: ProbeResult,
        found: usize,
    },
    Progress(ProgressSnapshot),
    SessionCompleted {
        port: u16,
        found: usize,
        elapsed: Duration,
    },
    PortSkipped {
        port: u16,
        base_url: String,
        reason: String,
    },
    WordlistMissing {
        port: u16,
        source: String,
        reason: String,
    },
    SessionFailed {
        port: u16,
        reason: String,
    },
}

impl ScanEvent {
    pub fn port(&self) -> u16 {
        match self {
            Self::SessionStarted { port, .. }
            | Self::CandidateFound { port, .. }
            | Self::SessionCompleted { port, .. }
            | Self::PortSkipped { port, .. }
            | Self::WordlistMissing { port, .. }
            | Self::SessionFailed { port, .. } => *port,
            Self::Progress(snapshot) => snapshot.port,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::PortSkipped { .. } | Self::WordlistMissing { .. } | Self::SessionFailed { .. }
        )
    }
}

/// Cloneable handle workers use to publish events. A closed or absent receiver is ignored.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ScanEvent) {
        if let Some(tx) = self.tx.as_ref() {
            let _ = tx.send(event);
        }
    }
}
