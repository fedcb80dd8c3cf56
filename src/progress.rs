//! Progress reporting for the pipeline.
//!
//! Library code never writes to the console. Components report what they are
//! doing through a [`ProgressObserver`]; the binary installs [`LogObserver`],
//! tests use [`NoopObserver`] or their own recorder.

use log::{info, warn};
use std::fmt;

/// The pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Retrieval,
    FastSummary,
    DeepAnalysis,
    Insights,
    ResearchDirections,
    TrendAnalysis,
    Report,
    Session,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Retrieval => "paper retrieval",
            Phase::FastSummary => "fast summarization",
            Phase::DeepAnalysis => "deep analysis",
            Phase::Insights => "cross-paper insights",
            Phase::ResearchDirections => "research directions",
            Phase::TrendAnalysis => "trend analysis",
            Phase::Report => "report generation",
            Phase::Session => "session storage",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    PhaseStarted { phase: Phase, detail: String },
    ItemCompleted { phase: Phase, index: usize, total: usize },
    ItemFailed { phase: Phase, item: String, reason: String },
    PhaseCompleted { phase: Phase, count: usize },
    Warning { phase: Phase, message: String },
}

pub trait ProgressObserver {
    fn on_event(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PhaseStarted { phase, detail } => {
                if detail.is_empty() {
                    info!("Starting {}", phase);
                } else {
                    info!("Starting {}: {}", phase, detail);
                }
            }
            ProgressEvent::ItemCompleted { phase, index, total } => {
                log::debug!("{}: {}/{}", phase, index, total);
            }
            ProgressEvent::ItemFailed { phase, item, reason } => {
                warn!("{} failed for {}: {}", phase, item, reason);
            }
            ProgressEvent::PhaseCompleted { phase, count } => {
                info!("Finished {} ({} items)", phase, count);
            }
            ProgressEvent::Warning { phase, message } => {
                warn!("{}: {}", phase, message);
            }
        }
    }
}

/// Observer handle shared by the pipeline components
pub type SharedObserver = std::sync::Arc<dyn ProgressObserver + Send + Sync>;

pub fn noop_observer() -> SharedObserver {
    std::sync::Arc::new(NoopObserver)
}
