//! Progress reporting while the manual is indexed.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stage of an index build, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    Load,
    Chunk,
    Embed,
    Index,
}

impl IndexPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Index => "index",
        }
    }
}

/// One step of progress through an [`IndexPhase`].
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: IndexPhase,

    /// Pages read, chunks created, texts embedded or chunks written
    pub done: u64,

    /// Known total for `done`
    pub total: Option<u64>,

    pub detail: String,

    /// Time since the reporter was created
    pub elapsed: Duration,
}

impl ProgressEvent {
    /// Share of the phase completed, when the total is known.
    pub fn percent(&self) -> Option<f64> {
        self.total
            .filter(|total| *total > 0)
            .map(|total| self.done as f64 * 100.0 / total as f64)
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase.as_str(), self.done)?;
        if let Some(total) = self.total {
            write!(f, "/{}", total)?;
        }
        if let Some(percent) = self.percent() {
            write!(f, " ({:.0}%)", percent)?;
        }
        write!(f, " - {}", self.detail)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Sends index-build progress to an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            started: Instant::now(),
        }
    }

    /// Reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            started: Instant::now(),
        }
    }

    fn report(&self, phase: IndexPhase, done: u64, total: Option<u64>, detail: String) {
        let Some(callback) = &self.callback else {
            return;
        };

        let event = ProgressEvent {
            phase,
            done,
            total,
            detail,
            elapsed: self.started.elapsed(),
        };
        tracing::debug!(phase = event.phase.as_str(), done, total = ?total, "{}", event.detail);
        callback(event);
    }

    /// The manual was read.
    pub fn load(&self, pages: u64, path: &str) {
        self.report(
            IndexPhase::Load,
            pages,
            None,
            format!("read {} pages from {}", pages, path),
        );
    }

    /// The manual was split into chunks.
    pub fn chunk(&self, chunks: u64, pages: u64) {
        self.report(
            IndexPhase::Chunk,
            chunks,
            None,
            format!("{} chunks from {} pages", chunks, pages),
        );
    }

    /// Another embedding batch finished.
    pub fn embed(&self, embedded: u64, total: Option<u64>, model: &str) {
        self.report(IndexPhase::Embed, embedded, total, format!("model={}", model));
    }

    /// Another write batch was committed.
    pub fn index(&self, written: u64, total: Option<u64>) {
        self.report(IndexPhase::Index, written, total, "writing to SQLite".to_string());
    }
}
