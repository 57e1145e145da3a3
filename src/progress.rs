//! Run event and progress reporting.
//!
//! The pipeline itself never writes to a log file or to stdout. Everything
//! observable — page fetches, batch submissions, validation defaults,
//! warnings — is emitted as a [`RunEvent`] through a [`RunReporter`], and
//! the chosen reporter decides how to render it. Events go to **stderr**
//! so stdout stays parseable for scripts (the run summary only).

use std::io::Write;

/// Severity of a log-style event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Traceability for silent defaults applied during transformation.
    Debug,
    Info,
    Warn,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
        }
    }
}

/// A single observable event from a reconciliation-and-sync run.
#[derive(Clone, Debug)]
pub enum RunEvent {
    /// A remote catalog page is being fetched during snapshot construction.
    FetchingPage { page: u32, fetched: usize },
    /// The snapshot is ready, either from cache or from a fresh fetch.
    SnapshotReady { products: usize, from_cache: bool },
    /// The feed was classified against the snapshot.
    Classified { new: usize, existing: usize },
    /// A batch was accepted by the remote.
    BatchSubmitted { index: usize, total: usize, items: usize },
    /// A batch was rejected; the run continues with the next one.
    BatchFailed {
        index: usize,
        total: usize,
        items: usize,
        error: String,
    },
    /// A severity-tagged message (defaults applied, cache problems, ...).
    Log { severity: Severity, message: String },
}

/// Receives run events. Implementations write to stderr (human or JSON)
/// or swallow events entirely; a front-end can supply its own.
pub trait RunReporter: Send + Sync {
    /// Emit an event. Called from the pipeline.
    fn report(&self, event: RunEvent);

    /// Convenience for severity-tagged messages.
    fn log(&self, severity: Severity, message: &str) {
        self.report(RunEvent::Log {
            severity,
            message: message.to_string(),
        });
    }
}

/// Human-friendly events on stderr: "fetch page 3  (200 products so far)".
pub struct StderrReporter;

impl RunReporter for StderrReporter {
    fn report(&self, event: RunEvent) {
        let line = match &event {
            RunEvent::FetchingPage { page, fetched } => {
                format!("fetch page {}  ({} products so far)\n", page, fetched)
            }
            RunEvent::SnapshotReady {
                products,
                from_cache,
            } => {
                let origin = if *from_cache { "cache" } else { "remote" };
                format!("snapshot ready  {} products ({})\n", products, origin)
            }
            RunEvent::Classified { new, existing } => {
                format!("classified  {} new, {} existing\n", new, existing)
            }
            RunEvent::BatchSubmitted {
                index,
                total,
                items,
            } => {
                format!("batch {}/{}  submitted {} items\n", index, total, items)
            }
            RunEvent::BatchFailed {
                index,
                total,
                items,
                error,
            } => {
                format!(
                    "batch {}/{}  FAILED ({} items skipped): {}\n",
                    index, total, items, error
                )
            }
            RunEvent::Log { severity, message } => {
                format!("{}: {}\n", severity.label(), message)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable events: one JSON object per line on stderr.
pub struct JsonReporter;

impl RunReporter for JsonReporter {
    fn report(&self, event: RunEvent) {
        let obj = match &event {
            RunEvent::FetchingPage { page, fetched } => serde_json::json!({
                "event": "fetching_page",
                "page": page,
                "fetched": fetched
            }),
            RunEvent::SnapshotReady {
                products,
                from_cache,
            } => serde_json::json!({
                "event": "snapshot_ready",
                "products": products,
                "from_cache": from_cache
            }),
            RunEvent::Classified { new, existing } => serde_json::json!({
                "event": "classified",
                "new": new,
                "existing": existing
            }),
            RunEvent::BatchSubmitted {
                index,
                total,
                items,
            } => serde_json::json!({
                "event": "batch_submitted",
                "batch": index,
                "total_batches": total,
                "items": items
            }),
            RunEvent::BatchFailed {
                index,
                total,
                items,
                error,
            } => serde_json::json!({
                "event": "batch_failed",
                "batch": index,
                "total_batches": total,
                "items": items,
                "error": error
            }),
            RunEvent::Log { severity, message } => serde_json::json!({
                "event": "log",
                "severity": severity.label(),
                "message": message
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NullReporter;

impl RunReporter for NullReporter {
    fn report(&self, _event: RunEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it into the pipeline.
    pub fn reporter(&self) -> Box<dyn RunReporter> {
        match self {
            ProgressMode::Off => Box::new(NullReporter),
            ProgressMode::Human => Box::new(StderrReporter),
            ProgressMode::Json => Box::new(JsonReporter),
        }
    }
}
