//! Indexing progress reporting.
//!
//! The indexer emits an [`IndexEvent`] for each observable step. Reporters
//! only observe: nothing they do affects the indexing outcome. Progress goes
//! to **stderr** so stdout stays parseable for scripts.
//!
//! Any `Fn(&str)` closure is a reporter too, receiving the human-readable
//! line for each event.

use std::fmt;
use std::io::Write;

/// A single progress event from `auto_index`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexEvent {
    /// The documents folder holds no indexable files.
    NoDocuments { folder: String },
    /// A new or changed file is being indexed.
    Processing { filename: String },
    /// A file was left untouched because of an error.
    Skipped { filename: String, reason: String },
}

impl fmt::Display for IndexEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexEvent::NoDocuments { folder } => write!(f, "No documents found in {}", folder),
            IndexEvent::Processing { filename } => write!(f, "Processing: {}", filename),
            IndexEvent::Skipped { filename, reason } => {
                write!(f, "Skipped {}: {}", filename, reason)
            }
        }
    }
}

/// Receives indexing progress.
pub trait IndexProgress: Send + Sync {
    fn report(&self, event: &IndexEvent);
}

impl<F> IndexProgress for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, event: &IndexEvent) {
        self(&event.to_string())
    }
}

/// Human-friendly progress on stderr, one line per event.
pub struct StderrProgress;

impl IndexProgress for StderrProgress {
    fn report(&self, event: &IndexEvent) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", event);
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &IndexEvent) -> serde_json::Value {
        let mut obj = match event {
            IndexEvent::NoDocuments { folder } => serde_json::json!({
                "phase": "empty",
                "folder": folder,
            }),
            IndexEvent::Processing { filename } => serde_json::json!({
                "phase": "processing",
                "file": filename,
            }),
            IndexEvent::Skipped { filename, reason } => serde_json::json!({
                "phase": "skipped",
                "file": filename,
                "reason": reason,
            }),
        };
        obj["event"] = serde_json::json!("progress");
        obj["message"] = serde_json::json!(event.to_string());
        obj
    }
}

impl IndexProgress for JsonProgress {
    fn report(&self, event: &IndexEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(event)) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgress for NoProgress {
    fn report(&self, _event: &IndexEvent) {}
}

/// Thousands separators: `1234567` → `"1,234,567"`.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IndexProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
