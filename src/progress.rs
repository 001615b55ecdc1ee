//! Export progress reporting.
//!
//! `blakefx export` walks every document on the server and every match of
//! each, which takes a while. Progress goes to **stderr** so the CSV can be
//! written to stdout when no output file is configured.

use std::io::Write;

/// A single progress event for an export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportProgressEvent {
    /// Starting on a primary document.
    Document {
        title: String,
        doctype: u64,
        docid: u64,
    },
    /// Writing the fragments of one match.
    Match { title: String },
    /// A match dropped because both documents share a matrix.
    Skipped { title: String },
}

/// Reports export progress.
pub trait ExportProgressReporter {
    fn report(&self, event: ExportProgressEvent);
}

/// Human-friendly progress on stderr:
///
/// ```text
/// original: vda.h.illbk.07.txt (doctype: 1 docid: 89)
///     matching: vda.g.illbk.07.txt
/// ```
pub struct StderrProgress;

impl ExportProgressReporter for StderrProgress {
    fn report(&self, event: ExportProgressEvent) {
        let line = match &event {
            ExportProgressEvent::Document {
                title,
                doctype,
                docid,
            } => format!(
                "original: {} (doctype: {} docid: {})\n",
                title, doctype, docid
            ),
            ExportProgressEvent::Match { title } => format!("    matching: {}\n", title),
            ExportProgressEvent::Skipped { title } => {
                format!("    same matrix, skipped: {}\n", title)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ExportProgressReporter for JsonProgress {
    fn report(&self, event: ExportProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event_json(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &ExportProgressEvent) -> serde_json::Value {
    match event {
        ExportProgressEvent::Document {
            title,
            doctype,
            docid,
        } => serde_json::json!({
            "event": "document",
            "title": title,
            "doctype": doctype,
            "docid": docid
        }),
        ExportProgressEvent::Match { title } => serde_json::json!({
            "event": "match",
            "title": title
        }),
        ExportProgressEvent::Skipped { title } => serde_json::json!({
            "event": "skipped",
            "title": title
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ExportProgressReporter for NoProgress {
    fn report(&self, _event: ExportProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
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

    pub fn reporter(&self) -> Box<dyn ExportProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
