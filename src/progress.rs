//! Upload progress reporting.
//!
//! Reports what `docsearch upload` is doing (extracting, embedding chunk
//! n of total, stored) on **stderr** so stdout stays parseable.

use std::io::Write;

/// A single progress event for one upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadEvent {
    /// Reading and cleaning the file.
    Extracting { filename: String },
    /// n of total chunks have an embedding.
    Embedding { filename: String, n: u64, total: u64 },
    /// The document and its chunks were written.
    Stored { filename: String, id: String, chunks: u64 },
}

/// Reports upload progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: UploadEvent);
}

/// Human-friendly progress on stderr: "upload report.pdf  embedding  12 / 40 chunks".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: UploadEvent) {
        let line = match &event {
            UploadEvent::Extracting { filename } => {
                format!("upload {}  extracting...\n", filename)
            }
            UploadEvent::Embedding { filename, n, total } => format!(
                "upload {}  embedding  {} / {} chunks\n",
                filename,
                format_number(*n),
                format_number(*total)
            ),
            UploadEvent::Stored {
                filename,
                id,
                chunks,
            } => format!(
                "upload {}  stored {} ({} chunks)\n",
                filename,
                id,
                format_number(*chunks)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: UploadEvent) {
        if let Ok(line) = serde_json::to_string(&event_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

fn event_json(event: &UploadEvent) -> serde_json::Value {
    match event {
        UploadEvent::Extracting { filename } => serde_json::json!({
            "event": "progress",
            "file": filename,
            "phase": "extracting"
        }),
        UploadEvent::Embedding { filename, n, total } => serde_json::json!({
            "event": "progress",
            "file": filename,
            "phase": "embedding",
            "n": n,
            "total": total
        }),
        UploadEvent::Stored {
            filename,
            id,
            chunks,
        } => serde_json::json!({
            "event": "progress",
            "file": filename,
            "phase": "stored",
            "id": id,
            "chunks": chunks
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: UploadEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
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

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!("Unknown progress mode: '{}'. Use off, human or json.", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn embedding_event_json_has_counts() {
        let v = event_json(&UploadEvent::Embedding {
            filename: "a.txt".into(),
            n: 3,
            total: 7,
        });
        assert_eq!(v["phase"], "embedding");
        assert_eq!(v["n"], 3);
        assert_eq!(v["total"], 7);
        assert_eq!(v["file"], "a.txt");
    }

    #[test]
    fn progress_mode_parses() {
        assert_eq!("json".parse::<ProgressMode>().unwrap(), ProgressMode::Json);
        assert_eq!("off".parse::<ProgressMode>().unwrap(), ProgressMode::Off);
        assert!("loud".parse::<ProgressMode>().is_err());
    }
}
