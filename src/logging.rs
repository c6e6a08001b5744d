//! Logging setup.
//!
//! Compact timestamped `tracing` output on stderr, plus an optional daily
//! file (`app_YYYYMMDD.log`) when `[logging].dir` is configured.
//! `RUST_LOG` takes precedence over `[logging].level`:
//!
//! ```bash
//! RUST_LOG=docsearch=debug docsearch upload report.pdf
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Timestamp layout of lines in the daily log file, read back by [`crate::logs`].
pub const FILE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

struct FileTime;

impl FormatTime for FileTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format(FILE_TIME_FORMAT))
    }
}

/// Path of today's log file inside `dir`.
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("app_{}.log", chrono::Local::now().format("%Y%m%d")))
}

/// Initialize logging. Only the first call takes effect.
pub fn init_with_config(config: &LoggingConfig) -> Result<()> {
    let file = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let path = log_file_path(dir);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(file)
        }
        None => None,
    };

    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&config.level)
        };

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true);

        let file_layer = file.map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_timer(FileTime)
                .with_target(true)
                .with_level(true)
        });

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init();
    });

    Ok(())
}
