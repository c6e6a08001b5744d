//! Reading back the daily log files.
//!
//! [`crate::logging`] appends to `app_YYYYMMDD.log` under `[logging].dir`.
//! This module lists those files, filters their entries by level, day range
//! and a case-insensitive message substring, and counts entries per level.
//! Used by `docsearch logs`.
//!
//! A file's name records the day it was opened, not the days it covers: a
//! long-running server keeps appending to the file it started with. Day
//! filters therefore look at each entry's own timestamp.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::config::LoggingConfig;

/// Days looked back when no day bounds are given.
pub const DEFAULT_WINDOW_DAYS: u64 = 7;

static LINE: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown log level '{}' (expected trace, debug, info, warn or error)",
                other
            )),
        }
    }
}

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub date: NaiveDate,
    pub time: String,
    pub level: LogLevel,
    /// Everything after the level: span context, target and fields.
    pub message: String,
}

impl LogEntry {
    /// Parse a line written with [`crate::logging::FILE_TIME_FORMAT`].
    /// Lines in any other shape give `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let re = LINE.get_or_init(|| {
            Regex::new(
                r"^(\d{4}-\d{2}-\d{2}) (\d{2}:\d{2}:\d{2}(?:\.\d+)?)\s+(TRACE|DEBUG|INFO|WARN|ERROR)\s+(.*)$",
            )
            .unwrap()
        });
        let caps = re.captures(line.trim_end())?;
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        let level = caps[3].parse().ok()?;
        Some(Self {
            date,
            time: caps[2].to_string(),
            level,
            message: caps[4].to_string(),
        })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:>5} {}", self.date, self.time, self.level, self.message)
    }
}

/// A daily log file and the day in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub day: NaiveDate,
}

fn day_from_stamp(stamp: &str) -> Option<NaiveDate> {
    if stamp.len() != 8 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(
        stamp[..4].parse().ok()?,
        stamp[4..6].parse().ok()?,
        stamp[6..].parse().ok()?,
    )
}

/// `app_YYYYMMDD.log` files in `dir`, newest first. A missing directory
/// has no files.
pub fn list_log_files(dir: &Path) -> Result<Vec<LogFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let read = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in read {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(day) = name
            .strip_prefix("app_")
            .and_then(|rest| rest.strip_suffix(".log"))
            .and_then(day_from_stamp)
        else {
            continue;
        };
        files.push(LogFile {
            path: entry.path(),
            day,
        });
    }
    files.sort_by(|a, b| b.day.cmp(&a.day));
    Ok(files)
}

fn read_lines(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read log file {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Entry filter. Every unset field matches everything.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub level: Option<LogLevel>,
    pub grep: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl LogQuery {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if self.level.is_some_and(|level| level != entry.level) {
            return false;
        }
        if self.since.is_some_and(|day| entry.date < day) {
            return false;
        }
        if self.until.is_some_and(|day| entry.date > day) {
            return false;
        }
        match self.grep.as_deref() {
            Some(needle) if !needle.is_empty() => entry
                .message
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// Matching entries from every log file in `dir`, oldest file first.
pub fn search_logs(dir: &Path, query: &LogQuery) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for file in list_log_files(dir)?.iter().rev() {
        let text = read_lines(&file.path)?;
        entries.extend(
            text.lines()
                .filter_map(LogEntry::parse)
                .filter(|entry| query.matches(entry)),
        );
    }
    Ok(entries)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    /// Non-empty lines, parsed or not.
    pub lines: usize,
    pub error: usize,
    pub warn: usize,
    pub info: usize,
    pub debug: usize,
    pub trace: usize,
}

impl LevelCounts {
    fn record(&mut self, level: LogLevel) {
        match level {
            LogLevel::Error => self.error += 1,
            LogLevel::Warn => self.warn += 1,
            LogLevel::Info => self.info += 1,
            LogLevel::Debug => self.debug += 1,
            LogLevel::Trace => self.trace += 1,
        }
    }

    /// Parsed entries across all levels.
    pub fn entries(&self) -> usize {
        self.error + self.warn + self.info + self.debug + self.trace
    }

    fn merge(&mut self, other: &LevelCounts) {
        self.lines += other.lines;
        self.error += other.error;
        self.warn += other.warn;
        self.info += other.info;
        self.debug += other.debug;
        self.trace += other.trace;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub day: NaiveDate,
    pub path: PathBuf,
    pub counts: LevelCounts,
}

/// Per-level counts for every log file in `dir`, newest first.
pub fn log_stats(dir: &Path) -> Result<Vec<FileStats>> {
    let mut stats = Vec::new();
    for file in list_log_files(dir)? {
        let text = read_lines(&file.path)?;
        let mut counts = LevelCounts::default();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            counts.lines += 1;
            if let Some(entry) = LogEntry::parse(line) {
                counts.record(entry.level);
            }
        }
        stats.push(FileStats {
            day: file.day,
            path: file.path,
            counts,
        });
    }
    Ok(stats)
}

/// Run the logs command: print matching entries, or per-file level counts
/// when `stats` is set. `--stats` always covers every file.
pub fn run_logs(config: &LoggingConfig, query: &LogQuery, stats: bool, json: bool) -> Result<()> {
    let Some(dir) = config.dir.as_deref() else {
        bail!("No log directory configured. Set [logging].dir to keep log files.");
    };
    if list_log_files(dir)?.is_empty() {
        println!("No log files found. Logs will appear here as the application runs.");
        return Ok(());
    }

    if stats {
        let files = log_stats(dir)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&files)?);
            return Ok(());
        }
        let mut total = LevelCounts::default();
        for file in &files {
            total.merge(&file.counts);
        }
        println!("docsearch Log Stats ({} files)", files.len());
        println!("=========================");
        println!();
        println!("  Entries:     {}", total.entries());
        println!("  Errors:      {}", total.error);
        println!("  Warnings:    {}", total.warn);
        println!("  Info:        {}", total.info);
        println!("  Debug:       {}", total.debug + total.trace);
        println!();
        for file in &files {
            let c = &file.counts;
            println!(
                "  {}  {} lines  {} errors  {} warnings  {} info",
                file.day, c.lines, c.error, c.warn, c.info
            );
        }
        println!();
        return Ok(());
    }

    let entries = search_logs(dir, query)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No logs match the selected filters.");
    } else {
        for entry in &entries {
            println!("{}", entry);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::logging::FILE_TIME_FORMAT;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_logs(dir: &Path) {
        fs::write(
            dir.join("app_20240101.log"),
            "2024-01-01 09:00:00.001  INFO docsearch::service: document stored file=alpha.txt chunks=2\n\
             2024-01-01 09:00:01.002  WARN docsearch::service: embeddings disabled; storing chunks without vectors file=alpha.txt\n\
             thread 'main' panicked somewhere\n\
             2024-01-02 00:10:00.000 ERROR docsearch::embedding: embedding request failed, will retry status=500\n",
        )
        .unwrap();
        fs::write(
            dir.join("app_20240103.log"),
            "2024-01-03 12:00:00.500  INFO docsearch::service: search completed limit=5 hits=1\n\
             \n\
             2024-01-03 12:00:01.000 DEBUG docsearch::service: chunked document file=Beta.txt chunks=1\n",
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "not a log").unwrap();
        fs::write(dir.join("app_latest.log"), "2024-01-09 00:00:00.000  INFO x: y\n").unwrap();
    }

    #[test]
    fn parses_written_line_format() {
        let stamp = day(2024, 5, 6)
            .and_hms_milli_opt(7, 8, 9, 10)
            .unwrap()
            .format(FILE_TIME_FORMAT)
            .to_string();
        let line = format!("{}  WARN docsearch::credentials: stored credential could not be decrypted key=k", stamp);
        let entry = LogEntry::parse(&line).unwrap();
        assert_eq!(entry.date, day(2024, 5, 6));
        assert_eq!(entry.time, "07:08:09.010");
        assert_eq!(entry.level, LogLevel::Warn);
        assert!(entry.message.starts_with("docsearch::credentials:"));
        assert!(LogEntry::parse("plain text").is_none());
    }

    #[test]
    fn level_names() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn lists_daily_files_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());
        let days: Vec<NaiveDate> = list_log_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.day)
            .collect();
        assert_eq!(days, vec![day(2024, 1, 3), day(2024, 1, 1)]);
        assert!(list_log_files(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn unfiltered_search_is_chronological() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());
        let entries = search_logs(dir.path(), &LogQuery::default()).unwrap();
        let levels: Vec<LogLevel> = entries.iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Info,
                LogLevel::Warn,
                LogLevel::Error,
                LogLevel::Info,
                LogLevel::Debug
            ]
        );
    }

    #[test]
    fn filters_by_level() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());
        let query = LogQuery {
            level: Some(LogLevel::Info),
            ..Default::default()
        };
        let entries = search_logs(dir.path(), &query).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.level == LogLevel::Info));
    }

    #[test]
    fn grep_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());
        let query = LogQuery {
            grep: Some("BETA.TXT".into()),
            ..Default::default()
        };
        let entries = search_logs(dir.path(), &query).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Debug);
    }

    #[test]
    fn day_range_uses_entry_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());
        // The 2024-01-02 entry lives in the 2024-01-01 file.
        let query = LogQuery {
            since: Some(day(2024, 1, 2)),
            until: Some(day(2024, 1, 2)),
            ..Default::default()
        };
        let entries = search_logs(dir.path(), &query).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);

        let query = LogQuery {
            since: Some(day(2024, 1, 3)),
            level: Some(LogLevel::Warn),
            ..Default::default()
        };
        assert!(search_logs(dir.path(), &query).unwrap().is_empty());
    }

    #[test]
    fn counts_levels_per_file() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());
        let stats = log_stats(dir.path()).unwrap();
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].day, day(2024, 1, 3));
        assert_eq!(
            stats[0].counts,
            LevelCounts {
                lines: 2,
                info: 1,
                debug: 1,
                ..Default::default()
            }
        );

        let first = &stats[1].counts;
        assert_eq!(first.lines, 4);
        assert_eq!(first.entries(), 3);
        assert_eq!((first.error, first.warn, first.info), (1, 1, 1));
    }

    #[test]
    fn run_logs_requires_a_directory() {
        let config = LoggingConfig {
            dir: None,
            ..Default::default()
        };
        assert!(run_logs(&config, &LogQuery::default(), false, false).is_err());
    }
}
