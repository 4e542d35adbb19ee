//! Dual-sink instance logger (§4.3 component, distinct from the ambient
//! `tracing` diagnostics initialised in the `rest` binary).
//!
//! Every line written here has the exact shape `[TIMESTAMP][LEVEL] message`
//! because `/api/latency` and `/api/top-latency` parse it back out of the
//! local log file. This is domain functionality, not a convenience wrapper
//! around `tracing`.

use chrono::Utc;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes to the instance-local log, the process-wide global log, and (for
/// snapshot-related events) a dedicated snapshot log.
pub struct Logger {
    local_path: PathBuf,
    global_path: PathBuf,
    snapshot_path: PathBuf,
    write_lock: Mutex<()>,
}

impl Logger {
    pub fn new(data_dir: &Path, port: u16) -> Self {
        Self {
            local_path: data_dir.join(format!("logs_{port}.txt")),
            global_path: PathBuf::from("global_logs.txt"),
            snapshot_path: data_dir.join("snapshot_log.txt"),
            write_lock: Mutex::new(()),
        }
    }

    fn append_line(path: &Path, line: &str) {
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(f, "{line}");
        }
    }

    fn line(level: &str, message: &str) -> String {
        format!("[{}][{level}] {message}", Utc::now().format(TIMESTAMP_FMT))
    }

    fn write(&self, level: &str, message: &str, global: bool) {
        let line = Self::line(level, message);
        let _guard = self.write_lock.lock();
        Self::append_line(&self.local_path, &line);
        if global {
            Self::append_line(&self.global_path, &line);
        }
    }

    pub fn info(&self, message: impl AsRef<str>, global: bool) {
        self.write("INFO", message.as_ref(), global);
    }

    pub fn warn(&self, message: impl AsRef<str>, global: bool) {
        let message = message.as_ref();
        self.write("WARN", message, global);
        tracing::warn!(%message, "logged");
    }

    pub fn error(&self, message: impl AsRef<str>, global: bool) {
        let message = message.as_ref();
        self.write("ERROR", message, global);
        tracing::error!(%message, "logged");
    }

    /// Records a sampled I/O line: `Volume: <id>, Host: <host>, IOPS: <n>,
    /// Latency: <v>ms, Throughput: <v> MB/s`.
    pub fn io_sample(&self, volume_id: &str, host_id: &str, iops: u32, latency: f64, throughput: f64) {
        self.info(
            format!(
                "Volume: {volume_id}, Host: {host_id}, IOPS: {iops}, Latency: {latency:.2}ms, Throughput: {throughput:.2} MB/s"
            ),
            false,
        );
    }

    /// Writes to both the instance log and the dedicated snapshot log.
    pub fn snapshot_event(&self, message: impl AsRef<str>) {
        let line = Self::line("INFO", message.as_ref());
        let _guard = self.write_lock.lock();
        Self::append_line(&self.local_path, &line);
        Self::append_line(&self.snapshot_path, &line);
    }

    /// Writes a `[CLEANUP]`-tagged line, also mirrored to the snapshot log
    /// when it concerns a snapshot sweep.
    pub fn cleanup_log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let line = Self::line("INFO", &format!("[CLEANUP] {message}"));
        let _guard = self.write_lock.lock();
        Self::append_line(&self.local_path, &line);
        if message.to_lowercase().contains("snapshot") {
            Self::append_line(&self.snapshot_path, &line);
        }
    }

    fn tail(path: &Path, n: usize) -> Vec<String> {
        let Ok(file) = std::fs::File::open(path) else {
            return Vec::new();
        };
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].to_vec()
    }

    pub fn local_lines(&self, n: usize) -> Vec<String> {
        Self::tail(&self.local_path, n)
    }

    pub fn global_lines(&self, n: usize) -> Vec<String> {
        Self::tail(&self.global_path, n)
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// The full instance log, unwindowed — the `/api/*-latency` routes do
    /// their own time-window filtering over this (§4.7).
    pub fn all_local_lines(&self) -> Vec<String> {
        let Ok(file) = std::fs::File::open(&self.local_path) else {
            return Vec::new();
        };
        BufReader::new(file).lines().map_while(Result::ok).collect()
    }
}

/// One parsed `Volume: ...` I/O line, as consumed by `/api/latency` and
/// `/api/top-latency`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIoLine {
    pub timestamp: chrono::DateTime<Utc>,
    pub volume_id: String,
    pub host_id: String,
    pub iops: u32,
    pub latency: f64,
    pub throughput: f64,
}

static IO_LINE_RE: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    regex::Regex::new(
        r"^\[(?P<ts>.*?)\]\[INFO\] Volume: (?P<volume>.*?), Host: (?P<host>.*?), IOPS: (?P<iops>\d+), Latency: (?P<latency>[\d.]+)ms, Throughput: (?P<throughput>[\d.]+) MB/s$",
    )
    .expect("static regex is valid")
});

/// Parses every `io_sample` line out of a log, skipping anything that
/// doesn't match (snapshot events, cleanup summaries, warnings).
pub fn parse_io_lines(lines: &[String]) -> Vec<ParsedIoLine> {
    lines
        .iter()
        .filter_map(|line| {
            let caps = IO_LINE_RE.captures(line)?;
            let timestamp = chrono::NaiveDateTime::parse_from_str(&caps["ts"], TIMESTAMP_FMT)
                .ok()?
                .and_utc();
            Some(ParsedIoLine {
                timestamp,
                volume_id: caps["volume"].to_string(),
                host_id: caps["host"].to_string(),
                iops: caps["iops"].parse().ok()?,
                latency: caps["latency"].parse().ok()?,
                throughput: caps["throughput"].parse().ok()?,
            })
        })
        .collect()
}
