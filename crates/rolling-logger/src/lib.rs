//! Rolling Logger
//!
//! Installs a `tracing` subscriber that writes to `<log_dir>/<app>.log`,
//! rotates the file by size into `<app>.log.1 .. <app>.log.N`, mirrors every
//! line to stderr and keeps the most recent lines in memory.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};

static LOGGER: OnceLock<Arc<LoggerState>> = OnceLock::new();

/// Serializes initialization so `LOGGER` is only set once a subscriber is live
static INIT: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Size at which the active file is rotated
    pub max_file_bytes: u64,
    /// Rotated files kept next to the active one
    pub max_files: usize,
    /// Lines kept for `recent_logs`
    pub buffer_lines: usize,
    /// Maximum level, e.g. "info" or "debug"
    pub level: String,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024,
            max_files: 5,
            buffer_lines: 500,
            level: "info".to_string(),
        }
    }
}

// ========================
// Rolling file
// ========================

struct RollingFile {
    dir: PathBuf,
    app_name: String,
    max_bytes: u64,
    max_files: usize,
    file: Option<File>,
    written: u64,
}

impl RollingFile {
    fn open(dir: &Path, app_name: &str, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut rolling = Self {
            dir: dir.to_path_buf(),
            app_name: app_name.to_string(),
            max_bytes: max_bytes.max(1),
            max_files,
            file: None,
            written: 0,
        };
        rolling.reopen()?;
        Ok(rolling)
    }

    fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.app_name))
    }

    fn rotated_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.app_name, n))
    }

    fn reopen(&mut self) -> io::Result<()> {
        let path = self.path();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.written = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.file = Some(file);
        Ok(())
    }

    /// Shift `<app>.log.N-1` to `.N` down to `.1`, dropping the oldest
    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;

        if self.max_files == 0 {
            let _ = fs::remove_file(self.path());
        } else {
            let _ = fs::remove_file(self.rotated_path(self.max_files));
            for n in (1..self.max_files).rev() {
                let from = self.rotated_path(n);
                if from.exists() {
                    fs::rename(&from, self.rotated_path(n + 1))?;
                }
            }
            fs::rename(self.path(), self.rotated_path(1))?;
        }

        self.reopen()
    }

    fn write_line(&mut self, buf: &[u8]) -> io::Result<()> {
        let len = buf.len() as u64;
        if self.written > 0 && self.written + len > self.max_bytes {
            self.rotate()?;
        }
        if self.file.is_none() {
            self.reopen()?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
            self.written += len;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

// ========================
// Shared state
// ========================

struct LoggerState {
    file: Mutex<RollingFile>,
    recent: Mutex<VecDeque<String>>,
    buffer_lines: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LoggerState {
    fn new(file: RollingFile, buffer_lines: usize) -> Self {
        Self {
            file: Mutex::new(file),
            recent: Mutex::new(VecDeque::with_capacity(buffer_lines)),
            buffer_lines,
        }
    }

    fn remember(&self, buf: &[u8]) {
        if self.buffer_lines == 0 {
            return;
        }
        let text = String::from_utf8_lossy(buf);
        let mut recent = lock(&self.recent);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if recent.len() == self.buffer_lines {
                recent.pop_front();
            }
            recent.push_back(line.to_string());
        }
    }

    fn recent(&self) -> Vec<String> {
        lock(&self.recent).iter().cloned().collect()
    }

    fn log_path(&self) -> PathBuf {
        lock(&self.file).path()
    }
}

/// Writer handed to the fmt layer for each event
struct LogWriter {
    state: Arc<LoggerState>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.remember(buf);
        lock(&self.state.file).write_line(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.state.file).flush()
    }
}

struct MakeLogWriter {
    state: Arc<LoggerState>,
}

impl<'a> MakeWriter<'a> for MakeLogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            state: self.state.clone(),
        }
    }
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ========================
// Public API
// ========================

/// Initialize with default options
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), String> {
    init_logger_with(log_dir, app_name, LoggerOptions::default())
}

/// Initialize the global logger; fails if this or any other subscriber is
/// already installed, in which case nothing is recorded as initialized
pub fn init_logger_with(log_dir: PathBuf, app_name: &str, options: LoggerOptions) -> Result<(), String> {
    let _init = lock(&INIT);
    if LOGGER.get().is_some() {
        return Err("Logger already initialized".to_string());
    }

    let file = RollingFile::open(&log_dir, app_name, options.max_file_bytes, options.max_files)
        .map_err(|e| format!("Failed to open log file in {}: {}", log_dir.display(), e))?;
    let state = Arc::new(LoggerState::new(file, options.buffer_lines));

    let level = LevelFilter::from_str(options.level.trim()).unwrap_or(LevelFilter::INFO);
    let writer = MakeLogWriter {
        state: state.clone(),
    }
    .and(io::stderr);

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_max_level(level)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    LOGGER
        .set(state)
        .map_err(|_| "Logger already initialized".to_string())?;

    tracing::info!(dir = %log_dir.display(), app = app_name, "rolling logger started");
    Ok(())
}

pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

/// Path of the active log file, once initialized
pub fn log_file_path() -> Option<PathBuf> {
    LOGGER.get().map(|state| state.log_path())
}

/// Most recent log lines, oldest first
pub fn recent_logs() -> Vec<String> {
    LOGGER.get().map(|state| state.recent()).unwrap_or_default()
}

fn ensure_initialized() -> Result<(), String> {
    if is_initialized() {
        Ok(())
    } else {
        Err("Logger not initialized".to_string())
    }
}

pub fn info(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}
