use anyhow::Result;
use chrono::Local;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A log entry with timestamp and message
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S.%3f").to_string(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message,
        }
    }

    /// Format for display in the log panel and the log file
    pub fn format_for_display(&self) -> String {
        format!(
            "[{}] {} [{}] {}",
            self.timestamp, self.level, self.target, self.message
        )
    }
}

/// Thread-safe ring buffer for log entries
#[derive(Clone)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for LogRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogRingBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    // A panic while holding the lock leaves the entries usable
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        entries.iter().rev().take(count).rev().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Split a compact fmt line ("LEVEL target: message") into its parts
fn parse_compact_line(line: &str) -> (Level, &str, &str) {
    let (level, rest) = if let Some(rest) = line.strip_prefix("TRACE ") {
        (Level::TRACE, rest)
    } else if let Some(rest) = line.strip_prefix("DEBUG ") {
        (Level::DEBUG, rest)
    } else if let Some(rest) = line.strip_prefix("INFO ") {
        (Level::INFO, rest)
    } else if let Some(rest) = line.strip_prefix("WARN ") {
        (Level::WARN, rest)
    } else if let Some(rest) = line.strip_prefix("ERROR ") {
        (Level::ERROR, rest)
    } else {
        return (Level::INFO, "general", line);
    };
    let rest = rest.trim_start();

    // Now parse "target: message" from rest
    match rest.find(':') {
        Some(colon_pos) if !rest[..colon_pos].contains(' ') => {
            (level, &rest[..colon_pos], rest[colon_pos + 1..].trim())
        }
        _ => (level, "general", rest),
    }
}

/// Append-only log file shared by every writer
struct LogFile {
    file: Mutex<File>,
    path: PathBuf,
}

impl LogFile {
    fn create(log_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(log_dir)?;

        // Create timestamped log file
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = log_dir.join(format!("paged-grid_{}.log", timestamp));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        #[cfg(unix)]
        {
            let latest_path = log_dir.join("latest.log");
            let _ = std::fs::remove_file(&latest_path);
            let _ = std::os::unix::fs::symlink(&path, &latest_path);
        }

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    fn write_entry(&self, entry: &LogEntry) {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(file, "{}", entry.format_for_display());
        let _ = file.flush();
    }
}

/// Writer that feeds the ring buffer and, when configured, the log file.
/// Nothing goes to stdout so the TUI stays intact.
#[derive(Clone)]
pub struct LogWriter {
    buffer: LogRingBuffer,
    file: Option<Arc<LogFile>>,
}

impl LogWriter {
    pub fn new(buffer: LogRingBuffer) -> Self {
        Self { buffer, file: None }
    }

    /// Also append every entry to a timestamped file under `log_dir`
    pub fn with_file(buffer: LogRingBuffer, log_dir: &Path) -> Result<Self> {
        Ok(Self {
            buffer,
            file: Some(Arc::new(LogFile::create(log_dir)?)),
        })
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|file| file.path.as_path())
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let (level, target, message) = parse_compact_line(line);
            let entry = LogEntry::new(level, target, message.to_string());
            if let Some(file) = &self.file {
                file.write_entry(&entry);
            }
            self.buffer.push(entry);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// What the app keeps after logging is up
pub struct LoggingHandle {
    pub buffer: LogRingBuffer,
    pub log_path: Option<PathBuf>,
}

/// Initialize tracing with the ring buffer and, if `log_dir` is given, a log
/// file. `RUST_LOG` overrides the default `debug` filter.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<LoggingHandle> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let buffer = LogRingBuffer::new();
    let writer = match log_dir {
        Some(dir) => LogWriter::with_file(buffer.clone(), dir)?,
        None => LogWriter::new(buffer.clone()),
    };
    let log_path = writer.log_path().map(Path::to_path_buf);

    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .without_time() // We add our own timestamps
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(target: "grid", "Logging initialized");
    Ok(LoggingHandle { buffer, log_path })
}
