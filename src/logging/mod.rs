use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

/// Rotation threshold used for streams with no configured limit.
pub const DEFAULT_MAX_BYTES: u64 = 2048;

/// Append-only logger with one named stream per file and size-bounded
/// rotation: when a write would push `<stream>.log` past its threshold,
/// the current contents are copied over `<stream>.bak` (one generation
/// of history) and the active file starts again from the new message.
///
/// Logging must never be able to crash the caller, so every failure is
/// reported to stderr instead of the stream being written.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    dir: PathBuf,
    limits: HashMap<String, u64>,
    // Rotation is a stat-copy-remove sequence; writers from different
    // task threads must not interleave it.
    write_lock: Mutex<()>,
}

impl Logger {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                dir: dir.as_ref().to_path_buf(),
                limits: HashMap::new(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Set the rotation threshold (in bytes) for one stream.
    pub fn with_limit(mut self, stream: &str, max_bytes: u64) -> Self {
        let inner = Arc::get_mut(&mut self.inner)
            .expect("with_limit must be called before the logger is cloned");
        inner.limits.insert(stream.to_string(), max_bytes);
        self
    }

    pub fn info(&self, stream: &str, message: &str) {
        self.with_level(stream, "INFO", message);
    }

    pub fn warn(&self, stream: &str, message: &str) {
        self.with_level(stream, "WARN", message);
    }

    pub fn error(&self, stream: &str, message: &str) {
        self.with_level(stream, "ERROR", message);
    }

    pub fn fatal(&self, stream: &str, message: &str) {
        self.with_level(stream, "FATAL", message);
    }

    fn with_level(&self, stream: &str, level: &str, message: &str) {
        let line = format!("{}  {}: {}\n", Local::now().to_rfc2822(), level, message);
        self.write(stream, &line);
    }

    /// Append `message` to the stream's active file, rotating first if the
    /// write would push it past the stream's threshold. No delimiters are
    /// added beyond what the caller supplies.
    pub fn write(&self, stream: &str, message: &str) {
        if let Err(e) = self.try_write(stream, message) {
            eprintln!("logger: write to stream '{}' failed: {}", stream, e);
        }
    }

    fn try_write(&self, stream: &str, message: &str) -> std::io::Result<()> {
        // A poisoned lock only means another writer panicked mid-write;
        // the guarded data is (), so keep logging.
        let _guard = match self.inner.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        fs::create_dir_all(&self.inner.dir)?;

        let active = self.inner.dir.join(format!("{}.log", stream));
        let backup = self.inner.dir.join(format!("{}.bak", stream));
        let max = self
            .inner
            .limits
            .get(stream)
            .copied()
            .unwrap_or(DEFAULT_MAX_BYTES);

        // Rotation is checked on every write, not on a timer.
        if let Ok(meta) = fs::metadata(&active) {
            if meta.len() + message.len() as u64 > max {
                fs::copy(&active, &backup)?;
                fs::remove_file(&active)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&active)?;
        file.write_all(message.as_bytes())
    }
}
