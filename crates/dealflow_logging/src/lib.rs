//! Logging setup for the Dealflow binary.
//!
//! Two sinks: a size-rotated file under `~/.dealflow/logs`, and stderr. The
//! stderr sink drops to warnings while a progress bar or JSON output owns
//! the terminal; the file always records at the configured filter.

use anyhow::{Context, Result};
use dealflow_protocol::paths::default_logs_dir;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "dealflow=info,dealflow_protocol=info";
const VERBOSE_LOG_FILTER: &str = "dealflow=debug,dealflow_protocol=debug";

/// Logging configuration for one process.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// A progress bar or JSON output owns the terminal; keep stderr to warnings.
    pub quiet_console: bool,
}

/// How large the log file may grow and how many generations are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    /// Total files on disk, including the live one.
    pub max_files: usize,
    pub max_bytes: u64,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let dir = default_logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    let log_file = LogFile::open(&dir, config.app_name, Rotation::default())
        .with_context(|| format!("Failed to open log file in {}", dir.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(env_or(DEFAULT_LOG_FILTER)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(console_filter(&config)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Path of the live log file for `app_name`.
pub fn log_file_path(app_name: &str) -> PathBuf {
    default_logs_dir().join(format!("{}.log", file_stem(app_name)))
}

fn env_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn console_filter(config: &LogConfig<'_>) -> EnvFilter {
    if config.verbose {
        env_or(VERBOSE_LOG_FILTER)
    } else if config.quiet_console {
        EnvFilter::new("warn")
    } else {
        env_or(DEFAULT_LOG_FILTER)
    }
}

fn file_stem(app_name: &str) -> String {
    let stem: String = app_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "dealflow".to_string()
    } else {
        stem
    }
}

/// Append-only log file that rolls over to `<name>.log.1`, `.2`, ... once
/// the next write would push it past `max_bytes`.
struct LogFile {
    path: PathBuf,
    rotation: Rotation,
    file: File,
    written: u64,
}

impl LogFile {
    fn open(dir: &Path, app_name: &str, rotation: Rotation) -> io::Result<Self> {
        let path = dir.join(format!("{}.log", file_stem(app_name)));
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        let mut log = Self {
            path,
            rotation,
            file,
            written,
        };
        if log.written >= rotation.max_bytes {
            log.roll()?;
        }
        Ok(log)
    }

    fn backup(&self, generation: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", generation));
        PathBuf::from(name)
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let backups = self.rotation.max_files.saturating_sub(1);

        if backups == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.backup(backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for generation in (1..backups).rev() {
            let from = self.backup(generation);
            if from.exists() {
                fs::rename(&from, self.backup(generation + 1))?;
            }
        }
        fs::rename(&self.path, self.backup(1))?;

        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.rotation.max_bytes {
            self.roll()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small(max_files: usize) -> Rotation {
        Rotation {
            max_files,
            max_bytes: 16,
        }
    }

    #[test]
    fn test_file_stem_replaces_path_characters() {
        assert_eq!(file_stem("dealflow"), "dealflow");
        assert_eq!(file_stem("deal flow/cli"), "deal_flow_cli");
        assert_eq!(file_stem(""), "dealflow");
    }

    #[test]
    fn test_rotation_keeps_bounded_file_count() {
        let temp = TempDir::new().unwrap();
        let mut log = LogFile::open(temp.path(), "dealflow", small(3)).unwrap();

        for _ in 0..10 {
            log.write_all(b"0123456789abcdef").unwrap();
        }
        log.flush().unwrap();

        assert!(temp.path().join("dealflow.log").exists());
        assert!(temp.path().join("dealflow.log.1").exists());
        assert!(temp.path().join("dealflow.log.2").exists());
        assert!(!temp.path().join("dealflow.log.3").exists());
    }

    #[test]
    fn test_single_file_mode_truncates_in_place() {
        let temp = TempDir::new().unwrap();
        let mut log = LogFile::open(temp.path(), "dealflow", small(1)).unwrap();

        log.write_all(b"first line here\n").unwrap();
        log.write_all(b"second\n").unwrap();
        log.flush().unwrap();

        let contents = fs::read_to_string(temp.path().join("dealflow.log")).unwrap();
        assert_eq!(contents, "second\n");
        assert!(!temp.path().join("dealflow.log.1").exists());
    }

    #[test]
    fn test_open_resumes_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("dealflow.log"), b"previous line\n").unwrap();

        let log = LogFile::open(temp.path(), "dealflow", Rotation::default()).unwrap();
        assert_eq!(log.written, 14);
    }

    #[test]
    fn test_open_rolls_oversized_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("dealflow.log"), vec![b'x'; 32]).unwrap();

        let log = LogFile::open(temp.path(), "dealflow", small(3)).unwrap();
        assert_eq!(log.written, 0);
        assert!(temp.path().join("dealflow.log.1").exists());
    }
}
