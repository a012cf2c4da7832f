//! Logging bootstrap for the CLI
//!
//! In `serve` mode stdout carries the MCP protocol, so logs go to a file under
//! `~/.issuegate/`. Every other command logs to stderr.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Directory under the home directory holding the MCP log
pub const LOG_DIR_NAME: &str = ".issuegate";

/// Default MCP log file name
pub const DEFAULT_LOG_FILE: &str = "mcp.log";

/// Environment variable overriding the MCP log file name
pub const LOG_FILE_ENV: &str = "ISSUEGATE_LOG_FILE";

/// A writer that flushes and syncs every write, so the MCP log is complete
/// even when the client kills the server.
///
/// # Example
///
/// ```no_run
/// use std::io::Write;
/// use std::sync::{Arc, Mutex};
/// use std::fs::File;
/// use issuegate_cli::logging::FileWriterGuard;
///
/// let file = File::create("log.txt").unwrap();
/// let mut guard = FileWriterGuard::new(Arc::new(Mutex::new(file)));
/// guard.write_all(b"Log message\n").unwrap();
/// ```
pub struct FileWriterGuard {
    file: Arc<Mutex<File>>,
}

impl FileWriterGuard {
    /// Wrap a shared file handle
    pub fn new(file: Arc<Mutex<File>>) -> Self {
        Self { file }
    }
}

impl Write for FileWriterGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let written = file.write(buf)?;
        file.flush()?;
        file.sync_all()?;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.flush()?;
        file.sync_all()
    }
}

/// Level implied by the verbosity flags; `--quiet` wins over the others
pub fn log_level(quiet: bool, debug: bool, verbose: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if verbose {
        Level::TRACE
    } else if debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Path of the MCP log file, honouring [`LOG_FILE_ENV`]
pub fn mcp_log_path() -> PathBuf {
    let log_dir = dirs::home_dir()
        .map(|home| home.join(LOG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(LOG_DIR_NAME));
    let file_name = std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
    log_dir.join(file_name)
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

fn open_log_file(path: &PathBuf) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber
///
/// With `to_file` set, logs go to [`mcp_log_path`] and fall back to stderr if
/// the file cannot be opened. `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: Level, to_file: bool) {
    if to_file {
        let path = mcp_log_path();
        match open_log_file(&path) {
            Ok(file) => {
                let shared = Arc::new(Mutex::new(file));
                tracing_subscriber::fmt()
                    .with_writer(move || FileWriterGuard::new(shared.clone()))
                    .with_env_filter(env_filter(level))
                    .with_ansi(false)
                    .init();
                return;
            }
            Err(e) => {
                eprintln!("Failed to open log file {}, using stderr: {e}", path.display());
            }
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Read;

    #[test]
    fn test_log_level_precedence() {
        assert_eq!(log_level(false, false, false), Level::INFO);
        assert_eq!(log_level(false, true, false), Level::DEBUG);
        assert_eq!(log_level(false, true, true), Level::TRACE);
        assert_eq!(log_level(true, true, true), Level::ERROR);
    }

    #[test]
    #[serial]
    fn test_mcp_log_path_override() {
        std::env::set_var(LOG_FILE_ENV, "gateway-test.log");
        let path = mcp_log_path();
        std::env::remove_var(LOG_FILE_ENV);

        assert!(path.ends_with("gateway-test.log"));
        assert!(path
            .parent()
            .is_some_and(|p| p.ends_with(LOG_DIR_NAME)));
    }

    #[test]
    #[serial]
    fn test_mcp_log_path_default() {
        std::env::remove_var(LOG_FILE_ENV);
        assert!(mcp_log_path().ends_with(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_file_writer_guard_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let file = File::create(&path).unwrap();
        let mut guard = FileWriterGuard::new(Arc::new(Mutex::new(file)));
        guard.write_all(b"hello\n").unwrap();
        guard.flush().unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello\n");
    }
}
