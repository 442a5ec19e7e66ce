use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/drop-catcher.log";
const DEFAULT_FILE_NAME: &str = "drop-catcher.log";

/// Install stdout and file logging. Keep the returned guard alive for the
/// whole run, dropping it flushes the file writer.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_file = env::var_os("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE.into());
    let (log_dir, file_name) = split_log_path(Path::new(&log_file));

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_thread_names(true)
                .with_ansi(false),
        )
        .with(EnvFilter::new(filter))
        .init();

    info!("Writing log file to {}", log_dir.join(&file_name).display());

    guard
}

/// Directory and file name for the appender. A bare file name logs into the
/// working directory.
fn split_log_path(path: &Path) -> (PathBuf, OsString) {
    match path.file_name() {
        Some(name) => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            (dir.to_path_buf(), name.to_os_string())
        }
        None => (path.to_path_buf(), DEFAULT_FILE_NAME.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new(DEFAULT_LOG_FILE)),
            (PathBuf::from("./logs"), OsString::from("drop-catcher.log"))
        );
        assert_eq!(
            split_log_path(Path::new("run.log")),
            (PathBuf::from("."), OsString::from("run.log"))
        );
        assert_eq!(
            split_log_path(Path::new("/")),
            (PathBuf::from("/"), OsString::from(DEFAULT_FILE_NAME))
        );
    }
}
