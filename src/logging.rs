//! Log output for the plugin.
//!
//! Messages go to stderr and, when a project is open, to a daily log file in
//! `<project>/Saved/Logs`. Yesterday's files are gzipped and compressed files
//! older than a week are deleted.

use std::{
    io::{self, IsTerminal, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::FolderTintConfig;

pub const LOG_FILE_PREFIX: &str = "foldertint";

const SECONDS_PER_DAY: u64 = 86400;
const COMPRESSED_LOG_MAX_AGE_DAYS: u64 = 7;

/// Keeps the file writer alive. Logs written after this is dropped may be
/// lost.
pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn log_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("Saved").join("Logs")
}

/// The file log level configured for `project_dir`. `None` means file
/// logging is off.
pub fn file_log_level(project_dir: &Path) -> Option<LevelFilter> {
    let (config, _) = FolderTintConfig::load_or_default(project_dir);
    config.file_log_level().unwrap_or_else(|err| {
        eprintln!("Warning: {err}");
        Some(LevelFilter::INFO)
    })
}

/// Installs the global subscriber. If the host already installed one, the
/// plugin logs through that instead and nothing here takes effect.
pub fn init_logging(verbosity: u8, project_dir: Option<&Path>) -> LogGuard {
    if tracing_log::LogTracer::init().is_err() {
        return LogGuard { _file_guard: None };
    }

    let console_filter = match verbosity {
        0 => "info",
        1 => "info,foldertint=debug",
        2 => "info,foldertint=trace",
        _ => "trace",
    };

    let console_env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_filter));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_filter(console_env_filter);

    let mut file_guard = None;

    let level = project_dir.and_then(|dir| file_log_level(dir).map(|level| (dir, level)));
    let file_layer = level.and_then(|(dir, level)| {
        let log_dir = log_dir(dir);

        if let Err(err) = fs_err::create_dir_all(&log_dir) {
            eprintln!("Warning: {err}");
            return None;
        }

        compress_old_logs(&log_dir, LOG_FILE_PREFIX);

        let file_appender = match tracing_appender::rolling::Builder::new()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(&log_dir)
        {
            Ok(appender) => appender,
            Err(err) => {
                eprintln!("Warning: could not open log file in {}: {err}", log_dir.display());
                return None;
            }
        };

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guard = Some(guard);

        Some(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_target(true)
                .with_thread_names(true)
                .with_level(true)
                .with_filter(EnvFilter::new(level.to_string())),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    LogGuard {
        _file_guard: file_guard,
    }
}

fn days_since_epoch(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|since| since.as_secs() / SECONDS_PER_DAY)
}

/// Gzips `<prefix>*.log` files last written before today and deletes
/// `<prefix>*.log.gz` files older than a week. The directory is shared with
/// the editor, so files without the prefix are never touched. Failures are
/// ignored; the worst case is an uncompressed log file.
fn compress_old_logs(log_dir: &Path, prefix: &str) {
    let Some(today) = days_since_epoch(SystemTime::now()) else {
        return;
    };

    let Ok(entries) = fs_err::read_dir(log_dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        if !file_name.starts_with(prefix) {
            continue;
        }

        let modified_day = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(days_since_epoch);

        if file_name.ends_with(".log.gz") {
            if modified_day.is_some_and(|day| today.saturating_sub(day) > COMPRESSED_LOG_MAX_AGE_DAYS)
            {
                let _ = fs_err::remove_file(&path);
            }
            continue;
        }

        if !file_name.ends_with(".log") {
            continue;
        }

        if modified_day.map_or(true, |day| day >= today) {
            continue;
        }

        let Ok(contents) = fs_err::read(&path) else {
            continue;
        };

        let gz_path = path.with_extension("log.gz");
        let Ok(gz_file) = fs_err::File::create(&gz_path) else {
            continue;
        };

        let mut encoder = flate2::write::GzEncoder::new(gz_file, flate2::Compression::default());
        if encoder.write_all(&contents).is_ok() && encoder.finish().is_ok() {
            let _ = fs_err::remove_file(&path);
        } else {
            let _ = fs_err::remove_file(&gz_path);
        }
    }
}
