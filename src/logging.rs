//! Structured logging: console plus a daily-rolling file in the log dir.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rolling log files are named `register.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "register";
pub const MAX_LOG_FILES: usize = 14;
const DEFAULT_FILTER: &str = "info,shift_register=debug";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Old log files are pruned before the appender opens today's file. The
/// appender guard is leaked so buffered lines flush until process exit.
pub fn init(log_dir: &Path) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let pruned = prune_old_logs(log_dir, MAX_LOG_FILES);
    fs::create_dir_all(log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    std::mem::forget(guard);

    if !pruned.is_empty() {
        tracing::debug!(count = pruned.len(), "Pruned old log files");
    }
}

/// Delete all but the `keep` most recently modified register log files in
/// `log_dir`. Returns the removed paths.
pub fn prune_old_logs(log_dir: &Path, keep: usize) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return Vec::new();
    };

    let prefix = format!("{LOG_FILE_PREFIX}.");
    let mut log_files: Vec<(PathBuf, SystemTime)> = entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file().then(|| {
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                (entry.path(), modified)
            })
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = Vec::new();
    for (path, _) in log_files.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to prune log file"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        fs::write(&path, b"log").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn keeps_newest_register_logs_only() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "register.2024-01-01", 300);
        touch(dir.path(), "register.2024-01-02", 200);
        touch(dir.path(), "register.2024-01-03", 100);
        touch(dir.path(), "other.log", 1000);

        let removed = prune_old_logs(dir.path(), 2);

        assert_eq!(removed, vec![dir.path().join("register.2024-01-01")]);
        assert!(dir.path().join("register.2024-01-03").exists());
        assert!(dir.path().join("other.log").exists());
    }

    #[test]
    fn missing_dir_is_ignored() {
        let dir = TempDir::new().unwrap();
        assert!(prune_old_logs(&dir.path().join("nope"), 1).is_empty());
    }
}
