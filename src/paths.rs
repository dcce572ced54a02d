//! Platform-specific locations for the slug cache and saved results.

use std::path::PathBuf;

/// Returns the cache directory for wpscout.
///
/// Platform-specific locations:
/// - Linux: `~/.cache/wpscout/`
/// - macOS: `~/Library/Caches/wpscout/`
/// - Windows: `%LOCALAPPDATA%\wpscout\`
///
/// Falls back to `/tmp/wpscout/` if no cache directory can be determined.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("wpscout")
}

/// Returns the directory saved scan results are written to.
///
/// Lives under the platform data directory (`~/.local/share/wpscout/results`
/// on Linux), falling back to `./results`.
pub fn results_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("wpscout"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("results")
}
