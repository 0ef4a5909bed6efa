//! Backup file naming

use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Compute a unique backup path for a rotating stream.
///
/// The first candidate is `{base}_{MMDD}.log` where MMDD comes from the
/// date the active file was opened. If that name is taken (same-day double
/// rotation), `_{HHMMSS}_{n}` is appended for the smallest `n >= 1` such
/// that neither the `.log` nor the `.log.gz` variant exists. Names sort
/// lexically in creation order without a persisted counter.
pub fn backup_path(
    work_dir: &Path,
    base_name: &str,
    stream_start: DateTime<Local>,
    now: DateTime<Local>,
) -> PathBuf {
    let day = stream_start.format("%m%d");
    let base = format!("{}_{}", base_name, day);

    let candidate = work_dir.join(format!("{}.log", base));
    if !is_taken(&candidate) {
        return candidate;
    }

    let time = now.format("%H%M%S");
    let mut n = 1u32;
    loop {
        let candidate = work_dir.join(format!("{}_{}_{}.log", base, time, n));
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// A name is taken if either the plain or the gzipped variant exists.
fn is_taken(path: &Path) -> bool {
    path.exists() || gz_sibling(path).exists()
}

/// Append `.gz` to a path, keeping the original extension.
pub(crate) fn gz_sibling(path: &Path) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(".gz");
    PathBuf::from(os)
}
