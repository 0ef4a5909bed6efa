//! Rotating log stream

use chrono::{DateTime, Local};
use logwrap_core::{Result, RotationPolicy};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{compress, namer};

/// How often the write path re-stats the active file to detect external
/// deletion. Healing also happens unconditionally at every maintenance tick.
const FILE_CHECK_THROTTLE: Duration = Duration::from_secs(5);

/// One rotating log stream: an append-only active file plus its policy.
///
/// Cloning yields another handle to the same stream; all handles share the
/// same state and the same non-reentrant rotation critical section.
#[derive(Clone)]
pub struct LogStream {
    inner: Arc<Mutex<StreamInner>>,
    maintenance: Arc<Mutex<Option<JoinHandle<()>>>>,
}

struct StreamInner {
    work_dir: PathBuf,
    base_name: String,
    path: PathBuf,
    file: Option<File>,
    write_offset: u64,
    stream_start: DateTime<Local>,
    policy: RotationPolicy,
    last_existence_check: Instant,
}

impl LogStream {
    /// Open (or create) the active file `work_dir/file_name` in append mode.
    pub fn open(work_dir: &Path, file_name: &str, policy: RotationPolicy) -> Result<Self> {
        let base_name = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        let mut inner = StreamInner {
            work_dir: work_dir.to_path_buf(),
            base_name,
            path: work_dir.join(file_name),
            file: None,
            write_offset: 0,
            stream_start: Local::now(),
            policy,
            last_existence_check: Instant::now(),
        };
        inner.open_active()?;

        // Birth time of a pre-existing active file drives date rollover
        // and backup naming; fall back to now where unsupported.
        if let Ok(created) = fs::metadata(&inner.path).and_then(|m| m.created()) {
            inner.stream_start = DateTime::<Local>::from(created);
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            maintenance: Arc::new(Mutex::new(None)),
        })
    }

    /// Append a chunk to the active file, rotating first when the chunk
    /// would push past the size bound.
    ///
    /// Failures are logged and the chunk is dropped; the stream keeps
    /// serving future writes.
    pub fn write(&self, bytes: &[u8]) {
        let backup = {
            let mut inner = self.inner.lock();
            match inner.write_chunk(bytes) {
                Ok(backup) => backup,
                Err(e) => {
                    warn!(
                        "write to {} failed, dropping {} bytes: {}",
                        inner.path.display(),
                        bytes.len(),
                        e
                    );
                    None
                }
            }
        };
        self.spawn_compress(backup);
    }

    /// Rotate the active file into a backup and open a fresh one.
    pub fn rotate(&self) -> Result<()> {
        let backup = self.inner.lock().rotate()?;
        self.spawn_compress(backup);
        Ok(())
    }

    /// One maintenance pass: heal a missing active file, roll over on
    /// calendar-day change, expire and evict backups.
    pub fn run_maintenance(&self) {
        let backup = {
            let mut inner = self.inner.lock();

            if let Err(e) = inner.heal_if_missing() {
                warn!("failed to reopen {}: {}", inner.path.display(), e);
            }

            let mut backup = None;
            if Local::now().date_naive() != inner.stream_start.date_naive() {
                info!("date changed, rotating {}", inner.path.display());
                match inner.rotate() {
                    Ok(b) => backup = b,
                    Err(e) => warn!("rotation of {} failed: {}", inner.path.display(), e),
                }
            }

            inner.sweep_backups(SystemTime::now());
            backup
        };
        self.spawn_compress(backup);
    }

    /// Start the periodic maintenance task.
    pub fn start_maintenance(&self) {
        let period = self.inner.lock().policy.maintenance_interval;
        self.restart_maintenance(period);
    }

    /// Cancel the maintenance task and close the handle. Idempotent.
    pub fn close(&self) {
        if let Some(task) = self.maintenance.lock().take() {
            task.abort();
        }
        self.inner.lock().file = None;
    }

    pub fn set_max_size(&self, bytes: u64) {
        self.inner.lock().policy.max_size_bytes = bytes;
    }

    pub fn set_max_files(&self, count: usize) {
        self.inner.lock().policy.max_files = count;
    }

    pub fn set_max_age(&self, age: Duration) {
        self.inner.lock().policy.max_age = age;
    }

    pub fn set_compress(&self, compress: bool) {
        self.inner.lock().policy.compress = compress;
    }

    /// Change the maintenance period, restarting the scheduler if running.
    pub fn set_maintenance_interval(&self, period: Duration) {
        self.inner.lock().policy.maintenance_interval = period;
        let running = self.maintenance.lock().is_some();
        if running {
            self.restart_maintenance(period);
        }
    }

    /// Snapshot of the current policy.
    pub fn policy(&self) -> RotationPolicy {
        self.inner.lock().policy.clone()
    }

    /// Bytes written to the active file since it was opened.
    pub fn write_offset(&self) -> u64 {
        self.inner.lock().write_offset
    }

    /// Path of the active file.
    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }

    #[cfg(test)]
    fn sweep_backups_at(&self, now: SystemTime) {
        self.inner.lock().sweep_backups(now);
    }

    fn restart_maintenance(&self, period: Duration) {
        let stream = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval yields immediately on the first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                stream.run_maintenance();
            }
        });
        if let Some(old) = self.maintenance.lock().replace(task) {
            old.abort();
        }
    }

    /// Compression runs off the write path so a slow gzip never stalls
    /// writes to the new active file.
    fn spawn_compress(&self, backup: Option<PathBuf>) {
        let Some(path) = backup else { return };
        let job = move || match compress::gzip_file(&path) {
            Ok(dst) => debug!("compressed backup {}", dst.display()),
            Err(e) => warn!("failed to compress {}: {}", path.display(), e),
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }
}

impl StreamInner {
    fn open_active(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.write_offset = file.metadata()?.len();
        self.file = Some(file);
        self.last_existence_check = Instant::now();
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> Result<Option<PathBuf>> {
        let mut backup = None;
        if self.file.is_none()
            || self.write_offset + bytes.len() as u64 > self.policy.max_size_bytes
        {
            backup = self.rotate()?;
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(bytes)?;
            self.write_offset += bytes.len() as u64;
        }

        if self.last_existence_check.elapsed() >= FILE_CHECK_THROTTLE {
            self.last_existence_check = Instant::now();
            if let Err(e) = self.heal_if_missing() {
                warn!("failed to reopen {}: {}", self.path.display(), e);
            }
        }

        Ok(backup)
    }

    /// Reopen the active file if something external removed it. Not a
    /// rotation: no backup is produced.
    fn heal_if_missing(&mut self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        warn!("active log file {} disappeared, reopening", self.path.display());
        self.file = None;
        self.open_active()
    }

    /// Close, rename to a backup, reopen. Returns the backup path when it
    /// should be compressed by the caller.
    fn rotate(&mut self) -> Result<Option<PathBuf>> {
        self.file = None;

        let now = Local::now();
        let backup = namer::backup_path(&self.work_dir, &self.base_name, self.stream_start, now);
        if self.path.exists() {
            fs::rename(&self.path, &backup)?;
            debug!("rotated {} -> {}", self.path.display(), backup.display());
        }

        // The new handle must be open before any compression of the old
        // backup starts.
        self.open_active()?;
        self.stream_start = now;

        Ok((self.policy.compress && backup.exists()).then_some(backup))
    }

    /// Expire backups older than `max_age` as of `now`, then evict the
    /// oldest beyond `max_files`. The active file is never touched.
    /// Per-file errors are logged and do not abort the scan.
    fn sweep_backups(&self, now: SystemTime) {
        let entries = match fs::read_dir(&self.work_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot scan {}: {}", self.work_dir.display(), e);
                return;
            }
        };

        let prefix = format!("{}_", self.base_name);
        let mut survivors: Vec<(PathBuf, SystemTime)> = Vec::new();

        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(&prefix)
                || !(name.ends_with(".log") || name.ends_with(".log.gz"))
            {
                continue;
            }
            let path = entry.path();
            if path == self.path {
                continue;
            }

            let created = match entry
                .metadata()
                .and_then(|m| m.created().or_else(|_| m.modified()))
            {
                Ok(t) => t,
                Err(e) => {
                    warn!("cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };

            // Strictly older than max_age; a backup exactly at the
            // boundary survives.
            let expired = now
                .duration_since(created)
                .map(|age| age > self.policy.max_age)
                .unwrap_or(false);

            if expired {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("cannot delete expired {}: {}", path.display(), e);
                }
            } else {
                survivors.push((path, created));
            }
        }

        let excess = survivors.len().saturating_sub(self.policy.max_files);
        if excess > 0 {
            survivors.sort_by_key(|(_, created)| *created);
            for (path, _) in survivors.into_iter().take(excess) {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("cannot evict {}: {}", path.display(), e);
                }
            }
        }
    }
}
