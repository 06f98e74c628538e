//! Watch-progress tracking and resumption
//!
//! A [`ProgressTracker`] lives for one viewing session of one title. It turns
//! the playback surface's position reports into progress records:
//!
//! - `report_position` persists immediately, but skips reports that moved less
//!   than `min_delta_seconds` from the last persisted position.
//! - `schedule_auto_save` debounces: only the last report of a burst is written,
//!   once the quiet period has elapsed.
//! - `load_progress` reads the stored record back so the caller can resume.
//!
//! Writes are fire-and-forget with merge semantics. A failed write never
//! reaches the caller; it is logged and raises the tracker's warning flag until
//! the next successful write.

use chrono::Utc;
use futures::future::{self, FutureExt};
use mktv_config::ProgressConfig;
use mktv_models::{MediaInfo, ProgressReport, RecordKey, WatchProgress};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::debounce::Debouncer;
use crate::error::{MalformedReport, TrackerError};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub min_delta_seconds: f64,
    pub autosave_interval: Duration,
    pub completed_threshold_percent: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from(&ProgressConfig::default())
    }
}

impl From<&ProgressConfig> for TrackerConfig {
    fn from(config: &ProgressConfig) -> Self {
        Self {
            min_delta_seconds: config.min_delta_seconds,
            autosave_interval: Duration::from_millis(config.autosave_interval_ms),
            completed_threshold_percent: config.completed_threshold_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No report accepted yet
    Idle,
    Tracking,
}

/// What happened to a single report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportOutcome {
    /// A write was started
    Scheduled,
    /// Within the minimal delta of the last persisted value
    Skipped,
    /// Discarded without touching storage
    Rejected(MalformedReport),
}

/// Last values handed to storage (optimistically, before the write completes)
#[derive(Debug, Clone, Copy, PartialEq)]
struct Persisted {
    current_time_seconds: f64,
    duration_seconds: f64,
    progress_percent: f64,
}

#[derive(Debug, Default)]
struct Shared {
    last_persisted: Option<Persisted>,
    warning: bool,
}

fn lock<T>(shared: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panic while holding the lock cannot leave the guarded value half-updated
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handles of every write started, direct or debounced
type Writes = Arc<Mutex<Vec<JoinHandle<()>>>>;

fn track(writes: &Writes, handle: JoinHandle<()>) {
    let mut writes = lock(writes);
    writes.retain(|h| !h.is_finished());
    writes.push(handle);
}

pub struct ProgressTracker {
    store: Arc<dyn RecordStore>,
    key: RecordKey,
    media: Option<MediaInfo>,
    config: TrackerConfig,
    state: TrackerState,
    /// Last known time fields, used to fill percentage-only records
    last_known: Option<(f64, f64)>,
    shared: Arc<Mutex<Shared>>,
    autosave: Debouncer<WatchProgress>,
    writes: Writes,
}

impl ProgressTracker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        viewer_id: impl Into<String>,
        title_id: impl Into<String>,
        config: TrackerConfig,
    ) -> Self {
        let viewer_id = viewer_id.into();
        let title_id = title_id.into();
        let key = RecordKey::progress(&viewer_id, &title_id);
        let shared = Arc::new(Mutex::new(Shared::default()));
        let writes: Writes = Arc::new(Mutex::new(Vec::new()));

        let autosave = {
            let store = Arc::clone(&store);
            let shared = Arc::clone(&shared);
            let writes = Arc::clone(&writes);
            let key = key.clone();
            Debouncer::new(config.autosave_interval, move |mut record: WatchProgress| {
                // Runs in the timer task the moment it fires, so the write is
                // tracked before the timer counts as finished
                record.last_updated = Utc::now();
                lock(&shared).last_persisted = Some(Persisted::of(&record));
                let handle = tokio::spawn(persist(Arc::clone(&store), Arc::clone(&shared), key.clone(), record));
                track(&writes, handle);
                future::ready(()).boxed()
            })
        };

        Self {
            store,
            key,
            media: None,
            config,
            state: TrackerState::Idle,
            last_known: None,
            shared,
            autosave,
            writes,
        }
    }

    /// Display metadata written with every record
    pub fn with_media(mut self, media: MediaInfo) -> Self {
        self.media = Some(media);
        self
    }

    pub fn viewer_id(&self) -> &str {
        &self.key.viewer_id
    }

    pub fn title_id(&self) -> &str {
        &self.key.item_id
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Set after a failed background write, cleared by the next successful one
    pub fn has_warning(&self) -> bool {
        lock(&self.shared).warning
    }

    /// Position of the last value handed to storage
    pub fn last_persisted_time(&self) -> Option<f64> {
        lock(&self.shared).last_persisted.map(|p| p.current_time_seconds)
    }

    pub fn last_persisted_percent(&self) -> Option<f64> {
        lock(&self.shared).last_persisted.map(|p| p.progress_percent)
    }

    /// Load the stored record for this session and seed the tracker with it
    ///
    /// Seeding makes an immediate report of the resumed position a no-op.
    pub async fn resume(&mut self) -> Result<Option<WatchProgress>, TrackerError> {
        let record = load_progress(self.store.as_ref(), &self.key.viewer_id, &self.key.item_id).await?;
        if let Some(record) = &record {
            self.last_known = Some((record.current_time_seconds, record.duration_seconds));
            lock(&self.shared).last_persisted = Some(Persisted::of(record));
            if self.media.is_none() {
                self.media = record.media.clone();
            }
        }
        Ok(record)
    }

    /// Handle one report from the playback surface, whichever its shape
    pub fn report(&mut self, report: ProgressReport) -> ReportOutcome {
        match report {
            ProgressReport::Timed { current_time_seconds, duration_seconds } => {
                self.report_position(current_time_seconds, duration_seconds)
            }
            ProgressReport::PercentOnly { percent } => self.report_percent(percent),
        }
    }

    /// Record a playback position, persisting it unless it barely moved
    pub fn report_position(&mut self, current_time_seconds: f64, duration_seconds: f64) -> ReportOutcome {
        if let Err(reason) = validate(current_time_seconds, duration_seconds) {
            return self.reject(reason);
        }
        self.state = TrackerState::Tracking;
        self.last_known = Some((current_time_seconds, duration_seconds));

        let last = lock(&self.shared).last_persisted;
        if let Some(last) = last {
            let moved = (current_time_seconds - last.current_time_seconds).abs();
            // A duration becoming known changes the percentage even without movement
            let duration_learned = last.duration_seconds <= 0.0 && duration_seconds > 0.0;
            if moved < self.config.min_delta_seconds && !duration_learned {
                debug!(
                    viewer_id = %self.key.viewer_id,
                    title_id = %self.key.item_id,
                    current_time = current_time_seconds,
                    moved,
                    "Position change below threshold, not persisting"
                );
                return ReportOutcome::Skipped;
            }
        }

        let mut record = self.timed_record(current_time_seconds, duration_seconds);
        self.keep_reported_percent(&mut record);
        self.write(record);
        ReportOutcome::Scheduled
    }

    /// Record a percentage-only report (player could not tell the duration)
    ///
    /// The time fields keep their last known values; the percentage is taken
    /// as reported instead of being recomputed from a zero duration.
    pub fn report_percent(&mut self, percent: f64) -> ReportOutcome {
        if !percent.is_finite() {
            return self.reject(MalformedReport::NonFinitePercent);
        }
        let percent = percent.clamp(0.0, 100.0);
        self.state = TrackerState::Tracking;

        if let Some(last) = lock(&self.shared).last_persisted {
            if (percent - last.progress_percent).abs() < f64::EPSILON {
                debug!(
                    viewer_id = %self.key.viewer_id,
                    title_id = %self.key.item_id,
                    percent,
                    "Percentage unchanged, not persisting"
                );
                return ReportOutcome::Skipped;
            }
        }

        let (current, duration) = self.last_known.unwrap_or((0.0, 0.0));
        let mut record = self.timed_record(current, duration);
        record.progress_percent = percent;
        self.write(record);
        ReportOutcome::Scheduled
    }

    /// Debounced save: only the last pair of a burst is written, `interval`
    /// after the final call
    pub fn schedule_auto_save(
        &mut self,
        current_time_seconds: f64,
        duration_seconds: f64,
        interval: Duration,
    ) -> Result<(), MalformedReport> {
        if let Err(reason) = validate(current_time_seconds, duration_seconds) {
            self.reject(reason);
            return Err(reason);
        }
        self.state = TrackerState::Tracking;
        self.last_known = Some((current_time_seconds, duration_seconds));

        if self.autosave.delay() != interval {
            self.autosave.set_delay(interval);
        }
        let mut record = self.timed_record(current_time_seconds, duration_seconds);
        self.keep_reported_percent(&mut record);
        self.autosave.schedule(record);
        Ok(())
    }

    /// `schedule_auto_save` with the configured interval
    pub fn auto_save(&mut self, current_time_seconds: f64, duration_seconds: f64) -> Result<(), MalformedReport> {
        let interval = self.config.autosave_interval;
        self.schedule_auto_save(current_time_seconds, duration_seconds, interval)
    }

    pub fn has_pending_auto_save(&self) -> bool {
        self.autosave.is_pending()
    }

    /// End of session: drop any pending auto-save so nothing fires afterwards
    ///
    /// Writes already started are left to finish. Returns whether an
    /// auto-save was still waiting and got dropped.
    pub fn teardown(&mut self) -> bool {
        let cancelled = self.autosave.cancel();
        if cancelled {
            info!(
                viewer_id = %self.key.viewer_id,
                title_id = %self.key.item_id,
                "Cancelled pending auto-save at session end"
            );
        }
        cancelled
    }

    /// Wait for every write started so far, auto-saves included
    pub async fn flush(&mut self) {
        let pending: Vec<JoinHandle<()>> = lock(&self.writes).drain(..).collect();
        for handle in pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "Progress write task ended abnormally");
            }
        }
    }

    fn timed_record(&self, current_time_seconds: f64, duration_seconds: f64) -> WatchProgress {
        WatchProgress::from_times(
            self.key.viewer_id.clone(),
            self.key.item_id.clone(),
            current_time_seconds,
            duration_seconds,
            Utc::now(),
        )
        .with_media(self.media.clone())
    }

    /// A timed report without a duration carries no percentage of its own;
    /// keep one that an earlier percentage-only report stored
    fn keep_reported_percent(&self, record: &mut WatchProgress) {
        if record.duration_seconds > 0.0 {
            return;
        }
        if let Some(last) = lock(&self.shared).last_persisted {
            if last.duration_seconds <= 0.0 && last.progress_percent > 0.0 {
                record.progress_percent = last.progress_percent;
            }
        }
    }

    fn reject(&self, reason: MalformedReport) -> ReportOutcome {
        warn!(
            viewer_id = %self.key.viewer_id,
            title_id = %self.key.item_id,
            reason = %reason,
            "Discarding malformed position report"
        );
        ReportOutcome::Rejected(reason)
    }

    /// Mark the record as persisted and start the write
    ///
    /// A direct write supersedes any auto-save still waiting: that value is
    /// older and would otherwise land on top of this one.
    fn write(&mut self, record: WatchProgress) {
        if self.autosave.cancel() {
            debug!(
                viewer_id = %self.key.viewer_id,
                title_id = %self.key.item_id,
                "Pending auto-save superseded by a newer report"
            );
        }
        lock(&self.shared).last_persisted = Some(Persisted::of(&record));

        let handle = tokio::spawn(persist(
            Arc::clone(&self.store),
            Arc::clone(&self.shared),
            self.key.clone(),
            record,
        ));
        track(&self.writes, handle);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Persisted {
    fn of(record: &WatchProgress) -> Self {
        Self {
            current_time_seconds: record.current_time_seconds,
            duration_seconds: record.duration_seconds,
            progress_percent: record.progress_percent,
        }
    }
}

fn validate(current_time_seconds: f64, duration_seconds: f64) -> Result<(), MalformedReport> {
    if !current_time_seconds.is_finite() {
        return Err(MalformedReport::NonFiniteTime);
    }
    if current_time_seconds < 0.0 {
        return Err(MalformedReport::NegativeTime(current_time_seconds));
    }
    if !duration_seconds.is_finite() {
        return Err(MalformedReport::NonFiniteDuration);
    }
    if duration_seconds < 0.0 {
        return Err(MalformedReport::NegativeDuration(duration_seconds));
    }
    Ok(())
}

/// Write one record; failures are logged and flagged, never returned
async fn persist(store: Arc<dyn RecordStore>, shared: Arc<Mutex<Shared>>, key: RecordKey, record: WatchProgress) {
    let value = match serde_json::to_value(&record) {
        Ok(value) => value,
        Err(e) => {
            warn!(key = %key, error = %e, "Could not serialize progress record");
            lock(&shared).warning = true;
            return;
        }
    };

    match store.set(&key, value, true).await {
        Ok(()) => {
            lock(&shared).warning = false;
            debug!(
                key = %key,
                current_time = record.current_time_seconds,
                progress = record.progress_percent,
                "Progress persisted"
            );
        }
        Err(e) => {
            lock(&shared).warning = true;
            warn!(
                operation = "progress_write",
                key = %key,
                backend = store.backend_name(),
                error = %e,
                "Progress update not saved; playback continues"
            );
        }
    }
}

/// Read the stored progress for a (viewer, title) pair
///
/// `Ok(None)` means nothing was recorded yet and playback starts at zero.
/// `Err(ReadFailure)` means the answer is unknown.
pub async fn load_progress(
    store: &dyn RecordStore,
    viewer_id: &str,
    title_id: &str,
) -> Result<Option<WatchProgress>, TrackerError> {
    let key = RecordKey::progress(viewer_id, title_id);
    let read_failure = |reason: String| TrackerError::ReadFailure {
        viewer_id: viewer_id.to_string(),
        title_id: title_id.to_string(),
        reason,
    };

    let value = match store.get(&key).await {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!(key = %key, "No stored progress");
            return Ok(None);
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Progress lookup failed");
            return Err(read_failure(e.to_string()));
        }
    };

    serde_json::from_value::<WatchProgress>(value)
        .map(Some)
        .map_err(|e| read_failure(format!("stored record is malformed: {}", e)))
}
