use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::media::MediaInfo;

/// Completion percentage for a playback position
///
/// Clamped to `[0, 100]`. Returns 0 when the duration is zero, unknown or not finite.
pub fn progress_percent(current_time_seconds: f64, duration_seconds: f64) -> f64 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 || !current_time_seconds.is_finite() {
        return 0.0;
    }
    (current_time_seconds / duration_seconds * 100.0).clamp(0.0, 100.0)
}

/// Durable progress record, one per (viewer, title)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgress {
    pub viewer_id: String,
    pub title_id: String,
    #[serde(rename = "currentTime")]
    pub current_time_seconds: f64,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    #[serde(rename = "progress")]
    pub progress_percent: f64,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
}

impl WatchProgress {
    /// Build a record whose percentage is derived from the two time fields
    pub fn from_times(
        viewer_id: impl Into<String>,
        title_id: impl Into<String>,
        current_time_seconds: f64,
        duration_seconds: f64,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            title_id: title_id.into(),
            current_time_seconds,
            duration_seconds,
            progress_percent: progress_percent(current_time_seconds, duration_seconds),
            last_updated,
            media: None,
        }
    }

    pub fn with_media(mut self, media: Option<MediaInfo>) -> Self {
        self.media = media;
        self
    }

    /// Seek target in seconds for resuming playback
    ///
    /// Falls back to a position derived from the percentage when only the
    /// percentage is trustworthy (duration unknown but a percent was reported).
    pub fn resume_point(&self) -> f64 {
        if self.current_time_seconds > 0.0 {
            self.current_time_seconds
        } else if self.duration_seconds > 0.0 {
            self.duration_seconds * self.progress_percent / 100.0
        } else {
            0.0
        }
    }

    pub fn is_started(&self) -> bool {
        self.progress_percent > 0.0
    }

    pub fn is_completed(&self, threshold_percent: f64) -> bool {
        self.progress_percent >= threshold_percent
    }
}

/// A single position report from the playback surface
///
/// Reports either carry both time fields, or only a percentage when the
/// player could not report a duration. The two shapes are kept distinct so
/// a percentage-only report never gets recomputed against a zero duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressReport {
    Timed {
        current_time_seconds: f64,
        duration_seconds: f64,
    },
    PercentOnly {
        percent: f64,
    },
}

impl ProgressReport {
    pub fn timed(current_time_seconds: f64, duration_seconds: f64) -> Self {
        ProgressReport::Timed { current_time_seconds, duration_seconds }
    }

    pub fn percent_only(percent: f64) -> Self {
        ProgressReport::PercentOnly { percent }
    }
}

/// Raw message as posted by the embedded player
///
/// Field names follow the player's event payload (`currentTime`, `duration`,
/// `percent`/`progress`). Any field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMessage {
    #[serde(default)]
    pub current_time: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default, alias = "progress")]
    pub percent: Option<f64>,
}

impl PlayerMessage {
    /// Classify the message into a report shape
    ///
    /// A message with a positive duration is a timed report. A message with a
    /// percentage but no usable duration is percentage-only. Anything else with
    /// a current time is a timed report with unknown duration. Returns `None`
    /// when the message carries no position information at all.
    pub fn into_report(self) -> Option<ProgressReport> {
        match (self.current_time, self.duration, self.percent) {
            (Some(current), Some(duration), _) if duration > 0.0 => {
                Some(ProgressReport::timed(current, duration))
            }
            (_, _, Some(percent)) => Some(ProgressReport::percent_only(percent)),
            (Some(current), duration, None) => {
                Some(ProgressReport::timed(current, duration.unwrap_or(0.0)))
            }
            (None, _, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_quarter() {
        assert_eq!(progress_percent(30.0, 120.0), 25.0);
    }

    #[test]
    fn test_progress_percent_zero_duration() {
        assert_eq!(progress_percent(0.0, 0.0), 0.0);
        assert_eq!(progress_percent(500.0, 0.0), 0.0);
    }

    #[test]
    fn test_progress_percent_clamped() {
        assert_eq!(progress_percent(130.0, 120.0), 100.0);
        assert_eq!(progress_percent(-5.0, 120.0), 0.0);
        assert_eq!(progress_percent(10.0, f64::NAN), 0.0);
        assert_eq!(progress_percent(10.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_progress_percent_within_bounds_for_valid_positions() {
        let duration = 7200.0;
        let mut current = 0.0;
        while current <= duration {
            let pct = progress_percent(current, duration);
            assert!((0.0..=100.0).contains(&pct));
            assert!((pct - current / duration * 100.0).abs() < 1e-9);
            current += 137.5;
        }
    }

    #[test]
    fn test_record_serializes_with_document_field_names() {
        let record = WatchProgress::from_times("v1", "550", 30.0, 120.0, Utc::now());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["viewerId"], "v1");
        assert_eq!(value["titleId"], "550");
        assert_eq!(value["currentTime"], 30.0);
        assert_eq!(value["duration"], 120.0);
        assert_eq!(value["progress"], 25.0);
        assert!(value.get("media").is_none());
    }

    #[test]
    fn test_resume_point() {
        let record = WatchProgress::from_times("v", "t", 42.0, 100.0, Utc::now());
        assert_eq!(record.resume_point(), 42.0);

        let mut percent_only = WatchProgress::from_times("v", "t", 0.0, 200.0, Utc::now());
        percent_only.progress_percent = 50.0;
        assert_eq!(percent_only.resume_point(), 100.0);

        let unknown = WatchProgress::from_times("v", "t", 0.0, 0.0, Utc::now());
        assert_eq!(unknown.resume_point(), 0.0);
    }

    #[test]
    fn test_player_message_timed() {
        let msg: PlayerMessage = serde_json::from_str(r#"{"currentTime": 12.5, "duration": 50}"#).unwrap();
        assert_eq!(msg.into_report(), Some(ProgressReport::timed(12.5, 50.0)));
    }

    #[test]
    fn test_player_message_percent_with_zero_duration_is_percent_only() {
        let msg: PlayerMessage =
            serde_json::from_str(r#"{"currentTime": 0, "duration": 0, "progress": 40}"#).unwrap();
        assert_eq!(msg.into_report(), Some(ProgressReport::percent_only(40.0)));
    }

    #[test]
    fn test_player_message_without_position() {
        let msg: PlayerMessage = serde_json::from_str(r#"{"duration": 50}"#).unwrap();
        assert_eq!(msg.into_report(), None);
    }
}
