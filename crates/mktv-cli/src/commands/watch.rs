use crate::app::App;
use crate::output::{format_timestamp, Output};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use mktv_core::{load_progress, ProgressTracker, ReportOutcome, TrackerConfig};
use mktv_models::{MediaInfo, MediaType, PlayerMessage, ProgressReport, WatchProgress};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

pub struct WatchOptions {
    pub input: Option<PathBuf>,
    pub autosave: bool,
    pub media: Option<MediaType>,
    pub episode: Option<(u32, u32)>,
}

/// Tally of one session, printed when the input ends
#[derive(Debug, Default, Serialize)]
struct SessionSummary {
    title_id: String,
    reports: usize,
    written: usize,
    skipped: usize,
    rejected: usize,
    autosaved: usize,
    unreadable: usize,
    final_position: Option<f64>,
    final_percent: Option<f64>,
    save_warning: bool,
}

impl SessionSummary {
    fn count(&mut self, outcome: ReportOutcome) {
        match outcome {
            ReportOutcome::Scheduled => self.written += 1,
            ReportOutcome::Skipped => self.skipped += 1,
            ReportOutcome::Rejected(_) => self.rejected += 1,
        }
    }
}

async fn lookup_media(app: &App, title_id: &str, media_type: MediaType, episode: Option<(u32, u32)>) -> Option<MediaInfo> {
    let Ok(id) = title_id.parse::<u64>() else {
        warn!(title_id, "Title id is not a catalog id, skipping metadata lookup");
        return None;
    };
    let catalog = match app.catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(error = %e, "Catalog unavailable, progress will be saved without metadata");
            return None;
        }
    };
    match catalog.media_info(media_type, id, episode).await {
        Ok(info) => Some(info),
        Err(e) => {
            warn!(title_id, error = %e, "Metadata lookup failed, progress will be saved without it");
            None
        }
    }
}

/// Parse one input line; blank lines yield `Ok(None)`
fn parse_line(line: &str) -> Result<Option<ProgressReport>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let message: PlayerMessage = serde_json::from_str(line).map_err(|e| e.to_string())?;
    message
        .into_report()
        .map(Some)
        .ok_or_else(|| "message carries no position".to_string())
}

async fn open_input(input: Option<&PathBuf>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    Ok(match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .wrap_err_with(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    })
}

pub async fn run_watch(app: &App, title_id: &str, options: WatchOptions, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    let config = TrackerConfig::from(&app.config().progress);
    let mut tracker = ProgressTracker::new(app.store(), viewer.id.clone(), title_id, config);

    if let Some(media_type) = options.media {
        if let Some(media) = lookup_media(app, title_id, media_type, options.episode).await {
            tracker = tracker.with_media(media);
        }
    }

    match tracker.resume().await {
        Ok(Some(record)) => output.info(format!(
            "Resuming at {} ({:.0}%)",
            format_timestamp(record.resume_point()),
            record.progress_percent
        )),
        Ok(None) => output.info("No saved progress; starting from the beginning"),
        Err(e) => output.warn(format!("Could not read saved progress, starting from the beginning: {}", e)),
    }

    let reader = open_input(options.input.as_ref()).await?;
    let mut lines = reader.lines();
    let mut summary = SessionSummary { title_id: title_id.to_string(), ..Default::default() };
    let mut last_timed: Option<(f64, f64)> = None;

    while let Some(line) = lines.next_line().await.wrap_err("Failed to read position reports")? {
        let report = match parse_line(&line) {
            Ok(Some(report)) => report,
            Ok(None) => continue,
            Err(reason) => {
                warn!(reason = %reason, "Ignoring unreadable report line");
                summary.unreadable += 1;
                continue;
            }
        };
        summary.reports += 1;

        match report {
            ProgressReport::Timed { current_time_seconds, duration_seconds } if options.autosave => {
                match tracker.auto_save(current_time_seconds, duration_seconds) {
                    Ok(()) => {
                        last_timed = Some((current_time_seconds, duration_seconds));
                        summary.autosaved += 1;
                    }
                    Err(_) => summary.rejected += 1,
                }
            }
            report => {
                let outcome = tracker.report(report);
                debug!(?outcome, "Report handled");
                summary.count(outcome);
            }
        }
    }

    // The input is over: an auto-save still waiting on its timer is written
    // now. One that already fired is awaited by flush.
    if tracker.teardown() {
        if let Some((current, duration)) = last_timed {
            info!(title_id, current_time = current, "Writing final position at session end");
            summary.count(tracker.report_position(current, duration));
        }
    }
    tracker.flush().await;

    summary.final_position = tracker.last_persisted_time();
    summary.final_percent = tracker.last_persisted_percent();
    summary.save_warning = tracker.has_warning();

    if summary.save_warning {
        output.warn("Some progress updates could not be saved; the last saved position may be behind");
    }
    output.emit(&summary, || print_summary(&summary));
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!("{}", format!("Session for {}", summary.title_id).bright_cyan().bold());
    println!(
        "  {} reports: {} written, {} skipped, {} debounced, {} rejected",
        summary.reports, summary.written, summary.skipped, summary.autosaved, summary.rejected
    );
    if summary.unreadable > 0 {
        println!("  {} unreadable lines ignored", summary.unreadable.to_string().yellow());
    }
    match (summary.final_position, summary.final_percent) {
        (Some(position), Some(percent)) => {
            println!("  Saved position: {} ({:.0}%)", format_timestamp(position), percent)
        }
        _ => println!("  {}", "Nothing saved".bright_black()),
    }
}

pub async fn show_progress(app: &App, title_id: &str, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    let record: Option<WatchProgress> = load_progress(app.store().as_ref(), &viewer.id, title_id)
        .await
        .map_err(|e| eyre!("{}", e))?;

    match record {
        Some(record) => output.emit(&record, || {
            let label = record.media.as_ref().map(|m| m.label()).unwrap_or_else(|| title_id.to_string());
            println!("{}", label.bright_cyan().bold());
            println!(
                "  Resume at {} of {} ({:.0}%)",
                format_timestamp(record.resume_point()),
                format_timestamp(record.duration_seconds),
                record.progress_percent
            );
            println!("  Last watched {}", record.last_updated.format("%Y-%m-%d %H:%M UTC"));
        }),
        None => output.emit(&serde_json::Value::Null, || {
            println!("No saved progress for {}", title_id);
        }),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_shapes() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(
            parse_line(r#"{"currentTime": 12.5, "duration": 100}"#).unwrap(),
            Some(ProgressReport::timed(12.5, 100.0))
        );
        assert_eq!(
            parse_line(r#"{"progress": 40}"#).unwrap(),
            Some(ProgressReport::percent_only(40.0))
        );
    }

    #[test]
    fn test_parse_line_rejects_noise() {
        assert!(parse_line("not json").is_err());
        assert!(parse_line("{}").is_err());
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = SessionSummary::default();
        summary.count(ReportOutcome::Scheduled);
        summary.count(ReportOutcome::Skipped);
        summary.count(ReportOutcome::Skipped);
        assert_eq!((summary.written, summary.skipped, summary.rejected), (1, 2, 0));
    }
}
