use crate::app::App;
use crate::output::{format_timestamp, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use mktv_core::WatchHistoryStore;
use mktv_models::WatchProgress;
use owo_colors::OwoColorize;

fn history_store(app: &App) -> WatchHistoryStore {
    WatchHistoryStore::new(app.store()).with_completed_threshold(app.config().progress.completed_threshold_percent)
}

fn print_progress_table(output: &Output, records: &[WatchProgress]) {
    output.emit(&records, || {
        if records.is_empty() {
            println!("{}", "Nothing watched yet".bright_black());
            return;
        }
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    r.title_id.clone(),
                    r.media.as_ref().map(|m| m.label()).unwrap_or_default(),
                    format!("{} / {}", format_timestamp(r.resume_point()), format_timestamp(r.duration_seconds)),
                    format!("{:.0}%", r.progress_percent),
                    r.last_updated.format("%Y-%m-%d %H:%M").to_string(),
                ]
            })
            .collect();
        output.table(&["Title ID", "Title", "Position", "Progress", "Last watched"], rows);
    });
}

pub async fn list(app: &App, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    let records = history_store(app).list(&viewer.id).await?;
    print_progress_table(output, &records);
    Ok(())
}

pub async fn continue_watching(app: &App, limit: usize, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    let records = history_store(app).continue_watching(&viewer.id, limit).await?;
    print_progress_table(output, &records);
    Ok(())
}

pub async fn remove(app: &App, title_id: &str, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    history_store(app).remove(&viewer.id, title_id).await?;
    output.success(format!("Removed {} from history", title_id));
    Ok(())
}

pub async fn clear(app: &App, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        return Err(eyre!("This removes your whole watch history. Re-run with --yes to confirm"));
    }
    let viewer = app.viewer()?;
    let removed = history_store(app).clear(&viewer.id).await?;
    output.success(format!("Removed {} history entries", removed));
    Ok(())
}
