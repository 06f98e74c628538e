use crate::app::App;
use crate::output::Output;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use mktv_core::WatchlistStore;
use mktv_models::MediaType;
use owo_colors::OwoColorize;

pub async fn list(app: &App, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    let entries = WatchlistStore::new(app.store()).list(&viewer.id).await?;
    output.emit(&entries, || {
        if entries.is_empty() {
            println!("{}", "Your watchlist is empty".bright_black());
            return;
        }
        let rows = entries
            .iter()
            .map(|e| {
                vec![
                    e.title_id.clone(),
                    e.media_type.to_string(),
                    e.title.clone(),
                    e.added_at.format("%Y-%m-%d").to_string(),
                ]
            })
            .collect();
        output.table(&["Title ID", "Type", "Title", "Added"], rows);
    });
    Ok(())
}

pub async fn add(app: &App, title_id: &str, media: MediaType, title: Option<String>, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;

    let (title, poster_path) = match title {
        Some(title) => (title, None),
        None => {
            let id = title_id
                .parse::<u64>()
                .map_err(|_| eyre!("'{}' is not a catalog id; pass --title to add it by name", title_id))?;
            let details = app
                .catalog()?
                .details(media, id)
                .await
                .wrap_err_with(|| format!("Could not look up {} {}", media, id))?;
            (details.card.title, details.card.poster_path)
        }
    };

    let entry = WatchlistStore::new(app.store())
        .add(&viewer.id, title_id, media, &title, poster_path)
        .await?;
    output.emit(&entry, || output.success(format!("{} is on your watchlist", entry.title)));
    Ok(())
}

pub async fn remove(app: &App, title_id: &str, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    WatchlistStore::new(app.store()).remove(&viewer.id, title_id).await?;
    output.success(format!("Removed {} from your watchlist", title_id));
    Ok(())
}
