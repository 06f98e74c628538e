use crate::app::App;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use futures::FutureExt;
use mktv_core::{Catalog, Debouncer};
use mktv_models::{EpisodeCard, MediaType, TitleCard};
use mktv_sources::tmdb::{TimeWindow, TrendingMedia};
use mktv_sources::SourceError;
use owo_colors::OwoColorize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Quiet period before an interactive query is sent
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

fn lookup_error(e: SourceError) -> color_eyre::Report {
    match e {
        SourceError::Unauthorized { .. } => eyre!("The catalog rejected the API key; check [tmdb] api_key"),
        SourceError::NotFound { path, .. } => eyre!("Not found in the catalog: {}", path),
        other => eyre!("Catalog request failed: {}", other),
    }
}

fn print_cards(output: &Output, cards: &[TitleCard]) {
    output.emit(&cards, || {
        if cards.is_empty() {
            println!("{}", "No results".bright_black());
            return;
        }
        let rows = cards
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.media_type.to_string(),
                    c.title.clone(),
                    c.year.map(|y| y.to_string()).unwrap_or_default(),
                    c.vote_average.map(|v| format!("{:.1}", v)).unwrap_or_default(),
                ]
            })
            .collect();
        output.table(&["ID", "Type", "Title", "Year", "Rating"], rows);
    });
}

fn print_episodes(output: &Output, episodes: &[EpisodeCard]) {
    let rows = episodes
        .iter()
        .map(|e| {
            vec![
                format!("S{:02}E{:02}", e.season_number, e.episode_number),
                e.name.clone(),
                e.runtime_minutes.map(|m| format!("{} min", m)).unwrap_or_default(),
            ]
        })
        .collect();
    output.table(&["Episode", "Name", "Runtime"], rows);
}

pub async fn trending(app: &App, media: TrendingMedia, window: TimeWindow, output: &Output) -> Result<()> {
    let cards = app.catalog()?.trending(media, window).await.map_err(lookup_error)?;
    print_cards(output, &cards);
    Ok(())
}

pub async fn popular(app: &App, media: MediaType, page: u32, output: &Output) -> Result<()> {
    let cards = app.catalog()?.popular(media, page).await.map_err(lookup_error)?;
    print_cards(output, &cards);
    Ok(())
}

pub async fn search(app: &App, query: &str, page: u32, output: &Output) -> Result<()> {
    let cards = app.catalog()?.search(query, page).await.map_err(lookup_error)?;
    print_cards(output, &cards);
    Ok(())
}

async fn run_query(catalog: &Catalog, query: &str, output: &Output) {
    match catalog.search(query, 1).await {
        Ok(cards) => print_cards(output, &cards),
        Err(e) => output.error(format!("Search for '{}' failed: {}", query, e)),
    }
}

/// Search as you type: each stdin line replaces the query, and a lookup is
/// only sent once input has been quiet for a moment
pub async fn interactive_search(app: &App, output: &Output) -> Result<()> {
    let catalog = app.catalog()?;
    if output.is_human() {
        output.info("Type a query per line; results follow once you pause. Ctrl-D to finish.");
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE, move |query: String| {
        let tx = tx.clone();
        async move {
            // The receiver only goes away when the session is over
            let _ = tx.send(query);
        }
        .boxed()
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut waiting: Option<String> = None;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let query = line.trim().to_string();
                if query.is_empty() {
                    continue;
                }
                debug!(query = %query, "Query updated");
                waiting = Some(query.clone());
                debouncer.schedule(query);
            }
            Some(query) = rx.recv() => {
                waiting = None;
                run_query(&catalog, &query, output).await;
            }
        }
    }

    // Input closed: run the query that was still waiting for its quiet period
    debouncer.cancel();
    if let Some(query) = waiting {
        run_query(&catalog, &query, output).await;
    }
    Ok(())
}

pub async fn details(app: &App, media_type: MediaType, id: u64, output: &Output) -> Result<()> {
    let details = app.catalog()?.details(media_type, id).await.map_err(lookup_error)?;
    output.emit(&details, || {
        let card = &details.card;
        let year = card.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        println!("{}{}", card.title.bright_cyan().bold(), year);
        if let Some(tagline) = &details.tagline {
            println!("{}", tagline.italic());
        }
        println!();
        if !details.genres.is_empty() {
            println!("Genres:  {}", details.genres.join(", "));
        }
        if let Some(runtime) = details.runtime_minutes {
            println!("Runtime: {} min", runtime);
        }
        if let Some(vote) = card.vote_average {
            println!("Rating:  {:.1}", vote);
        }
        if !details.seasons.is_empty() {
            let seasons: Vec<String> = details.seasons.iter().map(|s| s.to_string()).collect();
            println!("Seasons: {}", seasons.join(", "));
        }
        if !card.overview.is_empty() {
            println!();
            println!("{}", card.overview);
        }
    });
    Ok(())
}

pub async fn season(app: &App, show_id: u64, number: u32, output: &Output) -> Result<()> {
    let season = app.catalog()?.season(show_id, number).await.map_err(lookup_error)?;
    output.emit(&season, || {
        println!("{}", season.name.bright_cyan().bold());
        print_episodes(output, &season.episodes);
    });
    Ok(())
}

pub async fn parts(app: &App, show_id: u64, output: &Output) -> Result<()> {
    let parts = app.catalog()?.parts(show_id).await.map_err(lookup_error)?;
    output.emit(&parts, || {
        if parts.is_empty() {
            println!("{}", "This show has no episode groups".bright_black());
        }
        for part in &parts {
            println!("{}", part.name.bright_cyan().bold());
            print_episodes(output, &part.episodes);
        }
    });
    Ok(())
}
