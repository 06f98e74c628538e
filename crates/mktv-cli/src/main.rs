use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::{catalog, comments, config, history, session, watch, watchlist};
use mktv_models::MediaType;
use mktv_sources::tmdb::{TimeWindow, TrendingMedia};
use std::path::PathBuf;

mod app;
mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "mktv")]
#[command(about = "MKTV - browse movies and shows, and pick up where you left off")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Keep records in memory for this run only (nothing is read or written remotely)
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    #[command(long_about = "Sign in to the hosted account backend. The password is always read from the terminal. Use --sign-up to create the account first.")]
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,

        /// Create a new account instead of signing in
        #[arg(long, action = ArgAction::SetTrue)]
        sign_up: bool,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in viewer
    Whoami,
    /// Browse the movie and TV catalog
    Catalog {
        #[command(subcommand)]
        cmd: CatalogCommands,
    },
    /// Track a viewing session from JSON-line position reports
    #[command(long_about = "Run a progress-tracking session for one title. Reads player messages such as {\"currentTime\": 12.5, \"duration\": 3600} or {\"percent\": 40} one per line from stdin or --input, persisting progress as it goes. The stored resume point is printed before the first report is read.")]
    Watch {
        /// Title identifier (e.g. the catalog id)
        title_id: String,

        /// Read reports from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Route timed reports through the debounced auto-save
        #[arg(long, action = ArgAction::SetTrue)]
        autosave: bool,

        /// Look up display metadata for the title (movie or tv)
        #[arg(long)]
        media: Option<MediaType>,

        /// Season number, for episodes
        #[arg(long, requires = "episode")]
        season: Option<u32>,

        /// Episode number, for episodes
        #[arg(long, requires = "season")]
        episode: Option<u32>,
    },
    /// Show the stored resume point for a title
    Progress {
        title_id: String,
    },
    /// Watch history
    History {
        #[command(subcommand)]
        cmd: HistoryCommands,
    },
    /// Titles saved for later
    Watchlist {
        #[command(subcommand)]
        cmd: WatchlistCommands,
    },
    /// Per-title comment threads
    Comments {
        #[command(subcommand)]
        cmd: CommentCommands,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Trending titles
    Trending {
        #[arg(long, default_value = "all")]
        media: TrendingMedia,

        #[arg(long, default_value = "week")]
        window: TimeWindow,
    },
    /// Popular movies or shows
    Popular {
        #[arg(long, default_value = "movie")]
        media: MediaType,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Search movies and shows; without a query, search interactively
    Search {
        query: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Movie details
    Movie {
        id: u64,
    },
    /// Show details
    Tv {
        id: u64,
    },
    /// Episodes of one season
    Season {
        id: u64,
        number: u32,
    },
    /// Episodes arranged in parts (from the show's episode groups)
    Parts {
        id: u64,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// Everything watched, most recent first
    List,
    /// Started but unfinished titles
    Continue {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Remove one title from the history
    Remove {
        title_id: String,
    },
    /// Remove the whole history
    Clear {
        /// Confirm the deletion
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WatchlistCommands {
    List,
    /// Add a title
    Add {
        title_id: String,

        #[arg(long)]
        media: MediaType,

        /// Display title; looked up in the catalog when omitted
        #[arg(long)]
        title: Option<String>,
    },
    Remove {
        title_id: String,
    },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Comments on a title, oldest first
    List {
        title_id: String,
    },
    /// Post a comment
    Post {
        title_id: String,

        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Delete one of your comments
    Delete {
        title_id: String,
        comment_id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let paths = mktv_config::PathManager::default();
    let file_config = mktv_config::Config::load_or_default(&paths.config_file()).ok();
    let logging_config = file_config.as_ref().and_then(|c| c.logging.clone());
    logging::init_logging(cli.verbose, cli.quiet, logging_config.as_ref())
        .map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        // Config commands must work even when the config file does not load
        Commands::Config { cmd } => config::run_config(cmd, &paths, &output),
        command => {
            let app = app::App::load(paths, cli.offline).await?;
            run(command, &app, &output).await
        }
    }
}

async fn run(command: Commands, app: &app::App, output: &output::Output) -> color_eyre::Result<()> {
    match command {
        Commands::Login { email, sign_up } => session::login(app, email, sign_up, output).await,
        Commands::Logout => session::logout(app, output),
        Commands::Whoami => session::whoami(app, output),
        Commands::Catalog { cmd } => match cmd {
            CatalogCommands::Trending { media, window } => catalog::trending(app, media, window, output).await,
            CatalogCommands::Popular { media, page } => catalog::popular(app, media, page, output).await,
            CatalogCommands::Search { query: Some(query), page } => catalog::search(app, &query, page, output).await,
            CatalogCommands::Search { query: None, .. } => catalog::interactive_search(app, output).await,
            CatalogCommands::Movie { id } => catalog::details(app, MediaType::Movie, id, output).await,
            CatalogCommands::Tv { id } => catalog::details(app, MediaType::Tv, id, output).await,
            CatalogCommands::Season { id, number } => catalog::season(app, id, number, output).await,
            CatalogCommands::Parts { id } => catalog::parts(app, id, output).await,
        },
        Commands::Watch { title_id, input, autosave, media, season, episode } => {
            let options = watch::WatchOptions {
                input,
                autosave,
                media,
                episode: season.zip(episode),
            };
            watch::run_watch(app, &title_id, options, output).await
        }
        Commands::Progress { title_id } => watch::show_progress(app, &title_id, output).await,
        Commands::History { cmd } => match cmd {
            HistoryCommands::List => history::list(app, output).await,
            HistoryCommands::Continue { limit } => history::continue_watching(app, limit, output).await,
            HistoryCommands::Remove { title_id } => history::remove(app, &title_id, output).await,
            HistoryCommands::Clear { yes } => history::clear(app, yes, output).await,
        },
        Commands::Watchlist { cmd } => match cmd {
            WatchlistCommands::List => watchlist::list(app, output).await,
            WatchlistCommands::Add { title_id, media, title } => watchlist::add(app, &title_id, media, title, output).await,
            WatchlistCommands::Remove { title_id } => watchlist::remove(app, &title_id, output).await,
        },
        Commands::Comments { cmd } => match cmd {
            CommentCommands::List { title_id } => comments::list(app, &title_id, output).await,
            CommentCommands::Post { title_id, text } => comments::post(app, &title_id, &text.join(" "), output).await,
            CommentCommands::Delete { title_id, comment_id } => comments::delete(app, &title_id, &comment_id, output).await,
        },
        Commands::Config { cmd } => config::run_config(cmd, app.paths(), output),
    }
}
