use crate::output::{mask_secret, Output};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, Color, Table};
use mktv_config::{Config, PathManager, StorageBackend};
use owo_colors::OwoColorize;
use serde_json::json;

pub fn run_config(cmd: ConfigCommands, paths: &PathManager, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(paths, full, output),
        ConfigCommands::Init { force } => init_config(paths, force, output),
    }
}

fn section(title: &str, rows: Vec<(&str, String)>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new(title).fg(Color::Cyan).add_attribute(Attribute::Bold)]);
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table
}

fn show_config(paths: &PathManager, full: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    let exists = config_file.exists();
    let mut config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config.apply_env_overrides();

    let secret = |value: &str| if full { value.to_string() } else { mask_secret(value) };

    if !output.is_human() {
        let backend = config.backend.as_ref().map(|b| {
            json!({
                "project_id": b.project_id,
                "api_key": secret(&b.api_key),
                "auth_base_url": b.auth_base_url,
                "database_base_url": b.database_base_url,
            })
        });
        let data = json!({
            "config_file": config_file.display().to_string(),
            "exists": exists,
            "tmdb": {
                "api_key": secret(&config.tmdb.api_key),
                "language": config.tmdb.language,
                "base_url": config.tmdb.base_url,
            },
            "backend": backend,
            "progress": config.progress,
            "storage": config.storage,
            "logging": config.logging,
        });
        output.emit(&data, || {});
        return Ok(());
    }

    if !exists {
        output.warn(format!("No configuration file at {}; showing defaults", config_file.display()));
        output.info("Run 'mktv config init' to create one.");
    }

    output.emit(&(), || {
        println!("\n{}", "╔════════════════════════════════════════════════════════════╗".bright_white());
        println!("{} {}", "║".bright_white(), "Configuration".bright_cyan().bold());
        println!("{}", "╚════════════════════════════════════════════════════════════╝".bright_white());
        println!();

        println!(
            "{}\n",
            section(
                "Locations",
                vec![
                    ("Config File", config_file.display().to_string()),
                    ("Data Directory", paths.data_dir().display().to_string()),
                ]
            )
        );

        println!(
            "{}\n",
            section(
                "Catalog (TMDB)",
                vec![
                    ("API Key", secret(&config.tmdb.api_key)),
                    ("Language", config.tmdb.language.clone()),
                    ("Base URL", config.tmdb.base_url.clone()),
                ]
            )
        );

        match &config.backend {
            Some(backend) => {
                let mut rows = vec![
                    ("Project ID", backend.project_id.clone()),
                    ("API Key", secret(&backend.api_key)),
                ];
                if let Some(url) = &backend.auth_base_url {
                    rows.push(("Auth URL", url.clone()));
                }
                if let Some(url) = &backend.database_base_url {
                    rows.push(("Database URL", url.clone()));
                }
                println!("{}\n", section("Account Backend", rows));
            }
            None => println!("{}\n", "Account backend: Not configured".bright_black()),
        }

        let storage = match config.storage.backend {
            StorageBackend::File => format!("file ({})", paths.records_dir().display()),
            StorageBackend::Memory => "memory".to_string(),
            StorageBackend::Remote => "remote".to_string(),
        };
        println!(
            "{}\n",
            section(
                "Progress",
                vec![
                    ("Storage", storage),
                    ("Minimum Change", format!("{} seconds", config.progress.min_delta_seconds)),
                    ("Auto-save Interval", format!("{} ms", config.progress.autosave_interval_ms)),
                    ("Completed At", format!("{}%", config.progress.completed_threshold_percent)),
                ]
            )
        );

        if let Some(logging) = &config.logging {
            let file = logging.file.as_ref().map(|f| f.display().to_string()).unwrap_or_else(|| "stderr".to_string());
            println!(
                "{}",
                section(
                    "Logging",
                    vec![
                        ("Level", logging.level.clone()),
                        ("JSON", if logging.json { "✓".green().to_string() } else { "✗".red().to_string() }),
                        ("Output", file),
                    ]
                )
            );
        }
    });
    Ok(())
}

fn init_config(paths: &PathManager, force: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        return Err(eyre!(
            "Configuration already exists at {} (use --force to overwrite)",
            config_file.display()
        ));
    }
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create {}: {}", paths.config_dir().display(), e))?;
    Config::default()
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote default configuration to {}", config_file.display()));
    output.info(format!("Set [tmdb] api_key there, or export {}", mktv_config::config::TMDB_API_KEY_ENV));
    output.info(format!(
        "Logs go to stderr; add [logging] file = \"{}\" to keep a daily log file",
        paths.log_file().display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::rooted_at(dir.path());
        let output = Output::new(OutputFormat::Json, true);

        init_config(&paths, false, &output).unwrap();
        assert!(paths.config_file().exists());
        assert!(paths.records_dir().is_dir());
        assert!(init_config(&paths, false, &output).is_err());
        init_config(&paths, true, &output).unwrap();
    }

    #[test]
    fn test_show_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::rooted_at(dir.path());
        let output = Output::new(OutputFormat::Json, true);
        show_config(&paths, false, &output).unwrap();
    }
}
