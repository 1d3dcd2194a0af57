//! tmf-settings CLI
//!
//! Entry point for the `tmf-settings` command-line tool.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process;

use tmf_settings::config::ConfigError;
use tmf_settings::wiki::update::{self, HttpFetcher, UpdateOutcome};
use tmf_settings::wiki::{generate_json, SettingInfo};
use tmf_settings::{
    logging, render, AnalyzeError, AnalyzeOptions, Analyzer, EffectiveConfig, RenderOptions, WikiError, WikiIndex,
};

#[derive(Parser)]
#[command(name = "tmf-settings")]
#[command(about = "Show the slicer settings saved in 3MF project files", version)]
struct Cli {
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a 3MF project
    Analyze {
        /// Path to the .3mf file
        file: PathBuf,

        /// Show the value each custom setting replaced
        #[arg(long)]
        diff: bool,

        /// Print the resolved report as JSON
        #[arg(long)]
        json: bool,

        /// Disable colors
        #[arg(long)]
        no_color: bool,

        /// Link setting names to their wiki pages
        #[arg(long)]
        wiki: bool,

        /// Value comparison policy (default from config: exact)
        #[arg(long, value_parser = ["exact", "canonical"])]
        normalize: Option<String>,

        /// Path to config file (default: <config_dir>/tmf-settings/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Setting metadata from the slicer sources
    Wiki {
        #[command(subcommand)]
        action: WikiCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WikiCommands {
    /// Download the slicer sources and regenerate settings_wiki.json
    Update {
        /// Download and regenerate even if nothing changed
        #[arg(long)]
        force: bool,

        /// Only regenerate from the local sources
        #[arg(long, conflicts_with = "force")]
        parse_only: bool,
    },

    /// Show what is known about a setting
    Lookup {
        /// Setting key, e.g. wall_loops
        key: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration and its sources as JSON
    Show {
        /// Path to config file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wiki(#[from] WikiError),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown setting: {0}")]
    UnknownSetting(String),
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            file,
            diff,
            json,
            no_color,
            wiki,
            normalize,
            config,
        } => run_analyze(
            file,
            RenderOptions {
                diff,
                color: !no_color,
                wiki,
            },
            json,
            normalize,
            config,
        ),
        Commands::Wiki { action } => match action {
            WikiCommands::Update { force, parse_only } => run_wiki_update(force, parse_only),
            WikiCommands::Lookup { key, json } => run_wiki_lookup(&key, json),
        },
        Commands::Config { action } => match action {
            ConfigCommands::Show { config } => run_config_show(config),
        },
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run_analyze(
    file: PathBuf,
    options: RenderOptions,
    json: bool,
    normalize: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let cli_layer = normalize.map(|n| serde_json::json!({ "normalize": n }));
    let config = EffectiveConfig::load(config_path.as_deref(), cli_layer)?;

    let analyzer = Analyzer::new(AnalyzeOptions {
        normalization: config.normalization(),
    });
    let report = analyzer.analyze(&file)?;

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    let index = options.wiki.then(|| WikiIndex::load(&config.wiki()));
    print!("{}", render(&report, &options, index.as_ref()));
    Ok(())
}

fn run_wiki_update(force: bool, parse_only: bool) -> Result<(), CliError> {
    let config = EffectiveConfig::load(None, None)?;
    let settings = config.wiki();

    if parse_only {
        let data = generate_json(&settings)?;
        println!(
            "Parsed {} settings ({} with wiki page) into {}",
            data.meta.total_settings,
            data.meta.with_wiki_page,
            settings.json_path().display()
        );
        return Ok(());
    }

    let fetcher = HttpFetcher::from_settings(&settings)?;
    match update::update(&settings, &fetcher, force)? {
        UpdateOutcome::Updated => println!("Updated {}", settings.json_path().display()),
        UpdateOutcome::UpToDate => println!("Already up to date"),
    }
    Ok(())
}

#[derive(Serialize)]
struct LookupOutput<'a> {
    key: &'a str,
    #[serde(flatten)]
    info: &'a SettingInfo,
    url: Option<String>,
}

fn run_wiki_lookup(key: &str, json: bool) -> Result<(), CliError> {
    let config = EffectiveConfig::load(None, None)?;
    let index = WikiIndex::try_load(&config.wiki())?;
    let info = index
        .info(key)
        .ok_or_else(|| CliError::UnknownSetting(key.to_string()))?;

    let output = LookupOutput {
        key,
        info,
        url: index.url(key),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", key);
    let fields = [
        ("Label", info.label.as_deref()),
        ("Full label", info.full_label.as_deref()),
        ("Type", info.kind.as_deref()),
        ("Category", info.category.as_deref()),
        ("Default", info.default.as_deref()),
        ("Unit", info.sidetext.as_deref()),
        ("Wiki", output.url.as_deref()),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            println!("  {:<11} {}", format!("{}:", name), value);
        }
    }
    if let Some(tooltip) = &info.tooltip {
        println!();
        for line in tooltip.lines() {
            println!("  {}", line);
        }
    }
    Ok(())
}

fn run_config_show(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = EffectiveConfig::load(config_path.as_deref(), None)?;
    println!("{}", config.to_json()?);
    Ok(())
}
