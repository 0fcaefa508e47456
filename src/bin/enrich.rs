//! enrich: countdown-enrich CLI
//!
//! Resolve previews and ticket links through the on-disk caches, and
//! inspect or sweep those caches.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use countdown_enrich::CacheStore;
use countdown_enrich::config::{Config, Secrets};
use countdown_enrich::{Enrichment, Game, Team};

/// Countdown enrichment cache tool
#[derive(Parser)]
#[command(name = "enrich")]
#[command(version)]
#[command(about = "Game preview and ticket link enrichment cache")]
struct Args {
    /// Config file (default: ~/.countdown-enrich/config.toml)
    #[arg(short, long, env = "COUNTDOWN_ENRICH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the cache directory from the config
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the AI preview for a game
    Preview {
        /// Game JSON file
        game: PathBuf,
        /// League code (NFL, MLB, ...)
        #[arg(short, long)]
        league: String,
        /// Abbreviation of the team whose page is being rendered
        #[arg(short, long)]
        team: String,
    },

    /// Resolve the affiliate ticket link for a game
    Tickets {
        /// Game JSON file
        game: PathBuf,
        /// League code (NFL, MLB, ...)
        #[arg(short, long)]
        league: String,
        /// Abbreviation of the team whose page is being rendered
        #[arg(short, long)]
        team: String,
        /// Ignore the game and look for the team's next listing
        #[arg(long)]
        undated: bool,
    },

    /// List cached entries
    Inspect {
        domain: Domain,
    },

    /// Drop expired entries now
    Purge {
        domain: Domain,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Domain {
    Preview,
    Tickets,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.cache_dir {
        config.cache.dir = dir;
    }
    let secrets = Secrets::load()?;
    let enrichment = config.builder(&secrets).build()?;

    match args.command {
        Command::Preview { game, league, team } => {
            let game = load_game(&game)?;
            let team = pick_team(&game, &team)?;
            match enrichment.game_preview(&league, &game, &team).await {
                Some(preview) => println!("{preview}"),
                None => println!("(no preview)"),
            }
        }
        Command::Tickets {
            game,
            league,
            team,
            undated,
        } => {
            let game = load_game(&game)?;
            let team = pick_team(&game, &team)?;
            let target = (!undated).then_some(&game);
            match enrichment.affiliate_links(&team, &league, target).await {
                Some(links) => println!("{}", links.tickets.unwrap_or_default()),
                None => println!("(no ticket link)"),
            }
        }
        Command::Inspect { domain } => inspect(store(&enrichment, domain)).await,
        Command::Purge { domain } => {
            let store = store(&enrichment, domain);
            let removed = store.purge_now().await;
            println!("removed {removed} expired entries from {}", store.path().display());
        }
    }

    Ok(())
}

fn store(enrichment: &Enrichment, domain: Domain) -> &CacheStore<Option<String>> {
    match domain {
        Domain::Preview => enrichment.previews().cache().store(),
        Domain::Tickets => enrichment.tickets().cache().store(),
    }
}

async fn inspect(store: &CacheStore<Option<String>>) {
    let file = store.read().await;
    if file.is_empty() {
        println!("{} is empty", store.path().display());
        return;
    }

    for (key, entry) in &file {
        let state = if store.is_fresh(entry) { "fresh" } else { "stale" };
        let value = match &entry.value {
            Some(v) => first_line(v),
            None => "(negative)".to_string(),
        };
        println!("{key}\t{}\t{state}\t{value}", entry.cached_at);
    }
    println!("\n{} entries", file.len());
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.len() < text.trim_end().len() {
        format!("{line} …")
    } else {
        line.to_string()
    }
}

fn load_game(path: &Path) -> Result<Game, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read game file {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn pick_team(game: &Game, abbreviation: &str) -> Result<Team, Box<dyn std::error::Error>> {
    [&game.home_team, &game.away_team]
        .into_iter()
        .find(|t| t.abbreviation.eq_ignore_ascii_case(abbreviation))
        .cloned()
        .ok_or_else(|| {
            format!(
                "team {abbreviation} is not playing in game {} ({} vs {})",
                game.id, game.home_team.abbreviation, game.away_team.abbreviation
            )
            .into()
        })
}
