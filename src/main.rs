use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_roster::{
    ApiResponse, Config, ListQuery, PlayerQuery, RecordQuery, RosterService, SortOrder,
    SqliteStore, ALL_TABLES,
};

#[derive(Parser)]
#[command(name = "relay-roster", version, about = "Relay team roster and race records")]
struct Cli {
    /// SQLite database path (overrides ROSTER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import players from a CSV file
    Import { csv: PathBuf },
    /// List players
    Players {
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long)]
        order: Option<SortOrder>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        affiliation: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one player with best records and target progress
    Player { id: String },
    /// List a player's records
    Records {
        player_id: String,
        #[arg(long)]
        section: Option<String>,
    },
    /// Time series of a player's results
    History {
        player_id: String,
        #[arg(long)]
        section: Option<String>,
    },
    /// List team records
    Teams,
    /// List saved lineup simulations
    Simulations,
    /// Compare a best time against a target time
    Diff { best: String, target: String },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_roster=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let store = SqliteStore::open(&config.db_path, &ALL_TABLES)?;
    tracing::info!(path = %config.db_path.display(), "database opened");
    let service = RosterService::new(Arc::new(store));

    match cli.command {
        Command::Import { csv } => {
            let text = std::fs::read_to_string(&csv)
                .with_context(|| format!("Failed to read {}", csv.display()))?;
            print_response(&service.import_players_csv(&text))
        }
        Command::Players {
            sort_by,
            order,
            search,
            affiliation,
            category,
        } => {
            let query = PlayerQuery {
                sort_by,
                order,
                search,
                affiliation,
                category,
            };
            print_response(&service.list_players(&query))
        }
        Command::Player { id } => print_response(&service.get_player_detail(&id)),
        Command::Records { player_id, section } => {
            let query = RecordQuery {
                section,
                ..RecordQuery::default()
            };
            print_response(&service.list_player_records(&player_id, &query))
        }
        Command::History { player_id, section } => {
            print_response(&service.record_history(&player_id, section.as_deref()))
        }
        Command::Teams => print_response(&service.list_team_records(&ListQuery::default())),
        Command::Simulations => print_response(&service.list_simulations()),
        Command::Diff { best, target } => {
            print_response(&service.compute_target_diff(&best, &target))
        }
    }
}

fn print_response<T: Serialize>(response: &ApiResponse<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
