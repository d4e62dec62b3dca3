//! uttt - Ultimate Tic-Tac-Toe CLI
//!
//! Plays against an external search engine with full move history,
//! rewind and snapshots, persisted to SQLite.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;
use uttt_rules::{MatchState, Move, Slot};
use uttt_server::{
    EngineConfig, FirstLegalSource, GameId, HttpMoveSource, MatchSession, MoveSource,
    OpponentTurn, SearchMetadata, SessionManager, SnapshotId, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref())?;
    let manager = build_manager(&config, cli.offline)?;

    match cli.command {
        Command::New { name } => {
            let session = manager.create(name.as_deref())?;
            println!("{}", session.id());
        }
        Command::Games { all } => {
            for game in manager.list_games(!all)? {
                println!(
                    "{}  {:<20}  {:>2}/{:<2} moves  {:?}",
                    game.game_id,
                    game.name.as_deref().unwrap_or("-"),
                    game.cursor,
                    game.moves,
                    game.status
                );
            }
        }
        Command::Show { id, at } => {
            let session = manager.open(&GameId::new(id))?;
            let (state, n) = match at {
                Some(n) => (session.state_at(n).await?, n),
                None => {
                    let state = session.current_state().await?;
                    let n = state.moves_played();
                    (state, n)
                }
            };
            print_state(&state);
            print_search_at(&session, n).await?;
        }
        Command::Play { id, board, cell } => {
            let session = manager.open(&GameId::new(id))?;
            play(&session, board, cell).await?;
        }
        Command::Retry { id } => {
            let session = manager.open(&GameId::new(id))?;
            report_opponent(&session.request_opponent_move().await?);
            print_state(&session.current_state().await?);
        }
        Command::Goto { id, n } => {
            let session = manager.open(&GameId::new(id))?;
            print_state(&session.goto_move(n).await?);
            print_search_at(&session, n).await?;
        }
        Command::Snapshot { id, label } => {
            let session = manager.open(&GameId::new(id))?;
            let snapshot = session.create_snapshot(label).await?;
            println!("{}  {}", snapshot.id(), snapshot.label());
        }
        Command::Snapshots { id } => {
            let session = manager.open(&GameId::new(id))?;
            for snapshot in session.list_snapshots().await? {
                println!(
                    "{}  move {:>2}  {}  {}",
                    snapshot.id(),
                    snapshot.cursor_position(),
                    snapshot.created_at().format("%Y-%m-%d %H:%M:%S"),
                    snapshot.label()
                );
            }
        }
        Command::Restore { id, snapshot } => {
            let session = manager.open(&GameId::new(id))?;
            let snapshot_id: SnapshotId = snapshot
                .parse()
                .with_context(|| format!("'{}' is not a snapshot id", snapshot))?;
            print_state(&session.restore_snapshot(snapshot_id).await?);
        }
        Command::Rename { id, name } => {
            let session = manager.open(&GameId::new(id))?;
            session.rename(&name).await?;
        }
    }

    Ok(())
}

#[instrument(skip(config))]
fn build_manager(config: &EngineConfig, offline: bool) -> Result<SessionManager> {
    let store = SqliteStore::open(config.database_path())?;
    let source: Arc<dyn MoveSource> = if offline {
        Arc::new(FirstLegalSource::new("first-legal"))
    } else {
        Arc::new(HttpMoveSource::new(
            config.engine_url().clone(),
            *config.legacy_string_body(),
        ))
    };
    info!(source = source.name(), database = %config.database_path(), "Starting");
    Ok(SessionManager::new(
        Arc::new(store),
        source,
        config.session_settings(),
    ))
}

/// Plays a 1-based board/cell and prints the outcome.
async fn play(session: &MatchSession, board: u8, cell: u8) -> Result<()> {
    let sub_board = Slot::new(board - 1).context("board must be 1-9")?;
    let cell = Slot::new(cell - 1).context("cell must be 1-9")?;

    let report = session.play(sub_board, cell).await?;
    println!("{}", report.human);
    report_opponent(&report.opponent);
    print_state(&session.current_state().await?);
    Ok(())
}

fn report_opponent(turn: &OpponentTurn) {
    match turn {
        OpponentTurn::Played { mv, metadata } => print_search(mv, metadata),
        OpponentTurn::NotNeeded => {}
        OpponentTurn::Discarded => println!("Opponent reply discarded"),
    }
}

fn print_search(mv: &Move, metadata: &SearchMetadata) {
    println!(
        "{}  ({} positions, depth {}, {:.1}s)",
        mv, metadata.num_gamestates, metadata.depth_explored, metadata.thinking_time_seconds
    );
}

/// Prints the stored engine statistics for the last of the first `n` moves.
async fn print_search_at(session: &MatchSession, n: usize) -> Result<()> {
    let Some(last) = n.checked_sub(1) else {
        return Ok(());
    };
    let moves = session.moves().await?;
    let metadata = session.search_metadata().await?;
    if let (Some(mv), Some(Some(stats))) = (moves.get(last), metadata.get(last)) {
        print_search(mv, stats);
    }
    Ok(())
}

fn print_state(state: &MatchState) {
    println!("{}", state.board());
    match state.winner() {
        Some(outcome) => println!("{}", outcome),
        None => println!(
            "{} to move, constraint: {:?}",
            state.next_mark(),
            state.active_constraint()
        ),
    }
}
