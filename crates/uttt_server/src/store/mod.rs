//! Persistence of matches, moves and snapshots.
//!
//! Sessions write through a [`GameStore`] before committing in memory, so a
//! failed write leaves the match as it was.

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::ids::GameId;
use crate::opponent::SearchMetadata;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use uttt_rules::Move;

/// A match as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGame {
    /// Match identifier.
    pub game_id: GameId,
    /// Optional display name.
    pub name: Option<String>,
    /// Recorded moves in sequence order.
    pub moves: Vec<Move>,
    /// Search statistics per move, aligned with `moves`. Only opponent
    /// moves carry them.
    pub metadata: Vec<Option<SearchMetadata>>,
    /// Persisted cursor position.
    pub cursor: usize,
    /// When the match was created.
    pub created_at: DateTime<Utc>,
}

/// Storage for matches.
///
/// Every method is a single atomic write or read.
pub trait GameStore: Send + Sync + std::fmt::Debug {
    /// Registers a new match with no moves.
    fn create_game(&self, game_id: &GameId, name: Option<&str>) -> Result<(), StoreError>;

    /// Loads a match, or `None` if unknown.
    fn load_game(&self, game_id: &GameId) -> Result<Option<StoredGame>, StoreError>;

    /// Stores `mv` and its search statistics at its sequence number.
    ///
    /// Persisted moves at or beyond that sequence are dropped and the cursor
    /// is set just past the new move.
    fn save_move(
        &self,
        game_id: &GameId,
        mv: &Move,
        metadata: Option<&SearchMetadata>,
    ) -> Result<(), StoreError>;

    /// Stores the cursor position.
    fn save_cursor(&self, game_id: &GameId, cursor: usize) -> Result<(), StoreError>;

    /// Replaces all moves and the cursor.
    ///
    /// Search statistics survive for moves that are unchanged.
    fn replace_moves(
        &self,
        game_id: &GameId,
        moves: &[Move],
        cursor: usize,
    ) -> Result<(), StoreError>;

    /// Snapshots of a match in creation order.
    fn list_snapshots(&self, game_id: &GameId) -> Result<Vec<Snapshot>, StoreError>;

    /// Appends a snapshot.
    fn save_snapshot(&self, game_id: &GameId, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Sets the display name.
    fn rename_game(&self, game_id: &GameId, name: &str) -> Result<(), StoreError>;

    /// All matches in creation order.
    fn list_games(&self) -> Result<Vec<StoredGame>, StoreError>;
}

/// Search statistics for `moves`, taken from the stored move at the same
/// sequence when it is the same move.
pub(crate) fn carry_metadata(
    stored: &[Move],
    metadata: &[Option<SearchMetadata>],
    moves: &[Move],
) -> Vec<Option<SearchMetadata>> {
    moves
        .iter()
        .enumerate()
        .map(|(i, mv)| match (stored.get(i), metadata.get(i)) {
            (Some(old), Some(kept)) if old == mv => kept.clone(),
            _ => None,
        })
        .collect()
}
