//! Row types and their conversion to domain values.

use super::schema;
use crate::ids::{GameId, SnapshotId};
use crate::opponent::SearchMetadata;
use crate::snapshot::Snapshot;
use crate::store::{StoreError, StoredGame};
use chrono::NaiveDateTime;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;
use uttt_rules::{Mark, Move, Placement};

/// Match row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    id: String,
    name: Option<String>,
    cursor_position: i32,
    created_at: NaiveDateTime,
}

impl GameRow {
    /// Match identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Combines the row with its moves.
    #[instrument(skip(self, moves), fields(game_id = %self.id))]
    pub fn into_stored(self, moves: Vec<MoveRow>) -> Result<StoredGame, StoreError> {
        let (moves, metadata) = moves
            .into_iter()
            .map(MoveRow::into_move)
            .collect::<Result<(Vec<_>, Vec<_>), _>>()?;
        Ok(StoredGame {
            game_id: GameId::new(self.id),
            name: self.name,
            moves,
            metadata,
            cursor: to_index(self.cursor_position)?,
            created_at: self.created_at.and_utc(),
        })
    }
}

/// Insertable match row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::games)]
pub struct NewGameRow {
    id: String,
    name: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Move row, with the engine's search statistics for opponent moves.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::moves)]
pub struct MoveRow {
    sequence: i32,
    sub_board: i32,
    cell: i32,
    mark: String,
    played_at: NaiveDateTime,
    metadata_json: Option<String>,
}

impl MoveRow {
    /// Converts the row into a recorded move and its search statistics.
    pub fn into_move(self) -> Result<(Move, Option<SearchMetadata>), StoreError> {
        let mark = parse_mark(&self.mark)?;
        let placement =
            Placement::from_indices(i64::from(self.sub_board), i64::from(self.cell), mark)
                .map_err(|e| StoreError::new(format!("Stored move is invalid: {}", e)))?;
        let metadata = self
            .metadata_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let mv = Move::with_timestamp(
            placement,
            to_index(self.sequence)?,
            self.played_at.and_utc(),
        );
        Ok((mv, metadata))
    }
}

/// Insertable move row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::moves)]
pub struct NewMoveRow {
    game_id: String,
    sequence: i32,
    sub_board: i32,
    cell: i32,
    mark: String,
    played_at: NaiveDateTime,
    metadata_json: Option<String>,
}

impl NewMoveRow {
    /// Builds the row for a recorded move.
    pub fn from_move(
        game_id: &GameId,
        mv: &Move,
        metadata: Option<&SearchMetadata>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            game_id: game_id.to_string(),
            sequence: to_column(mv.sequence())?,
            sub_board: i32::from(mv.sub_board().get()),
            cell: i32::from(mv.cell().get()),
            mark: mv.mark().to_string(),
            played_at: mv.timestamp().naive_utc(),
            metadata_json: metadata.map(serde_json::to_string).transpose()?,
        })
    }
}

/// Snapshot row. The move prefix is stored as JSON.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::snapshots)]
pub struct SnapshotRow {
    id: String,
    label: String,
    cursor_position: i32,
    moves_json: String,
    created_at: NaiveDateTime,
}

impl SnapshotRow {
    /// Converts the row into a snapshot.
    pub fn into_snapshot(self) -> Result<Snapshot, StoreError> {
        let id = self
            .id
            .parse::<SnapshotId>()
            .map_err(|e| StoreError::new(format!("Bad snapshot id '{}': {}", self.id, e)))?;
        let moves: Vec<Move> = serde_json::from_str(&self.moves_json)?;
        Ok(Snapshot::new(
            id,
            self.label,
            to_index(self.cursor_position)?,
            self.created_at.and_utc(),
            moves,
        ))
    }
}

/// Insertable snapshot row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::snapshots)]
pub struct NewSnapshotRow {
    id: String,
    game_id: String,
    position: i32,
    label: String,
    cursor_position: i32,
    moves_json: String,
    created_at: NaiveDateTime,
}

impl NewSnapshotRow {
    /// Builds the row for a snapshot at list position `position`.
    pub fn from_snapshot(
        game_id: &GameId,
        position: i64,
        snapshot: &Snapshot,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            id: snapshot.id().to_string(),
            game_id: game_id.to_string(),
            position: i32::try_from(position)
                .map_err(|_| StoreError::new("Too many snapshots"))?,
            label: snapshot.label().clone(),
            cursor_position: to_column(*snapshot.cursor_position())?,
            moves_json: serde_json::to_string(snapshot.moves())?,
            created_at: snapshot.created_at().naive_utc(),
        })
    }
}

#[track_caller]
fn parse_mark(value: &str) -> Result<Mark, StoreError> {
    match value {
        "X" => Ok(Mark::Human),
        "O" => Ok(Mark::Opponent),
        other => Err(StoreError::new(format!("Unknown mark '{}'", other))),
    }
}

/// Converts a count or index to its column type.
#[track_caller]
pub fn to_column(value: usize) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::new(format!("{} does not fit a column", value)))
}

#[track_caller]
fn to_index(value: i32) -> Result<usize, StoreError> {
    usize::try_from(value)
        .map_err(|_| StoreError::new(format!("Negative index {} in store", value)))
}
