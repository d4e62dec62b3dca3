//! SQLite-backed [`GameStore`].

use super::models::{
    GameRow, MoveRow, NewGameRow, NewMoveRow, NewSnapshotRow, SnapshotRow, to_column,
};
use super::schema::{games, moves, snapshots};
use crate::ids::GameId;
use crate::opponent::SearchMetadata;
use crate::snapshot::Snapshot;
use crate::store::{GameStore, StoreError, StoredGame, carry_metadata};
use chrono::Utc;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};
use uttt_rules::Move;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Store backed by a SQLite database file.
///
/// A connection is opened per call.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Opens the database at `db_path` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path.as_ref()))]
    pub fn open(db_path: impl AsRef<str>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.as_ref().to_string(),
        };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migration failed: {}", e)))?;
        info!(path = %store.db_path, migrations = applied.len(), "SQLite store ready");
        Ok(store)
    }

    /// Path of the database file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    fn require_game(conn: &mut SqliteConnection, game_id: &GameId) -> Result<GameRow, StoreError> {
        games::table
            .find(game_id.as_str())
            .select(GameRow::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| StoreError::new(format!("Game {} not found", game_id)))
    }

    fn load_moves(conn: &mut SqliteConnection, game_id: &str) -> Result<Vec<MoveRow>, StoreError> {
        Ok(moves::table
            .filter(moves::game_id.eq(game_id))
            .order(moves::sequence.asc())
            .select(MoveRow::as_select())
            .load(conn)?)
    }

    fn touch(
        conn: &mut SqliteConnection,
        game_id: &GameId,
        cursor: usize,
    ) -> Result<(), StoreError> {
        diesel::update(games::table.find(game_id.as_str()))
            .set((
                games::cursor_position.eq(to_column(cursor)?),
                games::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        Ok(())
    }
}

impl GameStore for SqliteStore {
    #[instrument(skip(self))]
    fn create_game(&self, game_id: &GameId, name: Option<&str>) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let now = Utc::now().naive_utc();
        diesel::insert_into(games::table)
            .values(&NewGameRow::new(
                game_id.to_string(),
                name.map(str::to_string),
                now,
                now,
            ))
            .execute(&mut conn)?;
        info!("Game created");
        Ok(())
    }

    #[instrument(skip(self))]
    fn load_game(&self, game_id: &GameId) -> Result<Option<StoredGame>, StoreError> {
        let mut conn = self.connection()?;
        let row = games::table
            .find(game_id.as_str())
            .select(GameRow::as_select())
            .first(&mut conn)
            .optional()?;

        match row {
            Some(row) => {
                let moves = Self::load_moves(&mut conn, game_id.as_str())?;
                debug!(moves = moves.len(), "Game loaded");
                row.into_stored(moves).map(Some)
            }
            None => {
                debug!("Game not found");
                Ok(None)
            }
        }
    }

    #[instrument(
        skip(self, mv, metadata),
        fields(sequence = mv.sequence(), with_metadata = metadata.is_some())
    )]
    fn save_move(
        &self,
        game_id: &GameId,
        mv: &Move,
        metadata: Option<&SearchMetadata>,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = NewMoveRow::from_move(game_id, mv, metadata)?;
        let sequence = to_column(mv.sequence())?;

        conn.transaction::<_, StoreError, _>(|conn| {
            Self::require_game(conn, game_id)?;
            let dropped = diesel::delete(
                moves::table
                    .filter(moves::game_id.eq(game_id.as_str()))
                    .filter(moves::sequence.ge(sequence)),
            )
            .execute(conn)?;
            diesel::insert_into(moves::table).values(&row).execute(conn)?;
            Self::touch(conn, game_id, mv.sequence() + 1)?;
            debug!(dropped, "Move saved");
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn save_cursor(&self, game_id: &GameId, cursor: usize) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            Self::require_game(conn, game_id)?;
            Self::touch(conn, game_id, cursor)
        })
    }

    #[instrument(skip(self, moves), fields(moves = moves.len()))]
    fn replace_moves(
        &self,
        game_id: &GameId,
        moves: &[Move],
        cursor: usize,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection()?;

        conn.transaction::<_, StoreError, _>(|conn| {
            let game = Self::require_game(conn, game_id)?;
            let stored = game.into_stored(Self::load_moves(conn, game_id.as_str())?)?;
            let metadata = carry_metadata(&stored.moves, &stored.metadata, moves);
            let rows = moves
                .iter()
                .zip(&metadata)
                .map(|(mv, stats)| NewMoveRow::from_move(game_id, mv, stats.as_ref()))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(
                kept = metadata.iter().filter(|m| m.is_some()).count(),
                "Search statistics carried over"
            );
            diesel::delete(moves::table.filter(moves::game_id.eq(game_id.as_str())))
                .execute(conn)?;
            if !rows.is_empty() {
                diesel::insert_into(moves::table).values(&rows).execute(conn)?;
            }
            Self::touch(conn, game_id, cursor)
        })
    }

    #[instrument(skip(self))]
    fn list_snapshots(&self, game_id: &GameId) -> Result<Vec<Snapshot>, StoreError> {
        let mut conn = self.connection()?;
        snapshots::table
            .filter(snapshots::game_id.eq(game_id.as_str()))
            .order(snapshots::position.asc())
            .select(SnapshotRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(SnapshotRow::into_snapshot)
            .collect()
    }

    #[instrument(skip(self, snapshot), fields(snapshot_id = %snapshot.id()))]
    fn save_snapshot(&self, game_id: &GameId, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            Self::require_game(conn, game_id)?;
            let position: i64 = snapshots::table
                .filter(snapshots::game_id.eq(game_id.as_str()))
                .count()
                .get_result(conn)?;
            let row = NewSnapshotRow::from_snapshot(game_id, position, snapshot)?;
            diesel::insert_into(snapshots::table).values(&row).execute(conn)?;
            debug!(position, "Snapshot saved");
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn rename_game(&self, game_id: &GameId, name: &str) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let updated = diesel::update(games::table.find(game_id.as_str()))
            .set((
                games::name.eq(Some(name)),
                games::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(StoreError::new(format!("Game {} not found", game_id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn list_games(&self) -> Result<Vec<StoredGame>, StoreError> {
        let mut conn = self.connection()?;
        let rows = games::table
            .order((games::created_at.asc(), games::id.asc()))
            .select(GameRow::as_select())
            .load(&mut conn)?;

        rows.into_iter()
            .map(|row| {
                let moves = Self::load_moves(&mut conn, row.id())?;
                row.into_stored(moves)
            })
            .collect()
    }
}
