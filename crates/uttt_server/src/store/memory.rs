//! In-process store.

use super::{GameStore, StoreError, StoredGame, carry_metadata};
use crate::ids::GameId;
use crate::opponent::SearchMetadata;
use crate::snapshot::Snapshot;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};
use uttt_rules::Move;

#[derive(Debug, Clone)]
struct Entry {
    game: StoredGame,
    snapshots: Vec<Snapshot>,
}

/// Store that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[track_caller]
    fn with_entry<T>(
        &self,
        game_id: &GameId,
        f: impl FnOnce(&mut Entry) -> T,
    ) -> Result<T, StoreError> {
        let mut entries = self.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.game.game_id == *game_id)
            .ok_or_else(|| StoreError::new(format!("Game {} not found", game_id)))?;
        Ok(f(entry))
    }
}

impl GameStore for MemoryStore {
    #[instrument(skip(self))]
    fn create_game(&self, game_id: &GameId, name: Option<&str>) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if entries.iter().any(|e| e.game.game_id == *game_id) {
            return Err(StoreError::new(format!("Game {} already exists", game_id)));
        }
        entries.push(Entry {
            game: StoredGame {
                game_id: game_id.clone(),
                name: name.map(str::to_string),
                moves: Vec::new(),
                metadata: Vec::new(),
                cursor: 0,
                created_at: Utc::now(),
            },
            snapshots: Vec::new(),
        });
        debug!("Game created");
        Ok(())
    }

    fn load_game(&self, game_id: &GameId) -> Result<Option<StoredGame>, StoreError> {
        Ok(self
            .lock()
            .iter()
            .find(|e| e.game.game_id == *game_id)
            .map(|e| e.game.clone()))
    }

    fn save_move(
        &self,
        game_id: &GameId,
        mv: &Move,
        metadata: Option<&SearchMetadata>,
    ) -> Result<(), StoreError> {
        self.with_entry(game_id, |entry| {
            let game = &mut entry.game;
            game.moves.truncate(mv.sequence());
            game.metadata.resize(game.moves.len(), None);
            game.moves.push(mv.clone());
            game.metadata.push(metadata.cloned());
            game.cursor = mv.sequence() + 1;
        })
    }

    fn save_cursor(&self, game_id: &GameId, cursor: usize) -> Result<(), StoreError> {
        self.with_entry(game_id, |entry| entry.game.cursor = cursor)
    }

    fn replace_moves(
        &self,
        game_id: &GameId,
        moves: &[Move],
        cursor: usize,
    ) -> Result<(), StoreError> {
        self.with_entry(game_id, |entry| {
            let game = &mut entry.game;
            game.metadata = carry_metadata(&game.moves, &game.metadata, moves);
            game.moves = moves.to_vec();
            game.cursor = cursor;
        })
    }

    fn list_snapshots(&self, game_id: &GameId) -> Result<Vec<Snapshot>, StoreError> {
        self.with_entry(game_id, |entry| entry.snapshots.clone())
    }

    fn save_snapshot(&self, game_id: &GameId, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.with_entry(game_id, |entry| entry.snapshots.push(snapshot.clone()))
    }

    fn rename_game(&self, game_id: &GameId, name: &str) -> Result<(), StoreError> {
        self.with_entry(game_id, |entry| entry.game.name = Some(name.to_string()))
    }

    fn list_games(&self) -> Result<Vec<StoredGame>, StoreError> {
        Ok(self.lock().iter().map(|e| e.game.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uttt_rules::{Mark, Placement};

    fn mv(sub: i64, cell: i64, sequence: usize) -> Move {
        let mark = Mark::to_move_after(sequence);
        Move::record(Placement::from_indices(sub, cell, mark).unwrap(), sequence)
    }

    #[test]
    fn save_move_truncates_at_sequence() {
        let store = MemoryStore::new();
        let id = GameId::new("g");
        store.create_game(&id, None).unwrap();
        store.save_move(&id, &mv(4, 4, 0), None).unwrap();
        store.save_move(&id, &mv(4, 0, 1), None).unwrap();
        store.save_move(&id, &mv(0, 4, 2), None).unwrap();

        store.save_move(&id, &mv(4, 8, 1), None).unwrap();

        let game = store.load_game(&id).unwrap().unwrap();
        assert_eq!(game.moves.len(), 2);
        assert_eq!(game.moves[1].cell().get(), 8);
        assert_eq!(game.metadata, vec![None, None]);
        assert_eq!(game.cursor, 2);
    }

    #[test]
    fn replace_keeps_metadata_of_unchanged_moves() {
        let store = MemoryStore::new();
        let id = GameId::new("g");
        store.create_game(&id, None).unwrap();
        let first = mv(4, 4, 0);
        let reply = mv(4, 0, 1);
        let stats = SearchMetadata {
            depth_explored: 3,
            ..SearchMetadata::default()
        };
        store.save_move(&id, &first, None).unwrap();
        store.save_move(&id, &reply, Some(&stats)).unwrap();

        store.replace_moves(&id, &[first.clone(), reply], 2).unwrap();
        assert_eq!(store.load_game(&id).unwrap().unwrap().metadata, vec![None, Some(stats)]);

        store.replace_moves(&id, &[first, mv(4, 8, 1)], 2).unwrap();
        assert_eq!(store.load_game(&id).unwrap().unwrap().metadata, vec![None, None]);
    }

    #[test]
    fn unknown_game_is_an_error() {
        let store = MemoryStore::new();
        assert!(store.save_cursor(&GameId::new("missing"), 0).is_err());
        assert!(store.load_game(&GameId::new("missing")).unwrap().is_none());
    }
}
