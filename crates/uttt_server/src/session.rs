//! Turn coordination and per-match sessions.
//!
//! Each match has exactly one [`MatchSession`]. Writes to a match never
//! queue: if another write holds the match, or the opponent is thinking, the
//! call fails with [`SessionError::Concurrency`]. Reads wait for the lock.
//!
//! An opponent request is tagged with the match id, the cursor, the move
//! count and the history generation at the time it was sent. A reply is
//! recorded only if the match is still open and the tag still matches;
//! otherwise it is discarded. The request may be made behind the head, in
//! which case the recorded reply discards the later moves.

use crate::error::{HistoryError, SessionError};
use crate::history::HistoryManager;
use crate::ids::{GameId, SnapshotId};
use crate::opponent::{ComputeBudget, MoveSource, MoveSourceError, SearchMetadata};
use crate::snapshot::{Snapshot, SnapshotPolicy};
use crate::store::{GameStore, StoredGame};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};
use uttt_rules::{Mark, MatchState, MatchStatus, Move, Placement, Slot};

/// Settings shared by every session of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSettings {
    /// Budget for each opponent request.
    pub budget: ComputeBudget,
    /// Snapshot restore policy for new histories.
    pub policy: SnapshotPolicy,
}

impl SessionSettings {
    /// Creates settings.
    pub fn new(budget: ComputeBudget, policy: SnapshotPolicy) -> Self {
        Self { budget, policy }
    }
}

/// What happened on the opponent's side after a request.
#[derive(Debug, Clone, PartialEq)]
pub enum OpponentTurn {
    /// The opponent's move was validated and recorded.
    Played {
        /// Recorded move.
        mv: Move,
        /// Engine statistics for display.
        metadata: SearchMetadata,
    },
    /// The match is decided or it is the human's turn.
    NotNeeded,
    /// The reply arrived after the match changed or closed.
    Discarded,
}

/// Result of a human move.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// The human's recorded move.
    pub human: Move,
    /// The opponent's response.
    pub opponent: OpponentTurn,
}

/// One-line description of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    /// Match identifier.
    pub game_id: GameId,
    /// Optional display name.
    pub name: Option<String>,
    /// Recorded moves.
    pub moves: usize,
    /// Cursor position.
    pub cursor: usize,
    /// Status at the cursor.
    pub status: MatchStatus,
    /// Side to move at the cursor.
    pub next_mark: Mark,
}

impl GameSummary {
    fn from_stored(game: &StoredGame) -> Result<Self, HistoryError> {
        let in_effect = game.moves.get(..game.cursor).unwrap_or(&game.moves);
        let state = MatchState::replay(in_effect.iter().map(Move::placement))?;
        Ok(Self {
            game_id: game.game_id.clone(),
            name: game.name.clone(),
            moves: game.moves.len(),
            cursor: game.cursor,
            status: state.status(),
            next_mark: state.next_mark(),
        })
    }
}

#[derive(Debug)]
struct MatchData {
    history: HistoryManager,
    name: Option<String>,
}

/// Identifies the history an opponent request was made against.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReplyToken {
    game_id: GameId,
    cursor: usize,
    length: usize,
    generation: u64,
}

impl ReplyToken {
    fn new(game_id: &GameId, history: &HistoryManager) -> Self {
        Self {
            game_id: game_id.clone(),
            cursor: history.cursor(),
            length: history.len(),
            generation: history.generation(),
        }
    }

    fn still_current(&self, game_id: &GameId, history: &HistoryManager) -> bool {
        *self == Self::new(game_id, history)
    }
}

struct PendingReply {
    token: ReplyToken,
    state: MatchState,
}

/// Marks the opponent as thinking until dropped.
struct ThinkingGuard<'a>(&'a AtomicBool);

impl<'a> ThinkingGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ThinkingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A single match: its history, its store and its opponent.
pub struct MatchSession {
    id: GameId,
    data: Mutex<MatchData>,
    thinking: AtomicBool,
    closed: AtomicBool,
    poisoned: AtomicBool,
    store: Arc<dyn GameStore>,
    source: Arc<dyn MoveSource>,
    settings: SessionSettings,
}

impl std::fmt::Debug for MatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchSession")
            .field("id", &self.id)
            .field("thinking", &self.is_thinking())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .field("poisoned", &self.is_poisoned())
            .field("source", &self.source.name())
            .finish()
    }
}

impl MatchSession {
    fn new(
        id: GameId,
        history: HistoryManager,
        name: Option<String>,
        store: Arc<dyn GameStore>,
        source: Arc<dyn MoveSource>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            id,
            data: Mutex::new(MatchData { history, name }),
            thinking: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            poisoned: AtomicBool::new(false),
            store,
            source,
            settings,
        }
    }

    /// Match identifier.
    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Checks if an opponent request is outstanding.
    pub fn is_thinking(&self) -> bool {
        self.thinking.load(Ordering::Acquire)
    }

    /// Checks if an invariant violation disabled the match.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    fn busy(&self, reason: &'static str) -> SessionError {
        warn!(game_id = %self.id, reason, "Rejected concurrent operation");
        SessionError::Concurrency {
            game_id: self.id.clone(),
            reason,
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::UnknownGame(self.id.clone()));
        }
        if self.is_poisoned() {
            return Err(SessionError::Poisoned(self.id.clone()));
        }
        Ok(())
    }

    fn try_write(&self) -> Result<MutexGuard<'_, MatchData>, SessionError> {
        self.ensure_open()?;
        self.data
            .try_lock()
            .map_err(|_| self.busy("another operation on this match is in progress"))
    }

    async fn read(&self) -> Result<MutexGuard<'_, MatchData>, SessionError> {
        self.ensure_open()?;
        Ok(self.data.lock().await)
    }

    fn verify(&self, history: &HistoryManager) -> Result<(), SessionError> {
        history.verify().map_err(|e| {
            self.poisoned.store(true, Ordering::Release);
            error!(game_id = %self.id, error = %e, "Match disabled after failed verification");
            SessionError::from(e)
        })
    }

    /// Applies `placement` to a copy of the history, persists it, then
    /// swaps the copy in.
    fn commit_move(
        &self,
        data: &mut MatchData,
        placement: Placement,
        metadata: Option<&SearchMetadata>,
    ) -> Result<Move, SessionError> {
        let mut staged = data.history.clone();
        let recorded = staged.apply_move(placement)?.clone();
        self.store.save_move(&self.id, &recorded, metadata)?;
        data.history = staged;
        self.verify(&data.history)?;
        Ok(recorded)
    }

    fn pending_reply(&self, history: &HistoryManager) -> Option<PendingReply> {
        let state = history.current_state();
        if !state.status().is_in_progress() || state.next_mark() != Mark::Opponent {
            return None;
        }
        Some(PendingReply {
            token: ReplyToken::new(&self.id, history),
            state: state.clone(),
        })
    }

    /// Plays the human's move at the cursor, then asks the opponent to reply.
    ///
    /// If the opponent fails, the human move stays recorded and the error is
    /// returned; [`request_opponent_move`](Self::request_opponent_move)
    /// retries.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Concurrency`] while another write or an opponent
    ///   request is in flight
    /// - [`SessionError::History`] if the move is illegal or the game is over
    /// - [`SessionError::Store`] if persisting fails (nothing recorded)
    /// - [`SessionError::MoveSource`] if the opponent fails
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub async fn play(&self, sub_board: Slot, cell: Slot) -> Result<TurnReport, SessionError> {
        let (human, pending, guard) = {
            let mut data = self.try_write()?;
            let guard = ThinkingGuard::engage(&self.thinking)
                .ok_or_else(|| self.busy("the opponent is thinking"))?;
            let placement = Placement::new(sub_board, cell, Mark::Human);
            let human = self.commit_move(&mut data, placement, None)?;
            info!(placement = %placement, "Human move recorded");
            (human, self.pending_reply(&data.history), guard)
        };

        let opponent = match pending {
            Some(pending) => self.await_reply(pending, guard).await?,
            None => OpponentTurn::NotNeeded,
        };

        Ok(TurnReport { human, opponent })
    }

    /// Asks the opponent to move at the cursor.
    ///
    /// Used to retry after a failed request, or to resume a match rewound to
    /// a position where the opponent is due. A reply recorded behind the
    /// head discards the later moves.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Concurrency`] while another write or request is in
    ///   flight
    /// - [`SessionError::MoveSource`] if the opponent fails
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub async fn request_opponent_move(&self) -> Result<OpponentTurn, SessionError> {
        let (pending, guard) = {
            let data = self.try_write()?;
            let guard = ThinkingGuard::engage(&self.thinking)
                .ok_or_else(|| self.busy("the opponent is already thinking"))?;
            match self.pending_reply(&data.history) {
                Some(pending) => (pending, guard),
                None => {
                    debug!("Opponent has nothing to do");
                    return Ok(OpponentTurn::NotNeeded);
                }
            }
        };
        self.await_reply(pending, guard).await
    }

    async fn await_reply(
        &self,
        pending: PendingReply,
        _guard: ThinkingGuard<'_>,
    ) -> Result<OpponentTurn, SessionError> {
        let budget = self.settings.budget;
        info!(
            source = self.source.name(),
            cursor = pending.token.cursor,
            moves = pending.token.length,
            deadline_secs = budget.deadline().as_secs_f64(),
            "Requesting opponent move"
        );

        let reply = tokio::time::timeout(
            budget.deadline(),
            self.source.request_move(&self.id, &pending.state, budget),
        )
        .await
        .unwrap_or(Err(MoveSourceError::Timeout(budget.deadline())));

        let mut data = self.data.lock().await;

        if self.closed.load(Ordering::Acquire) {
            info!("Match closed while the opponent was thinking; reply discarded");
            return Ok(OpponentTurn::Discarded);
        }
        if !pending.token.still_current(&self.id, &data.history) {
            info!(
                sent_at = pending.token.cursor,
                moves = data.history.len(),
                cursor = data.history.cursor(),
                "History changed while the opponent was thinking; reply discarded"
            );
            return Ok(OpponentTurn::Discarded);
        }
        if self.is_poisoned() {
            return Err(SessionError::Poisoned(self.id.clone()));
        }

        let reply = reply.inspect_err(|e| warn!(error = %e, "Opponent request failed"))?;
        let placement = reply.placement(Mark::Opponent)?;
        pending.state.check(&placement).map_err(|reason| {
            warn!(%placement, reason = %reason, "Opponent chose an illegal move");
            MoveSourceError::IllegalReply { placement, reason }
        })?;

        let mv = self.commit_move(&mut data, placement, Some(&reply.metadata))?;
        info!(placement = %placement, "Opponent move recorded");
        Ok(OpponentTurn::Played {
            mv,
            metadata: reply.metadata,
        })
    }

    /// Moves the cursor to `n`.
    ///
    /// Allowed while the opponent is thinking; the pending reply will then
    /// be discarded.
    ///
    /// # Errors
    ///
    /// - [`SessionError::History`] with `CursorOutOfRange` if `n > len`
    /// - [`SessionError::Concurrency`] while another write is in progress
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub async fn goto_move(&self, n: usize) -> Result<MatchState, SessionError> {
        let mut data = self.try_write()?;
        let mut staged = data.history.clone();
        let state = staged.goto_move(n)?;
        self.store.save_cursor(&self.id, n)?;
        data.history = staged;
        self.verify(&data.history)?;
        Ok(state)
    }

    /// Position at the cursor.
    pub async fn current_state(&self) -> Result<MatchState, SessionError> {
        Ok(self.read().await?.history.current_state().clone())
    }

    /// Position after the first `n` moves, without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns `CursorOutOfRange` if `n` exceeds the recorded moves.
    pub async fn state_at(&self, n: usize) -> Result<MatchState, SessionError> {
        Ok(self.read().await?.history.state_at(n)?)
    }

    /// Recorded moves, including any after the cursor.
    pub async fn moves(&self) -> Result<Vec<Move>, SessionError> {
        Ok(self.read().await?.history.moves().to_vec())
    }

    /// Engine search statistics per recorded move, as persisted.
    ///
    /// Entries are `None` for human moves.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Store`] if the store cannot be read
    /// - [`SessionError::UnknownGame`] if the store no longer has the match
    pub async fn search_metadata(&self) -> Result<Vec<Option<SearchMetadata>>, SessionError> {
        let _data = self.read().await?;
        let game = self
            .store
            .load_game(&self.id)?
            .ok_or_else(|| SessionError::UnknownGame(self.id.clone()))?;
        Ok(game.metadata)
    }

    /// Snapshots the moves in effect.
    ///
    /// # Errors
    ///
    /// - [`SessionError::History`] with `NoActiveGame` before the first move
    /// - [`SessionError::Concurrency`] while another write is in progress
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub async fn create_snapshot(&self, label: Option<String>) -> Result<Snapshot, SessionError> {
        let mut data = self.try_write()?;
        let mut staged = data.history.clone();
        let snapshot = staged.create_snapshot(label)?.clone();
        self.store.save_snapshot(&self.id, &snapshot)?;
        data.history = staged;
        Ok(snapshot)
    }

    /// Snapshots in creation order.
    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>, SessionError> {
        Ok(self.read().await?.history.snapshots().cloned().collect())
    }

    /// Restores a snapshot.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Concurrency`] while the opponent is thinking or
    ///   another write is in progress
    /// - [`SessionError::History`] with `SnapshotNotFound` or
    ///   `SnapshotStale`
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub async fn restore_snapshot(&self, id: SnapshotId) -> Result<MatchState, SessionError> {
        let mut data = self.try_write()?;
        if self.is_thinking() {
            return Err(self.busy("the opponent is thinking"));
        }
        let mut staged = data.history.clone();
        let state = staged.restore_snapshot(id)?;
        self.store
            .replace_moves(&self.id, staged.moves(), staged.cursor())?;
        data.history = staged;
        self.verify(&data.history)?;
        Ok(state)
    }

    /// Sets the display name.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub async fn rename(&self, name: &str) -> Result<(), SessionError> {
        let mut data = self.try_write()?;
        let name = name.trim();
        self.store.rename_game(&self.id, name)?;
        data.name = Some(name.to_string());
        info!(name, "Match renamed");
        Ok(())
    }

    /// One-line description of the match.
    pub async fn summary(&self) -> Result<GameSummary, SessionError> {
        let data = self.read().await?;
        let state = data.history.current_state();
        Ok(GameSummary {
            game_id: self.id.clone(),
            name: data.name.clone(),
            moves: data.history.len(),
            cursor: data.history.cursor(),
            status: state.status(),
            next_mark: state.next_mark(),
        })
    }

    /// Reloads the match from the store and clears a poisoned state.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownGame`] if the store no longer has the match
    /// - [`SessionError::History`] if the stored moves are inconsistent
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub async fn reload(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::UnknownGame(self.id.clone()));
        }
        let mut data = self
            .data
            .try_lock()
            .map_err(|_| self.busy("another operation on this match is in progress"))?;

        let (history, name) = load_history(self.store.as_ref(), &self.id, self.settings.policy)?;
        data.history = history;
        data.name = name;
        self.poisoned.store(false, Ordering::Release);
        info!("Match reloaded from store");
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn load_history(
    store: &dyn GameStore,
    id: &GameId,
    policy: SnapshotPolicy,
) -> Result<(HistoryManager, Option<String>), SessionError> {
    let game = store
        .load_game(id)?
        .ok_or_else(|| SessionError::UnknownGame(id.clone()))?;
    let snapshots = store.list_snapshots(id)?;
    let history = HistoryManager::from_stored(game.moves, game.cursor, snapshots, policy)?;
    Ok((history, game.name))
}

/// Registry of open matches.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<StdMutex<HashMap<GameId, Arc<MatchSession>>>>,
    store: Arc<dyn GameStore>,
    source: Arc<dyn MoveSource>,
    settings: SessionSettings,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("source", &self.source.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl SessionManager {
    /// Creates a manager over a store and an opponent.
    pub fn new(
        store: Arc<dyn GameStore>,
        source: Arc<dyn MoveSource>,
        settings: SessionSettings,
    ) -> Self {
        info!(source = source.name(), ?settings, "Creating session manager");
        Self {
            sessions: Arc::new(StdMutex::new(HashMap::new())),
            store,
            source,
            settings,
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<GameId, Arc<MatchSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(
        &self,
        id: GameId,
        history: HistoryManager,
        name: Option<String>,
    ) -> Arc<MatchSession> {
        let session = Arc::new(MatchSession::new(
            id.clone(),
            history,
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.source),
            self.settings,
        ));
        Arc::clone(self.sessions().entry(id).or_insert(session))
    }

    /// Starts a new match.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the match cannot be persisted.
    #[instrument(skip(self))]
    pub fn create(&self, name: Option<&str>) -> Result<Arc<MatchSession>, SessionError> {
        let id = GameId::generate();
        self.store.create_game(&id, name)?;
        info!(game_id = %id, "Match created");
        Ok(self.register(
            id,
            HistoryManager::new(self.settings.policy),
            name.map(str::to_string),
        ))
    }

    /// Returns the open session for `id`, loading it from the store if needed.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownGame`] if the store has no such match
    /// - [`SessionError::History`] if the stored moves are inconsistent
    #[instrument(skip(self))]
    pub fn open(&self, id: &GameId) -> Result<Arc<MatchSession>, SessionError> {
        if let Some(session) = self.get(id) {
            return Ok(session);
        }
        let (history, name) = load_history(self.store.as_ref(), id, self.settings.policy)?;
        debug!(moves = history.len(), cursor = history.cursor(), "Match loaded");
        Ok(self.register(id.clone(), history, name))
    }

    /// Returns the open session for `id`, if any.
    pub fn get(&self, id: &GameId) -> Option<Arc<MatchSession>> {
        self.sessions().get(id).cloned()
    }

    /// Closes a session. A pending opponent reply will be discarded.
    ///
    /// Returns `false` if no session was open.
    #[instrument(skip(self))]
    pub fn close(&self, id: &GameId) -> bool {
        match self.sessions().remove(id) {
            Some(session) => {
                session.close();
                info!("Session closed");
                true
            }
            None => false,
        }
    }

    /// Lists stored matches, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store cannot be read.
    #[instrument(skip(self))]
    pub fn list_games(&self, in_progress_only: bool) -> Result<Vec<GameSummary>, SessionError> {
        let mut summaries = Vec::new();
        for game in self.store.list_games()? {
            match GameSummary::from_stored(&game) {
                Ok(summary) => {
                    if !in_progress_only || summary.status.is_in_progress() {
                        summaries.push(summary);
                    }
                }
                Err(e) => warn!(game_id = %game.game_id, error = %e, "Skipping unreadable match"),
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::FirstLegalSource;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn failed_verification_disables_match_until_reload() {
        let manager = SessionManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FirstLegalSource::new("first")),
            SessionSettings::default(),
        );
        let session = manager.create(None).unwrap();
        session.play(Slot::CENTER, Slot::CENTER).await.unwrap();

        session
            .data
            .lock()
            .await
            .history
            .overwrite_cached_state(MatchState::new());

        let err = session
            .play(Slot::TOP_LEFT, Slot::CENTER)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "InvariantViolation");
        assert!(session.is_poisoned());

        let err = session.summary().await.unwrap_err();
        assert!(matches!(err, SessionError::Poisoned(ref id) if id == session.id()));
        assert!(session.goto_move(0).await.is_err());

        session.reload().await.unwrap();
        assert!(!session.is_poisoned());
        let summary = session.summary().await.unwrap();
        assert_eq!(summary.moves, 3);
        assert_eq!(summary.cursor, 3);
        assert_eq!(summary.next_mark, Mark::Opponent);
        assert!(session.data.lock().await.history.verify().is_ok());
    }
}
