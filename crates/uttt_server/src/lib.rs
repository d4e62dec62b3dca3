//! Match history, snapshots and opponent coordination for Ultimate
//! Tic-Tac-Toe.
//!
//! A [`SessionManager`] owns one [`MatchSession`] per open match. Each
//! session wraps a [`HistoryManager`] (the move list and its cursor), a
//! [`GameStore`] it writes through, and a [`MoveSource`] that plays the
//! opponent's side.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use uttt_server::{FirstLegalSource, MemoryStore, SessionManager, SessionSettings};
//! use uttt_rules::Slot;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let manager = SessionManager::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(FirstLegalSource::new("first-legal")),
//!     SessionSettings::default(),
//! );
//! let session = manager.create(None).unwrap();
//! let report = session.play(Slot::CENTER, Slot::CENTER).await.unwrap();
//! assert_eq!(report.human.sequence(), 0);
//! assert_eq!(session.summary().await.unwrap().moves, 2);
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod history;
mod ids;
mod opponent;
mod session;
mod snapshot;
mod store;

pub use config::{ConfigError, DATABASE_VAR, ENGINE_URL_VAR, EngineConfig};
pub use error::{HistoryError, SessionError};
pub use history::HistoryManager;
pub use ids::{GameId, SnapshotId};
pub use opponent::{
    ComputeBudget, FirstLegalSource, HttpMoveSource, MoveReply, MoveRequest, MoveSource,
    MoveSourceError, PredictedMove, ScoredMove, SearchMetadata,
};
pub use session::{
    GameSummary, MatchSession, OpponentTurn, SessionManager, SessionSettings, TurnReport,
};
pub use snapshot::{Snapshot, SnapshotPolicy};
pub use store::{GameStore, MemoryStore, SqliteStore, StoreError, StoredGame};
