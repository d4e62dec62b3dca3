//! The external move source that plays the opponent's side.

mod error;
mod first_legal;
mod http;
mod wire;

pub use error::MoveSourceError;
pub use first_legal::FirstLegalSource;
pub use http::HttpMoveSource;
pub use wire::{MoveReply, MoveRequest, PredictedMove, ScoredMove, SearchMetadata};

use crate::ids::GameId;
use std::time::Duration;
use uttt_rules::MatchState;

/// Time allowance for one opponent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudget {
    compute_time: Duration,
    force_full_time: bool,
    grace: Duration,
}

impl ComputeBudget {
    /// Creates a budget.
    ///
    /// `grace` is added on top of `compute_time` before the request is
    /// abandoned.
    pub fn new(compute_time: Duration, force_full_time: bool, grace: Duration) -> Self {
        Self {
            compute_time,
            force_full_time,
            grace,
        }
    }

    /// Search time requested from the engine.
    pub fn compute_time(&self) -> Duration {
        self.compute_time
    }

    /// Whether the engine must spend the full time.
    pub fn force_full_time(&self) -> bool {
        self.force_full_time
    }

    /// Total wait before a request times out.
    pub fn deadline(&self) -> Duration {
        self.compute_time + self.grace
    }
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), false, Duration::from_secs(5))
    }
}

/// Something that picks the opponent's move for a position.
///
/// Implementations report the engine's raw choice; the caller validates it
/// against the rules before recording it.
#[async_trait::async_trait]
pub trait MoveSource: Send + Sync {
    /// Requests a move for the side to move in `state`.
    async fn request_move(
        &self,
        game_id: &GameId,
        state: &MatchState,
        budget: ComputeBudget,
    ) -> Result<MoveReply, MoveSourceError>;

    /// Display name for logs.
    fn name(&self) -> &str;
}
