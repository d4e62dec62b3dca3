//! JSON request and reply exchanged with the search engine.

use super::{ComputeBudget, MoveSourceError};
use crate::ids::GameId;
use serde::{Deserialize, Serialize};
use uttt_rules::{Mark, MatchState, Placement};

/// A considered move and its score: `[[board, cell], score]`.
pub type ScoredMove = ((i64, i64), f64);

/// One step of the engine's expected line: `[board, cell, mark]`.
pub type PredictedMove = (i64, i64, Mark);

/// Body posted to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveRequest {
    /// Match identifier.
    pub game_id: String,
    /// Most recent placement, if any.
    pub last_move: Option<(u8, u8, Mark)>,
    /// Board as nine sub-boards of nine cells: `"X"`, `"O"` or `""`.
    pub game_board: [[&'static str; 9]; 9],
    /// Requested search time in seconds.
    pub compute_time: f64,
    /// Whether to spend the full time even when the answer is clear.
    pub force_full_time: bool,
}

impl MoveRequest {
    /// Describes `state` for the engine.
    pub fn new(game_id: &GameId, state: &MatchState, budget: ComputeBudget) -> Self {
        let game_board = state.board().to_grid().map(|sub_board| {
            sub_board.map(|cell| match cell {
                Some(Mark::Human) => "X",
                Some(Mark::Opponent) => "O",
                None => "",
            })
        });

        Self {
            game_id: game_id.to_string(),
            last_move: state
                .last_move()
                .map(|p| (p.sub_board.get(), p.cell.get(), p.mark)),
            game_board,
            compute_time: budget.compute_time().as_secs_f64(),
            force_full_time: budget.force_full_time(),
        }
    }
}

/// Engine's chosen move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveReply {
    /// Chosen sub-board index.
    pub board: i64,
    /// Chosen cell index.
    pub cell: i64,
    /// Search statistics, passed through for display.
    #[serde(default)]
    pub metadata: SearchMetadata,
}

impl MoveReply {
    /// Creates a reply.
    pub fn new(board: i64, cell: i64, metadata: SearchMetadata) -> Self {
        Self {
            board,
            cell,
            metadata,
        }
    }

    /// Converts the reported indices into a placement for `mark`.
    ///
    /// # Errors
    ///
    /// Returns [`MoveSourceError::OutOfRange`] if either index is outside 0-8.
    pub fn placement(&self, mark: Mark) -> Result<Placement, MoveSourceError> {
        Placement::from_indices(self.board, self.cell, mark).map_err(|_| {
            MoveSourceError::OutOfRange {
                board: self.board,
                cell: self.cell,
            }
        })
    }
}

/// Search statistics reported alongside a move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Positions evaluated.
    #[serde(default, alias = "numGamestates")]
    pub num_gamestates: u64,
    /// Deepest ply reached.
    #[serde(default, alias = "depthExplored")]
    pub depth_explored: u32,
    /// Wall-clock search time in seconds.
    #[serde(default, rename = "thinking_time", alias = "thinkingTimeSeconds")]
    pub thinking_time_seconds: f64,
    /// Root moves with their scores.
    #[serde(default, rename = "moves", alias = "movesConsidered")]
    pub moves_considered: Vec<ScoredMove>,
    /// Line the engine expects to follow.
    #[serde(default, alias = "predictedLine", skip_serializing_if = "Option::is_none")]
    pub predicted_line: Option<Vec<PredictedMove>>,
    /// Whether the search stopped before its time was up.
    #[serde(default, alias = "earlyStop", skip_serializing_if = "Option::is_none")]
    pub early_stop: Option<bool>,
}
