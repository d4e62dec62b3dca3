//! Opponent request failures.

use std::time::Duration;
use uttt_rules::{MoveError, Placement};

/// Why an opponent move could not be used.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum MoveSourceError {
    /// Engine could not be reached.
    #[display("Engine unreachable: {}", _0)]
    Transport(String),

    /// Engine answered with a non-success status.
    #[display("Engine returned HTTP {}: {}", code, body)]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, for diagnosis.
        body: String,
    },

    /// Reply was not the expected JSON shape.
    #[display("Malformed engine reply: {}", _0)]
    Malformed(String),

    /// Reply named a position outside the board.
    #[display("Engine chose out-of-range position board {} cell {}", board, cell)]
    OutOfRange {
        /// Reported sub-board index.
        board: i64,
        /// Reported cell index.
        cell: i64,
    },

    /// Reply named a position the rules forbid.
    #[display("Engine chose illegal move {}: {}", placement, reason)]
    IllegalReply {
        /// What the engine chose.
        placement: Placement,
        /// Rule it broke.
        reason: MoveError,
    },

    /// No reply within the budget plus grace.
    #[display("Engine did not answer within {:?}", _0)]
    Timeout(Duration),

    /// Source had nothing to offer.
    #[display("Engine has no move: {}", _0)]
    NoMove(String),
}

impl std::error::Error for MoveSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MoveSourceError::IllegalReply { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
