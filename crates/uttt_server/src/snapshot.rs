//! Named bookmarks into a match's timeline.

use crate::ids::SnapshotId;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use uttt_rules::{Move, Placement};

/// How restoring a snapshot treats a history that diverged after it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Restore the snapshot's own copy of the move prefix. Never stale.
    #[default]
    ExactCopy,
    /// Keep the recorded moves and reject the restore if they no longer
    /// match the snapshot's prefix.
    Strict,
}

/// A labelled cursor position plus the moves that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Snapshot {
    id: SnapshotId,
    label: String,
    cursor_position: usize,
    created_at: DateTime<Utc>,
    moves: Vec<Move>,
}

impl Snapshot {
    /// Captures the moves in effect, labelled or with the default label.
    pub(crate) fn capture(label: Option<String>, moves_in_effect: &[Move]) -> Self {
        let cursor_position = moves_in_effect.len();
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| Self::default_label(cursor_position));

        Self {
            id: SnapshotId::generate(),
            label,
            cursor_position,
            created_at: Utc::now(),
            moves: moves_in_effect.to_vec(),
        }
    }

    /// Label used when none is given.
    pub fn default_label(cursor_position: usize) -> String {
        format!("Snapshot at move {}", cursor_position)
    }

    /// Checks if `moves` starts with the same placements as this snapshot,
    /// up to `len` moves.
    pub fn shares_prefix(&self, moves: &[Move], len: usize) -> bool {
        let placements = |ms: &[Move]| {
            ms.iter()
                .take(len)
                .map(Move::placement)
                .collect::<Vec<Placement>>()
        };
        moves.len() >= len
            && self.moves.len() >= len
            && placements(moves) == placements(&self.moves)
    }
}
