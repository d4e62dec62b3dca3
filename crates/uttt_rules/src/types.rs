//! Core domain types for Ultimate Tic-Tac-Toe.

use serde::{Deserialize, Serialize};

/// Side placing a mark. The human always moves first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Mark {
    /// The human player, written `X`.
    #[serde(rename = "X", alias = "x")]
    #[strum(to_string = "X")]
    Human,
    /// The engine-driven opponent, written `O`.
    #[serde(rename = "O", alias = "o")]
    #[strum(to_string = "O")]
    Opponent,
}

impl Mark {
    /// Returns the other side.
    pub fn opponent(self) -> Self {
        match self {
            Mark::Human => Mark::Opponent,
            Mark::Opponent => Mark::Human,
        }
    }

    /// Mark to move after `moves_played` moves.
    pub fn to_move_after(moves_played: usize) -> Self {
        if moves_played % 2 == 0 {
            Mark::Human
        } else {
            Mark::Opponent
        }
    }
}

/// An index in `0..=8`, used for both sub-boards and cells (row-major).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    /// Top-left slot (index 0).
    pub const TOP_LEFT: Slot = Slot(0);
    /// Center slot (index 4).
    pub const CENTER: Slot = Slot(4);
    /// Bottom-right slot (index 8).
    pub const BOTTOM_RIGHT: Slot = Slot(8);

    /// All nine slots in row-major order.
    pub const ALL: [Slot; 9] = [
        Slot(0),
        Slot(1),
        Slot(2),
        Slot(3),
        Slot(4),
        Slot(5),
        Slot(6),
        Slot(7),
        Slot(8),
    ];

    /// Creates a slot, or `None` when `index > 8`.
    pub fn new(index: u8) -> Option<Self> {
        (index < 9).then_some(Slot(index))
    }

    /// Index usable for array access.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw value.
    pub fn get(self) -> u8 {
        self.0
    }
}

/// Index outside `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("slot index {} is outside 0-8", value)]
pub struct SlotOutOfRange {
    /// The rejected value.
    pub value: i64,
}

impl std::error::Error for SlotOutOfRange {}

impl TryFrom<u8> for Slot {
    type Error = SlotOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Slot::new(value).ok_or(SlotOutOfRange {
            value: i64::from(value),
        })
    }
}

impl TryFrom<i64> for Slot {
    type Error = SlotOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Slot::new)
            .ok_or(SlotOutOfRange { value })
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cell of a sub-board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Claimed by a player; never changes afterwards.
    Marked(Mark),
}

impl Cell {
    /// Returns the mark in this cell, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::Marked(mark) => Some(mark),
        }
    }

    /// Checks if the cell is empty.
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }
}
