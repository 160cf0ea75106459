use serde::{Deserialize, Serialize};

pub const ROWS: u8 = 4;
pub const COLS: u8 = 16;

/// Number of addressable switch positions.
pub const KEY_COUNT: usize = ROWS as usize * COLS as usize;

// Recorded update words carry the position in 7 bits.
const _: () = assert!(KEY_COUNT <= 0x7F, "too many key positions");

/// Row and column in the switch matrix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Linear index in `0..KEY_COUNT`.
    pub const fn index(self) -> usize {
        self.row as usize * COLS as usize + self.col as usize
    }

    pub const fn from_index(idx: usize) -> Self {
        Self {
            row: (idx / COLS as usize) as u8,
            col: (idx % COLS as usize) as u8,
        }
    }

    pub const fn is_valid(self) -> bool {
        self.row < ROWS && self.col < COLS
    }
}
