//! Bit layout of the recorded stream.
//!
//! A recorded cycle starts with a timestamp word: a 15-bit offset from the
//! start of the recording and, in bit 15, a flag telling that the cycle has no
//! explicit updates and the next word is another timestamp. Otherwise update
//! words follow: the position index in bits 0..7, an end-of-cycle flag in bit
//! 7 and the raw key state in the high byte.

use crate::types::KeyState;

/// Largest offset a timestamp word can carry.
pub const MAX_OFFSET: u16 = 0x7FFF;

const OFFSET_MASK: u16 = 0x7FFF;
const NO_UPDATES_BIT: u16 = 0x8000;
const POS_MASK: u16 = 0x007F;
const LAST_UPDATE_BIT: u16 = 0x0080;
const STATE_SHIFT: u16 = 8;

/// One raw 16-bit word of the ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Word(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub offset: u16,
    pub no_explicit_updates: bool,
}

impl Timestamp {
    pub const fn new(offset: u16) -> Self {
        Self {
            offset,
            no_explicit_updates: false,
        }
    }

    pub const fn quiet(offset: u16) -> Self {
        Self {
            offset,
            no_explicit_updates: true,
        }
    }

    pub fn pack(self) -> Word {
        debug_assert!(self.offset <= MAX_OFFSET);
        let flag = if self.no_explicit_updates {
            NO_UPDATES_BIT
        } else {
            0
        };
        Word((self.offset & OFFSET_MASK) | flag)
    }

    pub fn unpack(word: Word) -> Self {
        Self {
            offset: word.0 & OFFSET_MASK,
            no_explicit_updates: word.0 & NO_UPDATES_BIT != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub pos_idx: u8,
    pub is_last: bool,
    pub state: KeyState,
}

impl Update {
    pub const fn new(pos_idx: u8, state: KeyState, is_last: bool) -> Self {
        Self {
            pos_idx,
            is_last,
            state,
        }
    }

    pub fn pack(self) -> Word {
        debug_assert!(u16::from(self.pos_idx) <= POS_MASK);
        let last = if self.is_last { LAST_UPDATE_BIT } else { 0 };
        Word(
            (u16::from(self.pos_idx) & POS_MASK)
                | last
                | (u16::from(self.state.raw()) << STATE_SHIFT),
        )
    }

    pub fn unpack(word: Word) -> Self {
        Self {
            pos_idx: (word.0 & POS_MASK) as u8,
            is_last: word.0 & LAST_UPDATE_BIT != 0,
            state: KeyState::from_raw((word.0 >> STATE_SHIFT) as u8),
        }
    }
}

impl Word {
    /// Sets the end-of-cycle flag, reading the word as an update.
    pub fn mark_last_update(self) -> Word {
        Word(self.0 | LAST_UPDATE_BIT)
    }

    /// Sets the no-updates flag, reading the word as a timestamp.
    pub fn mark_no_updates(self) -> Word {
        Word(self.0 | NO_UPDATES_BIT)
    }
}

impl From<Timestamp> for Word {
    fn from(ts: Timestamp) -> Self {
        ts.pack()
    }
}

impl From<Update> for Word {
    fn from(update: Update) -> Self {
        update.pack()
    }
}
