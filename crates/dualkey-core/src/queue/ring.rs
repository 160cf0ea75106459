use super::word::Word;

/// Fixed-capacity FIFO of recorded words.
///
/// Overflow never grows the buffer. The first rejected push seals it: every
/// later push is dropped as well until `clear`, so a truncated recording is
/// still a well-formed prefix. Each dropped word is counted.
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    words: [Word; N],
    head: usize,
    len: usize,
    sealed: bool,
    dropped: usize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self {
            words: [Word::default(); N],
            head: 0,
            len: 0,
            sealed: false,
            dropped: 0,
        }
    }
}

impl<const N: usize> RingBuffer<N> {
    /// Appends `word`, returning its index from the head, or `None` if it was
    /// dropped.
    pub fn push(&mut self, word: Word) -> Option<usize> {
        if self.sealed || self.len >= N {
            self.sealed = true;
            self.dropped += 1;
            return None;
        }
        let idx = self.len;
        self.words[(self.head + idx) % N] = word;
        self.len += 1;
        Some(idx)
    }

    pub fn pop(&mut self) -> Option<Word> {
        if self.len == 0 {
            return None;
        }
        let word = self.words[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(word)
    }

    pub fn get(&self, idx: usize) -> Option<Word> {
        (idx < self.len).then(|| self.words[(self.head + idx) % N])
    }

    /// Rewrites the word at `idx` in place.
    pub fn set(&mut self, idx: usize, word: Word) -> bool {
        if idx >= self.len {
            return false;
        }
        self.words[(self.head + idx) % N] = word;
        true
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.sealed = false;
        self.dropped = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Words dropped since the last `clear`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = Word> + '_ {
        (0..self.len).map(move |i| self.words[(self.head + i) % N])
    }
}
