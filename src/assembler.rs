//! Incremental frame assembly.
//!
//! Each camera side has a fill counter. Chunks append at the current counter;
//! a chunk that would push the counter past the frame size aborts that side's
//! frame. The stale bytes of an aborted frame are not cleared: the next
//! frame simply overwrites them from offset 0.

use std::ops::Range;

use crate::CameraSide;

/// Per-side assembly state, derived from the fill counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillState {
    Empty,
    Filling,
    Full,
}

/// A chunk that did not fit in the remaining frame capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overflow {
    /// Counter value the chunk would have produced.
    pub attempted: usize,
    pub capacity: usize,
}

#[derive(Clone, Debug)]
pub struct FrameAssembler {
    filled: [usize; 2],
    capacity: usize,
}

impl FrameAssembler {
    /// `capacity` is the raw-frame buffer size in bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            filled: [0, 0],
            capacity,
        }
    }

    pub fn filled(&self, side: CameraSide) -> usize {
        self.filled[side.index()]
    }

    pub fn remaining(&self, side: CameraSide) -> usize {
        self.capacity - self.filled(side)
    }

    pub fn state(&self, side: CameraSide) -> FillState {
        match self.filled(side) {
            0 => FillState::Empty,
            n if n == self.capacity => FillState::Full,
            _ => FillState::Filling,
        }
    }

    /// Account for `len` incoming bytes on `side`.
    ///
    /// Returns the byte range of the side's buffer the chunk belongs in. On
    /// overflow the side's counter drops back to zero and nothing is reserved.
    pub fn reserve(&mut self, side: CameraSide, len: usize) -> Result<Range<usize>, Overflow> {
        let start = self.filled[side.index()];
        let end = start.saturating_add(len);
        if end > self.capacity {
            self.filled[side.index()] = 0;
            return Err(Overflow {
                attempted: end,
                capacity: self.capacity,
            });
        }
        self.filled[side.index()] = end;
        Ok(start..end)
    }

    /// True only when both sides hold exactly one full frame.
    pub fn pair_complete(&self) -> bool {
        self.filled.iter().all(|&n| n == self.capacity)
    }

    pub fn reset(&mut self) {
        self.filled = [0, 0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_append_after_previous_ones() {
        let mut asm = FrameAssembler::new(10);
        assert_eq!(asm.state(CameraSide::Left), FillState::Empty);

        assert_eq!(asm.reserve(CameraSide::Left, 4), Ok(0..4));
        assert_eq!(asm.reserve(CameraSide::Left, 3), Ok(4..7));
        assert_eq!(asm.state(CameraSide::Left), FillState::Filling);
        assert_eq!(asm.remaining(CameraSide::Left), 3);

        assert_eq!(asm.filled(CameraSide::Right), 0);
        assert!(!asm.pair_complete());
    }

    #[test]
    fn overflow_resets_only_that_side() {
        let mut asm = FrameAssembler::new(10);
        asm.reserve(CameraSide::Right, 6).expect("fits");
        asm.reserve(CameraSide::Left, 8).expect("fits");

        let err = asm.reserve(CameraSide::Left, 3).unwrap_err();
        assert_eq!(
            err,
            Overflow {
                attempted: 11,
                capacity: 10
            }
        );
        assert_eq!(asm.filled(CameraSide::Left), 0);
        assert_eq!(asm.filled(CameraSide::Right), 6);
        assert_eq!(asm.reserve(CameraSide::Left, 2), Ok(0..2));
    }

    #[test]
    fn pair_completes_only_at_exact_capacity() {
        let mut asm = FrameAssembler::new(4);
        asm.reserve(CameraSide::Left, 4).expect("fits");
        assert_eq!(asm.state(CameraSide::Left), FillState::Full);
        assert!(!asm.pair_complete());

        asm.reserve(CameraSide::Right, 2).expect("fits");
        assert!(!asm.pair_complete());
        asm.reserve(CameraSide::Right, 2).expect("fits");
        assert!(asm.pair_complete());

        asm.reset();
        assert_eq!(asm.state(CameraSide::Left), FillState::Empty);
        assert_eq!(asm.state(CameraSide::Right), FillState::Empty);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut asm = FrameAssembler::new(4);
        assert_eq!(asm.reserve(CameraSide::Left, 0), Ok(0..0));
        assert_eq!(asm.state(CameraSide::Left), FillState::Empty);
    }
}
