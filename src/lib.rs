//! Simple Stereo Vision Library (ssvl)
//!
//! Estimates scene depth from a horizontally offset camera pair on
//! resource-constrained devices.
//!
//! # Pipeline
//!
//! Capture code streams packed RGB565 bytes into a [`Session`] per camera side.
//! When both sides hold a complete frame, the session runs, in the caller's
//! thread and before `feed` returns:
//!
//! 1. **Intensity**: both frames are rewritten in place as 16-bit luminance.
//! 2. **Disparity**: per depth-grid cell, block matching along the row toward
//!    decreasing x with a pluggable [`BlockComparer`] (SAD by default).
//! 3. **Depth**: disparity becomes millimetres via focal length and baseline;
//!    cells without a usable match get the maximum-depth sentinel.
//!
//! Observers registered on the session are notified after each stage.
//!
//! # Module Structure
//!
//! - `geometry`: rig parameters, grid layout, derived optics
//! - `buffers`: owned vs caller-supplied storage
//! - `assembler`: per-side fill counters and pair completion
//! - `intensity`, `compare`, `disparity`, `depth`: pipeline stages
//! - `observer`: stage notifications
//! - `config`, `ingest`, `report`, `ui`: tooling around the core

use std::fmt;

pub mod assembler;
pub mod buffers;
pub mod compare;
pub mod config;
pub mod depth;
pub mod disparity;
pub mod geometry;
pub mod ingest;
pub mod intensity;
pub mod observer;
pub mod report;
pub mod session;
pub mod ui;

pub use assembler::FillState;
pub use buffers::Ownership;
pub use compare::{
    BlockComparer, BlockOrigin, ComparerRegistry, SumOfAbsoluteDifferences,
    SumOfSquaredDifferences, DEFAULT_COMPARER,
};
pub use geometry::RigGeometry;
pub use ingest::{feed_pair, StereoPair, SyntheticConfig, SyntheticStereoSource};
pub use intensity::IntensityView;
pub use observer::{DepthObserver, DisparityObserver, GridView, IntensityObserver};
pub use report::MapStats;
pub use session::{process_pair, Session, SessionConfig};

// -------------------- Camera Side --------------------

/// Which camera of the rig a chunk or result belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CameraSide {
    Left = 0,
    Right = 1,
}

impl CameraSide {
    pub const BOTH: [CameraSide; 2] = [CameraSide::Left, CameraSide::Right];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CameraSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraSide::Left => f.write_str("left"),
            CameraSide::Right => f.write_str("right"),
        }
    }
}

// -------------------- Status --------------------

/// Last error recorded by a session. `Ok` until something fails.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Ok = 0,
    /// A side received more bytes than one frame holds.
    FeedOverflow = 1,
    /// `feed` was called with no buffers allocated or bound.
    BuffersUnset = 2,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "OK",
            Status::FeedOverflow => "FEED_OVERFLOW",
            Status::BuffersUnset => "BUFFERS_UNSET",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

// -------------------- Feed Results --------------------

/// What a successful `feed` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Chunk stored; the pair is not complete yet.
    Buffered {
        side: CameraSide,
        filled: usize,
        remaining: usize,
    },
    /// Chunk completed the pair and the pipeline ran.
    Processed,
}

/// Why a `feed` was rejected. The session status is set accordingly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedError {
    /// The chunk would have pushed `side` past one frame; that side restarts at 0.
    Overflow {
        side: CameraSide,
        attempted: usize,
        capacity: usize,
    },
    BuffersUnset,
}

impl FeedError {
    pub fn status(&self) -> Status {
        match self {
            FeedError::Overflow { .. } => Status::FeedOverflow,
            FeedError::BuffersUnset => Status::BuffersUnset,
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Overflow {
                side,
                attempted,
                capacity,
            } => write!(
                f,
                "{}: {} frame would hold {} bytes, capacity is {}",
                self.status(),
                side,
                attempted,
                capacity
            ),
            FeedError::BuffersUnset => {
                write!(f, "{}: no frame buffers allocated or bound", self.status())
            }
        }
    }
}

impl std::error::Error for FeedError {}
