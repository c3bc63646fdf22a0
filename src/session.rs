//! Stereo depth session.
//!
//! A `Session` is the single stateful handle for one stereo rig. Capture code
//! streams bytes into it per side; when both sides hold a complete frame the
//! session synchronously runs intensity conversion, disparity search and
//! depth reconstruction, notifying observers after each stage, and then
//! starts accepting the next pair.
//!
//! The session is not thread-safe by contract: callers feeding the two sides
//! from different threads must serialize every call themselves.

use anyhow::{anyhow, Result};

use crate::assembler::{FillState, FrameAssembler};
use crate::buffers::{BufferSet, Ownership};
use crate::compare::{BlockComparer, SumOfAbsoluteDifferences};
use crate::geometry::RigGeometry;
use crate::intensity::{self, IntensityView};
use crate::observer::{DepthObserver, DisparityObserver, GridView, IntensityObserver, Observers};
use crate::{depth, disparity, CameraSide, FeedError, FeedOutcome, Status};

/// Parameters fixed at session creation.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    /// Search window edge; must divide both width and height.
    pub block_size: u32,
    pub baseline_mm: f32,
    pub fov_degrees: f32,
    /// Allocate buffers now instead of waiting for `bind_buffers`.
    pub allocate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            block_size: 4,
            baseline_mm: 10.0,
            fov_degrees: 70.0,
            allocate: true,
        }
    }
}

pub struct Session<'a> {
    rig: RigGeometry,
    buffers: Option<BufferSet<'a>>,
    assembler: FrameAssembler,
    comparer: Box<dyn BlockComparer + 'a>,
    observers: Observers<'a>,
    status: Status,
    pairs_processed: u64,
}

impl<'a> Session<'a> {
    /// Create a session. Fails, yielding no session at all, when the geometry
    /// is invalid.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let rig = RigGeometry::new(
            config.width,
            config.height,
            config.block_size,
            config.baseline_mm,
            config.fov_degrees,
        )?;
        Ok(Self::with_geometry(rig, config.allocate))
    }

    /// Create a session from already-validated geometry.
    pub fn with_geometry(rig: RigGeometry, allocate: bool) -> Self {
        log::debug!(
            "ssvl session: {}x{} px, block {} px, baseline {:.3} mm, fov {:.3} deg, \
             focal {:.3} px, max depth {:.3} mm, frame buffer {} bytes",
            rig.width(),
            rig.height(),
            rig.block_size(),
            rig.baseline_mm(),
            rig.fov_degrees(),
            rig.focal_length_pixels(),
            rig.max_depth_mm(),
            rig.frame_buffer_size()
        );
        Self {
            rig,
            buffers: allocate.then(|| BufferSet::allocate(&rig)),
            assembler: FrameAssembler::new(rig.frame_buffer_size()),
            comparer: Box::new(SumOfAbsoluteDifferences),
            observers: Observers::default(),
            status: Status::Ok,
            pairs_processed: 0,
        }
    }

    pub fn geometry(&self) -> &RigGeometry {
        &self.rig
    }

    pub fn max_depth_mm(&self) -> f32 {
        self.rig.max_depth_mm()
    }

    /// Point the session at caller-owned memory.
    ///
    /// Each frame buffer must hold at least `frame_buffer_size()` bytes and the
    /// depth buffer at least `depth_cell_count()` cells. Any buffers the
    /// session owned are dropped, and both fill counters restart at zero.
    pub fn bind_buffers(
        &mut self,
        left: &'a mut [u8],
        right: &'a mut [u8],
        depth: &'a mut [f32],
    ) -> Result<()> {
        let set = BufferSet::borrow(&self.rig, left, right, depth)?;
        self.buffers = Some(set);
        self.assembler.reset();
        log::info!("ssvl: bound caller-owned frame and depth buffers");
        Ok(())
    }

    /// Drop session-owned buffers and forget borrowed ones.
    ///
    /// Safe to call repeatedly. Afterwards `feed` fails until buffers are
    /// bound again.
    pub fn release(&mut self) {
        if let Some(set) = self.buffers.take() {
            match set.ownership() {
                Ownership::Owned => {
                    log::info!("ssvl: released {} owned buffer bytes", set.owned_bytes())
                }
                Ownership::Borrowed => log::info!("ssvl: detached caller-owned buffers"),
            }
        }
        self.assembler.reset();
    }

    /// `None` once released or before buffers are bound.
    pub fn ownership(&self) -> Option<Ownership> {
        self.buffers.as_ref().map(BufferSet::ownership)
    }

    pub fn set_comparer(&mut self, comparer: Box<dyn BlockComparer + 'a>) {
        self.comparer = comparer;
    }

    pub fn comparer_name(&self) -> &str {
        self.comparer.name()
    }

    pub fn on_intensity<O: IntensityObserver + 'a>(&mut self, observer: O) {
        self.observers.intensity = Some(Box::new(observer));
    }

    pub fn on_disparity<O: DisparityObserver + 'a>(&mut self, observer: O) {
        self.observers.disparity = Some(Box::new(observer));
    }

    pub fn on_depth<O: DepthObserver + 'a>(&mut self, observer: O) {
        self.observers.depth = Some(Box::new(observer));
    }

    /// Last status set by a failed operation.
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn clear_status(&mut self) {
        self.status = Status::Ok;
    }

    pub fn fill_level(&self, side: CameraSide) -> usize {
        self.assembler.filled(side)
    }

    pub fn fill_state(&self, side: CameraSide) -> FillState {
        self.assembler.state(side)
    }

    pub fn pairs_processed(&self) -> u64 {
        self.pairs_processed
    }

    /// Current frame buffer contents for `side`. After a processed pair this
    /// is intensity, not color.
    pub fn frame(&self, side: CameraSide) -> Option<&[u8]> {
        self.buffers.as_ref().map(|set| set.frame(side))
    }

    /// Most recent depth grid (or disparity grid, mid-processing).
    pub fn depth_map(&self) -> Option<GridView<'_>> {
        self.buffers.as_ref().map(|set| {
            GridView::new(
                set.depth(),
                self.rig.depth_width() as usize,
                self.rig.depth_height() as usize,
            )
        })
    }

    /// Append `chunk` to `side`'s frame.
    ///
    /// When this completes the pair, the whole pipeline runs before returning
    /// and both sides start over at zero.
    pub fn feed(&mut self, side: CameraSide, chunk: &[u8]) -> Result<FeedOutcome, FeedError> {
        let Some(buffers) = self.buffers.as_mut() else {
            self.status = Status::BuffersUnset;
            return Err(FeedError::BuffersUnset);
        };

        let range = match self.assembler.reserve(side, chunk.len()) {
            Ok(range) => range,
            Err(overflow) => {
                self.status = Status::FeedOverflow;
                log::warn!(
                    "ssvl: {} feed overflow ({} > {} bytes), frame restarted",
                    side,
                    overflow.attempted,
                    overflow.capacity
                );
                return Err(FeedError::Overflow {
                    side,
                    attempted: overflow.attempted,
                    capacity: overflow.capacity,
                });
            }
        };
        buffers.frame_mut(side)[range].copy_from_slice(chunk);

        if !self.assembler.pair_complete() {
            return Ok(FeedOutcome::Buffered {
                side,
                filled: self.assembler.filled(side),
                remaining: self.assembler.remaining(side),
            });
        }

        self.assembler.reset();
        self.process();
        Ok(FeedOutcome::Processed)
    }

    fn process(&mut self) {
        let Some(buffers) = self.buffers.as_mut() else {
            return;
        };
        let rig = &self.rig;
        let width = rig.width() as usize;
        let height = rig.height() as usize;
        let grid_width = rig.depth_width() as usize;
        let grid_height = rig.depth_height() as usize;
        let (left, right, grid) = buffers.split_mut();

        intensity::convert_rgb565_in_place(left);
        intensity::convert_rgb565_in_place(right);
        let left = IntensityView::new(left, width, height);
        let right = IntensityView::new(right, width, height);
        self.observers.intensity(CameraSide::Left, left);
        self.observers.intensity(CameraSide::Right, right);

        disparity::estimate(rig, self.comparer.as_ref(), &left, &right, grid);
        self.observers
            .disparity(GridView::new(grid, grid_width, grid_height));

        depth::reconstruct(rig, grid);
        self.observers
            .depth(GridView::new(grid, grid_width, grid_height), rig.max_depth_mm());

        self.pairs_processed += 1;
        log::debug!(
            "ssvl: processed pair #{} ({}x{} cells, comparer {})",
            self.pairs_processed,
            grid_width,
            grid_height,
            self.comparer.name()
        );
    }
}

/// Feed a whole frame for each side and require that the pair was processed.
///
/// Convenience for callers that already hold complete frames.
pub fn process_pair(session: &mut Session<'_>, left: &[u8], right: &[u8]) -> Result<()> {
    session
        .feed(CameraSide::Left, left)
        .map_err(|e| anyhow!("left frame rejected: {}", e))?;
    match session.feed(CameraSide::Right, right) {
        Ok(FeedOutcome::Processed) => Ok(()),
        Ok(FeedOutcome::Buffered { remaining, .. }) => Err(anyhow!(
            "frame pair incomplete: right side still needs {} bytes",
            remaining
        )),
        Err(e) => Err(anyhow!("right frame rejected: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SessionConfig {
        SessionConfig {
            width: 8,
            height: 4,
            block_size: 4,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn invalid_geometry_yields_no_session() {
        let cfg = SessionConfig {
            width: 10,
            ..small()
        };
        assert!(Session::new(cfg).is_err());
    }

    #[test]
    fn unbound_session_rejects_feed() -> Result<()> {
        let mut session = Session::new(SessionConfig {
            allocate: false,
            ..small()
        })?;
        assert_eq!(session.ownership(), None);
        assert_eq!(
            session.feed(CameraSide::Left, &[0; 4]),
            Err(FeedError::BuffersUnset)
        );
        assert_eq!(session.status(), Status::BuffersUnset);
        assert_eq!(session.fill_level(CameraSide::Left), 0);
        Ok(())
    }

    #[test]
    fn overflow_does_not_copy_or_touch_other_side() -> Result<()> {
        let mut session = Session::new(small())?;
        session.feed(CameraSide::Right, &[1; 10]).expect("fits");
        session.feed(CameraSide::Left, &[2; 60]).expect("fits");

        let err = session.feed(CameraSide::Left, &[3; 5]).unwrap_err();
        assert!(matches!(
            err,
            FeedError::Overflow {
                side: CameraSide::Left,
                attempted: 65,
                capacity: 64
            }
        ));
        assert_eq!(session.status(), Status::FeedOverflow);
        assert_eq!(session.fill_level(CameraSide::Left), 0);
        assert_eq!(session.fill_level(CameraSide::Right), 10);

        // Stale bytes survive; the next frame overwrites from offset 0.
        let frame = session.frame(CameraSide::Left).expect("buffers");
        assert!(frame[..60].iter().all(|&b| b == 2));
        assert!(frame[60..].iter().all(|&b| b == 0));

        session.feed(CameraSide::Left, &[4; 16]).expect("fresh frame");
        assert_eq!(session.fill_level(CameraSide::Left), 16);
        let frame = session.frame(CameraSide::Left).expect("buffers");
        assert!(frame[..16].iter().all(|&b| b == 4));
        assert!(frame[16..60].iter().all(|&b| b == 2));
        assert!(frame[60..].iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn release_is_idempotent() -> Result<()> {
        let mut session = Session::new(small())?;
        assert_eq!(session.ownership(), Some(Ownership::Owned));
        session.feed(CameraSide::Left, &[0; 8]).expect("fits");
        session.release();
        session.release();
        assert_eq!(session.ownership(), None);
        assert_eq!(session.fill_level(CameraSide::Left), 0);
        assert!(session.feed(CameraSide::Left, &[0; 8]).is_err());
        Ok(())
    }

    #[test]
    fn process_pair_requires_full_frames() -> Result<()> {
        let mut session = Session::new(small())?;
        assert!(process_pair(&mut session, &[0; 64], &[0; 32]).is_err());
        session.release();

        let mut session = Session::new(small())?;
        process_pair(&mut session, &[0; 64], &[0; 64])?;
        assert_eq!(session.pairs_processed(), 1);
        Ok(())
    }
}
