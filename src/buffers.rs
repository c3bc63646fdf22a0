//! Frame and depth buffer storage.
//!
//! A session either allocates its buffers (`Owned`) or works on memory the
//! caller lends it (`Borrowed`). Borrowed memory is never freed by the
//! session; releasing it only forgets the reference.

use std::ops::{Deref, DerefMut};

use anyhow::{anyhow, Result};

use crate::geometry::RigGeometry;
use crate::CameraSide;

/// Who is responsible for the memory behind a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Allocated by the session, freed on release.
    Owned,
    /// Supplied by the caller, never freed by the session.
    Borrowed,
}

/// One buffer, either session-allocated or caller-supplied.
#[derive(Debug)]
pub enum Buffer<'a, T> {
    Owned(Vec<T>),
    Borrowed(&'a mut [T]),
}

impl<T> Buffer<'_, T> {
    pub fn ownership(&self) -> Ownership {
        match self {
            Buffer::Owned(_) => Ownership::Owned,
            Buffer::Borrowed(_) => Ownership::Borrowed,
        }
    }
}

impl<T> Deref for Buffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            Buffer::Owned(data) => data,
            Buffer::Borrowed(data) => data,
        }
    }
}

impl<T> DerefMut for Buffer<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        match self {
            Buffer::Owned(data) => data,
            Buffer::Borrowed(data) => data,
        }
    }
}

/// The two raw-frame buffers and the disparity/depth buffer of a session.
///
/// All three share one ownership mode.
#[derive(Debug)]
pub struct BufferSet<'a> {
    frames: [Buffer<'a, u8>; 2],
    depth: Buffer<'a, f32>,
}

impl<'a> BufferSet<'a> {
    /// Allocate zeroed buffers sized for `rig`.
    pub fn allocate(rig: &RigGeometry) -> Self {
        Self {
            frames: [
                Buffer::Owned(vec![0u8; rig.frame_buffer_size()]),
                Buffer::Owned(vec![0u8; rig.frame_buffer_size()]),
            ],
            depth: Buffer::Owned(vec![0.0f32; rig.depth_cell_count()]),
        }
    }

    /// Wrap caller memory after checking it can hold a full frame pair and grid.
    ///
    /// Longer slices are accepted; only their leading part is used.
    pub fn borrow(
        rig: &RigGeometry,
        left: &'a mut [u8],
        right: &'a mut [u8],
        depth: &'a mut [f32],
    ) -> Result<Self> {
        let frame_size = rig.frame_buffer_size();
        let cells = rig.depth_cell_count();
        for (side, len) in [
            (CameraSide::Left, left.len()),
            (CameraSide::Right, right.len()),
        ] {
            if len < frame_size {
                return Err(anyhow!(
                    "{} frame buffer too small: need {} bytes, got {}",
                    side,
                    frame_size,
                    len
                ));
            }
        }
        if depth.len() < cells {
            return Err(anyhow!(
                "depth buffer too small: need {} cells, got {}",
                cells,
                depth.len()
            ));
        }
        Ok(Self {
            frames: [
                Buffer::Borrowed(&mut left[..frame_size]),
                Buffer::Borrowed(&mut right[..frame_size]),
            ],
            depth: Buffer::Borrowed(&mut depth[..cells]),
        })
    }

    pub fn ownership(&self) -> Ownership {
        self.depth.ownership()
    }

    pub fn frame(&self, side: CameraSide) -> &[u8] {
        &self.frames[side.index()]
    }

    pub fn frame_mut(&mut self, side: CameraSide) -> &mut [u8] {
        &mut self.frames[side.index()]
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    /// Split into `(left, right, depth)` for the processing pass.
    pub(crate) fn split_mut(&mut self) -> (&mut [u8], &mut [u8], &mut [f32]) {
        let [left, right] = &mut self.frames;
        (&mut left[..], &mut right[..], &mut self.depth[..])
    }

    /// Bytes this set allocated itself (zero for borrowed storage).
    pub fn owned_bytes(&self) -> usize {
        match self.ownership() {
            Ownership::Owned => {
                self.frames.iter().map(|f| f.len()).sum::<usize>()
                    + self.depth.len() * std::mem::size_of::<f32>()
            }
            Ownership::Borrowed => 0,
        }
    }
}
