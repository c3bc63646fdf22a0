//! RGB565 to linear intensity conversion.
//!
//! Conversion happens in place: once a frame pair is processed, the raw-frame
//! buffers hold 16-bit intensity samples instead of packed color. Callers must
//! refill a buffer with fresh color data before it is processed again.
//!
//! - `convert_rgb565_in_place`: rewrites a byte buffer of packed samples.
//! - `IntensityView`: read-only, row-major view handed to observers and
//!   comparison strategies. It cannot outlive the processing call.

use crate::geometry::BYTES_PER_SAMPLE;

const RED_MASK: u16 = 0b1111_1000_0000_0000;
const GREEN_MASK: u16 = 0b0000_0111_1110_0000;
const BLUE_MASK: u16 = 0b0000_0000_0001_1111;

const RED_SHIFT: u32 = 11;
const GREEN_SHIFT: u32 = 5;

// Full scale of each channel is its mask shifted down.
const RED_MAX: f32 = (RED_MASK >> RED_SHIFT) as f32;
const GREEN_MAX: f32 = (GREEN_MASK >> GREEN_SHIFT) as f32;
const BLUE_MAX: f32 = BLUE_MASK as f32;

/// Linear luminance weights (Rec. 709 primaries).
pub const RED_WEIGHT: f64 = 0.2126;
pub const GREEN_WEIGHT: f64 = 0.7152;
pub const BLUE_WEIGHT: f64 = 0.07122;

/// Linear luminance in `[0, 1]` for one packed RGB565 sample.
///
/// Channels are normalized in `f32`; the weighted sum is taken in `f64` and
/// narrowed once at the end.
pub fn rgb565_luminance(sample: u16) -> f32 {
    let r = ((sample & RED_MASK) >> RED_SHIFT) as f32 / RED_MAX;
    let g = ((sample & GREEN_MASK) >> GREEN_SHIFT) as f32 / GREEN_MAX;
    let b = (sample & BLUE_MASK) as f32 / BLUE_MAX;
    (RED_WEIGHT * f64::from(r) + GREEN_WEIGHT * f64::from(g) + BLUE_WEIGHT * f64::from(b)) as f32
}

/// Quantized 16-bit intensity for one packed RGB565 sample.
pub fn rgb565_to_intensity(sample: u16) -> u16 {
    (rgb565_luminance(sample) * u16::MAX as f32) as u16
}

/// Rewrite every little-endian RGB565 sample in `frame` as a 16-bit intensity.
///
/// A trailing odd byte, if any, is left untouched.
pub fn convert_rgb565_in_place(frame: &mut [u8]) {
    for sample in frame.chunks_exact_mut(BYTES_PER_SAMPLE) {
        let packed = u16::from_le_bytes([sample[0], sample[1]]);
        sample.copy_from_slice(&rgb565_to_intensity(packed).to_le_bytes());
    }
}

/// Read-only view over a full intensity frame.
#[derive(Clone, Copy, Debug)]
pub struct IntensityView<'a> {
    bytes: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> IntensityView<'a> {
    /// `bytes` must hold at least `width * height` little-endian samples.
    pub(crate) fn new(bytes: &'a [u8], width: usize, height: usize) -> Self {
        debug_assert!(bytes.len() >= width * height * BYTES_PER_SAMPLE);
        Self {
            bytes,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Intensity at pixel `(x, y)`. Rows are `width` samples apart.
    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> u16 {
        let offset = (y * self.width + x) * BYTES_PER_SAMPLE;
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// Samples in row-major order.
    pub fn samples(&self) -> impl Iterator<Item = u16> + 'a {
        self.as_bytes()
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Underlying little-endian bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        let bytes: &'a [u8] = self.bytes;
        &bytes[..self.width * self.height * BYTES_PER_SAMPLE]
    }
}
