use anyhow::{anyhow, Result};

use crate::geometry::BYTES_PER_SAMPLE;

/// Layouts a frame source may deliver before packing for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, R G B byte order.
    Rgb24,
    /// 16-bit 5-6-5 samples, little-endian.
    Rgb565,
}

/// Convert `pixels` to little-endian RGB565, checking the length first.
pub fn normalize_to_rgb565(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    match format {
        PixelFormat::Rgb24 => {
            let expected = pixel_count
                .checked_mul(3)
                .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))?;
            if pixels.len() != expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Ok(rgb888_to_rgb565(pixels))
        }
        PixelFormat::Rgb565 => {
            let expected = pixel_count * BYTES_PER_SAMPLE;
            if pixels.len() != expected {
                return Err(anyhow!(
                    "RGB565 frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Ok(pixels.to_vec())
        }
    }
}

/// Pack one 8-bit-per-channel color into a 5-6-5 sample.
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3)
}

fn rgb888_to_rgb565(pixels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() / 3 * BYTES_PER_SAMPLE);
    for rgb in pixels.chunks_exact(3) {
        out.extend_from_slice(&pack_rgb565(rgb[0], rgb[1], rgb[2]).to_le_bytes());
    }
    out
}
