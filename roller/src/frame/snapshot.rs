const CHANNELS: usize = 4;

/// One captured camera frame as packed RGBA8 pixels.
///
/// A snapshot is immutable once built; the sampler replaces it wholesale
/// with the next capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("pixel buffer is {got} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        got: usize,
        expected: usize,
    },
}

impl Snapshot {
    /// Wrap a raw RGBA8 buffer. The buffer length must be `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SnapshotError> {
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(SnapshotError::BufferSize {
                width,
                height,
                got: pixels.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with a single colour.
    #[cfg(test)]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Sum of `|ΔR| + |ΔG| + |ΔB|` over every pixel; alpha is ignored.
    ///
    /// Returns `None` when the two frames have different dimensions, since
    /// there is no pixel-to-pixel correspondence to score. The score is not
    /// normalized, so it grows with resolution.
    pub fn difference(&self, other: &Snapshot) -> Option<u64> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        let score = self
            .pixels
            .chunks_exact(CHANNELS)
            .zip(other.pixels.chunks_exact(CHANNELS))
            .map(|(a, b)| {
                a[..3]
                    .iter()
                    .zip(&b[..3])
                    .map(|(x, y)| x.abs_diff(*y) as u64)
                    .sum::<u64>()
            })
            .sum();
        Some(score)
    }
}
