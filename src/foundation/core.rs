use crate::foundation::error::{MiravaError, MiravaResult};

pub use kurbo::{Point, Rect};

/// A frame as straight (non-premultiplied) RGBA8 bytes, row-major, tightly packed.
///
/// This is both the input shape fed to the tracking engine and the composited
/// output shape it returns per tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// `width * height * 4` RGBA8 bytes.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Construct a frame, validating that `data` matches `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MiravaResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(4))
            .ok_or_else(|| MiravaError::validation("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(MiravaError::validation(format!(
                "frame data length {} does not match {}x{}x4",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A fully transparent frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }
}

impl Default for FrameRGBA {
    fn default() -> Self {
        Self::blank(0, 0)
    }
}

/// Rational frames-per-second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator, must be > 0.
    pub num: u32,
    /// Denominator, must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a validated rational FPS value.
    pub fn new(num: u32, den: u32) -> MiravaResult<Self> {
        if num == 0 {
            return Err(MiravaError::validation("Fps num must be > 0"));
        }
        if den == 0 {
            return Err(MiravaError::validation("Fps den must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// FPS as a floating point value.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in milliseconds.
    pub fn frame_interval_ms(self) -> f64 {
        1000.0 * f64::from(self.den) / f64::from(self.num)
    }
}

/// A timestamp in milliseconds on the engine clock.
///
/// The session never reads a wall clock; every tick carries the timestamp the
/// frame source assigned to it, which keeps frame pacing deterministic.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct TimestampMs(pub f64);

impl TimestampMs {
    /// Milliseconds elapsed since `earlier`. Negative if `earlier` is later.
    pub fn since(self, earlier: TimestampMs) -> f64 {
        self.0 - earlier.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
