//! Bitstream feature probing.

use libwebp_sys::{VP8StatusCode, WebPBitstreamFeatures};
use whereat::at;

use crate::error::{DecodeError, DecodeResult, DecodeStatus};

/// Compression used by the bitstream, as reported by libwebp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BitstreamFormat {
    /// Mixed (animations with both kinds of frames) or not yet known.
    #[default]
    Undefined,
    /// VP8.
    Lossy,
    /// VP8L.
    Lossless,
}

impl BitstreamFormat {
    fn from_raw(format: i32) -> Self {
        match format {
            1 => Self::Lossy,
            2 => Self::Lossless,
            _ => Self::Undefined,
        }
    }
}

/// Metadata read from a WebP header without decoding any pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitstreamFeatures {
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    /// Whether the bitstream carries an alpha channel.
    pub has_alpha: bool,
    /// Whether the file is an animation.
    pub has_animation: bool,
    /// Lossy, lossless or undefined.
    pub format: BitstreamFormat,
}

impl BitstreamFeatures {
    /// Probe `data` for dimensions, alpha and format.
    ///
    /// `data` only needs to contain the container header; the rest of the
    /// file is not touched.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InsufficientData`] if `data` is too short for a header
    /// or the header reports a zero dimension, and [`DecodeError::Status`]
    /// for anything libwebp rejects outright.
    pub fn probe(data: &[u8]) -> DecodeResult<Self> {
        let mut raw = core::mem::MaybeUninit::<WebPBitstreamFeatures>::zeroed();
        // SAFETY: `data` is a valid slice for its length and `raw` is a
        // zero-initialized, writable `WebPBitstreamFeatures`. libwebp only
        // reads `data` and only writes `raw`.
        let status =
            unsafe { libwebp_sys::WebPGetFeatures(data.as_ptr(), data.len(), raw.as_mut_ptr()) };
        if status != VP8StatusCode::VP8_STATUS_OK {
            return Err(at!(DecodeError::from(DecodeStatus::from(status))));
        }
        // SAFETY: zero is a valid bit pattern for every field and libwebp
        // filled it in on success.
        let raw = unsafe { raw.assume_init() };
        let features = Self::from_raw(&raw);
        if features.is_degenerate() {
            return Err(at!(DecodeError::InsufficientData));
        }
        Ok(features)
    }

    pub(crate) fn from_raw(raw: &WebPBitstreamFeatures) -> Self {
        Self {
            width: raw.width.max(0) as u32,
            height: raw.height.max(0) as u32,
            has_alpha: raw.has_alpha != 0,
            has_animation: raw.has_animation != 0,
            format: BitstreamFormat::from_raw(raw.format),
        }
    }

    /// All-zero dimensions: the header was not readable.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
