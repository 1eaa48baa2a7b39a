//! One-shot decoding from an in-memory buffer.
//!
//! The pipeline is the same for every entry point:
//!
//! 1. probe the bitstream features,
//! 2. ask the caller for a [`DecodeDescriptor`],
//! 3. validate it against the features and the configured limits,
//! 4. allocate a page-aligned [`ScratchBuffer`] and point libwebp at it,
//! 5. decode and hand a borrowed [`DecodedImage`] to the caller's transform.
//!
//! The scratch buffer is dropped when the call returns, so the transform is
//! the only place the decoded rows can be read. Failures are reported as
//! `None` by [`Decoder::decode`]; [`Decoder::try_decode`] keeps the reason.

use enough::Stop;
use libwebp_sys::{WEBP_CSP_MODE, WebPDecoderConfig, WebPRGBABuffer};
use whereat::at;

use crate::buffer::{SCANLINE_ALIGNMENT, ScratchBuffer};
use crate::descriptor::DecodeDescriptor;
use crate::error::{DecodeError, DecodeResult, DecodeStatus};
use crate::info::BitstreamFeatures;
use crate::limits::ResourceLimits;
use crate::output::DecodedImage;
use crate::streaming::DEFAULT_CHUNK_SIZE;

/// Decode configuration.
///
/// Cheap to clone; holds no decoder state. A `Decoder` can be shared across
/// threads and used for any number of independent decodes.
///
/// ```no_run
/// use weblook::{DecodeDescriptor, Decoder, ResourceLimits};
///
/// let data = std::fs::read("photo.webp").unwrap();
/// let decoder = Decoder::new().with_limits(ResourceLimits::none().with_max_pixels(1 << 26));
/// let size = decoder.decode(&data, DecodeDescriptor::natural, |image| {
///     (image.width(), image.height())
/// });
/// ```
#[derive(Clone)]
pub struct Decoder<'a> {
    limits: ResourceLimits,
    stop: Option<&'a dyn Stop>,
    scanline_alignment: usize,
    chunk_size: usize,
}

impl Default for Decoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Decoder<'a> {
    /// Default configuration: no limits, no cancellation, 512-byte rows and
    /// 64 KiB stream chunks.
    pub fn new() -> Self {
        Self {
            limits: ResourceLimits::none(),
            stop: None,
            scanline_alignment: SCANLINE_ALIGNMENT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Apply resource limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Cancellation token, checked before decoding and between stream reads.
    #[must_use]
    pub fn with_stop(mut self, stop: &'a dyn Stop) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Row alignment of the decoded output in bytes. Zero is treated as one.
    #[must_use]
    pub fn with_scanline_alignment(mut self, alignment: usize) -> Self {
        self.scanline_alignment = alignment.max(1);
        self
    }

    /// Read size used by the streaming entry points. Zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[inline]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    #[inline]
    pub fn scanline_alignment(&self) -> usize {
        self.scanline_alignment
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Decode `data`, returning `None` on any failure.
    ///
    /// `configure` receives the probed features and returns the descriptor
    /// to decode with. `transform` receives the decoded rows; whatever it
    /// returns is the result of the call.
    pub fn decode<F, T, R>(&self, data: &[u8], configure: F, transform: T) -> Option<R>
    where
        F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
        T: FnOnce(DecodedImage<'_>) -> R,
    {
        self.try_decode(data, configure, transform)
            .map_err(|err| log::debug!("webp decode failed: {}", err.error()))
            .ok()
    }

    /// Decode `data`, keeping the reason for a failure.
    pub fn try_decode<F, T, R>(&self, data: &[u8], configure: F, transform: T) -> DecodeResult<R>
    where
        F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
        T: FnOnce(DecodedImage<'_>) -> R,
    {
        self.check_stop()?;
        self.limits
            .check_file_size(data.len() as u64)
            .map_err(|e| at!(DecodeError::from(e)))?;

        let features = BitstreamFeatures::probe(data)?;
        let mut target = self.prepare(features, configure)?;

        self.check_stop()?;
        // SAFETY: `data` is valid for reads of its length. `target.config`
        // points libwebp at the scratch buffer owned by `target`, which is
        // sized for `stride` * image height and outlives this call.
        let status =
            unsafe { libwebp_sys::WebPDecode(data.as_ptr(), data.len(), &mut target.config) };
        let status = DecodeStatus::from(status);
        if status != DecodeStatus::Ok {
            return Err(at!(DecodeError::from(status)));
        }

        Ok(transform(target.image()?))
    }

    pub(crate) fn check_stop(&self) -> DecodeResult<()> {
        match self.stop {
            Some(stop) => stop.check().map_err(|reason| at!(DecodeError::from(reason))),
            None => Ok(()),
        }
    }

    /// Steps 2 to 4: descriptor, validation, scratch memory and libwebp
    /// configuration.
    pub(crate) fn prepare<F>(
        &self,
        features: BitstreamFeatures,
        configure: F,
    ) -> DecodeResult<DecodeTarget>
    where
        F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
    {
        self.limits
            .check_features(&features)
            .map_err(|e| at!(DecodeError::from(e)))?;

        let descriptor = configure(&features);
        descriptor.validate(&features)?;

        let (width, height) = descriptor.output_dimensions(&features);
        self.limits
            .check_dimensions(width, height)
            .map_err(|e| at!(DecodeError::from(e)))?;

        let stride = descriptor
            .checked_stride(self.scanline_alignment)
            .ok_or_else(|| {
                at!(DecodeError::InvalidDescriptor(format!(
                    "row stride for width {} overflows",
                    descriptor.image_width()
                )))
            })?;
        let mut scratch = ScratchBuffer::for_descriptor(&descriptor, stride, &self.limits)?;
        let config =
            external_bgra_config(&mut scratch, stride, descriptor.scaled_dimensions(&features))?;

        log::trace!(
            "decoding {}x{} webp to {width}x{height}, stride {stride}",
            features.width,
            features.height
        );
        Ok(DecodeTarget {
            scratch,
            stride,
            config,
        })
    }
}

impl core::fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Decoder")
            .field("limits", &self.limits)
            .field("has_stop", &self.stop.is_some())
            .field("scanline_alignment", &self.scanline_alignment)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// Scratch memory plus the libwebp configuration that writes into it.
///
/// `config.output` holds a raw pointer into `scratch`; the two are only
/// ever moved together.
pub(crate) struct DecodeTarget {
    scratch: ScratchBuffer,
    stride: usize,
    pub(crate) config: WebPDecoderConfig,
}

impl DecodeTarget {
    /// View of the rows libwebp reported as decoded.
    pub(crate) fn image(&self) -> DecodeResult<DecodedImage<'_>> {
        let width = u32::try_from(self.config.output.width).unwrap_or(0);
        let height = u32::try_from(self.config.output.height).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(at!(DecodeError::Status(DecodeStatus::InvalidParam)));
        }
        DecodedImage::new(self.scratch.as_slice(), width, height, self.stride).ok_or_else(|| {
            at!(DecodeError::InvalidDescriptor(format!(
                "decoded {width}x{height} image does not fit the scratch buffer"
            )))
        })
    }
}

impl Drop for DecodeTarget {
    fn drop(&mut self) {
        // SAFETY: `config.output` was initialized by `WebPInitDecoderConfig`.
        // With external memory libwebp owns nothing, so this only resets the
        // descriptor fields; it never frees the scratch buffer.
        unsafe { libwebp_sys::WebPFreeDecBuffer(&mut self.config.output) };
    }
}

/// Build a decoder configuration that writes BGRA rows of `stride` bytes
/// into `scratch`, optionally scaled to `scaled`.
fn external_bgra_config(
    scratch: &mut ScratchBuffer,
    stride: usize,
    scaled: Option<(u32, u32)>,
) -> DecodeResult<WebPDecoderConfig> {
    let stride = i32::try_from(stride).map_err(|_| {
        at!(DecodeError::InvalidDescriptor(format!(
            "row stride {stride} does not fit libwebp's buffer description"
        )))
    })?;

    // SAFETY: all-zero is a valid bit pattern for the config (null pointers,
    // zero integers, MODE_RGB), and `WebPInitDecoderConfig` fills in the
    // rest before anything reads it.
    let mut config: WebPDecoderConfig = unsafe { core::mem::zeroed() };
    if !unsafe { libwebp_sys::WebPInitDecoderConfig(&mut config) } {
        // Only fails on a libwebp ABI version mismatch.
        return Err(at!(DecodeError::Status(DecodeStatus::InvalidParam)));
    }

    config.output.colorspace = WEBP_CSP_MODE::MODE_BGRA;
    config.output.is_external_memory = 1;
    config.output.u.RGBA = WebPRGBABuffer {
        rgba: scratch.as_mut_ptr(),
        stride,
        size: scratch.len(),
    };

    if let Some((width, height)) = scaled {
        let (Ok(width), Ok(height)) = (i32::try_from(width), i32::try_from(height)) else {
            return Err(at!(DecodeError::InvalidDescriptor(format!(
                "scaled size {width}x{height} is out of range"
            ))));
        };
        config.options.use_scaling = 1;
        config.options.scaled_width = width;
        config.options.scaled_height = height;
    }

    Ok(config)
}

/// Decode `data` with a default [`Decoder`].
///
/// Shorthand for `Decoder::new().decode(data, configure, transform)`.
pub fn decode_webp<F, T, R>(data: &[u8], configure: F, transform: T) -> Option<R>
where
    F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
    T: FnOnce(DecodedImage<'_>) -> R,
{
    Decoder::new().decode(data, configure, transform)
}
