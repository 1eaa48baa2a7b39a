//! WebP preview decoding with GPU-friendly output.
//!
//! This crate turns WebP files into BGRA pixels laid out for direct texture
//! upload, and draws them with a single textured quad:
//!
//! - [`BitstreamFeatures::probe`]: dimensions, alpha and format from the header
//! - [`DecodeDescriptor`]: target size, visible region and row stride
//! - [`Decoder`]: one-shot ([`decode`](Decoder::decode)) and incremental
//!   ([`decode_stream`](Decoder::decode_stream)) decoding into page-aligned
//!   [`ScratchBuffer`]s with 512-byte rows
//! - [`gpu`]: texture upload and the quad renderer (feature `gpu`)
//! - [`PreviewProvider`]: the host-facing preview and thumbnail entry points
//! - [`WindowRegistry`]: bookkeeping for the `weblook` viewer's windows
//!
//! Decoding is done by libwebp. Malformed input never panics; the primary
//! API reports it as `None` and the `try_*` variants keep the reason.
//!
//! ```no_run
//! use weblook::{decode_webp, DecodeDescriptor};
//!
//! let data = std::fs::read("photo.webp").unwrap();
//! let corner = decode_webp(&data, DecodeDescriptor::natural, |image| image.pixel(0, 0));
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

whereat::define_at_crate_info!();

mod buffer;
mod decode;
mod descriptor;
mod error;
mod format;
mod info;
mod limits;
mod output;
mod preview;
mod registry;
mod streaming;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use buffer::{PAGE_SIZE, SCANLINE_ALIGNMENT, ScratchBuffer, align_up, checked_align_up};
pub use decode::{Decoder, decode_webp};
pub use descriptor::{ColorLayout, DecodeDescriptor, Point, Size};
pub use error::{DecodeError, DecodeResult, DecodeStatus};
pub use format::ContainerFormat;
pub use info::{BitstreamFeatures, BitstreamFormat};
pub use limits::{LimitExceeded, ResourceLimits};
pub use output::{DecodedImage, OwnedImage};
pub use preview::{
    PREVIEW_CHUNK_SIZE, PreviewError, PreviewImage, PreviewProvider, THUMBNAIL_CHUNK_SIZE,
};
pub use registry::WindowRegistry;
pub use streaming::{DEFAULT_CHUNK_SIZE, decode_webp_stream};

// Re-exports for callers configuring cancellation and pixel formats.
pub use enough::{Stop, StopReason, Unstoppable};
pub use zenpixels::PixelDescriptor;
