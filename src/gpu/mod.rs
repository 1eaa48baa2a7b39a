//! GPU side: upload decoded images and draw them as a textured quad.
//!
//! ```text
//! GpuContext ──→ ImageTexture::upload(DecodedImage)
//!      │                  │
//!      └─→ QuadRenderer ──┴─→ bind() ─→ BoundImage ─→ draw(target view)
//! ```
//!
//! Everything here returns [`GpuError`] instead of panicking, so a preview
//! host can fall back to a CPU path when no adapter is available.

mod context;
mod renderer;
mod texture;

pub use context::{GpuContext, GpuError};
pub use renderer::{BoundImage, QUAD_VERTICES, QuadRenderer, Vertex};
pub use texture::ImageTexture;

/// Texture format used for decoded images. Decoded rows are BGRA; the
/// sRGB transfer is left to the output surface.
pub const IMAGE_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

/// Run `f` inside validation and out-of-memory error scopes and return the
/// first captured error message.
pub(crate) fn scoped<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> (T, Option<String>) {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let oom = pollster::block_on(device.pop_error_scope());
    let message = validation.or(oom).map(|err| err.to_string());
    (value, message)
}
