//! Decoded image → GPU texture.

use std::sync::mpsc;

use crate::buffer::align_up;
use crate::output::{DecodedImage, OwnedImage};

use super::{GpuContext, GpuError, IMAGE_TEXTURE_FORMAT, scoped};

/// A BGRA texture holding one decoded image.
///
/// Created fresh for every image and sized to the decoded output, which may
/// differ from the size the caller asked for.
#[derive(Debug)]
pub struct ImageTexture {
    texture: wgpu::Texture,
    width: u32,
    height: u32,
}

impl ImageTexture {
    /// Create a texture of the image's width×height and upload its rows,
    /// honoring the image's stride.
    pub fn upload(ctx: &GpuContext, image: &DecodedImage<'_>) -> Result<Self, GpuError> {
        let texture = Self::blank(ctx, image.width(), image.height())?;
        let bytes_per_row = u32::try_from(image.stride()).map_err(|_| {
            GpuError::TextureCreation(format!("row stride {} is too large", image.stride()))
        })?;
        ctx.queue().write_texture(
            texture.texture.as_image_copy(),
            image.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(image.height()),
            },
            texture.extent(),
        );
        Ok(texture)
    }

    /// An uninitialized texture that can also be rendered into.
    pub fn blank(ctx: &GpuContext, width: u32, height: u32) -> Result<Self, GpuError> {
        let max = ctx.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(GpuError::TextureCreation(format!(
                "{width}x{height} is outside 1..={max}"
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let (texture, error) = scoped(ctx.device(), || {
            ctx.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("decoded image"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: IMAGE_TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        });
        if let Some(message) = error {
            return Err(GpuError::TextureCreation(message));
        }
        Ok(Self {
            texture,
            width,
            height,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn create_view(&self) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Copy the texture back to the CPU as tightly packed BGRA rows.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_back(&self, ctx: &GpuContext) -> Result<OwnedImage, GpuError> {
        let row_bytes = self.width as usize * 4;
        let padded_row = align_up(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize);
        let size = (padded_row * self.height as usize) as u64;

        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("read back"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("read back"),
            });
        encoder.copy_texture_to_buffer(
            self.texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row as u32),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        ctx.queue().submit([encoder.finish()]);

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device().poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::ReadBack("map callback never ran".into()))?
            .map_err(|err| GpuError::ReadBack(err.to_string()))?;

        let mut data = Vec::with_capacity(row_bytes * self.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded_row) {
                data.extend_from_slice(&row[..row_bytes]);
            }
        }
        buffer.unmap();

        OwnedImage::new(data, self.width, self.height)
            .ok_or_else(|| GpuError::ReadBack("mapped buffer is too short".into()))
    }
}
