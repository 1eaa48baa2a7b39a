//! Fixtures shared by the integration tests.
//!
//! Images are encoded at test time with libwebp's lossless encoder, so the
//! decoded pixels must match the source exactly.

#![allow(dead_code)]

use std::io::{self, Read};

/// Encode packed BGRA pixels as a lossless WebP file.
pub fn encode_lossless(width: u32, height: u32, bgra: &[u8]) -> Vec<u8> {
    assert_eq!(bgra.len(), (width * height * 4) as usize);
    let mut output: *mut u8 = std::ptr::null_mut();
    // SAFETY: `bgra` holds `height` rows of `width * 4` bytes; libwebp
    // allocates `output` and we free it with `WebPFree` below.
    let len = unsafe {
        libwebp_sys::WebPEncodeLosslessBGRA(
            bgra.as_ptr(),
            width as i32,
            height as i32,
            (width * 4) as i32,
            &mut output,
        )
    };
    assert!(len > 0 && !output.is_null(), "lossless encode failed");
    // SAFETY: libwebp returned `len` initialized bytes at `output`.
    let data = unsafe { std::slice::from_raw_parts(output, len) }.to_vec();
    unsafe { libwebp_sys::WebPFree(output.cast()) };
    data
}

/// Every pixel set to `bgra`.
pub fn solid(width: u32, height: u32, bgra: [u8; 4]) -> Vec<u8> {
    bgra.repeat((width * height) as usize)
}

/// Distinct, opaque pixels: blue = x, green = y, red = x ^ y.
pub fn gradient(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8, 0xFF]);
        }
    }
    pixels
}

/// Encoded gradient, with its source pixels.
pub fn gradient_webp(width: u32, height: u32) -> (Vec<u8>, Vec<u8>) {
    let pixels = gradient(width, height);
    (encode_lossless(width, height, &pixels), pixels)
}

/// Source pixel `(x, y)` of a packed BGRA buffer.
pub fn source_pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

/// Reader that returns at most `max_read` bytes per call, like a pipe.
pub struct TrickleReader<'a> {
    data: &'a [u8],
    max_read: usize,
}

impl<'a> TrickleReader<'a> {
    pub fn new(data: &'a [u8], max_read: usize) -> Self {
        Self { data, max_read }
    }
}

impl Read for TrickleReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.max_read).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}
