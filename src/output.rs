//! Decoded pixel views.
//!
//! [`DecodedImage`] borrows the scratch buffer the decoder wrote into, so it
//! cannot outlive the decode call. Transforms that need to keep the pixels
//! copy them into an [`OwnedImage`].

use core::fmt;

use zenpixels::PixelDescriptor;

use crate::descriptor::ColorLayout;

/// Borrowed view of decoded BGRA rows.
///
/// Rows are `stride` bytes apart; only the first `width * 4` bytes of each
/// row are pixels, the rest is alignment padding.
#[derive(Clone, Copy)]
pub struct DecodedImage<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> DecodedImage<'a> {
    /// Wrap decoded rows.
    ///
    /// Returns `None` if `stride` is shorter than a row or `pixels` is too
    /// small for `height` rows.
    pub fn new(pixels: &'a [u8], width: u32, height: u32, stride: usize) -> Option<Self> {
        let row_bytes = (width as usize).checked_mul(ColorLayout::Bgra8.bytes_per_pixel())?;
        if stride < row_bytes {
            return None;
        }
        if height > 0 {
            let required = stride
                .checked_mul(height as usize - 1)?
                .checked_add(row_bytes)?;
            if pixels.len() < required {
                return None;
            }
        }
        Some(Self {
            pixels,
            width,
            height,
            stride,
        })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Byte distance between the starts of consecutive rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel format of the rows (always 8-bit BGRA).
    #[inline]
    pub fn descriptor(&self) -> PixelDescriptor {
        ColorLayout::Bgra8.pixel_descriptor()
    }

    /// The underlying bytes, including padding and any trailing scratch
    /// space.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.pixels
    }

    /// Pixel bytes of row `y`, without padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        assert!(
            y < self.height,
            "row index {y} out of bounds (height: {})",
            self.height
        );
        let start = y as usize * self.stride;
        &self.pixels[start..start + self.row_bytes()]
    }

    /// Iterate over rows without padding.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// The BGRA bytes of pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width, "column {x} out of bounds (width: {})", self.width);
        let offset = x as usize * 4;
        let row = self.row(y);
        [row[offset], row[offset + 1], row[offset + 2], row[offset + 3]]
    }

    /// Copy the rows into a tightly packed owned image.
    pub fn to_owned_image(&self) -> OwnedImage {
        let mut data = Vec::with_capacity(self.row_bytes() * self.height as usize);
        for row in self.rows() {
            data.extend_from_slice(row);
        }
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    fn row_bytes(&self) -> usize {
        self.width as usize * 4
    }
}

impl fmt::Debug for DecodedImage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish()
    }
}

/// Tightly packed, owned BGRA pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl OwnedImage {
    /// Wrap packed BGRA bytes. Returns `None` unless
    /// `data.len() == width * height * 4`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(ColorLayout::Bgra8.bytes_per_pixel())?;
        (data.len() == expected).then_some(Self {
            data,
            width,
            height,
        })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed BGRA bytes, `width * 4` per row.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the packed bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Borrow as a [`DecodedImage`] with `stride == width * 4`.
    pub fn as_decoded(&self) -> DecodedImage<'_> {
        DecodedImage {
            pixels: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width as usize * 4,
        }
    }
}

impl fmt::Debug for OwnedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}
