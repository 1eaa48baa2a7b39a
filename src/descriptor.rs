//! Decode descriptors: target size, visible region and output layout.
//!
//! A [`DecodeDescriptor`] is what a caller hands back after seeing the probed
//! [`BitstreamFeatures`]. It decides whether libwebp has to rescale, how big
//! the decoded output is, and how wide each output row is in memory.
//!
//! ```
//! use weblook::{DecodeDescriptor, Size, SCANLINE_ALIGNMENT};
//!
//! let descriptor = DecodeDescriptor::with_size(Size::new(300.0, 200.0));
//! assert_eq!(descriptor.visible_width(), 300.0);
//! // 300 * 4 = 1200 bytes, padded to the next multiple of 512.
//! assert_eq!(descriptor.stride(SCANLINE_ALIGNMENT), 1536);
//! ```

use whereat::at;
use zenpixels::PixelDescriptor;

use crate::buffer::checked_align_up;
use crate::error::{DecodeError, DecodeResult};
use crate::info::BitstreamFeatures;

/// Largest image side a descriptor may request.
const MAX_DIMENSION: f32 = u32::MAX as f32;

/// A width/height pair in the descriptor's coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A point in the descriptor's coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Output pixel layout. Only 8-bit BGRA is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ColorLayout {
    /// Blue, green, red, alpha; one byte each.
    #[default]
    Bgra8,
}

impl ColorLayout {
    /// Bytes per pixel.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8 => 4,
        }
    }

    /// The equivalent `zenpixels` descriptor.
    #[inline]
    pub const fn pixel_descriptor(self) -> PixelDescriptor {
        match self {
            Self::Bgra8 => PixelDescriptor::BGRA8_SRGB,
        }
    }
}

/// Target size, visible sub-rectangle and layout for one decode.
///
/// The visible region is given by two corners, bottom-left and top-right.
/// It must lie within `[0, image_size]`; in the common case it spans the
/// whole image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeDescriptor {
    image_size: Size,
    corners: [Point; 2],
    layout: ColorLayout,
}

impl DecodeDescriptor {
    /// Descriptor with an explicit visible region.
    pub const fn new(image_size: Size, bottom_left: Point, top_right: Point) -> Self {
        Self {
            image_size,
            corners: [bottom_left, top_right],
            layout: ColorLayout::Bgra8,
        }
    }

    /// Descriptor whose visible region is the whole `size`.
    pub const fn with_size(size: Size) -> Self {
        Self::new(size, Point::new(0.0, 0.0), Point::new(size.width, size.height))
    }

    /// Decode at the image's natural size; never scales.
    pub fn natural(features: &BitstreamFeatures) -> Self {
        Self::with_size(Size::new(features.width as f32, features.height as f32))
    }

    /// Decode scaled to fit inside `max`, keeping the aspect ratio.
    ///
    /// The scale factor is `min(max.width / width, max.height / height)`, so
    /// small images are scaled up as well as large ones down. A `max` with a
    /// non-positive component, or degenerate features, falls back to
    /// [`natural`](Self::natural).
    pub fn fit_within(features: &BitstreamFeatures, max: Size) -> Self {
        if max.width <= 0.0 || max.height <= 0.0 || features.is_degenerate() {
            return Self::natural(features);
        }
        let width = features.width as f32;
        let height = features.height as f32;
        let scale = (max.width / width).min(max.height / height);
        let scaled_width = ((width * scale) as u32).max(1);
        let scaled_height = ((height * scale) as u32).max(1);
        Self::with_size(Size::new(scaled_width as f32, scaled_height as f32))
    }

    #[inline]
    pub fn image_size(&self) -> Size {
        self.image_size
    }

    #[inline]
    pub fn image_width(&self) -> f32 {
        self.image_size.width
    }

    #[inline]
    pub fn image_height(&self) -> f32 {
        self.image_size.height
    }

    #[inline]
    pub fn bottom_left_corner(&self) -> Point {
        self.corners[0]
    }

    #[inline]
    pub fn top_right_corner(&self) -> Point {
        self.corners[1]
    }

    /// Width of the visible region.
    #[inline]
    pub fn visible_width(&self) -> f32 {
        self.top_right_corner().x - self.bottom_left_corner().x
    }

    /// Height of the visible region.
    #[inline]
    pub fn visible_height(&self) -> f32 {
        self.top_right_corner().y - self.bottom_left_corner().y
    }

    #[inline]
    pub fn layout(&self) -> ColorLayout {
        self.layout
    }

    /// Whether libwebp has to rescale: the requested image size differs
    /// from the natural size of the bitstream.
    pub fn needs_scaling(&self, features: &BitstreamFeatures) -> bool {
        self.image_width() as u32 != features.width || self.image_height() as u32 != features.height
    }

    /// The `(width, height)` libwebp is asked to scale to, or `None` if the
    /// image is decoded at its natural size.
    ///
    /// When scaling, the output is the visible region's size, not the full
    /// image size.
    pub fn scaled_dimensions(&self, features: &BitstreamFeatures) -> Option<(u32, u32)> {
        self.needs_scaling(features)
            .then(|| (self.visible_width() as u32, self.visible_height() as u32))
    }

    /// Dimensions of the decoded output.
    pub fn output_dimensions(&self, features: &BitstreamFeatures) -> (u32, u32) {
        self.scaled_dimensions(features)
            .unwrap_or((features.width, features.height))
    }

    /// Row stride in bytes: `align_up(image_width * 4, alignment)`.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is zero or the stride does not fit in `usize`.
    /// Use [`checked_stride`](Self::checked_stride) for caller-supplied
    /// descriptors.
    pub fn stride(&self, alignment: usize) -> usize {
        match self.checked_stride(alignment) {
            Some(stride) => stride,
            None => panic!(
                "stride for width {} with alignment {alignment} overflows",
                self.image_width()
            ),
        }
    }

    /// Checked variant of [`stride`](Self::stride). Returns `None` if
    /// `alignment` is zero or the row size overflows.
    pub fn checked_stride(&self, alignment: usize) -> Option<usize> {
        checked_align_up(self.row_bytes()?, alignment)
    }

    fn row_bytes(&self) -> Option<usize> {
        // `as` saturates, so an enormous width becomes `usize::MAX` here.
        (self.image_width() as usize).checked_mul(self.layout.bytes_per_pixel())
    }

    /// Check that this descriptor can be used to decode `features`.
    ///
    /// The image size must be finite and at least 1×1, the visible region
    /// must be non-empty and inside the image, and the decoded output must
    /// fit in the rows and height reserved for the image size.
    pub fn validate(&self, features: &BitstreamFeatures) -> DecodeResult<()> {
        let Size { width, height } = self.image_size;
        if !(width.is_finite() && height.is_finite()) || width < 1.0 || height < 1.0 {
            return Err(at!(DecodeError::InvalidDescriptor(format!(
                "image size {width}x{height} is not a positive finite size"
            ))));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(at!(DecodeError::InvalidDescriptor(format!(
                "image size {width}x{height} exceeds {MAX_DIMENSION} pixels per side"
            ))));
        }
        let bottom_left = self.bottom_left_corner();
        let top_right = self.top_right_corner();
        if bottom_left.x < 0.0
            || bottom_left.y < 0.0
            || top_right.x > width
            || top_right.y > height
            || self.visible_width() < 1.0
            || self.visible_height() < 1.0
        {
            return Err(at!(DecodeError::InvalidDescriptor(format!(
                "visible region ({}, {})..({}, {}) is empty or outside {width}x{height}",
                bottom_left.x, bottom_left.y, top_right.x, top_right.y
            ))));
        }
        let (out_width, out_height) = self.output_dimensions(features);
        if out_width > width as u32 || out_height > height as u32 {
            return Err(at!(DecodeError::InvalidDescriptor(format!(
                "output {out_width}x{out_height} does not fit in {width}x{height}"
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{SCANLINE_ALIGNMENT, align_up};
    use crate::info::BitstreamFormat;
    use proptest::prelude::*;

    fn features(width: u32, height: u32) -> BitstreamFeatures {
        BitstreamFeatures {
            width,
            height,
            has_alpha: true,
            has_animation: false,
            format: BitstreamFormat::Lossless,
        }
    }

    #[test]
    fn derived_fields() {
        let d = DecodeDescriptor::new(
            Size::new(100.0, 80.0),
            Point::new(10.0, 20.0),
            Point::new(60.0, 70.0),
        );
        assert_eq!(d.visible_width(), 50.0);
        assert_eq!(d.visible_height(), 50.0);
        assert_eq!(d.layout(), ColorLayout::Bgra8);
        assert_eq!(d.layout().pixel_descriptor(), PixelDescriptor::BGRA8_SRGB);
    }

    #[test]
    fn natural_size_does_not_scale() {
        let f = features(640, 480);
        let d = DecodeDescriptor::natural(&f);
        assert!(!d.needs_scaling(&f));
        assert_eq!(d.scaled_dimensions(&f), None);
        assert_eq!(d.output_dimensions(&f), (640, 480));
        assert!(d.validate(&f).is_ok());
    }

    #[test]
    fn different_size_scales_to_visible_region() {
        let f = features(640, 480);
        let d = DecodeDescriptor::new(
            Size::new(320.0, 240.0),
            Point::new(0.0, 0.0),
            Point::new(300.0, 200.0),
        );
        assert!(d.needs_scaling(&f));
        assert_eq!(d.scaled_dimensions(&f), Some((300, 200)));
        assert!(d.validate(&f).is_ok());
    }

    #[test]
    fn stride_examples() {
        let d = DecodeDescriptor::with_size(Size::new(128.0, 1.0));
        // 128 * 4 = 512 is already aligned.
        assert_eq!(d.stride(SCANLINE_ALIGNMENT), 512);
        let d = DecodeDescriptor::with_size(Size::new(129.0, 1.0));
        assert_eq!(d.stride(SCANLINE_ALIGNMENT), 1024);
        assert_eq!(d.checked_stride(0), None);
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        let f = features(400, 200);
        let d = DecodeDescriptor::fit_within(&f, Size::new(100.0, 100.0));
        assert_eq!(d.image_size(), Size::new(100.0, 50.0));
        assert_eq!(d.output_dimensions(&f), (100, 50));

        let d = DecodeDescriptor::fit_within(&f, Size::new(0.0, 0.0));
        assert!(!d.needs_scaling(&f));
    }

    #[test]
    fn fit_within_never_collapses_to_zero() {
        let f = features(10_000, 1);
        let d = DecodeDescriptor::fit_within(&f, Size::new(16.0, 16.0));
        assert_eq!(d.output_dimensions(&f), (16, 1));
    }

    #[test]
    fn validate_rejects_bad_regions() {
        let f = features(64, 64);
        let outside = DecodeDescriptor::new(
            Size::new(64.0, 64.0),
            Point::new(0.0, 0.0),
            Point::new(65.0, 64.0),
        );
        assert!(outside.validate(&f).is_err());

        let empty = DecodeDescriptor::new(
            Size::new(32.0, 32.0),
            Point::new(5.0, 5.0),
            Point::new(5.0, 20.0),
        );
        assert!(empty.validate(&f).is_err());

        let nan = DecodeDescriptor::with_size(Size::new(f32::NAN, 10.0));
        assert!(nan.validate(&f).is_err());
    }

    #[test]
    fn huge_width_has_no_stride() {
        let d = DecodeDescriptor::with_size(Size::new(1e30, 1e30));
        assert_eq!(d.checked_stride(SCANLINE_ALIGNMENT), None);
        assert!(matches!(
            d.validate(&features(1, 1)).unwrap_err().error(),
            DecodeError::InvalidDescriptor(_)
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn widest_valid_descriptor_has_a_stride() {
        let d = DecodeDescriptor::with_size(Size::new(4.0e9, 1.0));
        assert!(d.validate(&features(1, 1)).is_ok());
        assert!(d.checked_stride(SCANLINE_ALIGNMENT).is_some());
    }

    #[test]
    #[should_panic(expected = "overflows")]
    fn stride_panics_on_overflow() {
        let d = DecodeDescriptor::with_size(Size::new(f32::MAX, 1.0));
        let _ = d.stride(SCANLINE_ALIGNMENT);
    }

    proptest! {
        #[test]
        fn stride_is_aligned(width in 1u32..20_000) {
            let d = DecodeDescriptor::with_size(Size::new(width as f32, 1.0));
            let stride = d.stride(SCANLINE_ALIGNMENT);
            prop_assert_eq!(stride, align_up(width as usize * 4, 512));
            prop_assert_eq!(stride % 512, 0);
            prop_assert!(stride >= width as usize * 4);
        }

        #[test]
        fn scaling_iff_dimensions_differ(
            natural_w in 1u32..4096,
            natural_h in 1u32..4096,
            target_w in 1u32..4096,
            target_h in 1u32..4096,
        ) {
            let f = features(natural_w, natural_h);
            let d = DecodeDescriptor::with_size(Size::new(target_w as f32, target_h as f32));
            let differs = natural_w != target_w || natural_h != target_h;
            prop_assert_eq!(d.needs_scaling(&f), differs);
            if !differs {
                prop_assert_eq!(d.output_dimensions(&f), (natural_w, natural_h));
            }
        }
    }
}
