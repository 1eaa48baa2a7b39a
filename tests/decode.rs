//! One-shot decoding of lossless fixtures.

mod common;

use common::{encode_lossless, gradient_webp, solid, source_pixel};
use weblook::{
    BitstreamFeatures, BitstreamFormat, ContainerFormat, DecodeDescriptor, DecodeError, Decoder,
    PixelDescriptor, Point, ResourceLimits, SCANLINE_ALIGNMENT, Size, align_up, decode_webp,
};

#[test]
fn solid_color_decodes_everywhere() {
    let color = [0x20, 0x80, 0xE0, 0xFF];
    let data = encode_lossless(37, 11, &solid(37, 11, color));

    let checked = decode_webp(&data, DecodeDescriptor::natural, |image| {
        assert_eq!((image.width(), image.height()), (37, 11));
        assert_eq!(image.stride(), align_up(37 * 4, SCANLINE_ALIGNMENT));
        assert_eq!(image.descriptor(), PixelDescriptor::BGRA8_SRGB);
        for row in image.rows() {
            for pixel in row.chunks_exact(4) {
                assert_eq!(pixel, color);
            }
        }
        true
    });
    assert_eq!(checked, Some(true));
}

#[test]
fn gradient_round_trips_exactly() {
    let (data, pixels) = gradient_webp(130, 70);
    let owned = decode_webp(&data, DecodeDescriptor::natural, |image| {
        // 130 * 4 = 520 bytes, so every row carries padding.
        assert_eq!(image.stride(), 1024);
        image.to_owned_image()
    })
    .unwrap();
    assert_eq!(owned.as_bytes(), &pixels[..]);
}

#[test]
fn corners_match_source() {
    let (data, pixels) = gradient_webp(64, 48);
    let corners = decode_webp(&data, DecodeDescriptor::natural, |image| {
        [(0, 0), (63, 0), (0, 47), (63, 47)].map(|(x, y)| image.pixel(x, y))
    })
    .unwrap();
    assert_eq!(corners[0], source_pixel(&pixels, 64, 0, 0));
    assert_eq!(corners[1], source_pixel(&pixels, 64, 63, 0));
    assert_eq!(corners[2], source_pixel(&pixels, 64, 0, 47));
    assert_eq!(corners[3], source_pixel(&pixels, 64, 63, 47));
}

#[test]
fn probe_reports_lossless_features() {
    let mut pixels = solid(9, 5, [1, 2, 3, 0xFF]);
    pixels[3] = 0x80;
    let data = encode_lossless(9, 5, &pixels);

    let features = BitstreamFeatures::probe(&data).unwrap();
    assert_eq!((features.width, features.height), (9, 5));
    assert_eq!(features.format, BitstreamFormat::Lossless);
    assert!(features.has_alpha);
    assert!(!features.has_animation);
    assert_eq!(ContainerFormat::detect(&data), Some(ContainerFormat::Lossless));
}

#[test]
fn different_size_scales() {
    let (data, _) = gradient_webp(200, 100);
    let dims = decode_webp(
        &data,
        |_| DecodeDescriptor::with_size(Size::new(50.0, 25.0)),
        |image| {
            assert_eq!(image.stride(), align_up(50 * 4, SCANLINE_ALIGNMENT));
            (image.width(), image.height())
        },
    );
    assert_eq!(dims, Some((50, 25)));
}

#[test]
fn scaling_outputs_visible_region() {
    let (data, _) = gradient_webp(100, 80);
    let descriptor = DecodeDescriptor::new(
        Size::new(64.0, 64.0),
        Point::new(0.0, 0.0),
        Point::new(32.0, 16.0),
    );
    let dims = decode_webp(&data, |_| descriptor, |image| (image.width(), image.height()));
    assert_eq!(dims, Some((32, 16)));
}

#[test]
fn fit_within_keeps_aspect_ratio() {
    let (data, _) = gradient_webp(120, 60);
    let dims = decode_webp(
        &data,
        |features| DecodeDescriptor::fit_within(features, Size::new(40.0, 40.0)),
        |image| (image.width(), image.height()),
    );
    assert_eq!(dims, Some((40, 20)));
}

#[test]
fn configure_sees_probed_features() {
    let (data, _) = gradient_webp(21, 13);
    let mut seen = None;
    decode_webp(
        &data,
        |features| {
            seen = Some(*features);
            DecodeDescriptor::natural(features)
        },
        |_| (),
    )
    .unwrap();
    let seen = seen.unwrap();
    assert_eq!((seen.width, seen.height), (21, 13));
}

#[test]
fn truncated_input_is_absent() {
    let (data, _) = gradient_webp(90, 90);
    for len in [0, 1, 11, 12, 20, 30, data.len() / 2, data.len() - 1] {
        let result = decode_webp(&data[..len], DecodeDescriptor::natural, |_| ());
        assert!(result.is_none(), "prefix of {len} bytes decoded");
    }
}

#[test]
fn corrupt_input_never_panics() {
    let (data, _) = gradient_webp(50, 50);
    for offset in (20..data.len()).step_by(7) {
        let mut corrupt = data.clone();
        corrupt[offset] ^= 0xFF;
        // Either outcome is fine; only a panic would fail the test.
        let _ = decode_webp(&corrupt, DecodeDescriptor::natural, |image| image.width());
    }
}

#[test]
fn region_outside_image_is_rejected() {
    let (data, _) = gradient_webp(16, 16);
    let mut transformed = false;
    let err = Decoder::new()
        .try_decode(
            &data,
            |_| {
                DecodeDescriptor::new(
                    Size::new(16.0, 16.0),
                    Point::new(0.0, 0.0),
                    Point::new(32.0, 16.0),
                )
            },
            |_| transformed = true,
        )
        .unwrap_err();
    assert!(matches!(err.error(), DecodeError::InvalidDescriptor(_)));
    assert!(!transformed);
}

#[test]
fn pixel_limit_rejects_before_decoding() {
    let (data, _) = gradient_webp(64, 64);
    let decoder = Decoder::new().with_limits(ResourceLimits::none().with_max_pixels(1000));
    let err = decoder
        .try_decode(&data, DecodeDescriptor::natural, |_| ())
        .unwrap_err();
    assert!(matches!(err.error(), DecodeError::LimitExceeded(_)));
    assert!(decoder.decode(&data, DecodeDescriptor::natural, |_| ()).is_none());
}

#[test]
fn custom_alignment_changes_stride() {
    let (data, pixels) = gradient_webp(10, 4);
    let decoder = Decoder::new().with_scanline_alignment(64);
    let owned = decoder
        .decode(&data, DecodeDescriptor::natural, |image| {
            assert_eq!(image.stride(), 64);
            image.to_owned_image()
        })
        .unwrap();
    assert_eq!(owned.as_bytes(), &pixels[..]);
}

#[test]
fn oversized_descriptor_is_absent() {
    let data = encode_lossless(1, 1, &solid(1, 1, [1, 2, 3, 0xFF]));
    for size in [Size::new(1e30, 1e30), Size::new(f32::MAX, 1.0), Size::new(4.0e9, 4.0e9)] {
        let result = decode_webp(&data, |_| DecodeDescriptor::with_size(size), |image| image.width());
        assert!(result.is_none(), "{size:?} decoded");

        let err = Decoder::new()
            .try_decode(&data, |_| DecodeDescriptor::with_size(size), |_| ())
            .unwrap_err();
        assert!(
            matches!(
                err.error(),
                DecodeError::InvalidDescriptor(_) | DecodeError::OutOfMemory(_)
            ),
            "{size:?}: {}",
            err.error()
        );
    }
}
