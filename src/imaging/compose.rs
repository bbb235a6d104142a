//! Pure pixel preparation: no I/O, unit testable.
//!
//! Every encoder accepts a limited set of color types. [`prepare_for`] maps a
//! decoded image onto one the target's encoder takes, and flattens alpha for
//! JPEG, which has no alpha channel.

use super::params::Background;
use crate::formats::TargetFormat;
use image::{DynamicImage, RgbImage};

/// True when the image stores more than 8 bits per channel.
pub fn is_high_depth(image: &DynamicImage) -> bool {
    let color = image.color();
    color.bytes_per_pixel() > color.channel_count()
}

fn is_gray(image: &DynamicImage) -> bool {
    matches!(
        image,
        DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
    )
}

/// Composite the image onto an opaque background.
///
/// Per channel: `out = a * src + (1 - a) * background`, with rounding.
/// Images without alpha are only converted to 8-bit RGB.
pub fn flatten_onto(image: &DynamicImage, background: Background) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let [br, bg, bb] = background.0;
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u32::from(a);
        let blend = |src: u8, back: u8| -> u8 {
            ((u32::from(src) * a + u32::from(back) * (255 - a) + 127) / 255) as u8
        };
        image::Rgb([blend(r, br), blend(g, bg), blend(b, bb)])
    })
}

/// Convert a decoded image into a color type the target encoder accepts.
pub fn prepare_for(image: DynamicImage, target: TargetFormat, background: Background) -> DynamicImage {
    let has_alpha = image.color().has_alpha();
    match target {
        TargetFormat::Jpg | TargetFormat::Jpeg => {
            DynamicImage::ImageRgb8(flatten_onto(&image, background))
        }
        // The TIFF encoder has no gray+alpha layout.
        TargetFormat::Tiff if matches!(image, DynamicImage::ImageLumaA8(_)) => {
            DynamicImage::ImageRgba8(image.to_rgba8())
        }
        TargetFormat::Tiff if matches!(image, DynamicImage::ImageLumaA16(_)) => {
            DynamicImage::ImageRgba16(image.to_rgba16())
        }
        TargetFormat::Png | TargetFormat::Tiff => match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_) => image,
            // Float (and any future) layouts: keep precision at 16 bits.
            other if other.color().has_alpha() => DynamicImage::ImageRgba16(other.to_rgba16()),
            other => DynamicImage::ImageRgb16(other.to_rgb16()),
        },
        TargetFormat::Webp | TargetFormat::Bmp => match (is_gray(&image), has_alpha) {
            (true, true) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
            (true, false) => DynamicImage::ImageLuma8(image.to_luma8()),
            (false, true) => DynamicImage::ImageRgba8(image.to_rgba8()),
            (false, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgba, RgbaImage};

    fn half_transparent() -> DynamicImage {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0])); // fully transparent black
        img.put_pixel(1, 0, Rgba([200, 100, 50, 255])); // opaque
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn transparent_pixels_take_background() {
        let flat = flatten_onto(&half_transparent(), Background::WHITE);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [200, 100, 50]);
    }

    #[test]
    fn partial_alpha_blends() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let flat = flatten_onto(&img, Background::WHITE);
        // 255 * 127 / 255 = 127
        assert_eq!(flat.get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn custom_background_color() {
        let flat = flatten_onto(&half_transparent(), Background([10, 20, 30]));
        assert_eq!(flat.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn jpeg_target_is_always_rgb8() {
        let prepared = prepare_for(half_transparent(), TargetFormat::Jpg, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageRgb8(_)));

        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        let prepared = prepare_for(gray, TargetFormat::Jpeg, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn png_keeps_alpha_and_depth() {
        let prepared = prepare_for(half_transparent(), TargetFormat::Png, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageRgba8(_)));

        let deep = DynamicImage::ImageRgb16(image::ImageBuffer::new(2, 2));
        let prepared = prepare_for(deep, TargetFormat::Tiff, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageRgb16(_)));
        assert!(is_high_depth(&prepared));
    }

    #[test]
    fn tiff_gray_alpha_widens_to_rgba() {
        let img = DynamicImage::ImageLumaA8(image::ImageBuffer::new(2, 2));
        let prepared = prepare_for(img.clone(), TargetFormat::Tiff, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageRgba8(_)));
        // PNG has a native gray+alpha layout
        let prepared = prepare_for(img, TargetFormat::Png, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageLumaA8(_)));
    }

    #[test]
    fn float_images_become_16_bit() {
        let float = DynamicImage::ImageRgba32F(image::ImageBuffer::new(2, 2));
        let prepared = prepare_for(float, TargetFormat::Png, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageRgba16(_)));
    }

    #[test]
    fn webp_and_bmp_drop_to_8_bit() {
        let deep = DynamicImage::ImageRgba16(image::ImageBuffer::new(2, 2));
        let prepared = prepare_for(deep, TargetFormat::Webp, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageRgba8(_)));

        let gray = DynamicImage::ImageLuma16(image::ImageBuffer::new(2, 2));
        let prepared = prepare_for(gray, TargetFormat::Bmp, Background::WHITE);
        assert!(matches!(prepared, DynamicImage::ImageLuma8(_)));
        assert!(!is_high_depth(&prepared));
    }
}
