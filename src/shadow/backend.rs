use super::{Contour, Difference, ImageOps, OverlayStyle, ShadowError, ShadowMask};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::{
    contours::{BorderType, find_contours},
    drawing::draw_filled_rect_mut,
    rect::Rect,
};
use rayon::prelude::*;

/// [`ImageOps`] on 8-bit RGB buffers using `image` and `imageproc`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RgbOps;

/// ITU-R BT.601 luma.
fn luma(Rgb([r, g, b]): Rgb<u8>) -> u8 {
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)).round() as u8
}

fn blend(base: u8, tint: u8, alpha: f64) -> u8 {
    (f64::from(base) * (1.0 - alpha) + f64::from(tint) * alpha)
        .round()
        .clamp(0.0, 255.0) as u8
}

impl ImageOps for RgbOps {
    fn subtract(
        &self,
        no_shadow: &RgbImage,
        shadow: &RgbImage,
    ) -> Result<Difference, ShadowError> {
        let (width, height) = no_shadow.dimensions();
        let mismatch = || ShadowError::SizeMismatch {
            shadow: shadow.dimensions(),
            no_shadow: no_shadow.dimensions(),
        };
        if shadow.dimensions() != (width, height) {
            return Err(mismatch());
        }

        let (samples, underflow): (Vec<u8>, Vec<bool>) = no_shadow
            .as_raw()
            .par_iter()
            .zip(shadow.as_raw().par_iter())
            .map(|(&lit, &shaded)| (lit.saturating_sub(shaded), shaded > lit))
            .unzip();

        Ok(Difference {
            image: RgbImage::from_raw(width, height, samples).ok_or_else(mismatch)?,
            underflow_samples: underflow.into_iter().filter(|&u| u).count() as u64,
        })
    }

    fn grayscale(&self, image: &RgbImage) -> GrayImage {
        let (width, height) = image.dimensions();
        GrayImage::from_fn(width, height, |x, y| Luma([luma(*image.get_pixel(x, y))]))
    }

    fn threshold(&self, gray: &GrayImage, level: u8) -> ShadowMask {
        let (width, height) = gray.dimensions();
        ShadowMask::new(GrayImage::from_fn(width, height, |x, y| {
            let Luma([v]) = *gray.get_pixel(x, y);
            Luma([if v > level { u8::MAX } else { 0 }])
        }))
    }

    fn external_contours(&self, mask: &ShadowMask) -> Vec<Contour> {
        find_contours::<u32>(mask.as_image())
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| Contour::new(c.points.into_iter().map(|p| (p.x, p.y)).collect()))
            .collect()
    }

    fn draw_overlay(
        &self,
        base: &RgbImage,
        mask: &ShadowMask,
        contours: &[Contour],
        style: &OverlayStyle,
    ) -> RgbImage {
        let mut overlay = base.clone();
        overlay
            .enumerate_pixels_mut()
            .filter(|(x, y, _)| mask.contains(*x, *y))
            .for_each(|(_, _, Rgb(px))| {
                let Rgb(tint) = style.mask_color;
                for (c, t) in px.iter_mut().zip(tint) {
                    *c = blend(*c, t, style.alpha);
                }
            });

        let size = style.contour_thickness.max(1);
        let offset = (size as i32 - 1) / 2;
        for &(x, y) in contours.iter().flat_map(Contour::points) {
            let rect = Rect::at(x as i32 - offset, y as i32 - offset).of_size(size, size);
            draw_filled_rect_mut(&mut overlay, rect, style.contour_color);
        }
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ExtractionConfig, shadow::ShadowExtractor};
    use rstest::rstest;

    fn scene() -> RgbImage {
        RgbImage::from_fn(32, 32, |x, y| Rgb([(60 + x * 4) as u8, (60 + y * 4) as u8, 120]))
    }

    /// Darken a square patch of `scene` by `level` on every channel.
    fn with_shadow(scene: &RgbImage, level: u8, from: u32, to: u32) -> RgbImage {
        let mut shadow = scene.clone();
        for y in from..to {
            for x in from..to {
                let Rgb(px) = shadow.get_pixel_mut(x, y);
                px.iter_mut().for_each(|c| *c = c.saturating_sub(level));
            }
        }
        shadow
    }

    #[rstest]
    #[case(Rgb([0, 0, 0]), 0)]
    #[case(Rgb([255, 255, 255]), 255)]
    #[case(Rgb([50, 50, 50]), 50)]
    #[case(Rgb([255, 0, 0]), 76)]
    #[case(Rgb([0, 255, 0]), 150)]
    #[case(Rgb([0, 0, 255]), 29)]
    fn luma_weights(#[case] pixel: Rgb<u8>, #[case] expected: u8) {
        assert_eq!(luma(pixel), expected);
    }

    #[test]
    fn subtract_rejects_mismatched_sizes() {
        let result = RgbOps.subtract(&RgbImage::new(4, 3), &RgbImage::new(3, 4));
        assert!(matches!(
            result,
            Err(ShadowError::SizeMismatch {
                shadow: (3, 4),
                no_shadow: (4, 3)
            })
        ));
    }

    #[test]
    fn identical_images_have_no_shadows() {
        let extractor = ShadowExtractor::<RgbOps>::default();
        let image = scene();
        let extraction = extractor.extract("view_000.png", &image, &image).unwrap();

        let record = &extraction.record;
        assert_eq!(record.total_difference(), 0);
        assert_eq!(record.max_difference(), 0);
        assert_eq!(record.mean_difference(), 0.0);
        assert!(!record.has_significant_shadows());
        assert_eq!(record.shadow_areas_count(), 0);
        assert_eq!(extraction.mask.area(), 0);
        assert_eq!(extraction.overlay, image);
    }

    #[test]
    fn uniform_patch_is_one_region() {
        let extractor = ShadowExtractor::<RgbOps>::default();
        let no_shadow = scene();
        let shadow = with_shadow(&no_shadow, 50, 8, 16);
        let extraction = extractor.extract("view_001.png", &shadow, &no_shadow).unwrap();

        let record = &extraction.record;
        assert!(record.has_significant_shadows());
        assert_eq!(record.max_difference(), 50);
        assert_eq!(record.total_difference(), 8 * 8 * 3 * 50);
        assert_eq!(record.shadow_areas_count(), 1);
        assert_eq!(extraction.mask.area(), 64);
    }

    #[test]
    fn separate_patches_are_separate_regions() {
        let extractor = ShadowExtractor::<RgbOps>::default();
        let no_shadow = scene();
        let shadow = with_shadow(&with_shadow(&no_shadow, 50, 2, 6), 50, 20, 28);
        let record = extractor
            .extract("view_002.png", &shadow, &no_shadow)
            .unwrap()
            .record;
        assert_eq!(record.shadow_areas_count(), 2);
    }

    #[test]
    fn nested_regions_are_ignored() {
        // A ring with a separate blob inside its hole.
        let mut gray = GrayImage::new(20, 20);
        for y in 2..18 {
            for x in 2..18 {
                let on_ring = !(4..16).contains(&x) || !(4..16).contains(&y);
                let in_blob = (8..12).contains(&x) && (8..12).contains(&y);
                if on_ring || in_blob {
                    gray.put_pixel(x, y, Luma([255]));
                }
            }
        }
        let mask = ShadowMask::new(gray);
        assert_eq!(RgbOps.external_contours(&mask).len(), 1);
    }

    #[test]
    fn faint_differences_stay_out_of_the_mask() {
        let extractor = ShadowExtractor::<RgbOps>::default();
        let no_shadow = scene();
        let shadow = with_shadow(&no_shadow, 12, 8, 16);
        let extraction = extractor.extract("view_003.png", &shadow, &no_shadow).unwrap();

        // Above the significance threshold but below the mask threshold.
        assert!(extraction.record.has_significant_shadows());
        assert_eq!(extraction.record.shadow_areas_count(), 0);
    }

    #[test]
    fn overlay_tints_mask_and_outlines_regions() {
        let base = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        let mut gray = GrayImage::new(10, 10);
        for y in 3..7 {
            for x in 3..7 {
                gray.put_pixel(x, y, Luma([255]));
            }
        }
        let mask = ShadowMask::new(gray);
        let style = OverlayStyle::from(&ExtractionConfig {
            contour_thickness: 1,
            ..ExtractionConfig::default()
        });

        let tinted = RgbOps.draw_overlay(&base, &mask, &[], &style);
        assert_eq!(tinted.get_pixel(5, 5), &Rgb([162, 60, 60]));
        assert_eq!(tinted.get_pixel(0, 0), &Rgb([100, 100, 100]));

        let contours = RgbOps.external_contours(&mask);
        let outlined = RgbOps.draw_overlay(&base, &mask, &contours, &style);
        assert_eq!(outlined.get_pixel(3, 3), &Rgb([255, 255, 0]));
        assert_eq!(outlined.get_pixel(5, 5), &Rgb([162, 60, 60]));
    }
}
