//! Isolating shadows by differencing two renders of the same pose.
//!
//! One render has shadows enabled and the other does not. Wherever the shadow render is darker the
//! per-channel difference is positive; thresholding its grayscale gives a [`ShadowMask`] whose
//! outer boundaries are the shadow regions.

mod backend;
pub mod dataset;

pub use backend::RgbOps;

use crate::config::ExtractionConfig;
use image::{GrayImage, ImageError, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::{io, path::Path, path::PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const VIZ_SUFFIX: &str = "_shadow_viz.png";
pub const DIFF_SUFFIX: &str = "_shadow_diff.png";

#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("source directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("{0}")]
    InvalidConfig(String),
    #[error("image sizes differ: shadow is {shadow:?}, no-shadow is {no_shadow:?}")]
    SizeMismatch {
        shadow: (u32, u32),
        no_shadow: (u32, u32),
    },
    #[error("failed to decode {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("failed to encode {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("i/o error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize extraction record")]
    Serialize(#[from] serde_json::Error),
}

/// The clamped per-channel difference `no_shadow - shadow`.
#[derive(Clone, Debug)]
pub struct Difference {
    pub image: RgbImage,

    /// Channel samples where the shadow render was brighter and the difference clamped to zero.
    pub underflow_samples: u64,
}

/// Pixels classified as shadow.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowMask {
    image: GrayImage,
}

impl ShadowMask {
    /// Wrap a grayscale image, treating every nonzero pixel as shadow.
    pub fn new(mut image: GrayImage) -> Self {
        image.pixels_mut().for_each(|Luma([v])| {
            if *v > 0 {
                *v = u8::MAX;
            }
        });
        Self { image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.image
            .get_pixel_checked(x, y)
            .is_some_and(|Luma([v])| *v > 0)
    }

    /// Number of shadow pixels.
    pub fn area(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v > 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

/// Boundary pixels of one external shadow region, in traversal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    points: Vec<(u32, u32)>,
}

impl Contour {
    pub fn new(points: Vec<(u32, u32)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(u32, u32)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// How the mask and contours are painted onto the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub mask_color: Rgb<u8>,
    pub contour_color: Rgb<u8>,
    pub alpha: f64,
    pub contour_thickness: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

impl From<&ExtractionConfig> for OverlayStyle {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            mask_color: Rgb([255, 0, 0]),
            contour_color: Rgb([255, 255, 0]),
            alpha: config.overlay_alpha,
            contour_thickness: config.contour_thickness,
        }
    }
}

/// Image primitives needed by [`ShadowExtractor`].
pub trait ImageOps {
    /// Per-channel `clamp(no_shadow - shadow, 0, 255)`.
    ///
    /// Fails with [`ShadowError::SizeMismatch`] unless both images have the same dimensions.
    fn subtract(&self, no_shadow: &RgbImage, shadow: &RgbImage)
    -> Result<Difference, ShadowError>;

    fn grayscale(&self, image: &RgbImage) -> GrayImage;

    /// Pixels strictly brighter than `level`.
    fn threshold(&self, gray: &GrayImage, level: u8) -> ShadowMask;

    /// Outer boundaries of the mask's regions. Holes and regions nested inside holes are ignored.
    fn external_contours(&self, mask: &ShadowMask) -> Vec<Contour>;

    fn draw_overlay(
        &self,
        base: &RgbImage,
        mask: &ShadowMask,
        contours: &[Contour],
        style: &OverlayStyle,
    ) -> RgbImage;
}

/// Names of the two images written for a pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationFiles {
    pub highlighted: String,
    pub difference: String,
}

impl VisualizationFiles {
    pub fn for_image(image_name: &str) -> Self {
        let base = base_name(image_name);
        Self {
            highlighted: format!("{base}{VIZ_SUFFIX}"),
            difference: format!("{base}{DIFF_SUFFIX}"),
        }
    }
}

/// `view_000.png` becomes `view_000`.
pub fn base_name(image_name: &str) -> &str {
    Path::new(image_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(image_name)
}

/// Statistics for one shadow/no-shadow pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifferenceRecord {
    image: String,
    total_difference: u64,
    max_difference: u8,
    mean_difference: f64,
    has_significant_shadows: bool,
    shadow_areas_count: usize,
    shadow_threshold_used: u8,
    significance_threshold_used: u8,
    underflow_samples: u64,
    visualization_files: VisualizationFiles,
}

impl DifferenceRecord {
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn total_difference(&self) -> u64 {
        self.total_difference
    }

    pub fn max_difference(&self) -> u8 {
        self.max_difference
    }

    pub fn mean_difference(&self) -> f64 {
        self.mean_difference
    }

    pub fn has_significant_shadows(&self) -> bool {
        self.has_significant_shadows
    }

    pub fn shadow_areas_count(&self) -> usize {
        self.shadow_areas_count
    }

    pub fn mask_threshold(&self) -> u8 {
        self.shadow_threshold_used
    }

    pub fn significance_threshold(&self) -> u8 {
        self.significance_threshold_used
    }

    pub fn underflow_samples(&self) -> u64 {
        self.underflow_samples
    }

    pub fn visualization_files(&self) -> &VisualizationFiles {
        &self.visualization_files
    }
}

/// Everything produced for a pair.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub record: DifferenceRecord,
    pub difference: RgbImage,
    pub mask: ShadowMask,
    pub overlay: RgbImage,
}

/// Runs the difference, mask and contour steps for image pairs.
#[derive(Clone, Debug, Default)]
pub struct ShadowExtractor<B = RgbOps> {
    backend: B,
    config: ExtractionConfig,
}

impl<B: ImageOps> ShadowExtractor<B> {
    pub fn new(backend: B, config: ExtractionConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the shadows of `image_name` from its two renders.
    pub fn extract(
        &self,
        image_name: &str,
        shadow: &RgbImage,
        no_shadow: &RgbImage,
    ) -> Result<Extraction, ShadowError> {
        if shadow.dimensions() != no_shadow.dimensions() {
            return Err(ShadowError::SizeMismatch {
                shadow: shadow.dimensions(),
                no_shadow: no_shadow.dimensions(),
            });
        }

        let Difference {
            image: difference,
            underflow_samples,
        } = self.backend.subtract(no_shadow, shadow)?;
        if underflow_samples > 0 {
            warn!(
                "{image_name}: {underflow_samples} samples brighter with shadows, clamped to zero"
            );
        }

        let samples = difference.as_raw();
        let total_difference: u64 = samples.iter().map(|&v| u64::from(v)).sum();
        let max_difference = samples.iter().copied().max().unwrap_or(0);
        let mean_difference = match samples.len() {
            0 => 0.0,
            n => total_difference as f64 / n as f64,
        };
        let has_significant_shadows = max_difference > self.config.significance_threshold;

        let gray = self.backend.grayscale(&difference);
        let mask = self.backend.threshold(&gray, self.config.mask_threshold);
        let contours = self.backend.external_contours(&mask);
        let overlay = self.backend.draw_overlay(
            shadow,
            &mask,
            &contours,
            &OverlayStyle::from(&self.config),
        );

        debug!(
            "{image_name}: max {max_difference}, mean {mean_difference:.1}, {} regions",
            contours.len()
        );

        Ok(Extraction {
            record: DifferenceRecord {
                image: image_name.to_owned(),
                total_difference,
                max_difference,
                mean_difference,
                has_significant_shadows,
                shadow_areas_count: contours.len(),
                shadow_threshold_used: self.config.mask_threshold,
                significance_threshold_used: self.config.significance_threshold,
                underflow_samples,
                visualization_files: VisualizationFiles::for_image(image_name),
            },
            difference,
            mask,
            overlay,
        })
    }
}
