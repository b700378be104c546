//! Serializable run configuration.
//!
//! Every tunable constant lives in one of these structs so a run can be described by a single
//! JSON file. Missing fields take their defaults.

use crate::{
    error::Error,
    geo::GeoReference,
    pattern::{PatternKind, PatternSpec},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Thresholds and styling used when differencing shadow and no-shadow captures.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// A pair is significant when its largest channel difference exceeds this.
    pub significance_threshold: u8,

    /// Grayscale difference a pixel must exceed to belong to the shadow mask.
    pub mask_threshold: u8,

    /// Opacity of the mask tint painted over the shadow image.
    pub overlay_alpha: f64,

    /// Width in pixels of the drawn contour outlines.
    pub contour_thickness: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 10,
            mask_threshold: 15,
            overlay_alpha: 0.4,
            contour_thickness: 2,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.overlay_alpha) {
            return Err(Error::InvalidConfig(format!(
                "overlay_alpha must lie in [0, 1], got {}",
                self.overlay_alpha
            )));
        }
        Ok(())
    }
}

/// Everything needed to fly one capture run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturePlan {
    pub dataset_name: String,
    pub camera_name: String,

    /// Free-form label recorded in the dataset descriptor, e.g. `shadow` or `no_shadow`.
    pub mode: String,

    pub geo: GeoReference,
    pub pattern: PatternSpec,
}

impl Default for CapturePlan {
    fn default() -> Self {
        Self {
            dataset_name: String::from("viewpoint_dataset"),
            camera_name: String::from("front_center"),
            mode: String::from("shadow"),
            geo: GeoReference::default(),
            pattern: PatternSpec::example(PatternKind::Orbit),
        }
    }
}

/// Read a JSON configuration file.
pub fn load<T, P>(path: P) -> Result<T, Error>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let serialized = fs::read_to_string(path)
        .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&serialized)
        .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Pattern, SquarePattern};
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config: ExtractionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ExtractionConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn thresholds_are_independent() {
        let config: ExtractionConfig =
            serde_json::from_str(r#"{"mask_threshold": 40}"#).unwrap();
        assert_eq!(config.mask_threshold, 40);
        assert_eq!(config.significance_threshold, 10);
    }

    #[test]
    fn rejects_out_of_range_alpha() {
        let config = ExtractionConfig {
            overlay_alpha: 1.5,
            ..ExtractionConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn loads_capture_plan_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"camera_name": "bottom", "pattern": {{"pattern_type": "square", "points_per_side": 2}}}}"#
        )
        .unwrap();

        let plan: CapturePlan = load(file.path()).unwrap();
        assert_eq!(plan.camera_name, "bottom");
        assert_eq!(plan.dataset_name, "viewpoint_dataset");
        assert_eq!(
            plan.pattern,
            PatternSpec::Square(SquarePattern {
                points_per_side: 2,
                ..SquarePattern::default()
            })
        );
        assert_eq!(plan.pattern.poses().unwrap().len(), 7);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = load::<CapturePlan, _>("/nonexistent/plan.json");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
