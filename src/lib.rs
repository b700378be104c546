// #![warn(missing_docs)]

//! Viewpoint Trajectories and Shadow Extraction
//!
//! Generates reproducible camera trajectories for aerial capture, records what a simulator saw
//! along them, and isolates shadows by differencing two runs over the same trajectory.

#[allow(missing_docs)]
pub mod error;

pub mod capture;
pub mod config;
pub mod geo;
pub mod pattern;
pub mod pose;
pub mod shadow;

pub use error::Error;

pub mod prelude {
    pub use crate::capture::{
        CaptureError, CapturedView, DatasetDirectory, MetadataWriter, PoseSink, capture_dataset,
    };
    pub use crate::config::{CapturePlan, ExtractionConfig};
    pub use crate::geo::{GeoPoint, GeoReference, meters_to_gps};
    pub use crate::pattern::{Facing, Pattern, PatternError, PatternKind, PatternSpec};
    pub use crate::pose::{Pose, PoseSequence, Position};
    pub use crate::shadow::{
        DifferenceRecord, ImageOps, RgbOps, ShadowError, ShadowExtractor,
        dataset::{ExtractionSummary, MetadataReader, SourceDatasets, extract_dataset},
    };
}
