//! Driving a pose sequence through a simulator and recording what it saw.
//!
//! The simulator sits behind [`PoseSink`] and persistence behind [`MetadataWriter`]. Neither is
//! implemented here beyond [`DatasetDirectory`], the on-disk layout later consumed by
//! [`crate::shadow::dataset`].

use crate::{
    config::CapturePlan,
    geo::{GeoPoint, GeoReference},
    pattern::{Pattern, PatternError, PatternSpec},
    pose::{EulerAngles, Pose, Position},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    error::Error as StdError,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use uom::si::{f64::Length, length::meter};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("pose sink failed at view {index}")]
    Sink {
        index: usize,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize metadata")]
    Serialize(#[from] serde_json::Error),
}

/// An image returned by the simulator after moving to a pose.
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedView {
    /// Encoded PNG bytes, stored without decoding.
    pub png: Vec<u8>,

    /// Position the simulator reports after the move. May contain NaN.
    pub position: Position,
}

/// Accepts a pose, moves the camera there and returns what it sees.
pub trait PoseSink {
    type Error: StdError + Send + Sync + 'static;

    fn apply(&mut self, pose: &Pose) -> Result<CapturedView, Self::Error>;
}

/// Persists dataset descriptors, captured images and per-view records.
pub trait MetadataWriter {
    fn write_dataset(&mut self, descriptor: &DatasetDescriptor) -> Result<(), CaptureError>;

    fn write_view(&mut self, view: &CapturedView, metadata: &ViewMetadata)
    -> Result<(), CaptureError>;

    /// Called once after the last view with every record written so far.
    fn finish(&mut self, views: &[ViewMetadata]) -> Result<(), CaptureError>;
}

/// Base file name for the view at `index`, e.g. `view_007`.
pub fn view_stem(index: usize) -> String {
    format!("view_{index:03}")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GpsRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PositionRecord {
    pub x_meters: f64,
    pub y_meters: f64,
    pub z_meters: f64,
    pub gps: GpsRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Coordinates {
    pub position: PositionRecord,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QuaternionRecord {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Orientation {
    pub quaternion: QuaternionRecord,
    pub euler_degrees: EulerAngles,
    pub euler_radians: EulerAngles,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CameraRecord {
    pub name: String,
    #[serde(flatten)]
    pub pattern: PatternSpec,
}

/// Everything recorded about a single captured view.
///
/// NaN values serialize as JSON `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewMetadata {
    pub timestamp: DateTime<Utc>,
    pub view_index: usize,
    pub coordinates: Coordinates,
    pub orientation: Orientation,
    pub camera: CameraRecord,
}

impl ViewMetadata {
    /// Build the record for a view.
    ///
    /// Coordinates come from the position the simulator `reported`; orientation comes from the
    /// commanded `pose`.
    pub fn new(
        view_index: usize,
        timestamp: DateTime<Utc>,
        pose: &Pose,
        reported: &Position,
        geo: &GeoReference,
        camera_name: &str,
        pattern: &PatternSpec,
    ) -> Self {
        let gps = geo.to_geodetic(
            Length::new::<meter>(reported.x()),
            Length::new::<meter>(reported.y()),
        );
        let q = pose.quaternion();
        let radians = pose.euler_angles();

        Self {
            timestamp,
            view_index,
            coordinates: Coordinates {
                position: PositionRecord {
                    x_meters: reported.x(),
                    y_meters: reported.y(),
                    z_meters: reported.z(),
                    gps: GpsRecord {
                        latitude: gps.latitude,
                        longitude: gps.longitude,
                        altitude: reported.altitude(),
                    },
                },
            },
            orientation: Orientation {
                quaternion: QuaternionRecord {
                    w: q.w,
                    x: q.i,
                    y: q.j,
                    z: q.k,
                },
                euler_degrees: radians.to_degrees(),
                euler_radians: radians,
            },
            camera: CameraRecord {
                name: camera_name.to_owned(),
                pattern: pattern.clone(),
            },
        }
    }
}

/// Describes a whole capture run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetDescriptor {
    pub dataset_name: String,
    pub creation_time: DateTime<Utc>,
    pub total_views: usize,
    pub pattern: PatternSpec,
    pub camera_name: String,
    pub world_origin_gps: GeoPoint,
    pub mode: String,
}

/// Capture every pose of `plan` through `sink`, recording each view with `writer`.
///
/// Stops at the first sink or writer failure. Returns the per-view records in capture order.
pub fn capture_dataset<S, W>(
    plan: &CapturePlan,
    sink: &mut S,
    writer: &mut W,
) -> Result<Vec<ViewMetadata>, CaptureError>
where
    S: PoseSink,
    W: MetadataWriter,
{
    let poses = plan.pattern.poses()?;
    info!(
        "capturing {} views with {} pattern",
        poses.len(),
        plan.pattern.kind()
    );

    writer.write_dataset(&DatasetDescriptor {
        dataset_name: plan.dataset_name.clone(),
        creation_time: Utc::now(),
        total_views: poses.len(),
        pattern: plan.pattern.clone(),
        camera_name: plan.camera_name.clone(),
        world_origin_gps: plan.geo.origin,
        mode: plan.mode.clone(),
    })?;

    let mut records = Vec::with_capacity(poses.len());
    for (index, pose) in poses.iter().enumerate() {
        let view = sink.apply(pose).map_err(|e| CaptureError::Sink {
            index,
            source: Box::new(e),
        })?;

        let metadata = ViewMetadata::new(
            index,
            Utc::now(),
            pose,
            &view.position,
            &plan.geo,
            &plan.camera_name,
            &plan.pattern,
        );
        writer.write_view(&view, &metadata)?;

        let position = &metadata.coordinates.position;
        if position.gps.latitude.is_nan() {
            warn!("{}: simulator reported an invalid position", view_stem(index));
        }
        info!(
            "{}: pos({:.3}, {:.3}, {:.3}) gps({:.6}, {:.6})",
            view_stem(index),
            position.x_meters,
            position.y_meters,
            position.z_meters,
            position.gps.latitude,
            position.gps.longitude,
        );

        records.push(metadata);
    }

    writer.finish(&records)?;
    Ok(records)
}

/// A capture run laid out on disk.
///
/// ```text
/// <root>/dataset_info.json
/// <root>/images/view_000.png
/// <root>/metadata/view_000_metadata.json
/// <root>/metadata/all_metadata.json
/// ```
#[derive(Clone, Debug)]
pub struct DatasetDirectory {
    root: PathBuf,
}

impl DatasetDirectory {
    /// Create `root` and its `images/` and `metadata/` subdirectories.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, CaptureError> {
        let dataset = Self {
            root: root.as_ref().to_path_buf(),
        };
        for dir in [dataset.images_dir(), dataset.metadata_dir()] {
            fs::create_dir_all(&dir).map_err(|source| CaptureError::Io { path: dir, source })?;
        }
        Ok(dataset)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    fn write_json<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<(), CaptureError> {
        debug!("writing {}", path.display());
        let file = File::create(&path).map_err(|source| CaptureError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer
            .flush()
            .map_err(|source| CaptureError::Io { path, source })
    }
}

impl MetadataWriter for DatasetDirectory {
    fn write_dataset(&mut self, descriptor: &DatasetDescriptor) -> Result<(), CaptureError> {
        self.write_json(self.root.join("dataset_info.json"), descriptor)
    }

    fn write_view(
        &mut self,
        view: &CapturedView,
        metadata: &ViewMetadata,
    ) -> Result<(), CaptureError> {
        let stem = view_stem(metadata.view_index);
        let image_path = self.images_dir().join(format!("{stem}.png"));
        fs::write(&image_path, &view.png).map_err(|source| CaptureError::Io {
            path: image_path,
            source,
        })?;

        self.write_json(
            self.metadata_dir().join(format!("{stem}_metadata.json")),
            metadata,
        )
    }

    fn finish(&mut self, views: &[ViewMetadata]) -> Result<(), CaptureError> {
        self.write_json(self.metadata_dir().join("all_metadata.json"), &views)
    }
}
