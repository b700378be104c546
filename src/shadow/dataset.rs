//! Batch extraction over two capture runs of the same pattern.
//!
//! Both runs use the [`crate::capture::DatasetDirectory`] layout. Images are paired by file name;
//! a name present in only one run is skipped. A pair that fails to decode or write is logged and
//! counted, and the batch moves on.

use super::{DifferenceRecord, ImageOps, RgbOps, ShadowError, ShadowExtractor, base_name};
use crate::config::ExtractionConfig;
use chrono::{DateTime, Utc};
use image::RgbImage;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    collections::HashSet,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

/// Recorded as the extraction method in every output record.
pub const METHOD: &str = "clamped per-channel difference (no_shadow - shadow)";

/// Looks up the per-view metadata recorded for a captured image.
pub trait MetadataReader {
    fn read(&self, image_name: &str) -> Option<Value>;
}

/// Reads `<dir>/<base>_metadata.json` for an image named `<base>.png`.
#[derive(Clone, Debug)]
pub struct MetadataDirectory {
    dir: PathBuf,
}

impl MetadataDirectory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl MetadataReader for MetadataDirectory {
    fn read(&self, image_name: &str) -> Option<Value> {
        let path = self.dir.join(metadata_file_name(image_name));
        let serialized = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&serialized) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("ignoring unreadable metadata {}: {e}", path.display());
                None
            }
        }
    }
}

fn metadata_file_name(image_name: &str) -> String {
    format!("{}_metadata.json", base_name(image_name))
}

/// Roots of the shadow and no-shadow capture runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceDatasets {
    pub shadow: PathBuf,
    pub no_shadow: PathBuf,
}

impl SourceDatasets {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(shadow: P, no_shadow: Q) -> Self {
        Self {
            shadow: shadow.as_ref().to_path_buf(),
            no_shadow: no_shadow.as_ref().to_path_buf(),
        }
    }

    pub fn shadow_images(&self) -> PathBuf {
        self.shadow.join("images")
    }

    pub fn no_shadow_images(&self) -> PathBuf {
        self.no_shadow.join("images")
    }

    /// Both `images/` directories must exist.
    pub fn check(&self) -> Result<(), ShadowError> {
        for dir in [self.shadow_images(), self.no_shadow_images()] {
            if !dir.is_dir() {
                return Err(ShadowError::MissingDirectory(dir));
            }
        }
        Ok(())
    }
}

/// Sorted names of the `.png` files directly inside `dir`.
pub fn list_png_names<P: AsRef<Path>>(dir: P) -> Result<Vec<String>, ShadowError> {
    let dir = dir.as_ref();
    let io_err = |source| ShadowError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if let Some(name) = entry.file_name().to_str()
            && name.ends_with(".png")
            && entry.path().is_file()
        {
            names.push(name.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Names present in both lists, in the order of `shadow`.
pub fn pair_images(shadow: &[String], no_shadow: &[String]) -> Vec<String> {
    let available: HashSet<&str> = no_shadow.iter().map(String::as_str).collect();
    shadow
        .iter()
        .filter(|name| available.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Totals over a whole batch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub total_frame_pairs: usize,
    pub successful_extractions: usize,
    pub failed_extractions: usize,
    pub frames_with_significant_shadows: usize,

    /// Fraction of all pairs with significant shadows, in `[0, 1]`. Zero when there are no pairs.
    pub shadow_detection_rate: f64,
}

impl ExtractionSummary {
    fn new(total_frame_pairs: usize, records: &[DifferenceRecord]) -> Self {
        let significant = records
            .iter()
            .filter(|r| r.has_significant_shadows())
            .count();
        let shadow_detection_rate = match total_frame_pairs {
            0 => 0.0,
            n => significant as f64 / n as f64,
        };

        Self {
            total_frame_pairs,
            successful_extractions: records.len(),
            failed_extractions: total_frame_pairs - records.len(),
            frames_with_significant_shadows: significant,
            shadow_detection_rate,
        }
    }
}

/// The outcome of a batch run.
#[derive(Clone, Debug)]
pub struct ExtractionReport {
    pub summary: ExtractionSummary,

    /// One record per successful pair, in pairing order.
    pub records: Vec<DifferenceRecord>,

    /// Names of the pairs that failed.
    pub failures: Vec<String>,
}

#[derive(Serialize)]
struct SourcePair<T> {
    shadow: T,
    no_shadow: T,
}

#[derive(Serialize)]
struct ShadowExtractionSection<'a> {
    method: &'static str,
    source_datasets: &'a SourceDatasets,
    source_images: SourcePair<PathBuf>,
    difference_statistics: &'a DifferenceRecord,
    extraction_timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct Statistics<'a> {
    total_pairs: usize,
    successful_extractions: usize,
    failed_extractions: usize,
    differences_detected: &'a [DifferenceRecord],
}

#[derive(Serialize)]
struct ExtractionInfo<'a> {
    source_datasets: &'a SourceDatasets,
    method: &'static str,
    extraction_timestamp: DateTime<Utc>,
    statistics: &'a Statistics<'a>,
    summary: &'a ExtractionSummary,
}

#[derive(Serialize)]
struct ExtractionInfoFile<'a> {
    extraction_info: ExtractionInfo<'a>,
}

/// Writes extraction artifacts below an output root.
///
/// ```text
/// <root>/images/<base>_shadow_viz.png
/// <root>/images/<base>_shadow_diff.png
/// <root>/metadata/<base>_metadata.json
/// <root>/shadow_statistics.json
/// <root>/extraction_info.json
/// ```
#[derive(Clone, Debug)]
pub struct OutputDirectory {
    root: PathBuf,
}

impl OutputDirectory {
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, ShadowError> {
        let output = Self {
            root: root.as_ref().to_path_buf(),
        };
        for dir in [output.images_dir(), output.metadata_dir()] {
            fs::create_dir_all(&dir).map_err(|source| ShadowError::Io { path: dir, source })?;
        }
        Ok(output)
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

    fn save_image(&self, name: &str, image: &RgbImage) -> Result<(), ShadowError> {
        let path = self.images_dir().join(name);
        image
            .save(&path)
            .map_err(|source| ShadowError::Encode { path, source })
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: PathBuf, value: &T) -> Result<(), ShadowError> {
        let file = File::create(&path).map_err(|source| ShadowError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer
            .flush()
            .map_err(|source| ShadowError::Io { path, source })
    }
}

fn open_rgb(path: &Path) -> Result<RgbImage, ShadowError> {
    image::open(path)
        .map(|image| image.into_rgb8())
        .map_err(|source| ShadowError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Runs a [`ShadowExtractor`] over every image pair of two capture runs.
pub struct DatasetExtraction<'a, B, R> {
    extractor: &'a ShadowExtractor<B>,
    sources: &'a SourceDatasets,
    reader: &'a R,
}

impl<'a, B, R> DatasetExtraction<'a, B, R>
where
    B: ImageOps + Sync,
    R: MetadataReader + Sync,
{
    pub fn new(extractor: &'a ShadowExtractor<B>, sources: &'a SourceDatasets, reader: &'a R) -> Self {
        Self {
            extractor,
            sources,
            reader,
        }
    }

    /// Process every pair, writing artifacts and both summary files below `output_root`.
    ///
    /// Fails only if the extraction config is invalid, a source `images/` directory is missing or
    /// unreadable, or the output root or a summary file cannot be written. Per-pair failures are counted instead.
    pub fn run<P: AsRef<Path>>(&self, output_root: P) -> Result<ExtractionReport, ShadowError> {
        self.extractor
            .config()
            .validate()
            .map_err(|e| ShadowError::InvalidConfig(e.to_string()))?;
        self.sources.check()?;

        let shadow_names = list_png_names(self.sources.shadow_images())?;
        let no_shadow_names = list_png_names(self.sources.no_shadow_images())?;
        info!("found {} shadow images", shadow_names.len());
        info!("found {} no-shadow images", no_shadow_names.len());

        let pairs = pair_images(&shadow_names, &no_shadow_names);
        info!("extracting shadows from {} image pairs", pairs.len());

        let output = OutputDirectory::create(output_root)?;

        let outcomes: Vec<(&String, Result<DifferenceRecord, ShadowError>)> = pairs
            .par_iter()
            .map(|name| (name, self.process_pair(name, &output)))
            .collect();

        let mut records = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    error!("error processing {name}: {e}");
                    failures.push(name.clone());
                }
            }
        }

        let summary = ExtractionSummary::new(pairs.len(), &records);
        self.write_summaries(&output, &summary, &records)?;

        info!(
            "{} of {} pairs extracted, {} with significant shadows",
            summary.successful_extractions,
            summary.total_frame_pairs,
            summary.frames_with_significant_shadows
        );

        Ok(ExtractionReport {
            summary,
            records,
            failures,
        })
    }

    fn process_pair(
        &self,
        name: &str,
        output: &OutputDirectory,
    ) -> Result<DifferenceRecord, ShadowError> {
        let shadow_path = self.sources.shadow_images().join(name);
        let no_shadow_path = self.sources.no_shadow_images().join(name);
        let shadow = open_rgb(&shadow_path)?;
        let no_shadow = open_rgb(&no_shadow_path)?;

        let extraction = self.extractor.extract(name, &shadow, &no_shadow)?;
        let files = extraction.record.visualization_files();
        output.save_image(&files.highlighted, &extraction.overlay)?;
        output.save_image(&files.difference, &extraction.difference)?;

        let mut metadata = match self.reader.read(name) {
            Some(Value::Object(map)) => map,
            Some(_) => {
                warn!("metadata for {name} is not a JSON object, starting from an empty record");
                Map::new()
            }
            None => Map::new(),
        };
        let section = ShadowExtractionSection {
            method: METHOD,
            source_datasets: self.sources,
            source_images: SourcePair {
                shadow: shadow_path,
                no_shadow: no_shadow_path,
            },
            difference_statistics: &extraction.record,
            extraction_timestamp: Utc::now(),
        };
        metadata.insert(
            String::from("shadow_extraction"),
            serde_json::to_value(section)?,
        );
        output.write_json(
            output.metadata_dir().join(metadata_file_name(name)),
            &metadata,
        )?;

        Ok(extraction.record)
    }

    fn write_summaries(
        &self,
        output: &OutputDirectory,
        summary: &ExtractionSummary,
        records: &[DifferenceRecord],
    ) -> Result<(), ShadowError> {
        let statistics = Statistics {
            total_pairs: summary.total_frame_pairs,
            successful_extractions: summary.successful_extractions,
            failed_extractions: summary.failed_extractions,
            differences_detected: records,
        };
        output.write_json(output.root().join("shadow_statistics.json"), &statistics)?;

        let info = ExtractionInfoFile {
            extraction_info: ExtractionInfo {
                source_datasets: self.sources,
                method: METHOD,
                extraction_timestamp: Utc::now(),
                statistics: &statistics,
                summary,
            },
        };
        output.write_json(output.root().join("extraction_info.json"), &info)
    }
}

/// Extract with the default [`RgbOps`] backend, merging metadata recorded by the shadow run.
pub fn extract_dataset<P: AsRef<Path>>(
    sources: &SourceDatasets,
    output_root: P,
    config: ExtractionConfig,
) -> Result<ExtractionReport, ShadowError> {
    let extractor = ShadowExtractor::new(RgbOps, config);
    let reader = MetadataDirectory::new(sources.shadow.join("metadata"));
    DatasetExtraction::new(&extractor, sources, &reader).run(output_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&["a.png", "b.png"], &["b.png", "c.png"], &["b.png"])]
    #[case(&["a.png", "b.png"], &["a.png", "b.png"], &["a.png", "b.png"])]
    #[case(&["a.png"], &[], &[])]
    #[case(&[], &["a.png"], &[])]
    fn pairs_by_exact_name(
        #[case] shadow: &[&str],
        #[case] no_shadow: &[&str],
        #[case] expected: &[&str],
    ) {
        assert_eq!(pair_images(&names(shadow), &names(no_shadow)), names(expected));
    }

    #[test]
    fn lists_only_png_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "notes.txt", "c.PNG"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("d.png")).unwrap();

        assert_eq!(list_png_names(dir.path()).unwrap(), names(&["a.png", "b.png"]));
    }

    #[test]
    fn missing_images_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("shadow/images")).unwrap();
        let sources = SourceDatasets::new(dir.path().join("shadow"), dir.path().join("clear"));

        match sources.check() {
            Err(ShadowError::MissingDirectory(path)) => {
                assert_eq!(path, dir.path().join("clear/images"))
            }
            other => panic!("expected a missing directory, got {other:?}"),
        }
    }

    #[test]
    fn detection_rate_is_a_fraction_of_all_pairs() {
        let summary = ExtractionSummary::new(0, &[]);
        assert_eq!(summary.shadow_detection_rate, 0.0);
        assert_eq!(summary.failed_extractions, 0);
    }

    #[test]
    fn metadata_directory_reads_by_base_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("view_004_metadata.json"),
            r#"{"view_index": 4}"#,
        )
        .unwrap();
        fs::write(dir.path().join("view_005_metadata.json"), "not json").unwrap();

        let reader = MetadataDirectory::new(dir.path());
        assert_eq!(reader.read("view_004.png").unwrap()["view_index"], 4);
        assert!(reader.read("view_005.png").is_none());
        assert!(reader.read("view_006.png").is_none());
    }
}
