//! Core object-erasure engine.

use std::path::Path;

use image::RgbImage;
use log::{debug, warn};

use crate::annotate;
use crate::detection::{filter_label, Detection};
use crate::error::InpaintFailure;
use crate::inpaint::{Inpainter, TeleaInpainter};
use crate::mask::Mask;
use crate::patch;

#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Display mode of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Draw box outlines and captions over detected objects.
    Annotate,
    /// Erase detected objects from the frame.
    Remove,
}

/// Policy values of the synthesis pipeline.
///
/// The reference margins and thresholds are defaults, not structural
/// constants; every knob is configurable.
#[derive(Debug, Clone)]
pub struct EraserConfig {
    /// Case-insensitive substring a detection label must contain.
    pub target_label: String,
    /// Confidence a detection must strictly exceed on the fallback and
    /// annotation paths. The mask path does not consult it.
    pub confidence_threshold: f32,
    /// Padding applied to each detection box before masking/patching.
    pub mask_margin: u32,
    /// Search radius of the inpainting algorithm, in pixel units.
    pub inpaint_radius: f32,
}

impl Default for EraserConfig {
    fn default() -> Self {
        Self {
            target_label: "bottle".to_string(),
            confidence_threshold: 0.5,
            mask_margin: 10,
            inpaint_radius: 10.0,
        }
    }
}

/// The frame synthesis engine.
///
/// Holds the policy configuration, the pluggable inpainting primitive, and
/// the current display mode. [`EraserEngine::process_frame`] is total: it
/// always yields a frame of the input's dimensions, absorbing every
/// per-frame failure internally.
pub struct EraserEngine {
    config: EraserConfig,
    inpainter: Box<dyn Inpainter + Send + Sync>,
    mode: Mode,
}

impl EraserEngine {
    /// Engine with the default fast-marching inpainter, starting in removal
    /// mode.
    #[must_use]
    pub fn new(config: EraserConfig) -> Self {
        Self::with_inpainter(config, Box::new(TeleaInpainter))
    }

    /// Engine with a caller-supplied inpainting primitive. Tests use this to
    /// force the fallback path.
    #[must_use]
    pub fn with_inpainter(config: EraserConfig, inpainter: Box<dyn Inpainter + Send + Sync>) -> Self {
        Self {
            config,
            inpainter,
            mode: Mode::Remove,
        }
    }

    /// The active policy configuration.
    #[must_use]
    pub fn config(&self) -> &EraserConfig {
        &self.config
    }

    /// The current display mode.
    #[must_use]
    pub fn current_mode(&self) -> Mode {
        self.mode
    }

    /// Flip between removal and annotation.
    pub fn toggle_removal(&mut self) {
        self.mode = match self.mode {
            Mode::Annotate => Mode::Remove,
            Mode::Remove => Mode::Annotate,
        };
    }

    /// Process one frame under the current mode. Never fails: every
    /// per-frame error routes to the patch fallback or a pass-through.
    #[must_use]
    pub fn process_frame(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        match self.mode {
            Mode::Annotate => annotate::draw_annotations(
                frame,
                detections,
                &self.config.target_label,
                self.config.confidence_threshold,
            ),
            Mode::Remove => self.synthesize(frame, detections),
        }
    }

    /// The removal path: label-filter, mask, inpaint, fall back to patches.
    ///
    /// Mask construction uses the label-only filter; the fallback re-filters
    /// with the stricter label + confidence criteria itself rather than
    /// reusing the mask path's candidate set.
    #[must_use]
    pub fn synthesize(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let candidates = filter_label(detections, &self.config.target_label);
        let mask = Mask::from_detections(
            frame.width(),
            frame.height(),
            &candidates,
            self.config.mask_margin,
        );

        match self
            .inpainter
            .inpaint(frame, &mask, self.config.inpaint_radius)
        {
            Ok(out) => out,
            Err(InpaintFailure::MaskEmpty) => {
                debug!(
                    "empty removal mask ({} detections), using patch fallback",
                    detections.len()
                );
                self.fallback(frame, detections)
            }
            Err(InpaintFailure::Execution(reason)) => {
                warn!(
                    "inpaint failed on {}x{} frame with {} detections: {reason}",
                    frame.width(),
                    frame.height(),
                    detections.len()
                );
                self.fallback(frame, detections)
            }
        }
    }

    fn fallback(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        patch::synthesize_patches(
            frame,
            detections,
            &self.config.target_label,
            self.config.confidence_threshold,
            self.config.mask_margin,
        )
    }
}

/// Result of processing a single frame file.
#[cfg(feature = "cli")]
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (no detection sidecar found).
    pub skipped: bool,
    /// Human-readable status message.
    pub message: String,
}

#[cfg(feature = "cli")]
impl EraserEngine {
    /// Load detections from a JSON sidecar: an array of
    /// `{label, confidence, bbox: {left, top, right, bottom}}`.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Io`] when the file cannot be read,
    /// [`crate::Error::InvalidDetections`] when it does not parse.
    pub fn load_detections(path: &Path) -> crate::Result<Vec<Detection>> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| crate::Error::InvalidDetections(format!("{}: {e}", path.display())))
    }

    /// Sidecar path convention: `frame_0042.png` pairs with
    /// `frame_0042.json`.
    #[must_use]
    pub fn sidecar_path(input: &Path) -> PathBuf {
        input.with_extension("json")
    }

    /// Process a single frame file: load frame and sidecar, synthesize,
    /// save. A missing sidecar skips the file.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        detections_path: Option<&Path>,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            skipped: false,
            message: String::new(),
        };

        let dyn_img = match image::open(input) {
            Ok(img) => img,
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };
        let frame = dyn_img.to_rgb8();

        let sidecar = detections_path.map_or_else(|| Self::sidecar_path(input), Path::to_path_buf);
        if !sidecar.exists() {
            result.skipped = true;
            result.success = true;
            result.message = format!("No detection sidecar at {}", sidecar.display());
            return result;
        }
        let detections = match Self::load_detections(&sidecar) {
            Ok(d) => d,
            Err(e) => {
                result.message = e.to_string();
                return result;
            }
        };

        let synthesized = self.process_frame(&frame, &detections);

        if let Some(parent) = output.parent() {
            if !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&synthesized, output) {
            Ok(()) => {
                result.success = true;
                result.message = match self.mode {
                    Mode::Remove => format!("Erased ({} detections)", detections.len()),
                    Mode::Annotate => format!("Annotated ({} detections)", detections.len()),
                };
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported frames in a directory in parallel, pairing each
    /// with its `<stem>.json` sidecar.
    ///
    /// # Panics
    ///
    /// Panics if any directory entry has no filename (should not happen for
    /// regular files).
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
        use rayon::prelude::*;

        let entries: Vec<_> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .filter(|e| is_supported_image(e.path().as_path()))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult {
                    path: output_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to create output directory: {e}"),
                }];
            }
        }

        entries
            .par_iter()
            .map(|entry| {
                let input_path = entry.path();
                let filename = input_path.file_name().unwrap();
                let output_path = output_dir.join(filename);
                self.process_file(&input_path, &output_path, None)
            })
            .collect()
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGB frame with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> crate::Result<()> {
    use crate::Error;
    use image::{DynamicImage, ImageFormat};

    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    let dyn_img = DynamicImage::ImageRgb8(img.clone());

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&dyn_img)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            dyn_img.save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"frame.jpg"` becomes `"frame_erased.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> std::path::PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_erased.{ext}"))
}
