//! Erase detected objects from camera frames.
//!
//! Each frame goes through a four-stage synthesis pipeline: qualifying
//! detections are selected, their padded boxes become a binary removal mask,
//! a fast-marching inpainter fills the masked hole, and when inpainting is
//! unavailable or fails a neighbor-patch fallback covers each region with a
//! same-size donor block instead. In annotation mode the pipeline draws box
//! outlines and captions instead of erasing.
//!
//! # Quick Start
//!
//! ```no_run
//! use object_eraser::{BBox, Detection, EraserConfig, EraserEngine};
//!
//! let engine = EraserEngine::new(EraserConfig::default());
//! let frame = image::open("frame.png").unwrap().to_rgb8();
//! let detections = vec![Detection {
//!     label: "bottle".to_string(),
//!     confidence: 0.9,
//!     bbox: BBox::new(20, 20, 40, 40),
//! }];
//! let synthesized = engine.process_frame(&frame, &detections);
//! synthesized.save("erased.png").unwrap();
//! ```
//!
//! # Live analysis
//!
//! [`FrameAnalyzer`] wraps the engine for streaming use: frames are submitted
//! without blocking, only the most recent frame is analyzed (a new submission
//! preempts waiting work), and stale detection results are discarded instead
//! of overwriting newer display state.
//!
//! `process_frame` is total: every per-frame failure is absorbed internally
//! and some valid frame of the input's dimensions always comes back. The only
//! fatal error is a detector that cannot be initialized, surfaced at
//! construction time.

#![deny(missing_docs)]

pub mod analyzer;
pub mod annotate;
pub mod detection;
mod engine;
pub mod error;
mod font;
pub mod inpaint;
pub mod mask;
pub mod patch;

pub use analyzer::{FrameAnalyzer, ObjectDetector};
pub use detection::{filter_label, filter_label_confident, BBox, Detection, Region};
pub use engine::{
    default_output_path, is_supported_image, save_image, EraserConfig, EraserEngine, Mode,
};
#[cfg(feature = "cli")]
pub use engine::ProcessResult;
pub use error::{Error, InpaintFailure, Result};
pub use inpaint::{Inpainter, TeleaInpainter};
pub use mask::Mask;
