//! Detection model and removal-candidate filtering.
//!
//! Detections arrive from an external object detector as labeled, scored
//! bounding boxes. Two filters select removal/annotation candidates:
//!
//! 1. **Label filter**: case-insensitive substring match on the label. Used
//!    when building the removal mask.
//! 2. **Label + confidence filter**: label match AND `confidence > min`. Used
//!    by the patch fallback and the annotation path.
//!
//! The mask path deliberately ignores confidence while the fallback and
//! annotation paths require it; see DESIGN.md for the rationale.

/// Axis-aligned bounding box in frame pixel coordinates.
///
/// Coordinates come straight from the detector and are not trusted to be
/// inside the frame; consumers re-clamp (see [`BBox::padded_region`]).
/// Expected ordering: `left < right`, `top < bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

/// A padded bounding box, clamped to frame bounds.
///
/// Always lies fully inside the frame it was clamped against; may have zero
/// area if the source box was degenerate or entirely outside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
}

impl Region {
    /// True when the region covers no pixels.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl BBox {
    /// Construct a box from left/top/right/bottom edges.
    #[must_use]
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Expand the box by `margin` pixels on every side and clamp it to
    /// `[0, width) x [0, height)`.
    ///
    /// Degenerate or fully out-of-frame boxes yield a zero-area [`Region`].
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn padded_region(&self, width: u32, height: u32, margin: u32) -> Region {
        let margin = margin as i32;
        let x0 = (self.left - margin).clamp(0, width as i32);
        let y0 = (self.top - margin).clamp(0, height as i32);
        let x1 = (self.right + margin).clamp(0, width as i32);
        let y1 = (self.bottom + margin).clamp(0, height as i32);

        Region {
            x: x0 as u32,
            y: y0 as u32,
            w: (x1 - x0).max(0) as u32,
            h: (y1 - y0).max(0) as u32,
        }
    }
}

/// One recognized object instance produced by the detector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize, serde::Deserialize))]
pub struct Detection {
    /// Category label, e.g. `"bottle"`.
    pub label: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box in frame pixel coordinates.
    pub bbox: BBox,
}

impl Detection {
    /// Case-insensitive substring match against the label.
    #[must_use]
    pub fn matches_label(&self, substring: &str) -> bool {
        self.label
            .to_lowercase()
            .contains(&substring.to_lowercase())
    }
}

/// Select detections whose label contains `substring` (case-insensitive).
///
/// Order of the input is preserved. Confidence is intentionally ignored:
/// this is the removal-mask path's filter.
#[must_use]
pub fn filter_label<'a>(detections: &'a [Detection], substring: &str) -> Vec<&'a Detection> {
    detections
        .iter()
        .filter(|d| d.matches_label(substring))
        .collect()
}

/// Select detections with a matching label AND `confidence > min_confidence`
/// (strictly greater).
///
/// This stricter filter guards the patch fallback and the annotation path.
#[must_use]
pub fn filter_label_confident<'a>(
    detections: &'a [Detection],
    substring: &str,
    min_confidence: f32,
) -> Vec<&'a Detection> {
    detections
        .iter()
        .filter(|d| d.matches_label(substring) && d.confidence > min_confidence)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32, bbox: BBox) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox,
        }
    }

    #[test]
    fn label_match_is_case_insensitive_substring() {
        let d = det("Water Bottle", 0.9, BBox::new(0, 0, 10, 10));
        assert!(d.matches_label("bottle"));
        assert!(d.matches_label("BOTTLE"));
        assert!(d.matches_label("water"));
        assert!(!d.matches_label("cup"));
    }

    #[test]
    fn label_filter_ignores_confidence() {
        let dets = vec![
            det("bottle", 0.1, BBox::new(0, 0, 10, 10)),
            det("cup", 0.99, BBox::new(0, 0, 10, 10)),
            det("bottle", 0.95, BBox::new(20, 20, 30, 30)),
        ];
        let picked = filter_label(&dets, "bottle");
        assert_eq!(picked.len(), 2);
        assert!((picked[0].confidence - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn confident_filter_requires_strictly_greater_score() {
        let dets = vec![
            det("bottle", 0.5, BBox::new(0, 0, 10, 10)),
            det("bottle", 0.51, BBox::new(0, 0, 10, 10)),
            det("chair", 0.9, BBox::new(0, 0, 10, 10)),
        ];
        let picked = filter_label_confident(&dets, "bottle", 0.5);
        assert_eq!(picked.len(), 1);
        assert!((picked[0].confidence - 0.51).abs() < f32::EPSILON);
    }

    #[test]
    fn filters_preserve_input_order() {
        let dets = vec![
            det("bottle", 0.9, BBox::new(0, 0, 1, 1)),
            det("bottle", 0.8, BBox::new(1, 1, 2, 2)),
            det("bottle", 0.7, BBox::new(2, 2, 3, 3)),
        ];
        let picked = filter_label_confident(&dets, "bottle", 0.5);
        let scores: Vec<f32> = picked.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn padded_region_expands_and_clamps() {
        let b = BBox::new(20, 20, 40, 40);
        let r = b.padded_region(100, 100, 10);
        assert_eq!(
            r,
            Region {
                x: 10,
                y: 10,
                w: 40,
                h: 40
            }
        );
    }

    #[test]
    fn padded_region_clamps_at_frame_edges() {
        let b = BBox::new(-5, 0, 30, 95);
        let r = b.padded_region(100, 100, 10);
        assert_eq!(r.x, 0);
        assert_eq!(r.y, 0);
        assert_eq!(r.w, 40);
        assert_eq!(r.h, 100);
    }

    #[test]
    fn padded_region_outside_frame_is_degenerate() {
        let b = BBox::new(200, 200, 250, 250);
        let r = b.padded_region(100, 100, 10);
        assert!(r.is_degenerate());
    }
}
