//! Binary removal mask construction from detection boxes.
//!
//! The mask marks which frame pixels belong to an object slated for removal.
//! Each qualifying detection contributes its padded, clamped region; regions
//! simply union, so overlapping detections are idempotent.

use image::GrayImage;

use crate::detection::Detection;

/// Foreground (to-be-removed) mask value.
pub const FOREGROUND: u8 = 255;
/// Background (keep) mask value.
pub const BACKGROUND: u8 = 0;

/// Single-channel binary mask with the same dimensions as its frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    raster: GrayImage,
}

impl Mask {
    /// An all-background mask of the given dimensions.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            raster: GrayImage::new(width, height),
        }
    }

    /// Build a mask by painting the padded, clamped region of every
    /// detection as foreground.
    ///
    /// An empty detection slice yields a valid all-background mask; the
    /// inpainting engine treats that as a precondition failure, not this
    /// builder. Output is deterministic for a given input sequence.
    #[must_use]
    pub fn from_detections(
        width: u32,
        height: u32,
        detections: &[&Detection],
        margin: u32,
    ) -> Self {
        let mut mask = Self::empty(width, height);
        for det in detections {
            let region = det.bbox.padded_region(width, height, margin);
            if region.is_degenerate() {
                continue;
            }
            for y in region.y..region.y + region.h {
                for x in region.x..region.x + region.w {
                    mask.raster.put_pixel(x, y, image::Luma([FOREGROUND]));
                }
            }
        }
        mask
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// True when the pixel at `(x, y)` is marked for removal.
    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.raster.get_pixel(x, y)[0] != BACKGROUND
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.raster.pixels().filter(|p| p[0] != BACKGROUND).count()
    }

    /// True when no pixel is marked for removal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raster.pixels().all(|p| p[0] == BACKGROUND)
    }

    /// Access the underlying single-channel raster.
    #[must_use]
    pub fn raster(&self) -> &GrayImage {
        &self.raster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BBox;

    fn det(bbox: BBox) -> Detection {
        Detection {
            label: "bottle".to_string(),
            confidence: 0.9,
            bbox,
        }
    }

    #[test]
    fn empty_detections_yield_all_background() {
        let mask = Mask::from_detections(64, 48, &[], 10);
        assert!(mask.is_empty());
        assert_eq!(mask.foreground_count(), 0);
        assert_eq!((mask.width(), mask.height()), (64, 48));
    }

    #[test]
    fn padded_region_is_exactly_foreground() {
        let d = det(BBox::new(20, 20, 40, 40));
        let mask = Mask::from_detections(100, 100, &[&d], 10);

        for y in 0..100 {
            for x in 0..100 {
                let inside = (10..50).contains(&x) && (10..50).contains(&y);
                assert_eq!(
                    mask.is_foreground(x, y),
                    inside,
                    "pixel ({x},{y}) foreground mismatch"
                );
            }
        }
        assert_eq!(mask.foreground_count(), 40 * 40);
    }

    #[test]
    fn overlapping_regions_union() {
        let a = det(BBox::new(10, 10, 30, 30));
        let b = det(BBox::new(20, 20, 40, 40));
        let merged = Mask::from_detections(100, 100, &[&a, &b], 0);
        let single_a = Mask::from_detections(100, 100, &[&a], 0);

        // Union covers both boxes; repainting the overlap changes nothing.
        assert!(merged.foreground_count() > single_a.foreground_count());
        let twice = Mask::from_detections(100, 100, &[&a, &b, &a], 0);
        assert_eq!(twice, merged);
    }

    #[test]
    fn region_clamped_to_frame_bounds() {
        let d = det(BBox::new(-20, -20, 5, 5));
        let mask = Mask::from_detections(50, 50, &[&d], 10);
        assert!(mask.is_foreground(0, 0));
        assert!(mask.is_foreground(14, 14));
        assert!(!mask.is_foreground(15, 15));
    }

    #[test]
    fn fully_out_of_frame_box_paints_nothing() {
        let d = det(BBox::new(200, 200, 300, 300));
        let mask = Mask::from_detections(100, 100, &[&d], 10);
        assert!(mask.is_empty());
    }
}
