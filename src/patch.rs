//! Neighbor-patch fallback for object removal.
//!
//! When inpainting is unavailable (empty mask) or fails, each removal region
//! is covered by a same-size donor patch copied from an adjacent area of the
//! frame. Donor candidates are probed in fixed priority order — right, left,
//! top, bottom — each offset from the region by its own width or height; the
//! first candidate that fits entirely inside the frame wins. A region with no
//! fitting donor (e.g. touching several frame edges) is left unmodified.

use image::RgbImage;
use log::debug;

use crate::detection::{filter_label_confident, Detection, Region};

/// Find the donor rectangle for `region` inside a `width` x `height` frame.
///
/// Probes right, left, top, bottom in that order and returns the origin of
/// the first candidate whose intersection with the frame keeps exactly the
/// region's width and height, i.e. the candidate lies fully inside.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn find_donor(region: &Region, width: u32, height: u32) -> Option<(u32, u32)> {
    let Region { x, y, w, h } = *region;
    if region.is_degenerate() {
        return None;
    }

    let candidates = [
        (i64::from(x) + i64::from(w), i64::from(y)), // right
        (i64::from(x) - i64::from(w), i64::from(y)), // left
        (i64::from(x), i64::from(y) - i64::from(h)), // top
        (i64::from(x), i64::from(y) + i64::from(h)), // bottom
    ];

    candidates.into_iter().find_map(|(cx, cy)| {
        let fits = cx >= 0
            && cy >= 0
            && cx + i64::from(w) <= i64::from(width)
            && cy + i64::from(h) <= i64::from(height);
        fits.then(|| (cx as u32, cy as u32))
    })
}

/// Copy the `w` x `h` block at `(src_x, src_y)` onto `(dst_x, dst_y)`.
///
/// Caller guarantees both rectangles lie inside the frame.
fn copy_block(frame: &mut RgbImage, src: (u32, u32), dst: (u32, u32), w: u32, h: u32) {
    for dy in 0..h {
        for dx in 0..w {
            let px = *frame.get_pixel(src.0 + dx, src.1 + dy);
            frame.put_pixel(dst.0 + dx, dst.1 + dy, px);
        }
    }
}

/// Replace each qualifying detection's padded region with a donor patch.
///
/// Applies the strict filter itself (label match AND confidence strictly
/// above `min_confidence`) — it never reuses the label-only set the mask
/// path was built from. Regions without a fitting donor are skipped; the
/// returned frame always has the input's dimensions.
#[must_use]
pub fn synthesize_patches(
    frame: &RgbImage,
    detections: &[Detection],
    label: &str,
    min_confidence: f32,
    margin: u32,
) -> RgbImage {
    let mut out = frame.clone();
    let (width, height) = (frame.width(), frame.height());

    for det in filter_label_confident(detections, label, min_confidence) {
        let region = det.bbox.padded_region(width, height, margin);
        if region.is_degenerate() {
            continue;
        }
        match find_donor(&region, width, height) {
            Some(src) => {
                copy_block(&mut out, src, (region.x, region.y), region.w, region.h);
            }
            None => {
                debug!(
                    "no donor patch for {}x{} region at ({},{}), leaving unmodified",
                    region.w, region.h, region.x, region.y
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BBox;
    use image::Rgb;

    fn det(label: &str, confidence: f32, bbox: BBox) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox,
        }
    }

    /// Frame whose pixel at (x, y) encodes its own coordinates, so copies
    /// are easy to assert on.
    fn coordinate_frame(w: u32, h: u32) -> RgbImage {
        let mut img = RgbImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                #[allow(clippy::cast_possible_truncation)]
                img.put_pixel(x, y, Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
            }
        }
        img
    }

    #[test]
    fn donor_priority_prefers_right_over_left() {
        // Both right and left donors fit; right must win.
        let region = Region {
            x: 40,
            y: 40,
            w: 20,
            h: 20,
        };
        assert_eq!(find_donor(&region, 100, 100), Some((60, 40)));
    }

    #[test]
    fn donor_falls_back_left_then_top_then_bottom() {
        // Right donor would end at x=120 > 100: left wins.
        let at_right_edge = Region {
            x: 60,
            y: 40,
            w: 40,
            h: 20,
        };
        assert_eq!(find_donor(&at_right_edge, 100, 100), Some((20, 40)));

        // Full-width region: neither horizontal donor fits, top wins.
        let full_width = Region {
            x: 0,
            y: 50,
            w: 100,
            h: 25,
        };
        assert_eq!(find_donor(&full_width, 100, 100), Some((0, 25)));

        // Full-width region at the top: only bottom fits.
        let top_strip = Region {
            x: 0,
            y: 0,
            w: 100,
            h: 30,
        };
        assert_eq!(find_donor(&top_strip, 100, 100), Some((0, 30)));
    }

    #[test]
    fn no_donor_when_region_covers_frame() {
        let whole = Region {
            x: 0,
            y: 0,
            w: 100,
            h: 100,
        };
        assert_eq!(find_donor(&whole, 100, 100), None);
    }

    #[test]
    fn patches_copy_right_donor_pixels() {
        let frame = coordinate_frame(100, 100);
        let dets = vec![det("bottle", 0.9, BBox::new(20, 20, 40, 40))];
        let out = synthesize_patches(&frame, &dets, "bottle", 0.5, 10);

        // Padded region is (10,10)-(50,50); donor starts at (50,10).
        for dy in 0..40 {
            for dx in 0..40 {
                assert_eq!(
                    out.get_pixel(10 + dx, 10 + dy),
                    frame.get_pixel(50 + dx, 10 + dy),
                    "patched pixel ({},{}) should come from the right donor",
                    10 + dx,
                    10 + dy
                );
            }
        }
        // Outside the region nothing changed.
        assert_eq!(out.get_pixel(5, 5), frame.get_pixel(5, 5));
        assert_eq!(out.get_pixel(60, 60), frame.get_pixel(60, 60));
    }

    #[test]
    fn region_without_donor_is_left_unmodified() {
        let frame = coordinate_frame(100, 100);
        let dets = vec![det("bottle", 0.9, BBox::new(0, 0, 100, 100))];
        let out = synthesize_patches(&frame, &dets, "bottle", 0.5, 10);
        assert_eq!(out, frame);
    }

    #[test]
    fn low_confidence_detections_are_not_patched() {
        let frame = coordinate_frame(100, 100);
        let dets = vec![det("bottle", 0.5, BBox::new(20, 20, 40, 40))];
        // 0.5 is not strictly greater than the 0.5 threshold.
        let out = synthesize_patches(&frame, &dets, "bottle", 0.5, 10);
        assert_eq!(out, frame);
    }

    #[test]
    fn output_dimensions_always_match_input() {
        let frame = coordinate_frame(64, 48);
        let dets = vec![
            det("bottle", 0.9, BBox::new(-10, -10, 200, 200)),
            det("bottle", 0.8, BBox::new(5, 5, 15, 15)),
        ];
        let out = synthesize_patches(&frame, &dets, "bottle", 0.5, 10);
        assert_eq!((out.width(), out.height()), (64, 48));
    }
}
