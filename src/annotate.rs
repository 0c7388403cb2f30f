//! Annotation rendering: box outlines and labels for detected objects.
//!
//! The non-removal display mode. Each detection passing the strict filter
//! (label match AND confidence above threshold) gets a hollow rectangle at
//! its raw box coordinates and a `"<label> (<score>%)"` caption 10 px above
//! the box's top-left corner.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detection::{filter_label_confident, Detection};
use crate::font::{glyph, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Outline and caption color.
const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 64]);
/// Vertical offset of the caption above the box's top edge.
const LABEL_OFFSET: i32 = 10;

/// Render a caption with the embedded 5x7 font; pixels falling outside the
/// frame are clipped.
fn draw_label(frame: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let mut pen_x = x;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (dy, row) in rows.iter().enumerate() {
                for dx in 0..GLYPH_WIDTH {
                    if (row >> (GLYPH_WIDTH - 1 - dx)) & 1 == 0 {
                        continue;
                    }
                    #[allow(clippy::cast_possible_wrap)]
                    let (px, py) = (pen_x + dx as i32, y + dy as i32);
                    if px >= 0
                        && py >= 0
                        && (px as u32) < frame.width()
                        && (py as u32) < frame.height()
                    {
                        #[allow(clippy::cast_sign_loss)]
                        frame.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
        pen_x += GLYPH_ADVANCE as i32;
    }
}

/// Caption text for one detection: `"<label> (<score*100 rounded>%)"`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn caption(detection: &Detection) -> String {
    format!(
        "{} ({}%)",
        detection.label,
        (detection.confidence * 100.0).round() as i32
    )
}

/// Draw boxes and captions for every qualifying detection, returning an
/// annotated copy of the frame.
#[must_use]
pub fn draw_annotations(
    frame: &RgbImage,
    detections: &[Detection],
    label: &str,
    min_confidence: f32,
) -> RgbImage {
    let mut out = frame.clone();

    for det in filter_label_confident(detections, label, min_confidence) {
        let w = det.bbox.right.saturating_sub(det.bbox.left);
        let h = det.bbox.bottom.saturating_sub(det.bbox.top);
        if w <= 0 || h <= 0 {
            continue;
        }
        #[allow(clippy::cast_sign_loss)]
        let rect = Rect::at(det.bbox.left, det.bbox.top).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(&mut out, rect, ANNOTATION_COLOR);

        // Keep the caption on-frame when the box hugs the top edge.
        #[allow(clippy::cast_possible_wrap)]
        let text_y = (det.bbox.top - LABEL_OFFSET).max(0).min(
            frame.height().saturating_sub(GLYPH_HEIGHT) as i32,
        );
        draw_label(&mut out, det.bbox.left.max(0), text_y, &caption(det), ANNOTATION_COLOR);
    }

    out
}
