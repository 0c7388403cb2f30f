//! Fast-marching inpainting of masked frame regions.
//!
//! Implements Telea-style hole filling: the mask boundary is marched inward
//! in distance order, and each hole pixel is estimated as a weighted average
//! of already-known pixels within a search radius. Weights combine direction
//! (alignment with the marching front's normal), geometric distance, and
//! level-set proximity, which propagates image structure (isophotes) into
//! the hole instead of flat-averaging it.
//!
//! The engine checks its precondition explicitly: an all-background mask is a
//! [`InpaintFailure::MaskEmpty`] and the algorithm never runs. Any internal
//! inconsistency surfaces as [`InpaintFailure::Execution`]; callers route
//! both to the patch fallback.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use image::RgbImage;

use crate::error::InpaintFailure;
use crate::mask::Mask;

/// Sentinel distance for pixels whose fill order is not yet determined.
const T_FAR: f32 = 1.0e6;

/// Pixel classification during the march.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Value is trusted: either original or already filled.
    Known,
    /// On the narrow band, queued for filling.
    Band,
    /// Inside the hole, not yet reached.
    Inside,
}

/// Narrow-band entry ordered by arrival time `t` (smallest first via
/// `Reverse` in the heap). Stale entries are skipped on pop.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BandPixel {
    t: f32,
    x: u32,
    y: u32,
}

impl Eq for BandPixel {}

impl Ord for BandPixel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.t
            .total_cmp(&other.t)
            .then_with(|| (self.y, self.x).cmp(&(other.y, other.x)))
    }
}

impl PartialOrd for BandPixel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Diffusion-based hole filling over a binary mask.
///
/// Implementations must treat the mask foreground as the exact hole, operate
/// on all three color channels, and preserve the input dimensions. They are
/// swapped for failing stubs in tests of the fallback routing.
pub trait Inpainter {
    /// Fill every mask-foreground pixel of `frame`, searching known pixels
    /// within `radius` pixel units.
    ///
    /// # Errors
    ///
    /// [`InpaintFailure::MaskEmpty`] when the mask has no foreground;
    /// [`InpaintFailure::Execution`] on algorithm failure.
    fn inpaint(&self, frame: &RgbImage, mask: &Mask, radius: f32) -> Result<RgbImage, InpaintFailure>;
}

/// Default [`Inpainter`]: fast marching method after Telea (2004).
#[derive(Debug, Clone, Copy, Default)]
pub struct TeleaInpainter;

impl Inpainter for TeleaInpainter {
    fn inpaint(&self, frame: &RgbImage, mask: &Mask, radius: f32) -> Result<RgbImage, InpaintFailure> {
        if mask.is_empty() {
            return Err(InpaintFailure::MaskEmpty);
        }
        if frame.width() != mask.width() || frame.height() != mask.height() {
            return Err(InpaintFailure::Execution(format!(
                "mask {}x{} does not match frame {}x{}",
                mask.width(),
                mask.height(),
                frame.width(),
                frame.height()
            )));
        }

        let mut march = March::new(frame, mask);
        march.run(radius.max(1.0))?;
        Ok(march.into_image())
    }
}

/// Working state of one fast-marching pass.
struct March {
    width: u32,
    height: u32,
    image: RgbImage,
    state: Vec<State>,
    t: Vec<f32>,
    band: BinaryHeap<Reverse<BandPixel>>,
}

impl March {
    fn new(frame: &RgbImage, mask: &Mask) -> Self {
        let width = frame.width();
        let height = frame.height();
        let len = (width as usize) * (height as usize);

        let mut state = vec![State::Known; len];
        let mut t = vec![0.0_f32; len];
        for y in 0..height {
            for x in 0..width {
                if mask.is_foreground(x, y) {
                    let i = Self::index_of(width, x, y);
                    state[i] = State::Inside;
                    t[i] = T_FAR;
                }
            }
        }

        let mut march = Self {
            width,
            height,
            image: frame.clone(),
            state,
            t,
            band: BinaryHeap::new(),
        };

        // Seed the narrow band with hole pixels touching known territory.
        for y in 0..height {
            for x in 0..width {
                let i = march.index(x, y);
                if march.state[i] == State::Inside && march.has_known_neighbor(x, y) {
                    let arrival = march.solve_arrival(x, y);
                    march.state[i] = State::Band;
                    march.t[i] = arrival;
                    march.band.push(Reverse(BandPixel { t: arrival, x, y }));
                }
            }
        }

        march
    }

    fn index_of(width: u32, x: u32, y: u32) -> usize {
        (y as usize) * (width as usize) + (x as usize)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        Self::index_of(self.width, x, y)
    }

    /// 4-connected in-bounds neighbors.
    #[allow(clippy::cast_sign_loss)]
    fn neighbors(&self, x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> {
        let (w, h) = (self.width, self.height);
        [(0_i64, -1_i64), (-1, 0), (1, 0), (0, 1)]
            .into_iter()
            .filter_map(move |(dx, dy)| {
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                (nx >= 0 && ny >= 0 && nx < i64::from(w) && ny < i64::from(h))
                    .then(|| (nx as u32, ny as u32))
            })
    }

    fn has_known_neighbor(&self, x: u32, y: u32) -> bool {
        self.neighbors(x, y)
            .any(|(nx, ny)| self.state[self.index(nx, ny)] == State::Known)
    }

    /// Arrival time of a neighbor used in the eikonal update; `T_FAR` when
    /// the neighbor is out of bounds or still inside the hole.
    fn arrival_at(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return T_FAR;
        }
        #[allow(clippy::cast_sign_loss)]
        let i = Self::index_of(self.width, x as u32, y as u32);
        if self.state[i] == State::Inside {
            T_FAR
        } else {
            self.t[i]
        }
    }

    /// Solve `|grad T| = 1` at `(x, y)` from the best horizontal/vertical
    /// neighbor pair (first-order upwind discretization).
    fn solve_arrival(&self, x: u32, y: u32) -> f32 {
        let (xi, yi) = (i64::from(x), i64::from(y));
        let th = self.arrival_at(xi - 1, yi).min(self.arrival_at(xi + 1, yi));
        let tv = self.arrival_at(xi, yi - 1).min(self.arrival_at(xi, yi + 1));

        let (tmin, tmax) = if th <= tv { (th, tv) } else { (tv, th) };
        if tmin >= T_FAR {
            return T_FAR;
        }
        if tmax - tmin >= 1.0 {
            tmin + 1.0
        } else {
            let disc = 2.0 - (tmax - tmin) * (tmax - tmin);
            0.5 * (tmin + tmax + disc.sqrt())
        }
    }

    /// Central-difference gradient of the arrival-time field at `(x, y)`,
    /// falling back to one-sided differences near edges and the hole.
    fn grad_t(&self, x: u32, y: u32) -> (f32, f32) {
        let (xi, yi) = (i64::from(x), i64::from(y));
        let here = self.t[self.index(x, y)];

        let axis = |prev: f32, next: f32| -> f32 {
            match (prev < T_FAR, next < T_FAR) {
                (true, true) => (next - prev) * 0.5,
                (true, false) => here - prev,
                (false, true) => next - here,
                (false, false) => 0.0,
            }
        };

        let gx = axis(self.arrival_at(xi - 1, yi), self.arrival_at(xi + 1, yi));
        let gy = axis(self.arrival_at(xi, yi - 1), self.arrival_at(xi, yi + 1));
        (gx, gy)
    }

    /// Estimate the color at `(x, y)` from known pixels within `radius`.
    fn fill_pixel(&mut self, x: u32, y: u32, radius: f32) -> Result<(), InpaintFailure> {
        let (gx, gy) = self.grad_t(x, y);
        let here_t = self.t[self.index(x, y)];

        #[allow(clippy::cast_possible_truncation)]
        let r = radius.ceil() as i64;
        let mut weight_sum = 0.0_f32;
        let mut acc = [0.0_f32; 3];

        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                if nx < 0 || ny < 0 || nx >= i64::from(self.width) || ny >= i64::from(self.height) {
                    continue;
                }
                #[allow(clippy::cast_sign_loss)]
                let (nx, ny) = (nx as u32, ny as u32);
                if self.state[self.index(nx, ny)] != State::Known {
                    continue;
                }

                #[allow(clippy::cast_precision_loss)]
                let (rx, ry) = (dx as f32, dy as f32);
                let dist_sq = rx * rx + ry * ry;
                let dist = dist_sq.sqrt();
                if dist > radius {
                    continue;
                }

                // Telea weights: front-normal alignment, geometric distance,
                // level-set proximity.
                let dir = ((rx * gx + ry * gy) / dist).abs().max(1.0e-6);
                let dst = 1.0 / (dist_sq * dist);
                let lev = 1.0 / (1.0 + (self.t[self.index(nx, ny)] - here_t).abs());
                let weight = dir * dst * lev;

                let px = self.image.get_pixel(nx, ny);
                for ch in 0..3 {
                    acc[ch] += weight * f32::from(px[ch]);
                }
                weight_sum += weight;
            }
        }

        if !weight_sum.is_finite() {
            return Err(InpaintFailure::Execution(format!(
                "non-finite weight sum at ({x},{y})"
            )));
        }

        if weight_sum > f32::EPSILON {
            let px = self.image.get_pixel_mut(x, y);
            for ch in 0..3 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    px[ch] = (acc[ch] / weight_sum).clamp(0.0, 255.0) as u8;
                }
            }
        }
        // No known pixel in range: keep the original value, a later band
        // visit of its neighbors will have filled closer sources by then.
        Ok(())
    }

    fn run(&mut self, radius: f32) -> Result<(), InpaintFailure> {
        while let Some(Reverse(pixel)) = self.band.pop() {
            let i = self.index(pixel.x, pixel.y);
            if self.state[i] != State::Band {
                continue; // superseded by a shorter arrival
            }

            self.fill_pixel(pixel.x, pixel.y, radius)?;
            self.state[i] = State::Known;

            for (nx, ny) in self.neighbors(pixel.x, pixel.y).collect::<Vec<_>>() {
                let ni = self.index(nx, ny);
                if self.state[ni] == State::Known {
                    continue;
                }
                let arrival = self.solve_arrival(nx, ny);
                if self.state[ni] == State::Inside || arrival < self.t[ni] {
                    self.state[ni] = State::Band;
                    self.t[ni] = arrival;
                    self.band.push(Reverse(BandPixel {
                        t: arrival,
                        x: nx,
                        y: ny,
                    }));
                }
            }
        }
        Ok(())
    }

    fn into_image(self) -> RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BBox, Detection};
    use image::Rgb;

    fn uniform_frame(w: u32, h: u32, color: [u8; 3]) -> RgbImage {
        let mut img = RgbImage::new(w, h);
        for px in img.pixels_mut() {
            *px = Rgb(color);
        }
        img
    }

    fn mask_for_box(w: u32, h: u32, bbox: BBox) -> Mask {
        let det = Detection {
            label: "bottle".to_string(),
            confidence: 0.9,
            bbox,
        };
        Mask::from_detections(w, h, &[&det], 0)
    }

    #[test]
    fn empty_mask_is_a_precondition_failure() {
        let frame = uniform_frame(32, 32, [10, 20, 30]);
        let mask = Mask::empty(32, 32);
        let err = TeleaInpainter.inpaint(&frame, &mask, 10.0).unwrap_err();
        assert_eq!(err, InpaintFailure::MaskEmpty);
    }

    #[test]
    fn dimension_mismatch_is_an_execution_failure() {
        let frame = uniform_frame(32, 32, [0, 0, 0]);
        let mask = mask_for_box(16, 16, BBox::new(2, 2, 8, 8));
        let err = TeleaInpainter.inpaint(&frame, &mask, 10.0).unwrap_err();
        assert!(matches!(err, InpaintFailure::Execution(_)));
    }

    #[test]
    fn output_dimensions_match_input() {
        let frame = uniform_frame(57, 43, [100, 150, 200]);
        let mask = mask_for_box(57, 43, BBox::new(10, 10, 20, 20));
        let out = TeleaInpainter.inpaint(&frame, &mask, 10.0).unwrap();
        assert_eq!((out.width(), out.height()), (57, 43));
    }

    #[test]
    fn hole_in_uniform_image_fills_with_surrounding_color() {
        let mut frame = uniform_frame(40, 40, [60, 120, 180]);
        // Scribble garbage into the hole; the algorithm must not read it as
        // a source, so the fill should converge back to the surround.
        for y in 15..25 {
            for x in 15..25 {
                frame.put_pixel(x, y, Rgb([255, 0, 255]));
            }
        }
        let mask = mask_for_box(40, 40, BBox::new(15, 15, 25, 25));
        let out = TeleaInpainter.inpaint(&frame, &mask, 10.0).unwrap();

        for y in 15..25 {
            for x in 15..25 {
                let px = out.get_pixel(x, y);
                for (ch, &want) in [60_u8, 120, 180].iter().enumerate() {
                    let diff = (i32::from(px[ch]) - i32::from(want)).abs();
                    assert!(
                        diff <= 3,
                        "pixel ({x},{y}) ch {ch}: got {}, want ~{want}",
                        px[ch]
                    );
                }
            }
        }
    }

    #[test]
    fn pixels_outside_the_mask_are_untouched() {
        let mut frame = uniform_frame(30, 30, [5, 5, 5]);
        frame.put_pixel(2, 2, Rgb([250, 10, 40]));
        let mask = mask_for_box(30, 30, BBox::new(12, 12, 18, 18));
        let out = TeleaInpainter.inpaint(&frame, &mask, 8.0).unwrap();

        for y in 0..30 {
            for x in 0..30 {
                if !mask.is_foreground(x, y) {
                    assert_eq!(out.get_pixel(x, y), frame.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn vertical_edge_propagates_through_the_hole() {
        // Left half dark, right half light; the hole straddles the edge.
        let mut frame = RgbImage::new(40, 40);
        for y in 0..40 {
            for x in 0..40 {
                let v = if x < 20 { 30 } else { 220 };
                frame.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        let mask = mask_for_box(40, 40, BBox::new(14, 14, 26, 26));
        let out = TeleaInpainter.inpaint(&frame, &mask, 10.0).unwrap();

        // Far sides of the hole should keep their half's tone.
        let left = out.get_pixel(15, 20)[0];
        let right = out.get_pixel(25, 20)[0];
        assert!(left < 128, "left side of hole too bright: {left}");
        assert!(right > 128, "right side of hole too dark: {right}");
    }

    #[test]
    fn mask_covering_entire_frame_still_terminates() {
        let frame = uniform_frame(16, 16, [90, 90, 90]);
        let mask = mask_for_box(16, 16, BBox::new(0, 0, 16, 16));
        // No known seed anywhere: the march has nothing to start from, but
        // must still return a full-size frame rather than hang or panic.
        let out = TeleaInpainter.inpaint(&frame, &mask, 10.0).unwrap();
        assert_eq!((out.width(), out.height()), (16, 16));
    }
}
