//! CPU [`Surface`] over a premultiplied RGBA buffer.
//!
//! Paths are flattened into device space as they are built, so the transform
//! in effect at each path call is the one that applies, as on a canvas
//! context. Fills use the even-odd rule with 4x4 supersampling. Strokes are
//! anti-aliased by distance to each segment. Everything composites
//! source-over.

use std::f64::consts::TAU;
use std::ops::Range;

use glam::{DAffine2, DVec2};
use starfield_core::{Glow, Rgba, Srgb, Surface};

use crate::RasterError;

/// Largest buffer a surface will allocate, 8192 x 8192 pixels.
pub const MAX_PIXELS: usize = 1 << 26;

const SUBSAMPLES: usize = 4;
const MIN_ARC_SEGMENTS: usize = 12;
const MAX_ARC_SEGMENTS: usize = 256;

#[derive(Debug, Clone, Copy)]
struct PaintState {
    transform: DAffine2,
    fill: Rgba,
    stroke: Rgba,
    line_width: f64,
    glow: Option<Glow>,
}

impl Default for PaintState {
    fn default() -> Self {
        let black = Srgb {
            r: 0.0,
            g: 0.0,
            b: 0.0,
        }
        .with_alpha(1.0);
        Self {
            transform: DAffine2::IDENTITY,
            fill: black,
            stroke: black,
            line_width: 1.0,
            glow: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Subpath {
    points: Vec<DVec2>,
    closed: bool,
}

/// A software drawing surface. Starts empty; [`Surface::resize`] allocates.
#[derive(Debug, Clone, Default)]
pub struct PixelSurface {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 4]>,
    state: PaintState,
    stack: Vec<PaintState>,
    path: Vec<Subpath>,
}

impl PixelSurface {
    /// A transparent surface of the given size. Sizes above [`MAX_PIXELS`]
    /// give an empty surface.
    pub fn new(width: usize, height: usize) -> Self {
        let mut surface = Self::default();
        surface.allocate(width, height);
        surface
    }

    /// The buffer size [`Surface::resize`] would allocate for a CSS size.
    ///
    /// Returns `RasterError::InvalidDimensions` when it exceeds
    /// [`MAX_PIXELS`]; `resize` falls back to an empty buffer instead.
    pub fn checked_size(width: f64, height: f64) -> Result<(usize, usize), RasterError> {
        let (width, height) = (device_size(width), device_size(height));
        match width.checked_mul(height) {
            Some(n) if n <= MAX_PIXELS => Ok((width, height)),
            _ => Err(RasterError::InvalidDimensions { width, height }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Straight-alpha RGBA8 of one pixel, or `None` outside the surface.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(unpremultiply(self.pixels[y * self.width + x]))
    }

    /// Number of pixels with any coverage.
    pub fn painted_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| p[3] > 0.0).count()
    }

    /// Straight-alpha RGBA8, row-major. Length is `width * height * 4`.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&p| unpremultiply(p)).collect()
    }

    /// Opaque RGBA8 with the surface composited over `background`.
    pub fn composite_over(&self, background: Srgb) -> Vec<u8> {
        let bg = [
            background.r as f32,
            background.g as f32,
            background.b as f32,
        ];
        self.pixels
            .iter()
            .flat_map(|p| {
                let keep = 1.0 - p[3];
                [
                    quantize(p[0] + bg[0] * keep),
                    quantize(p[1] + bg[1] * keep),
                    quantize(p[2] + bg[2] * keep),
                    255,
                ]
            })
            .collect()
    }

    fn allocate(&mut self, width: usize, height: usize) {
        let (width, height) = match width.checked_mul(height) {
            Some(n) if n <= MAX_PIXELS => (width, height),
            _ => {
                log::warn!("{width}x{height} exceeds {MAX_PIXELS} pixels, surface left empty");
                (0, 0)
            }
        };
        self.width = width;
        self.height = height;
        self.pixels = vec![[0.0; 4]; width * height];
        self.state = PaintState::default();
        self.stack.clear();
        self.path.clear();
    }

    fn to_device(&self, x: f64, y: f64) -> DVec2 {
        self.state.transform.transform_point2(DVec2::new(x, y))
    }

    /// Uniform scale of the current transform, for line widths and arc
    /// tessellation.
    fn scale(&self) -> f64 {
        self.state.transform.matrix2.determinant().abs().sqrt()
    }

    fn rect_ring(&self, x: f64, y: f64, width: f64, height: f64) -> Vec<DVec2> {
        [
            (x, y),
            (x + width, y),
            (x + width, y + height),
            (x, y + height),
        ]
        .into_iter()
        .map(|(px, py)| self.to_device(px, py))
        .collect()
    }

    /// Pixel index ranges touched by a device-space box, clipped to the
    /// surface.
    fn span(&self, lo: DVec2, hi: DVec2) -> Option<(Range<usize>, Range<usize>)> {
        if !(lo.is_finite() && hi.is_finite()) {
            return None;
        }
        let clip = |lo: f64, hi: f64, limit: usize| {
            let start = lo.floor().max(0.0) as usize;
            let end = hi.ceil().min(limit as f64).max(0.0) as usize;
            (start < end).then_some(start..end)
        };
        Some((clip(lo.x, hi.x, self.width)?, clip(lo.y, hi.y, self.height)?))
    }

    fn blend(&mut self, x: usize, y: usize, color: Rgba, coverage: f64) {
        let a = (color.alpha * coverage) as f32;
        if a <= 0.0 {
            return;
        }
        let src = [
            color.rgb.r as f32 * a,
            color.rgb.g as f32 * a,
            color.rgb.b as f32 * a,
            a,
        ];
        let keep = 1.0 - a;
        let dst = &mut self.pixels[y * self.width + x];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s + *d * keep;
        }
    }

    fn fill_rings(&mut self, rings: &[Vec<DVec2>], color: Rgba) {
        let rings: Vec<&[DVec2]> = rings
            .iter()
            .filter(|r| r.len() >= 3)
            .map(Vec::as_slice)
            .collect();
        let Some((lo, hi)) = bounds(rings.iter().flat_map(|r| r.iter())) else {
            return;
        };
        if let Some(glow) = self.state.glow {
            self.paint_glow(lo, hi, glow);
        }
        let Some((xs, ys)) = self.span(lo, hi) else {
            return;
        };
        let step = 1.0 / SUBSAMPLES as f64;
        let total = (SUBSAMPLES * SUBSAMPLES) as f64;
        for py in ys {
            for px in xs.clone() {
                let mut hits = 0usize;
                for j in 0..SUBSAMPLES {
                    for i in 0..SUBSAMPLES {
                        let sample = DVec2::new(
                            px as f64 + (i as f64 + 0.5) * step,
                            py as f64 + (j as f64 + 0.5) * step,
                        );
                        if inside_even_odd(&rings, sample) {
                            hits += 1;
                        }
                    }
                }
                if hits > 0 {
                    self.blend(px, py, color, hits as f64 / total);
                }
            }
        }
    }

    fn stroke_segments(&mut self, segments: &[(DVec2, DVec2)], color: Rgba) {
        let half = self.state.line_width * self.scale() / 2.0;
        let Some((lo, hi)) = bounds(segments.iter().flat_map(|(a, b)| [a, b])) else {
            return;
        };
        let pad = DVec2::splat(half + 1.0);
        if let Some(glow) = self.state.glow {
            self.paint_glow(lo - pad, hi + pad, glow);
        }
        let Some((xs, ys)) = self.span(lo - pad, hi + pad) else {
            return;
        };
        for py in ys {
            for px in xs.clone() {
                let center = DVec2::new(px as f64 + 0.5, py as f64 + 0.5);
                let coverage = segments
                    .iter()
                    .map(|&(a, b)| (half + 0.5 - segment_distance(center, a, b)).clamp(0.0, 1.0))
                    .fold(0.0, f64::max);
                if coverage > 0.0 {
                    self.blend(px, py, color, coverage);
                }
            }
        }
    }

    /// Gaussian halo around the box, painted under the shape.
    fn paint_glow(&mut self, lo: DVec2, hi: DVec2, glow: Glow) {
        if glow.blur.is_nan() || glow.blur <= 0.0 || glow.color.alpha <= 0.0 {
            return;
        }
        let center = (lo + hi) / 2.0;
        let radius = (hi - lo).max_element() / 2.0;
        let sigma = glow.blur / 2.0;
        let reach = DVec2::splat(radius + glow.blur * 1.5);
        let Some((xs, ys)) = self.span(center - reach, center + reach) else {
            return;
        };
        for py in ys {
            for px in xs.clone() {
                let c = DVec2::new(px as f64 + 0.5, py as f64 + 0.5);
                let d = ((c - center).length() - radius).max(0.0);
                let falloff = (-(d * d) / (2.0 * sigma * sigma)).exp();
                self.blend(px, py, glow.color, falloff);
            }
        }
    }
}

impl Surface for PixelSurface {
    fn resize(&mut self, width: f64, height: f64) {
        self.allocate(device_size(width), device_size(height));
        log::trace!("pixel surface resized to {}x{}", self.width, self.height);
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let ring = self.rect_ring(x, y, width, height);
        let Some((lo, hi)) = bounds(&ring) else {
            return;
        };
        let Some((xs, ys)) = self.span(lo, hi) else {
            return;
        };
        let rings = [ring.as_slice()];
        for py in ys {
            for px in xs.clone() {
                let center = DVec2::new(px as f64 + 0.5, py as f64 + 0.5);
                if inside_even_odd(&rings, center) {
                    self.pixels[py * self.width + px] = [0.0; 4];
                }
            }
        }
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.state.transform = self.state.transform * DAffine2::from_translation(DVec2::new(x, y));
    }

    fn rotate(&mut self, angle: f64) {
        self.state.transform = self.state.transform * DAffine2::from_angle(angle);
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.state.fill = color;
    }

    fn set_stroke_color(&mut self, color: Rgba) {
        self.state.stroke = color;
    }

    /// Non-positive and non-finite widths are ignored.
    fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    fn set_glow(&mut self, glow: Option<Glow>) {
        self.state.glow = glow;
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let ring = self.rect_ring(x, y, width, height);
        let color = self.state.fill;
        self.fill_rings(&[ring], color);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let ring = self.rect_ring(x, y, width, height);
        let color = self.state.stroke;
        self.stroke_segments(&ring_segments(&ring, true), color);
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        let p = self.to_device(x, y);
        self.path.push(Subpath {
            points: vec![p],
            closed: false,
        });
    }

    /// Without a current point this starts a subpath.
    fn line_to(&mut self, x: f64, y: f64) {
        let p = self.to_device(x, y);
        match self.path.last_mut() {
            Some(sub) => sub.points.push(p),
            None => self.path.push(Subpath {
                points: vec![p],
                closed: false,
            }),
        }
    }

    /// Clockwise from `start_angle`. A sweep of a full turn or more draws the
    /// whole circle. Joins the current subpath when there is one.
    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        let radius = radius.max(0.0);
        let delta = end_angle - start_angle;
        if !delta.is_finite() {
            return;
        }
        let sweep = if delta >= TAU {
            TAU
        } else {
            delta.rem_euclid(TAU)
        };
        let full = ((radius * self.scale() * 4.0).ceil() as usize)
            .clamp(MIN_ARC_SEGMENTS, MAX_ARC_SEGMENTS);
        let segments = ((full as f64 * sweep / TAU).ceil() as usize).max(1);
        let center = DVec2::new(x, y);
        let points: Vec<DVec2> = (0..=segments)
            .map(|i| {
                let angle = start_angle + sweep * i as f64 / segments as f64;
                let p = center + DVec2::from_angle(angle) * radius;
                self.to_device(p.x, p.y)
            })
            .collect();
        match self.path.last_mut() {
            Some(sub) => sub.points.extend(points),
            None => self.path.push(Subpath {
                points,
                closed: false,
            }),
        }
    }

    /// Closes the current subpath and starts a new one at its first point.
    fn close_path(&mut self) {
        let first = match self.path.last_mut() {
            Some(sub) if !sub.points.is_empty() => {
                sub.closed = true;
                sub.points[0]
            }
            _ => return,
        };
        self.path.push(Subpath {
            points: vec![first],
            closed: false,
        });
    }

    fn fill(&mut self) {
        let rings: Vec<Vec<DVec2>> = self.path.iter().map(|s| s.points.clone()).collect();
        let color = self.state.fill;
        self.fill_rings(&rings, color);
    }

    fn stroke(&mut self) {
        let segments: Vec<(DVec2, DVec2)> = self
            .path
            .iter()
            .flat_map(|s| ring_segments(&s.points, s.closed))
            .collect();
        let color = self.state.stroke;
        self.stroke_segments(&segments, color);
    }
}

fn device_size(v: f64) -> usize {
    if v.is_finite() && v > 0.0 {
        v.round() as usize
    } else {
        0
    }
}

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn unpremultiply(p: [f32; 4]) -> [u8; 4] {
    let a = p[3];
    if a <= 0.0 {
        return [0; 4];
    }
    [
        quantize(p[0] / a),
        quantize(p[1] / a),
        quantize(p[2] / a),
        quantize(a),
    ]
}

fn bounds<'a>(points: impl IntoIterator<Item = &'a DVec2>) -> Option<(DVec2, DVec2)> {
    points.into_iter().fold(None, |acc, &p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
    })
}

fn ring_segments(ring: &[DVec2], closed: bool) -> Vec<(DVec2, DVec2)> {
    let mut segments: Vec<_> = ring.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && ring.len() > 2 {
        segments.push((ring[ring.len() - 1], ring[0]));
    }
    segments
}

fn segment_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    let t = if len2 > 0.0 {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p - (a + ab * t)).length()
}

fn inside_even_odd(rings: &[&[DVec2]], p: DVec2) -> bool {
    let mut inside = false;
    for ring in rings {
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let (a, b) = (ring[i], ring[j]);
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}
