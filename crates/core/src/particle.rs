//! A single mote: kinetic state, blink oscillator, and drawing rules.
//!
//! Per step a particle blinks, integrates and damps its velocity, spins,
//! gets pushed away from a nearby pointer, and is pulled back toward its
//! rest position. Clicks seed velocity through [`Particle::apply_impulse`];
//! the pointer only ever displaces position directly.

use std::f64::consts::TAU;

use glam::DVec2;

use crate::color::{Rgba, Srgb};
use crate::config::Dynamics;
use crate::error::FieldError;
use crate::palette::Palette;
use crate::pointer::Pointer;
use crate::prng::RandomSource;
use crate::surface::{Extent, Glow, Surface};

pub const OPACITY_MIN: f64 = 0.2;
pub const OPACITY_MAX: f64 = 0.9;

const SIZE_MIN: f64 = 1.0;
const SIZE_SPAN: f64 = 4.0;
const DENSITY_MIN: f64 = 10.0;
const DENSITY_SPAN: f64 = 30.0;
const INITIAL_OPACITY_MIN: f64 = 0.3;
const INITIAL_OPACITY_SPAN: f64 = 0.6;
const BLINK_SPEED_MIN: f64 = 0.005;
const BLINK_SPEED_SPAN: f64 = 0.01;
const ROTATION_SPEED_SPAN: f64 = 0.02;

const LINE_WIDTH: f64 = 1.0;
/// Framed squares above this size get a filled core.
const CORE_MIN_SIZE: f64 = 2.0;
const GLOW_MIN_SIZE: f64 = 3.0;
const GLOW_BLUR: f64 = 10.0;
const TETHER_MIN_SIZE: f64 = 1.8;
const TETHER_MAX_ALPHA: f64 = 0.6;
const TETHER_WIDTH: f64 = 0.8;

fn glow_color() -> Rgba {
    Srgb::from_rgb8(99, 102, 241).with_alpha(0.4)
}

fn tether_color() -> Srgb {
    Srgb::from_rgb8(129, 140, 248)
}

/// How a mote is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Filled disk.
    Circle,
    /// Outlined square, with a filled core when large enough.
    FramedSquare,
    /// Outlined triangle.
    Triangle,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [
        ShapeKind::Circle,
        ShapeKind::FramedSquare,
        ShapeKind::Triangle,
    ];

    /// With probability `accent_chance` picks uniformly among all kinds,
    /// otherwise [`ShapeKind::Circle`].
    pub fn roll(rng: &mut impl RandomSource, accent_chance: f64) -> Self {
        if rng.chance(accent_chance) {
            Self::ALL[rng.index(Self::ALL.len())]
        } else {
            ShapeKind::Circle
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    position: DVec2,
    base: DVec2,
    velocity: DVec2,
    size: f64,
    density: f64,
    opacity: f64,
    blink_speed: f64,
    blink_direction: f64,
    color: Srgb,
    shape: ShapeKind,
    rotation: f64,
    rotation_speed: f64,
}

impl Particle {
    /// Draws every attribute from `rng`. The rest position is uniform over
    /// `extent`, so a degenerate extent pins it to the origin edge.
    pub fn create(
        rng: &mut impl RandomSource,
        extent: Extent,
        palette: &Palette,
        accent_shape_chance: f64,
    ) -> Self {
        let position = DVec2::new(
            rng.next_f64() * extent.width(),
            rng.next_f64() * extent.height(),
        );
        let size = rng.next_f64().powi(3) * SIZE_SPAN + SIZE_MIN;
        let density = rng.range(DENSITY_MIN, DENSITY_MIN + DENSITY_SPAN);
        let opacity = rng.range(
            INITIAL_OPACITY_MIN,
            INITIAL_OPACITY_MIN + INITIAL_OPACITY_SPAN,
        );
        let blink_speed = rng.range(BLINK_SPEED_MIN, BLINK_SPEED_MIN + BLINK_SPEED_SPAN);
        let color = palette.pick(rng);
        let shape = ShapeKind::roll(rng, accent_shape_chance);
        let rotation = rng.next_f64() * TAU;
        let rotation_speed = (rng.next_f64() - 0.5) * ROTATION_SPEED_SPAN;

        Self {
            position,
            base: position,
            velocity: DVec2::ZERO,
            size,
            density,
            opacity,
            blink_speed,
            blink_direction: 1.0,
            color,
            shape,
            rotation,
            rotation_speed,
        }
    }

    /// Moves both the current and the rest position to `(x, y)` and stops it.
    #[cfg(test)]
    pub(crate) fn with_rest(mut self, x: f64, y: f64) -> Self {
        self.position = DVec2::new(x, y);
        self.base = self.position;
        self.velocity = DVec2::ZERO;
        self
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn base_position(&self) -> DVec2 {
        self.base
    }

    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn blink_speed(&self) -> f64 {
        self.blink_speed
    }

    /// +1 while brightening, -1 while fading.
    pub fn blink_direction(&self) -> f64 {
        self.blink_direction
    }

    pub fn color(&self) -> Srgb {
        self.color
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn rotation_speed(&self) -> f64 {
        self.rotation_speed
    }

    /// One time step. See the module docs for the order of effects.
    pub fn advance(&mut self, pointer: &Pointer, dynamics: &Dynamics) {
        self.blink();

        self.position += self.velocity;
        self.velocity *= dynamics.velocity_damping;
        self.rotation += self.rotation_speed;

        if let Some((toward_pointer, distance)) = pointer.reach(self.position) {
            if distance > 0.0 {
                let falloff = (pointer.radius() - distance) / pointer.radius();
                let push = falloff * self.density * dynamics.repulsion_strength;
                self.position -= toward_pointer / distance * push;
            }
        }

        self.position += (self.base - self.position) * dynamics.return_rate;
    }

    /// Reflecting oscillator: the overflowing step is mirrored back inside
    /// [OPACITY_MIN, OPACITY_MAX] and the direction flips.
    fn blink(&mut self) {
        self.opacity += self.blink_speed * self.blink_direction;
        if self.opacity > OPACITY_MAX {
            self.blink_direction = -1.0;
            self.opacity = (2.0 * OPACITY_MAX - self.opacity).clamp(OPACITY_MIN, OPACITY_MAX);
        } else if self.opacity < OPACITY_MIN {
            self.blink_direction = 1.0;
            self.opacity = (2.0 * OPACITY_MIN - self.opacity).clamp(OPACITY_MIN, OPACITY_MAX);
        }
    }

    /// Replaces the velocity with an outward kick of magnitude
    /// `(falloff_radius - d) / impulse_divisor` when `d < falloff_radius`.
    ///
    /// Returns `Ok(true)` if applied and `Ok(false)` if out of range. A
    /// particle sitting exactly on `origin` is left untouched and reported as
    /// `FieldError::UndefinedDirection`.
    pub fn apply_impulse(
        &mut self,
        origin: DVec2,
        falloff_radius: f64,
        dynamics: &Dynamics,
    ) -> Result<bool, FieldError> {
        let away = self.position - origin;
        let distance = away.length();
        if distance.is_nan() || distance >= falloff_radius {
            return Ok(false);
        }
        if distance == 0.0 {
            return Err(FieldError::UndefinedDirection {
                x: origin.x,
                y: origin.y,
            });
        }
        let magnitude = (falloff_radius - distance) / dynamics.impulse_divisor;
        self.velocity = away / distance * magnitude;
        Ok(true)
    }

    /// Draws the shape in the particle's rotated frame, then the tether to a
    /// nearby pointer in surface space.
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, pointer: &Pointer) {
        surface.save();
        surface.translate(self.position.x, self.position.y);
        surface.rotate(self.rotation);
        surface.set_fill_color(self.color.with_alpha(self.opacity));
        surface.set_stroke_color(self.color.with_alpha(self.opacity * 0.5));
        surface.set_line_width(LINE_WIDTH);
        if self.size > GLOW_MIN_SIZE {
            surface.set_glow(Some(Glow {
                blur: GLOW_BLUR,
                color: glow_color(),
            }));
        }

        let s = self.size;
        match self.shape {
            ShapeKind::Circle => {
                surface.begin_path();
                surface.arc(0.0, 0.0, s, 0.0, TAU);
                surface.fill();
            }
            ShapeKind::FramedSquare => {
                surface.stroke_rect(-s, -s, s * 2.0, s * 2.0);
                if s > CORE_MIN_SIZE {
                    surface.fill_rect(-s / 2.0, -s / 2.0, s, s);
                }
            }
            ShapeKind::Triangle => {
                surface.begin_path();
                surface.move_to(0.0, -s);
                surface.line_to(s, s);
                surface.line_to(-s, s);
                surface.close_path();
                surface.stroke();
            }
        }
        surface.restore();

        if self.size > TETHER_MIN_SIZE {
            if let Some((offset, distance)) = pointer.reach(self.position) {
                let alpha = (1.0 - distance / pointer.radius()) * TETHER_MAX_ALPHA;
                let target = self.position + offset;
                surface.set_stroke_color(tether_color().with_alpha(alpha));
                surface.set_line_width(TETHER_WIDTH);
                surface.begin_path();
                surface.move_to(self.position.x, self.position.y);
                surface.line_to(target.x, target.y);
                surface.stroke();
            }
        }
    }
}
