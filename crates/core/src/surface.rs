//! The drawing-surface and container contracts the host provides.
//!
//! [`Surface`] mirrors the small slice of a 2D canvas context that motes
//! need: a save/restore state stack holding the transform, colors, line
//! width, and glow; rect and arc primitives; and a single current path.
//! The trait is object-safe.
//!
//! [`RecordingSurface`] logs every call as a [`DrawCommand`] so drawing rules
//! can be checked without a display.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::error::FieldError;

/// Width and height of a container in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    width: f64,
    height: f64,
}

impl Extent {
    /// Negative and non-finite sizes become 0.
    pub fn new(width: f64, height: f64) -> Self {
        let sane = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            width: sane(width),
            height: sane(height),
        }
    }

    /// Like [`new`](Self::new), but reports `DegenerateGeometry` when
    /// either side has no visible area. The sanitized extent is returned
    /// alongside so callers can carry on with it.
    pub fn measured(width: f64, height: f64) -> (Self, Option<FieldError>) {
        let extent = Self::new(width, height);
        let problem = extent
            .is_degenerate()
            .then_some(FieldError::DegenerateGeometry { width, height });
        (extent, problem)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// The region the field is laid over. Measured on initialize and resize.
pub trait Container {
    /// Current size in pixels, as reported by the host. May be zero.
    fn measure(&self) -> (f64, f64);
}

/// Blur halo requested around subsequently drawn shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    pub blur: f64,
    pub color: Rgba,
}

/// Primitive 2D drawing operations, in the spirit of a canvas context.
///
/// Angles are radians. Coordinates pass through the current transform.
pub trait Surface {
    /// Sets the backing size in pixels. Clears the contents and resets state.
    fn resize(&mut self, width: f64, height: f64);

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Pushes transform, colors, line width, and glow.
    fn save(&mut self);
    /// Pops the state pushed by the matching [`save`](Surface::save).
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64);
    fn rotate(&mut self, angle: f64);

    fn set_fill_color(&mut self, color: Rgba);
    fn set_stroke_color(&mut self, color: Rgba);
    fn set_line_width(&mut self, width: f64);
    /// `None` turns the glow off.
    fn set_glow(&mut self, glow: Option<Glow>);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);
}

/// One recorded [`Surface`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Resize { width: f64, height: f64 },
    ClearRect { x: f64, y: f64, width: f64, height: f64 },
    Save,
    Restore,
    Translate { x: f64, y: f64 },
    Rotate { angle: f64 },
    SetFillColor { color: Rgba },
    SetStrokeColor { color: Rgba },
    SetLineWidth { width: f64 },
    SetGlow { glow: Option<Glow> },
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    StrokeRect { x: f64, y: f64, width: f64, height: f64 },
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    Arc { x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64 },
    ClosePath,
    Fill,
    Stroke,
}

/// A [`Surface`] that only remembers what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Returns the recorded commands and starts a fresh log.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl Surface for RecordingSurface {
    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.push(DrawCommand::Resize { width, height });
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::ClearRect {
            x,
            y,
            width,
            height,
        });
    }

    fn save(&mut self) {
        self.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.push(DrawCommand::Restore);
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::Translate { x, y });
    }

    fn rotate(&mut self, angle: f64) {
        self.push(DrawCommand::Rotate { angle });
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.push(DrawCommand::SetFillColor { color });
    }

    fn set_stroke_color(&mut self, color: Rgba) {
        self.push(DrawCommand::SetStrokeColor { color });
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawCommand::SetLineWidth { width });
    }

    fn set_glow(&mut self, glow: Option<Glow>) {
        self.push(DrawCommand::SetGlow { glow });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
        });
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::StrokeRect {
            x,
            y,
            width,
            height,
        });
    }

    fn begin_path(&mut self) {
        self.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::LineTo { x, y });
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        self.push(DrawCommand::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
        });
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn fill(&mut self) {
        self.push(DrawCommand::Fill);
    }

    fn stroke(&mut self) {
        self.push(DrawCommand::Stroke);
    }
}

/// A container with a size set directly by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedContainer {
    pub width: f64,
    pub height: f64,
}

impl FixedContainer {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Container for FixedContainer {
    fn measure(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Srgb;

    #[test]
    fn extent_sanitizes_negative_and_nan() {
        let e = Extent::new(-5.0, f64::NAN);
        assert_eq!(e.width(), 0.0);
        assert_eq!(e.height(), 0.0);
        assert!(e.is_degenerate());
    }

    #[test]
    fn extent_keeps_positive_sizes() {
        let e = Extent::new(1280.0, 480.0);
        assert_eq!((e.width(), e.height()), (1280.0, 480.0));
        assert!(!e.is_degenerate());
    }

    #[test]
    fn measured_reports_degenerate_geometry() {
        let (extent, problem) = Extent::measured(0.0, 300.0);
        assert_eq!(extent.height(), 300.0);
        assert!(matches!(
            problem,
            Some(FieldError::DegenerateGeometry { width, height }) if width == 0.0 && height == 300.0
        ));
        assert!(Extent::measured(10.0, 10.0).1.is_none());
    }

    #[test]
    fn surface_trait_is_object_safe() {
        let mut surface: Box<dyn Surface> = Box::new(RecordingSurface::new());
        surface.begin_path();
        surface.arc(0.0, 0.0, 2.0, 0.0, std::f64::consts::TAU);
        surface.fill();
    }

    #[test]
    fn recording_surface_logs_calls_in_order() {
        let mut s = RecordingSurface::new();
        s.resize(10.0, 20.0);
        s.save();
        s.translate(1.0, 2.0);
        s.set_fill_color(Srgb::from_rgb8(255, 0, 0).with_alpha(0.5));
        s.fill_rect(0.0, 0.0, 1.0, 1.0);
        s.restore();
        assert_eq!((s.width(), s.height()), (10.0, 20.0));
        assert_eq!(s.commands().len(), 6);
        assert_eq!(s.commands()[1], DrawCommand::Save);
        assert_eq!(s.commands()[2], DrawCommand::Translate { x: 1.0, y: 2.0 });
        assert_eq!(s.commands()[5], DrawCommand::Restore);
    }

    #[test]
    fn take_commands_empties_the_log() {
        let mut s = RecordingSurface::new();
        s.stroke();
        assert_eq!(s.take_commands(), vec![DrawCommand::Stroke]);
        assert!(s.commands().is_empty());
    }

    #[test]
    fn draw_command_serializes_with_op_tag() {
        let v = serde_json::to_value(DrawCommand::MoveTo { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(v["op"], "move_to");
        assert_eq!(v["x"], 1.0);
        let unit = serde_json::to_value(DrawCommand::ClosePath).unwrap();
        assert_eq!(unit["op"], "close_path");
    }

    #[test]
    fn fixed_container_reports_its_size() {
        let c = FixedContainer::new(640.0, 360.0);
        assert_eq!(c.measure(), (640.0, 360.0));
    }
}
