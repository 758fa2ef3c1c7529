//! Pointer state: where the pointer is inside the container, if anywhere.

use glam::DVec2;

/// Pointer position in container-local coordinates plus the fixed radius
/// within which motes react to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    position: Option<DVec2>,
    radius: f64,
}

impl Pointer {
    /// An absent pointer with the given interaction radius.
    pub fn new(radius: f64) -> Self {
        Self {
            position: None,
            radius,
        }
    }

    /// Coordinates are taken as-is, including ones outside the container.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.position = Some(DVec2::new(x, y));
    }

    pub fn leave(&mut self) {
        self.position = None;
    }

    pub fn position(&self) -> Option<DVec2> {
        self.position
    }

    pub fn is_present(&self) -> bool {
        self.position.is_some()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Offset from `from` to the pointer and its length, when the pointer is
    /// present and strictly closer than the radius.
    pub fn reach(&self, from: DVec2) -> Option<(DVec2, f64)> {
        let offset = self.position? - from;
        let distance = offset.length();
        (distance < self.radius).then_some((offset, distance))
    }
}
