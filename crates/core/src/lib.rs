#![deny(unsafe_code)]
//! Core of the interactive starfield: a field of twinkling motes that drift
//! away from the pointer, burst outward on click, and spring back home.
//!
//! Provides the [`Field`] owner, [`Particle`] physics and drawing, the
//! [`Surface`]/[`Container`] host contracts with a [`RecordingSurface`],
//! color types and [`Palette`] presets, the [`Xorshift64`] PRNG behind the
//! [`RandomSource`] trait, [`FieldConfig`], and a [`FixedRateTicker`] for
//! hosts without their own frame callback.

pub mod color;
pub mod config;
pub mod error;
pub mod field;
pub mod palette;
pub mod particle;
pub mod pointer;
pub mod prng;
pub mod surface;
pub mod ticker;

pub use color::{Rgba, Srgb};
pub use config::{Dynamics, FieldConfig};
pub use error::FieldError;
pub use field::{ClickReport, Field};
pub use palette::Palette;
pub use particle::{Particle, ShapeKind};
pub use pointer::Pointer;
pub use prng::{RandomSource, Xorshift64};
pub use surface::{
    Container, DrawCommand, Extent, FixedContainer, Glow, RecordingSurface, Surface,
};
pub use ticker::{FixedRateTicker, StopHandle, TickControl};
