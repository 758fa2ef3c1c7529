#![deny(unsafe_code)]
//! Software rendering for the starfield.
//!
//! [`PixelSurface`] implements the core `Surface` contract on a CPU RGBA
//! buffer, so a field can be drawn without a browser. The `png` feature
//! (default on) adds [`snapshot::write_png`]; wasm builds can leave it off
//! and skip the `image` dependency.

pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

pub use pixel::{PixelSurface, MAX_PIXELS};

use thiserror::Error;

/// Errors from exporting a rendered surface.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The surface is empty, larger than [`MAX_PIXELS`], or too large for
    /// the output format.
    #[error("invalid dimensions: {width} x {height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Writing the output failed.
    #[error("i/o error: {0}")]
    Io(String),
}
