//! PNG snapshots of a [`PixelSurface`].
//!
//! Feature-gated behind `png` (default on) so wasm builds can use the raster
//! crate without pulling in `image`.

use std::path::Path;

use starfield_core::Srgb;

use crate::pixel::PixelSurface;
use crate::RasterError;

/// Writes the surface as a PNG. With a `background` the image is opaque,
/// otherwise transparency is kept.
///
/// Returns `RasterError::InvalidDimensions` for an empty surface or one
/// whose sides overflow `u32`, and `RasterError::Io` on write failure.
pub fn write_png(
    surface: &PixelSurface,
    background: Option<Srgb>,
    path: &Path,
) -> Result<(), RasterError> {
    let invalid = || RasterError::InvalidDimensions {
        width: surface.width(),
        height: surface.height(),
    };
    if surface.width() == 0 || surface.height() == 0 {
        return Err(invalid());
    }
    let w = u32::try_from(surface.width()).map_err(|_| invalid())?;
    let h = u32::try_from(surface.height()).map_err(|_| invalid())?;
    let rgba = match background {
        Some(bg) => surface.composite_over(bg),
        None => surface.to_rgba8(),
    };
    let img = image::RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| RasterError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| RasterError::Io(e.to_string()))?;
    log::debug!("wrote {w}x{h} snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfield_core::{Rgba, Surface};

    #[test]
    fn write_png_round_trip() {
        let mut surface = PixelSurface::new(16, 12);
        surface.set_fill_color(Rgba::new(Srgb::from_rgb8(165, 180, 252), 1.0));
        surface.fill_rect(0.0, 0.0, 4.0, 4.0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        write_png(&surface, None, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.width(), 16);
        assert_eq!(img.height(), 12);
        assert_eq!(img.get_pixel(1, 1).0, [165, 180, 252, 255]);
        assert_eq!(img.get_pixel(10, 10).0[3], 0);
    }

    #[test]
    fn background_makes_it_opaque() {
        let surface = PixelSurface::new(4, 4);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");

        write_png(&surface, Some(Srgb::from_rgb8(15, 23, 42)), &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(2, 2).0, [15, 23, 42, 255]);
    }

    #[test]
    fn empty_surface_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_png(&PixelSurface::default(), None, &dir.path().join("x.png"));
        assert!(matches!(
            result,
            Err(RasterError::InvalidDimensions { width: 0, height: 0 })
        ));
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let surface = PixelSurface::new(2, 2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.png");
        assert!(matches!(
            write_png(&surface, None, &path),
            Err(RasterError::Io(_))
        ));
    }
}
