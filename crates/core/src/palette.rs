//! Small fixed palettes that motes draw their base color from.
//!
//! A particle picks one entry at creation and keeps it for life; there is no
//! interpolation between entries.

use crate::color::Srgb;
use crate::error::FieldError;
use crate::prng::RandomSource;

/// Names accepted by [`Palette::from_name`], default first.
const PALETTE_NAMES: &[&str] = &["twilight", "ember", "aurora", "mono"];

/// A non-empty list of base colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Srgb>,
}

impl Palette {
    /// Requires at least one color.
    pub fn new(colors: Vec<Srgb>) -> Result<Self, FieldError> {
        if colors.is_empty() {
            return Err(FieldError::InvalidPalette(
                "palette requires at least 1 color".to_string(),
            ));
        }
        Ok(Self { colors })
    }

    /// Parses each entry as `"#rrggbb"` or `"rrggbb"`.
    pub fn from_hex<S: AsRef<str>>(hexes: &[S]) -> Result<Self, FieldError> {
        let colors = hexes
            .iter()
            .map(|h| Srgb::from_hex(h.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }

    /// Looks up a built-in palette.
    ///
    /// Returns `FieldError::InvalidPalette` for unknown names.
    pub fn from_name(name: &str) -> Result<Self, FieldError> {
        match name {
            "twilight" => Ok(Self::twilight()),
            "ember" => Ok(Self::ember()),
            "aurora" => Ok(Self::aurora()),
            "mono" => Ok(Self::mono()),
            other => Err(FieldError::InvalidPalette(format!(
                "unknown palette '{other}', expected one of: {}",
                PALETTE_NAMES.join(", ")
            ))),
        }
    }

    pub fn list_names() -> &'static [&'static str] {
        PALETTE_NAMES
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false for a constructed palette.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Srgb] {
        &self.colors
    }

    /// Picks one entry uniformly.
    pub fn pick(&self, rng: &mut impl RandomSource) -> Srgb {
        self.colors[rng.index(self.colors.len())]
    }

    // -- Built-in palettes --

    /// Periwinkle, pale sky, and lilac. The default.
    pub fn twilight() -> Self {
        Self {
            colors: vec![
                Srgb::from_rgb8(165, 180, 252),
                Srgb::from_rgb8(191, 219, 254),
                Srgb::from_rgb8(233, 213, 255),
            ],
        }
    }

    /// Warm ambers and rose.
    pub fn ember() -> Self {
        Self {
            colors: vec![
                Srgb::from_rgb8(253, 186, 116),
                Srgb::from_rgb8(252, 211, 77),
                Srgb::from_rgb8(251, 113, 133),
            ],
        }
    }

    /// Mint, teal, and sky.
    pub fn aurora() -> Self {
        Self {
            colors: vec![
                Srgb::from_rgb8(110, 231, 183),
                Srgb::from_rgb8(94, 234, 212),
                Srgb::from_rgb8(125, 211, 252),
            ],
        }
    }

    /// Off-whites.
    pub fn mono() -> Self {
        Self {
            colors: vec![
                Srgb::from_rgb8(248, 250, 252),
                Srgb::from_rgb8(226, 232, 240),
            ],
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::twilight()
    }
}
