//! Error types for the starfield core.
//!
//! None of these ever reach an end user. Hosts log them and degrade to
//! "nothing visible happens".

use thiserror::Error;

/// Errors produced by field, particle, and configuration operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    /// The container or the drawing surface was absent at initialize time.
    #[error("missing element: {0}")]
    MissingElement(String),

    /// The container reported a zero, negative, or non-finite size.
    #[error("degenerate geometry: container reported {width} x {height}")]
    DegenerateGeometry { width: f64, height: f64 },

    /// A click landed exactly on a particle, so there is no direction to push it.
    #[error("undefined impulse direction at ({x}, {y})")]
    UndefinedDirection { x: f64, y: f64 },

    /// A configuration value was out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A palette could not be constructed or looked up.
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_element_names_the_element() {
        let msg = FieldError::MissingElement("container".into()).to_string();
        assert!(msg.contains("container"), "got: {msg}");
    }

    #[test]
    fn degenerate_geometry_includes_dimensions() {
        let err = FieldError::DegenerateGeometry {
            width: 0.0,
            height: -12.0,
        };
        let msg = format!("{err}");
        assert!(msg.contains('0'), "missing width in: {msg}");
        assert!(msg.contains("-12"), "missing height in: {msg}");
    }

    #[test]
    fn undefined_direction_includes_coordinates() {
        let msg = FieldError::UndefinedDirection { x: 100.0, y: 42.5 }.to_string();
        assert!(msg.contains("100"), "missing x in: {msg}");
        assert!(msg.contains("42.5"), "missing y in: {msg}");
    }

    #[test]
    fn invalid_config_includes_message() {
        let msg = FieldError::InvalidConfig("target_fps must be > 0".into()).to_string();
        assert!(msg.contains("target_fps"), "got: {msg}");
    }

    #[test]
    fn color_and_palette_errors_include_message() {
        assert!(FieldError::InvalidColor("bad hex".into())
            .to_string()
            .contains("bad hex"));
        assert!(FieldError::InvalidPalette("unknown".into())
            .to_string()
            .contains("unknown"));
    }

    #[test]
    fn field_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FieldError>();
    }

    #[test]
    fn field_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<FieldError>();
    }
}
