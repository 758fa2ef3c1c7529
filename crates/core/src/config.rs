//! Field configuration: particle count, radii, and motion constants.
//!
//! Hosts pass a JSON params object. Extraction never fails: a missing or
//! mistyped key falls back to its default. Range checks happen afterwards in
//! [`FieldConfig::validate`].

use crate::error::FieldError;
use crate::palette::Palette;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_PARTICLE_COUNT: usize = 550;
/// Upper bound on `particle_count`; every particle is drawn every frame.
pub const MAX_PARTICLE_COUNT: usize = 100_000;
pub const DEFAULT_INTERACTION_RADIUS: f64 = 200.0;
pub const DEFAULT_FALLOFF_RADIUS: f64 = 400.0;
/// Share of particles that roll for a non-circle shape.
pub const DEFAULT_ACCENT_SHAPE_CHANCE: f64 = 0.2;
pub const DEFAULT_VELOCITY_DAMPING: f64 = 0.92;
pub const DEFAULT_RETURN_RATE: f64 = 0.04;
pub const DEFAULT_REPULSION_STRENGTH: f64 = 0.2;
pub const DEFAULT_IMPULSE_DIVISOR: f64 = 8.0;
pub const DEFAULT_TARGET_FPS: f64 = 60.0;
pub const DEFAULT_PALETTE: &str = "twilight";

/// Per-step motion constants, calibrated for one step per displayed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dynamics {
    /// Velocity multiplier applied every step.
    pub velocity_damping: f64,
    /// Fraction of the gap to the base position closed every step.
    pub return_rate: f64,
    /// Scale on `density` for pointer repulsion.
    pub repulsion_strength: f64,
    /// Click impulse magnitude is `(falloff - d) / impulse_divisor`.
    pub impulse_divisor: f64,
}

impl Default for Dynamics {
    fn default() -> Self {
        Self {
            velocity_damping: DEFAULT_VELOCITY_DAMPING,
            return_rate: DEFAULT_RETURN_RATE,
            repulsion_strength: DEFAULT_REPULSION_STRENGTH,
            impulse_divisor: DEFAULT_IMPULSE_DIVISOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub particle_count: usize,
    pub interaction_radius: f64,
    pub falloff_radius: f64,
    pub accent_shape_chance: f64,
    pub dynamics: Dynamics,
    pub target_fps: f64,
    pub palette: String,
    /// Hex colors overriding `palette` when present.
    pub colors: Option<Vec<String>>,
    /// Set by [`from_json`](Self::from_json) when `colors` holds a
    /// non-string entry; reported by [`validate`](Self::validate).
    #[serde(skip)]
    malformed_colors: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
            falloff_radius: DEFAULT_FALLOFF_RADIUS,
            accent_shape_chance: DEFAULT_ACCENT_SHAPE_CHANCE,
            dynamics: Dynamics::default(),
            target_fps: DEFAULT_TARGET_FPS,
            palette: DEFAULT_PALETTE.to_string(),
            colors: None,
            malformed_colors: false,
        }
    }
}

impl FieldConfig {
    /// Reads a flat JSON params object, falling back to defaults per key.
    ///
    /// Does not validate; call [`validate`](Self::validate) or
    /// [`from_json_validated`](Self::from_json_validated).
    pub fn from_json(params: &Value) -> Self {
        let list = params.get("colors").and_then(Value::as_array);
        let malformed_colors = list.is_some_and(|l| l.iter().any(|v| !v.is_string()));
        let colors = list.map(|l| {
            l.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        });
        Self {
            particle_count: param_usize(params, "particle_count", DEFAULT_PARTICLE_COUNT),
            interaction_radius: param_f64(params, "interaction_radius", DEFAULT_INTERACTION_RADIUS),
            falloff_radius: param_f64(params, "falloff_radius", DEFAULT_FALLOFF_RADIUS),
            accent_shape_chance: param_f64(
                params,
                "accent_shape_chance",
                DEFAULT_ACCENT_SHAPE_CHANCE,
            ),
            dynamics: Dynamics {
                velocity_damping: param_f64(params, "velocity_damping", DEFAULT_VELOCITY_DAMPING),
                return_rate: param_f64(params, "return_rate", DEFAULT_RETURN_RATE),
                repulsion_strength: param_f64(
                    params,
                    "repulsion_strength",
                    DEFAULT_REPULSION_STRENGTH,
                ),
                impulse_divisor: param_f64(params, "impulse_divisor", DEFAULT_IMPULSE_DIVISOR),
            },
            target_fps: param_f64(params, "target_fps", DEFAULT_TARGET_FPS),
            palette: param_string(params, "palette", DEFAULT_PALETTE),
            colors,
            malformed_colors,
        }
    }

    pub fn from_json_validated(params: &Value) -> Result<Self, FieldError> {
        let config = Self::from_json(params);
        config.validate()?;
        Ok(config)
    }

    /// Checks every range constraint and that the palette resolves.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.particle_count > MAX_PARTICLE_COUNT {
            return Err(FieldError::InvalidConfig(format!(
                "particle_count must be at most {MAX_PARTICLE_COUNT}, got {}",
                self.particle_count
            )));
        }
        non_negative("interaction_radius", self.interaction_radius)?;
        non_negative("falloff_radius", self.falloff_radius)?;
        non_negative("repulsion_strength", self.dynamics.repulsion_strength)?;
        within("accent_shape_chance", self.accent_shape_chance, 0.0, 1.0)?;
        within("return_rate", self.dynamics.return_rate, 0.0, 1.0)?;
        let damping = self.dynamics.velocity_damping;
        if !(0.0..1.0).contains(&damping) {
            return Err(FieldError::InvalidConfig(format!(
                "velocity_damping must be in [0, 1), got {damping}"
            )));
        }
        positive("impulse_divisor", self.dynamics.impulse_divisor)?;
        positive("target_fps", self.target_fps)?;
        self.palette().map(|_| ())
    }

    /// Resolves `colors` if given, otherwise the named preset.
    pub fn palette(&self) -> Result<Palette, FieldError> {
        if self.malformed_colors {
            return Err(FieldError::InvalidPalette(
                "colors must contain only hex strings".to_string(),
            ));
        }
        match &self.colors {
            Some(hexes) => Palette::from_hex(hexes),
            None => Palette::from_name(&self.palette),
        }
    }

    /// Current values as a flat JSON object, readable by [`from_json`](Self::from_json).
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "particle_count": self.particle_count,
            "interaction_radius": self.interaction_radius,
            "falloff_radius": self.falloff_radius,
            "accent_shape_chance": self.accent_shape_chance,
            "velocity_damping": self.dynamics.velocity_damping,
            "return_rate": self.dynamics.return_rate,
            "repulsion_strength": self.dynamics.repulsion_strength,
            "impulse_divisor": self.dynamics.impulse_divisor,
            "target_fps": self.target_fps,
            "palette": self.palette,
        });
        if let Some(colors) = &self.colors {
            value["colors"] = json!(colors);
        }
        value
    }

    /// Type, default, range, and description of every key.
    pub fn schema() -> Value {
        json!({
            "particle_count": {
                "type": "integer",
                "default": DEFAULT_PARTICLE_COUNT,
                "min": 0,
                "max": MAX_PARTICLE_COUNT,
                "description": "Number of motes created on initialize and every resize"
            },
            "interaction_radius": {
                "type": "number",
                "default": DEFAULT_INTERACTION_RADIUS,
                "min": 0.0,
                "description": "Pointer distance within which motes are pushed away and tethered"
            },
            "falloff_radius": {
                "type": "number",
                "default": DEFAULT_FALLOFF_RADIUS,
                "min": 0.0,
                "description": "Click distance within which motes receive an impulse"
            },
            "accent_shape_chance": {
                "type": "number",
                "default": DEFAULT_ACCENT_SHAPE_CHANCE,
                "min": 0.0,
                "max": 1.0,
                "description": "Probability a mote rolls uniformly among all shapes instead of being a circle"
            },
            "velocity_damping": {
                "type": "number",
                "default": DEFAULT_VELOCITY_DAMPING,
                "min": 0.0,
                "max": 1.0,
                "description": "Velocity multiplier per frame (exclusive upper bound)"
            },
            "return_rate": {
                "type": "number",
                "default": DEFAULT_RETURN_RATE,
                "min": 0.0,
                "max": 1.0,
                "description": "Fraction of the gap to the rest position closed per frame"
            },
            "repulsion_strength": {
                "type": "number",
                "default": DEFAULT_REPULSION_STRENGTH,
                "min": 0.0,
                "description": "Scale applied to density for pointer repulsion"
            },
            "impulse_divisor": {
                "type": "number",
                "default": DEFAULT_IMPULSE_DIVISOR,
                "min": 0.0,
                "description": "Click impulse magnitude is (falloff_radius - distance) / impulse_divisor"
            },
            "target_fps": {
                "type": "number",
                "default": DEFAULT_TARGET_FPS,
                "min": 0.0,
                "description": "Tick rate for hosts without a display-frame primitive"
            },
            "palette": {
                "type": "string",
                "default": DEFAULT_PALETTE,
                "enum": Palette::list_names(),
                "description": "Built-in palette name"
            },
            "colors": {
                "type": "array",
                "items": "string",
                "description": "Hex colors overriding palette"
            }
        })
    }
}

fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Only non-negative integers are accepted; floats and negatives fall back.
fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map_or_else(|| default.to_owned(), String::from)
}

fn non_negative(name: &str, value: f64) -> Result<(), FieldError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FieldError::InvalidConfig(format!(
            "{name} must be finite and >= 0, got {value}"
        )))
    }
}

fn positive(name: &str, value: f64) -> Result<(), FieldError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FieldError::InvalidConfig(format!(
            "{name} must be finite and > 0, got {value}"
        )))
    }
}

fn within(name: &str, value: f64, min: f64, max: f64) -> Result<(), FieldError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(FieldError::InvalidConfig(format!(
            "{name} must be in [{min}, {max}], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_constants() {
        let c = FieldConfig::default();
        assert_eq!(c.particle_count, 550);
        assert_eq!(c.interaction_radius, 200.0);
        assert_eq!(c.falloff_radius, 400.0);
        assert_eq!(c.dynamics.velocity_damping, 0.92);
        assert_eq!(c.dynamics.return_rate, 0.04);
        assert_eq!(c.dynamics.repulsion_strength, 0.2);
        assert_eq!(c.dynamics.impulse_divisor, 8.0);
        assert_eq!(c.palette, "twilight");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn from_json_empty_object_is_default() {
        assert_eq!(FieldConfig::from_json(&json!({})), FieldConfig::default());
    }

    #[test]
    fn from_json_non_object_is_default() {
        assert_eq!(
            FieldConfig::from_json(&json!("not an object")),
            FieldConfig::default()
        );
    }

    #[test]
    fn from_json_reads_every_key() {
        let c = FieldConfig::from_json(&json!({
            "particle_count": 12,
            "interaction_radius": 50,
            "falloff_radius": 75.5,
            "accent_shape_chance": 0.5,
            "velocity_damping": 0.5,
            "return_rate": 0.1,
            "repulsion_strength": 1.0,
            "impulse_divisor": 4,
            "target_fps": 30,
            "palette": "ember",
        }));
        assert_eq!(c.particle_count, 12);
        assert_eq!(c.interaction_radius, 50.0);
        assert_eq!(c.falloff_radius, 75.5);
        assert_eq!(c.accent_shape_chance, 0.5);
        assert_eq!(c.dynamics.velocity_damping, 0.5);
        assert_eq!(c.dynamics.return_rate, 0.1);
        assert_eq!(c.dynamics.repulsion_strength, 1.0);
        assert_eq!(c.dynamics.impulse_divisor, 4.0);
        assert_eq!(c.target_fps, 30.0);
        assert_eq!(c.palette, "ember");
    }

    #[test]
    fn mistyped_values_fall_back() {
        let c = FieldConfig::from_json(&json!({
            "particle_count": -3,
            "interaction_radius": "wide",
            "palette": 7,
        }));
        assert_eq!(c.particle_count, DEFAULT_PARTICLE_COUNT);
        assert_eq!(c.interaction_radius, DEFAULT_INTERACTION_RADIUS);
        assert_eq!(c.palette, DEFAULT_PALETTE);
    }

    #[test]
    fn float_particle_count_falls_back() {
        let c = FieldConfig::from_json(&json!({"particle_count": 2.5}));
        assert_eq!(c.particle_count, DEFAULT_PARTICLE_COUNT);
    }

    #[test]
    fn colors_override_palette() {
        let c = FieldConfig::from_json(&json!({"colors": ["#ff0000", "#00ff00"]}));
        let p = c.palette().unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.colors()[0].to_rgb8(), [255, 0, 0]);
    }

    #[test]
    fn validate_rejects_unknown_palette() {
        let c = FieldConfig::from_json(&json!({"palette": "plaid"}));
        assert!(matches!(c.validate(), Err(FieldError::InvalidPalette(_))));
    }

    #[test]
    fn validate_rejects_bad_custom_colors() {
        let c = FieldConfig::from_json(&json!({"colors": ["#12"]}));
        assert!(matches!(c.validate(), Err(FieldError::InvalidColor(_))));
    }

    #[test]
    fn validate_rejects_empty_custom_colors() {
        let c = FieldConfig::from_json(&json!({"colors": []}));
        assert!(matches!(c.validate(), Err(FieldError::InvalidPalette(_))));
    }

    #[test]
    fn validate_rejects_mixed_custom_colors() {
        let c = FieldConfig::from_json(&json!({"colors": ["#fff", 3]}));
        assert!(matches!(c.validate(), Err(FieldError::InvalidPalette(_))));
        assert!(matches!(c.palette(), Err(FieldError::InvalidPalette(_))));
    }

    #[test]
    fn particle_count_is_capped() {
        let at_cap = json!({"particle_count": MAX_PARTICLE_COUNT});
        assert!(FieldConfig::from_json_validated(&at_cap).is_ok());
        for count in [MAX_PARTICLE_COUNT as u64 + 1, 1_000_000_000_000_000_000] {
            let result = FieldConfig::from_json_validated(&json!({ "particle_count": count }));
            assert!(
                matches!(result, Err(FieldError::InvalidConfig(_))),
                "expected InvalidConfig for {count}"
            );
        }
        assert_eq!(
            FieldConfig::schema()["particle_count"]["max"],
            json!(MAX_PARTICLE_COUNT)
        );
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let cases = [
            json!({"interaction_radius": -1.0}),
            json!({"falloff_radius": -0.5}),
            json!({"accent_shape_chance": 1.5}),
            json!({"velocity_damping": 1.0}),
            json!({"velocity_damping": -0.1}),
            json!({"return_rate": 2.0}),
            json!({"repulsion_strength": -2.0}),
            json!({"impulse_divisor": 0.0}),
            json!({"target_fps": 0.0}),
        ];
        for params in cases {
            let result = FieldConfig::from_json_validated(&params);
            assert!(
                matches!(result, Err(FieldError::InvalidConfig(_))),
                "expected InvalidConfig for {params}"
            );
        }
    }

    #[test]
    fn to_json_round_trips_through_from_json() {
        let mut c = FieldConfig::default();
        c.particle_count = 3;
        c.dynamics.return_rate = 0.5;
        c.colors = Some(vec!["#010203".into()]);
        assert_eq!(FieldConfig::from_json(&c.to_json()), c);
    }

    #[test]
    fn schema_describes_every_key() {
        let schema = FieldConfig::schema();
        let keys = FieldConfig::default().to_json();
        for key in keys.as_object().unwrap().keys() {
            assert!(schema.get(key).is_some(), "schema missing {key}");
            assert!(schema[key].get("type").is_some(), "{key} missing type");
            assert!(
                schema[key].get("description").is_some(),
                "{key} missing description"
            );
        }
    }
}
