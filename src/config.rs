use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Gravity multipliers for the glide mechanic.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoaringConfig {
    /// Applied while gliding and descending.
    pub glide_gravity_scale: f32,
    /// Applied at all other times.
    pub normal_gravity_scale: f32,
}

impl Default for SoaringConfig {
    fn default() -> Self {
        Self {
            glide_gravity_scale: 0.01,
            normal_gravity_scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub acceleration: f32,
    /// Fraction of the acceleration available while airborne.
    pub air_control: f32,
    pub max_walk_speed: f32,
    /// Multiplier applied to lateral velocity every frame.
    pub damping: f32,
    /// Lateral speeds below this snap to zero.
    pub stop_speed: f32,
    pub jump_impulse: f32,
    pub max_jumps: u32,
    pub max_slope_angle_degrees: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            acceleration: 1250.0,
            air_control: 0.8,
            max_walk_speed: 600.0,
            damping: 0.92,
            stop_speed: 1.0,
            jump_impulse: 1000.0,
            max_jumps: 2,
            max_slope_angle_degrees: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub offset_x: f32,
    pub offset_y: f32,
    /// Fraction of the remaining distance covered per second.
    pub follow_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 75.0,
            follow_speed: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub soaring_audio: String,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            soaring_audio: "audio/soaring.ogg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "wgpu=error,naga=warn,unknown_steampunk=info".to_string(),
        }
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub soaring: SoaringConfig,
    pub movement: MovementConfig,
    pub camera: CameraConfig,
    pub effects: EffectsConfig,
    pub log: LogConfig,
}

impl GameConfig {
    pub fn from_toml_str(path: &Path, toml_str: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(toml_str).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_scale("soaring.glide_gravity_scale", self.soaring.glide_gravity_scale)?;
        check_scale("soaring.normal_gravity_scale", self.soaring.normal_gravity_scale)?;
        if self.movement.max_jumps == 0 {
            return Err(ConfigError::Invalid {
                field: "movement.max_jumps",
                reason: "must be at least 1".to_string(),
            });
        }
        let damping = self.movement.damping;
        if !(damping > 0.0 && damping <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "movement.damping",
                reason: format!("{damping} is outside (0, 1]"),
            });
        }
        Ok(())
    }
}

fn check_scale(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not a finite non-negative scale"),
        })
    }
}

/// Where the active configuration came from, reported once logging is up.
#[derive(Resource, Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults(String),
}

pub fn load_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    GameConfig::from_toml_str(path, &toml_str)
}

/// Load the config, falling back to defaults on any failure.
pub fn load_config_or_default(path: &Path) -> (GameConfig, ConfigSource) {
    match load_config(path) {
        Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
        Err(error) => (GameConfig::default(), ConfigSource::Defaults(error.to_string())),
    }
}

pub fn report_config_source(source: Res<ConfigSource>, config: Res<GameConfig>) {
    match &*source {
        ConfigSource::File(path) => info!("Read configuration from {}", path.display()),
        ConfigSource::Defaults(reason) => {
            warn!("Using default configuration: {}", reason)
        }
    }
    debug!("Active configuration: {:?}", *config);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<GameConfig, ConfigError> {
        GameConfig::from_toml_str(Path::new("test.toml"), toml_str)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.soaring.glide_gravity_scale, 0.01);
        assert_eq!(config.soaring.normal_gravity_scale, 2.0);
        assert_eq!(config.movement.max_jumps, 2);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = parse(
            r#"
            [soaring]
            glide_gravity_scale = 0.05

            [movement]
            max_jumps = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.soaring.glide_gravity_scale, 0.05);
        assert_eq!(config.soaring.normal_gravity_scale, 2.0);
        assert_eq!(config.movement.max_jumps, 3);
        assert_eq!(config.movement.jump_impulse, 1000.0);
    }

    #[test]
    fn negative_gravity_scale_is_rejected() {
        let err = parse("[soaring]\nglide_gravity_scale = -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "soaring.glide_gravity_scale",
                ..
            }
        ));
    }

    #[test]
    fn zero_jumps_and_bad_damping_are_rejected() {
        assert!(matches!(
            parse("[movement]\nmax_jumps = 0\n"),
            Err(ConfigError::Invalid {
                field: "movement.max_jumps",
                ..
            })
        ));
        assert!(matches!(
            parse("[movement]\ndamping = 1.5\n"),
            Err(ConfigError::Invalid {
                field: "movement.damping",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(parse("[soaring"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let (config, source) = load_config_or_default(Path::new("definitely/not/here.toml"));
        assert_eq!(config, GameConfig::default());
        assert!(matches!(source, ConfigSource::Defaults(_)));
    }
}
