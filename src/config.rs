//! Tunable parameters for the animation core.
//!
//! Every numeric here is a design parameter tuned for visual feel, not a hard
//! physical requirement. Values load from a YAML file when present and fall
//! back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AvatarError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvatarConfig {
    /// World units covered by one step gesture.
    pub step_size: f32,
    /// Heading change of one turn gesture, radians.
    pub turn_angle: f32,
    /// Half-extent of the square world boundary steps are clamped to.
    pub world_bounds: f32,
    /// Default command duration in seconds when the stream omits one.
    pub default_duration: f32,
    /// Exponential heading smoothing rate per second (time-based, so the
    /// easing feel does not depend on frame rate).
    pub heading_smoothing: f32,
    /// Continuous spin rate in radians per second when auto-spin is on.
    pub auto_spin_rate: f32,
    /// Maximum yaw the pointer can pull the avatar to, radians.
    pub max_yaw: f32,
    /// Maximum yaw for skeletal head/neck look-at, radians.
    pub look_at_max_yaw: f32,
    /// Crossfade duration between clips, seconds.
    pub crossfade: f32,
    /// Whether stopping autopilot resets committed position/heading to the
    /// origin. On by default for consistent demo behavior.
    pub reset_spatial_on_stop: bool,
    /// Highest numbered clip variant probed per command ("Talking 1", ...).
    pub max_clip_variants: u32,
    /// Assumed audio bitrate (bits/s) for estimating speech duration from
    /// response size when no platform player reports one.
    pub tts_bitrate: u32,
    pub autopilot_url: String,
    pub tts_url: String,
    pub config_url: String,
    pub model_url: String,
    pub animations_url: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            turn_angle: std::f32::consts::FRAC_PI_2,
            world_bounds: 4.0,
            default_duration: 3.0,
            heading_smoothing: 3.0,
            auto_spin_rate: 0.48,
            max_yaw: std::f32::consts::FRAC_PI_2,
            look_at_max_yaw: std::f32::consts::FRAC_PI_4,
            crossfade: 0.3,
            reset_spatial_on_stop: true,
            max_clip_variants: 8,
            tts_bitrate: 48_000,
            autopilot_url: "http://127.0.0.1:8765/autopilot".to_string(),
            tts_url: "http://127.0.0.1:8765/tts".to_string(),
            config_url: "http://127.0.0.1:8765/config".to_string(),
            model_url: "http://127.0.0.1:8080/models/character.json".to_string(),
            animations_url: "http://127.0.0.1:8080/models/animations/".to_string(),
        }
    }
}

impl AvatarConfig {
    /// Load from the default location, falling back to defaults if the file
    /// does not exist.
    pub fn load() -> Result<Self, AvatarError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, AvatarError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AvatarError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| AvatarError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("marionette").join("config.yaml"))
}
