use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Animation and polling policy for a display.
///
/// Every display in a session must run with the same values, otherwise two
/// screens fed the same spin would not settle on the same angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    pub pointer_angle: f64,
    pub extra_rotations: u32,
    pub spin_duration_ms: f64,
    pub walk_base_ms: f64,
    pub walk_step_ms: f64,
    pub render_tick_ms: u32,
    pub snapshot_poll_ms: u32,
    pub rotation_key: String,
    pub rotation_max_age_secs: u64,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            pointer_angle: POINTER_ANGLE,
            extra_rotations: EXTRA_ROTATIONS,
            spin_duration_ms: SPIN_DURATION_MS,
            walk_base_ms: WALK_BASE_MS,
            walk_step_ms: WALK_STEP_MS,
            render_tick_ms: RENDER_TICK_MS,
            snapshot_poll_ms: SNAPSHOT_POLL_MS,
            rotation_key: ROTATION_STORAGE_KEY.to_string(),
            rotation_max_age_secs: ROTATION_MAX_AGE_SECS,
        }
    }
}

impl WheelConfig {
    /// Duration of a forward walk that advanced `steps` sectors.
    pub fn walk_duration_ms(&self, steps: usize) -> f64 {
        self.walk_base_ms + steps as f64 * self.walk_step_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: WheelConfig = serde_json::from_str(r#"{"extra_rotations": 6}"#).unwrap();
        assert_eq!(config.extra_rotations, 6);
        assert_eq!(config.pointer_angle, 270.0);
        assert_eq!(config.rotation_key, "wheel_rotation");
    }

    #[test]
    fn walk_duration_grows_per_step() {
        let config = WheelConfig::default();
        assert_eq!(config.walk_duration_ms(1), 1200.0);
        assert_eq!(config.walk_duration_ms(3), 1600.0);
    }
}
