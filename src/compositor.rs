//! Layer compositor: per-frame resolution of the four animation layers onto a
//! pose target, with reset-then-apply ordering and the self-rotation
//! exception for the heading update.

use crate::animations::{self, is_self_rotating};
use crate::config::AvatarConfig;
use crate::locomotion::SpatialState;
use crate::target::PoseTarget;

/// The four concurrent layer values. When `full` is set it is the sole
/// authority over the pose; body/arms/face are retained but not applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    pub body: String,
    pub arms: String,
    pub face: String,
    pub full: Option<String>,
}

impl Default for LayerState {
    fn default() -> Self {
        Self {
            body: "idle".to_string(),
            arms: "auto".to_string(),
            face: "auto".to_string(),
            full: None,
        }
    }
}

impl LayerState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The pose that decides self-rotation handling: full override when set,
    /// otherwise the body key.
    pub fn active_pose(&self) -> &str {
        self.full.as_deref().unwrap_or(&self.body)
    }

    /// Layer keys no animation function recognizes, for missing-capability
    /// feedback. Unknown keys still render as safe no-ops.
    pub fn unknown_keys(&self) -> Vec<String> {
        let mut unknown = Vec::new();
        for key in [
            Some(self.body.as_str()),
            Some(self.arms.as_str()),
            Some(self.face.as_str()),
            self.full.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            if !animations::is_known_key(key) {
                unknown.push(key.to_string());
            }
        }
        unknown
    }
}

/// Per-frame inputs from the render loop and pointer events.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    /// Animation clock, seconds since program start.
    pub now: f64,
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Normalized horizontal pointer offset in [-1, 1].
    pub mouse_x: f32,
    /// Continuous spin mode.
    pub auto_spin: bool,
}

/// Resolve one frame: reset, breathe, apply layers, resolve heading. The
/// target is handed back fully posed, ready for the renderer.
pub fn resolve_frame<T: PoseTarget>(
    target: &mut T,
    layers: &LayerState,
    spatial: &mut SpatialState,
    input: FrameInput,
    config: &AvatarConfig,
) {
    let t = input.now as f32;
    let sample = spatial.sample(input.now);

    target.reset_to_neutral();
    target.set_ground_position(sample.position);
    target.apply_breathing(&layers.face, t);

    if let Some(full) = &layers.full {
        // Full-body override controls everything; no other layer runs.
        target.apply_full_pose(full, t);
    } else {
        if layers.face != "sleeping" && layers.face != "tired" {
            target.apply_head_bob(t);
        }
        // Fixed order: later layers overwrite parts they own
        target.apply_body_pose(&layers.body, t, sample.progress);
        target.apply_arms_pose(&layers.arms, t);
        target.apply_face_pose(&layers.face, t);
    }

    // Heading: self-rotating poses manage it inside their own function.
    if !is_self_rotating(layers.active_pose()) {
        if spatial.is_turning() {
            target.set_heading(sample.heading);
        } else if input.auto_spin {
            spatial.heading += config.auto_spin_rate * input.dt;
            target.set_heading(spatial.heading);
        } else {
            let goal = input.mouse_x * config.max_yaw;
            let alpha = 1.0 - (-config.heading_smoothing * input.dt).exp();
            spatial.heading += (goal - spatial.heading) * alpha;
            target.set_heading(spatial.heading);
        }
    }

    target.finish_frame(input.dt, input.mouse_x);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::PrimitiveRig;

    fn neutral_input(now: f64) -> FrameInput {
        FrameInput {
            now,
            dt: 1.0 / 60.0,
            mouse_x: 0.0,
            auto_spin: false,
        }
    }

    #[test]
    fn resolve_is_idempotent_for_identical_state_and_time() {
        let config = AvatarConfig::default();
        let layers = LayerState {
            body: "sit".to_string(),
            arms: "wave".to_string(),
            face: "happy".to_string(),
            full: None,
        };

        let mut rig_a = PrimitiveRig::default();
        let mut spatial_a = SpatialState::default();
        resolve_frame(&mut rig_a, &layers, &mut spatial_a, neutral_input(2.5), &config);

        let mut rig_b = PrimitiveRig::default();
        let mut spatial_b = SpatialState::default();
        resolve_frame(&mut rig_b, &layers, &mut spatial_b, neutral_input(2.5), &config);

        assert_eq!(rig_a, rig_b);
    }

    #[test]
    fn full_override_excludes_other_layers() {
        let config = AvatarConfig::default();
        let mut rig = PrimitiveRig::default();
        let mut spatial = SpatialState::default();
        let layers = LayerState {
            body: "sit".to_string(),
            arms: "peace".to_string(),
            face: "happy".to_string(),
            full: Some("front-kick".to_string()),
        };
        resolve_frame(&mut rig, &layers, &mut spatial, neutral_input(0.0), &config);

        // sit would sink the root and peace would swap the hand mesh
        assert_eq!(rig.root.position.y, 0.0);
        assert!(!rig.parts.peace.visible);
        assert!(rig.parts.right_hand.visible);
        // front-kick's guard arms are present
        assert_eq!(rig.parts.right_elbow.rotation.x, -0.7);
    }

    #[test]
    fn self_rotating_full_key_skips_heading_update() {
        let config = AvatarConfig::default();
        let mut rig = PrimitiveRig::default();
        let mut spatial = SpatialState::default();
        let layers = LayerState {
            full: Some("twirl".to_string()),
            ..LayerState::default()
        };
        let input = FrameInput {
            now: 1.0,
            dt: 1.0 / 60.0,
            mouse_x: 1.0,
            auto_spin: true,
        };
        resolve_frame(&mut rig, &layers, &mut spatial, input, &config);

        // Neither auto-spin nor mouse easing touched the committed heading
        assert_eq!(spatial.heading, 0.0);
        // twirl drives the root rotation itself
        assert!((rig.root.rotation.y - 10.0).abs() < 1e-6);
    }

    #[test]
    fn auto_spin_advances_heading_each_frame() {
        let config = AvatarConfig::default();
        let mut rig = PrimitiveRig::default();
        let mut spatial = SpatialState::default();
        let layers = LayerState::default();
        let mut input = FrameInput {
            now: 0.0,
            dt: 1.0 / 60.0,
            mouse_x: 0.0,
            auto_spin: true,
        };
        resolve_frame(&mut rig, &layers, &mut spatial, input, &config);
        let one = spatial.heading;
        input.now += 1.0 / 60.0;
        resolve_frame(&mut rig, &layers, &mut spatial, input, &config);
        assert!((spatial.heading - 2.0 * one).abs() < 1e-6);
        assert!(one > 0.0);
    }

    #[test]
    fn heading_eases_toward_pointer() {
        let config = AvatarConfig::default();
        let mut rig = PrimitiveRig::default();
        let mut spatial = SpatialState::default();
        let layers = LayerState::default();
        let input = FrameInput {
            now: 0.0,
            dt: 1.0 / 60.0,
            mouse_x: 1.0,
            auto_spin: false,
        };
        let goal = config.max_yaw;
        for _ in 0..10 {
            resolve_frame(&mut rig, &layers, &mut spatial, input, &config);
        }
        assert!(spatial.heading > 0.0 && spatial.heading < goal);
        assert_eq!(rig.root.rotation.y, spatial.heading);
    }

    #[test]
    fn unknown_keys_reported_not_fatal() {
        let layers = LayerState {
            body: "moonwalk".to_string(),
            ..LayerState::default()
        };
        assert_eq!(layers.unknown_keys(), vec!["moonwalk".to_string()]);

        let config = AvatarConfig::default();
        let mut rig = PrimitiveRig::default();
        let mut spatial = SpatialState::default();
        resolve_frame(&mut rig, &layers, &mut spatial, neutral_input(1.0), &config);
        assert!(rig.all_finite());
    }
}
