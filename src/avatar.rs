//! Avatar orchestrator: owns the layer state, the locomotion state and one of
//! the two backends, and threads them through the compositor every frame.

use std::time::Instant;

use tracing::debug;

use crate::autopilot::AnimationCommand;
use crate::compositor::{self, FrameInput, LayerState};
use crate::config::AvatarConfig;
use crate::error::AvatarError;
use crate::locomotion::SpatialState;
use crate::rig::PrimitiveRig;
use crate::target::SkeletalAvatar;

pub enum Backend {
    Primitive(PrimitiveRig),
    Skeletal(SkeletalAvatar),
}

pub struct Avatar {
    pub layers: LayerState,
    pub spatial: SpatialState,
    pub backend: Backend,
    pub config: AvatarConfig,
    pub auto_spin: bool,
    pub mouse_x: f32,
    epoch: Instant,
}

impl Avatar {
    pub fn new(backend: Backend, config: AvatarConfig) -> Self {
        Self {
            layers: LayerState::default(),
            spatial: SpatialState::default(),
            backend,
            config,
            auto_spin: false,
            mouse_x: 0.0,
            epoch: Instant::now(),
        }
    }

    pub fn primitive(config: AvatarConfig) -> Self {
        Self::new(Backend::Primitive(PrimitiveRig::default()), config)
    }

    /// Seconds since the avatar was created; the shared animation clock.
    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Select a body key, restarting its gesture even when the key is
    /// already active.
    pub fn set_body(&mut self, key: &str, now: f64, duration: f64) {
        self.layers.body = key.to_string();
        self.spatial.begin(key, now, duration, &self.config);
    }

    pub fn set_arms(&mut self, key: &str) {
        self.layers.arms = key.to_string();
    }

    pub fn set_face(&mut self, key: &str) {
        self.layers.face = key.to_string();
    }

    pub fn set_full(&mut self, key: Option<&str>) {
        self.layers.full = key.map(|k| k.to_string());
    }

    /// Apply an autopilot command's layer values. A full command forces the
    /// other layers to neutral; a non-full command clears any full override.
    ///
    /// Keys no animation recognizes fail with `MissingCapability` listing
    /// them; the command still takes effect, with those keys rendering as
    /// no-ops.
    pub fn apply_command(&mut self, cmd: &AnimationCommand, now: f64) -> Result<(), AvatarError> {
        self.spatial.commit(now);
        let duration = cmd.duration.unwrap_or(self.config.default_duration) as f64;

        if let Some(full) = &cmd.full {
            self.set_full(Some(full));
            self.set_body("idle", now, duration);
            self.set_arms("auto");
            self.set_face("auto");
        } else {
            self.set_full(None);
            self.set_body(cmd.body.as_deref().unwrap_or("idle"), now, duration);
            self.set_arms(cmd.arms.as_deref().unwrap_or("auto"));
            self.set_face(cmd.face.as_deref().unwrap_or("auto"));
        }

        let unknown = self.layers.unknown_keys();
        if unknown.is_empty() {
            Ok(())
        } else {
            debug!(?unknown, "command contains keys with no animation");
            Err(AvatarError::MissingCapability(unknown.join(", ")))
        }
    }

    /// Reset layers, and spatial state when the configured stop policy says
    /// so, back to the idle baseline.
    pub fn reset(&mut self, reset_spatial: bool) {
        self.layers.reset();
        if reset_spatial {
            self.spatial.reset();
        }
    }

    /// Recompute the backend's transforms for one rendered frame.
    pub fn update(&mut self, now: f64, dt: f32) {
        let input = FrameInput {
            now,
            dt,
            mouse_x: self.mouse_x,
            auto_spin: self.auto_spin,
        };
        match &mut self.backend {
            Backend::Primitive(rig) => {
                compositor::resolve_frame(rig, &self.layers, &mut self.spatial, input, &self.config)
            }
            Backend::Skeletal(skeletal) => compositor::resolve_frame(
                skeletal,
                &self.layers,
                &mut self.spatial,
                input,
                &self.config,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn avatar() -> Avatar {
        Avatar::primitive(AvatarConfig::default())
    }

    #[test]
    fn full_command_forces_other_layers_neutral() {
        let mut a = avatar();
        a.set_arms("wave");
        let cmd = AnimationCommand {
            full: Some("twirl".to_string()),
            ..AnimationCommand::default()
        };
        a.apply_command(&cmd, 0.0).unwrap();
        assert_eq!(a.layers.full.as_deref(), Some("twirl"));
        assert_eq!(a.layers.body, "idle");
        assert_eq!(a.layers.arms, "auto");
        assert_eq!(a.layers.face, "auto");
    }

    #[test]
    fn non_full_command_clears_override() {
        let mut a = avatar();
        a.set_full(Some("mr-bean"));
        let cmd = AnimationCommand {
            body: Some("sit".to_string()),
            face: Some("happy".to_string()),
            ..AnimationCommand::default()
        };
        a.apply_command(&cmd, 0.0).unwrap();
        assert_eq!(a.layers.full, None);
        assert_eq!(a.layers.body, "sit");
        assert_eq!(a.layers.face, "happy");
    }

    #[test]
    fn step_command_moves_committed_position() {
        let mut a = avatar();
        let cmd = AnimationCommand {
            body: Some("step-front".to_string()),
            duration: Some(2.0),
            ..AnimationCommand::default()
        };
        a.apply_command(&cmd, 0.0).unwrap();
        a.update(2.0, 0.016);
        assert!((a.spatial.position - Vec2::new(0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn unknown_keys_reported() {
        let mut a = avatar();
        let cmd = AnimationCommand {
            body: Some("moonwalk".to_string()),
            arms: Some("juggle".to_string()),
            ..AnimationCommand::default()
        };
        let err = a.apply_command(&cmd, 0.0).unwrap_err();
        match err {
            AvatarError::MissingCapability(keys) => assert_eq!(keys, "moonwalk, juggle"),
            other => panic!("unexpected error {other:?}"),
        }
        // The command still landed; the unknown keys just render nothing
        assert_eq!(a.layers.body, "moonwalk");
    }
}
