//! Pose target abstraction: the capability set both avatar backends expose so
//! the compositor stays backend-agnostic.
//!
//! The primitive rig applies layer functions by direct transform assignment;
//! the skeletal backend records the requested layer keys and resolves them to
//! clip playback when the frame is finished.

use glam::Vec2;

use crate::animations;
use crate::blend::BlendEngine;
use crate::clips::{self, ClipLibrary};
use crate::compositor::LayerState;
use crate::rig::{PrimitiveRig, RootTransform};
use crate::skeleton::Skeleton;

pub trait PoseTarget {
    /// Reset every controllable part to its rest transform.
    fn reset_to_neutral(&mut self);

    /// Universal breathing modifier, applied regardless of layer state.
    fn apply_breathing(&mut self, face: &str, t: f32);

    /// Idle head micro-motion (primitive rig only; clips carry their own).
    fn apply_head_bob(&mut self, t: f32);

    fn apply_body_pose(&mut self, key: &str, t: f32, progress: f32);
    fn apply_arms_pose(&mut self, key: &str, t: f32);
    fn apply_face_pose(&mut self, key: &str, t: f32);
    fn apply_full_pose(&mut self, key: &str, t: f32);

    /// Ground-plane position resolved by the locomotion machine.
    fn set_ground_position(&mut self, xz: Vec2);

    /// Heading resolved by the generic heading update. Not called for
    /// self-rotating poses, whose functions own the heading.
    fn set_heading(&mut self, heading: f32);

    /// Per-frame settling: clip mixers advance and look-at applies here.
    fn finish_frame(&mut self, dt: f32, mouse_x: f32);
}

impl PoseTarget for PrimitiveRig {
    fn reset_to_neutral(&mut self) {
        self.reset_defaults();
    }

    fn apply_breathing(&mut self, face: &str, t: f32) {
        animations::apply_breathing(&mut self.parts, face, t);
    }

    fn apply_head_bob(&mut self, t: f32) {
        animations::apply_head_bob(&mut self.parts, t);
    }

    fn apply_body_pose(&mut self, key: &str, t: f32, progress: f32) {
        animations::apply_body(key, self, t, progress);
    }

    fn apply_arms_pose(&mut self, key: &str, t: f32) {
        animations::apply_arms(key, &mut self.parts, t);
    }

    fn apply_face_pose(&mut self, key: &str, t: f32) {
        animations::apply_face(key, &mut self.parts, t);
    }

    fn apply_full_pose(&mut self, key: &str, t: f32) {
        animations::apply_full(key, self, t);
    }

    fn set_ground_position(&mut self, xz: Vec2) {
        // Runs before the layer functions; jump-fwd adds its own forward
        // displacement on top of this baseline.
        self.root.position.x = xz.x;
        self.root.position.z = xz.y;
    }

    fn set_heading(&mut self, heading: f32) {
        self.root.rotation.y = heading;
    }

    fn finish_frame(&mut self, _dt: f32, _mouse_x: f32) {}
}

/// Skeletal-mesh backend. Layer requests accumulate during the frame and are
/// resolved to clip playback in `finish_frame`, because the body/overlay
/// choice depends on all four layers at once.
pub struct SkeletalAvatar {
    pub skeleton: Skeleton,
    pub library: ClipLibrary,
    pub engine: BlendEngine,
    pub root: RootTransform,
    look_at_max_yaw: f32,
    pending: LayerState,
}

impl SkeletalAvatar {
    pub fn new(
        skeleton: Skeleton,
        library: ClipLibrary,
        crossfade: f32,
        look_at_max_yaw: f32,
    ) -> Self {
        Self {
            skeleton,
            library,
            engine: BlendEngine::new(crossfade),
            root: RootTransform::default(),
            look_at_max_yaw,
            pending: LayerState::default(),
        }
    }
}

impl PoseTarget for SkeletalAvatar {
    fn reset_to_neutral(&mut self) {
        self.skeleton.reset_to_bind();
        self.root.position = glam::Vec3::ZERO;
        self.root.rotation.x = 0.0;
        self.root.rotation.z = 0.0;
        self.pending = LayerState::default();
    }

    // Breathing and head bob are baked into the clips for this backend.
    fn apply_breathing(&mut self, _face: &str, _t: f32) {}
    fn apply_head_bob(&mut self, _t: f32) {}

    fn apply_body_pose(&mut self, key: &str, _t: f32, _progress: f32) {
        self.pending.body = key.to_string();
    }

    fn apply_arms_pose(&mut self, key: &str, _t: f32) {
        self.pending.arms = key.to_string();
    }

    fn apply_face_pose(&mut self, key: &str, _t: f32) {
        self.pending.face = key.to_string();
    }

    fn apply_full_pose(&mut self, key: &str, _t: f32) {
        self.pending.full = Some(key.to_string());
    }

    fn set_ground_position(&mut self, xz: Vec2) {
        self.root.position.x = xz.x;
        self.root.position.z = xz.y;
    }

    fn set_heading(&mut self, heading: f32) {
        self.root.rotation.y = heading;
    }

    fn finish_frame(&mut self, dt: f32, mouse_x: f32) {
        if self.skeleton.has_layers() {
            let resolved = clips::resolve_clip_layers(&self.pending);
            self.engine.play_body(
                &resolved.body_clip,
                &self.library,
                clips::should_loop(&resolved.body_clip),
                false,
            );
            match &resolved.upper_clip {
                Some(upper) => self.engine.play_upper(
                    upper,
                    &self.library,
                    &self.skeleton,
                    clips::should_loop(upper),
                    false,
                ),
                None => self.engine.clear_upper(),
            }
        } else {
            // No lower-body split to protect, so overlay blending would
            // fight the body clip; collapse the layers to one clip instead.
            let name = clips::resolve_clip_name(&self.pending);
            self.engine
                .play_body(&name, &self.library, clips::should_loop(&name), false);
            self.engine.clear_upper();
        }
        self.engine.update(dt, &mut self.skeleton);
        // Look-at after all blending so it is never overwritten
        self.skeleton
            .apply_look_at(mouse_x, self.look_at_max_yaw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clips::{BoneTrack, Clip};
    use crate::compositor::{resolve_frame, FrameInput};
    use crate::config::AvatarConfig;
    use crate::locomotion::SpatialState;
    use crate::skeleton::test_skeleton;

    fn clip(name: &str, bone: &str, y: f32) -> Clip {
        Clip {
            name: name.to_string(),
            duration: 1.0,
            tracks: vec![BoneTrack {
                bone: bone.to_string(),
                times: vec![0.0, 1.0],
                positions: Some(vec![[0.0, y, 0.0], [0.0, y, 0.0]]),
                rotations: None,
                scales: None,
            }],
        }
    }

    fn skeletal() -> SkeletalAvatar {
        let mut lib = ClipLibrary::default();
        lib.add("idle", clip("Idle", "mixamorigHips", 1.0));
        lib.add("walk", clip("Walking", "mixamorigHips", 2.0));
        lib.add("wave", clip("Waving", "mixamorigLeftArm", 5.0));
        lib.add("happy", clip("Happy Idle", "mixamorigLeftArm", 6.0));
        SkeletalAvatar::new(test_skeleton(), lib, 0.0, std::f32::consts::FRAC_PI_4)
    }

    #[test]
    fn frame_resolution_drives_clip_layers() {
        let config = AvatarConfig::default();
        let mut avatar = skeletal();
        let mut spatial = SpatialState::default();
        let layers = crate::compositor::LayerState {
            body: "step-front".to_string(),
            arms: "auto".to_string(),
            face: "happy".to_string(),
            full: None,
        };
        let input = FrameInput {
            now: 0.1,
            dt: 0.016,
            mouse_x: 0.0,
            auto_spin: false,
        };
        resolve_frame(&mut avatar, &layers, &mut spatial, input, &config);
        assert_eq!(avatar.engine.body_clip(), Some("walk"));
        assert_eq!(avatar.engine.upper_clip(), Some("happy"));
    }

    #[test]
    fn idle_with_overlay_promotes_to_body_slot() {
        let config = AvatarConfig::default();
        let mut avatar = skeletal();
        let mut spatial = SpatialState::default();
        let layers = crate::compositor::LayerState {
            arms: "wave".to_string(),
            ..crate::compositor::LayerState::default()
        };
        let input = FrameInput {
            now: 0.1,
            dt: 0.016,
            mouse_x: 0.0,
            auto_spin: false,
        };
        resolve_frame(&mut avatar, &layers, &mut spatial, input, &config);
        assert_eq!(avatar.engine.body_clip(), Some("wave"));
        assert_eq!(avatar.engine.upper_clip(), None);
    }

    #[test]
    fn unlayered_rig_collapses_to_single_clip() {
        use crate::skeleton::{Bone, Skeleton};

        // Upper-body bones only: no lower split, so no overlay blending
        let skeleton = Skeleton::new(vec![
            Bone::new("mixamorigSpine", None),
            Bone::new("mixamorigNeck", Some(0)),
            Bone::new("mixamorigHead", Some(1)),
            Bone::new("mixamorigLeftArm", Some(0)),
        ]);
        assert!(!skeleton.has_layers());

        let mut lib = ClipLibrary::default();
        lib.add("walk", clip("Walking", "mixamorigSpine", 2.0));
        lib.add("happy", clip("Happy Idle", "mixamorigLeftArm", 6.0));
        let mut avatar =
            SkeletalAvatar::new(skeleton, lib, 0.0, std::f32::consts::FRAC_PI_4);

        avatar.apply_body_pose("step-front", 0.0, 0.5);
        avatar.apply_face_pose("happy", 0.0);
        avatar.finish_frame(0.016, 0.0);

        // The busy body clip claims the whole skeleton; the overlay is dropped
        assert_eq!(avatar.engine.body_clip(), Some("walk"));
        assert_eq!(avatar.engine.upper_clip(), None);
        let spine = avatar.skeleton.bone_index("mixamorigSpine").unwrap();
        assert!((avatar.skeleton.bones()[spine].position.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn look_at_applies_after_blending() {
        let mut avatar = skeletal();
        avatar.reset_to_neutral();
        avatar.apply_body_pose("idle", 0.0, 1.0);
        avatar.finish_frame(0.016, 1.0);
        let head = avatar.skeleton.bone_index("mixamorigHead").unwrap();
        assert!(avatar.skeleton.bones()[head].rotation != glam::Quat::IDENTITY);
    }
}
