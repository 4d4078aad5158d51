//! Two-mixer blend engine for the skeletal backend.
//!
//! The body mixer drives the whole skeleton; the upper mixer replays a second
//! clip over the same skeleton for overlay gestures. Per frame the engine
//! advances the body mixer, snapshots the lower-body bones, advances the
//! upper mixer (which would otherwise clobber the legs) and restores the
//! snapshot, so overlay bones show the overlay clip while the lower body
//! keeps the body clip's pose.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clips::{Clip, ClipLibrary};
use crate::skeleton::{BoneSnapshot, Skeleton};

pub const DEFAULT_CROSSFADE: f32 = 0.3;

struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

struct Action {
    clip: Arc<Clip>,
    time: f32,
    weight: f32,
    fade: Option<Fade>,
    looping: bool,
}

impl Action {
    fn advance(&mut self, dt: f32) {
        self.time += dt;
        if self.looping {
            if self.clip.duration > 0.0 {
                self.time %= self.clip.duration;
            }
        } else {
            // One-shot: clamp on the final frame
            self.time = self.time.min(self.clip.duration);
        }

        if let Some(fade) = &mut self.fade {
            fade.elapsed += dt;
            let f = if fade.duration > 0.0 {
                (fade.elapsed / fade.duration).clamp(0.0, 1.0)
            } else {
                1.0
            };
            self.weight = fade.from + (fade.to - fade.from) * f;
            if f >= 1.0 {
                self.fade = None;
            }
        }
    }

    fn finished_fading_out(&self) -> bool {
        self.fade.is_none() && self.weight <= 0.0
    }
}

/// Weighted clip playback over one skeleton. Switching clips cross-fades;
/// repeated requests for the playing clip are no-ops unless forced.
#[derive(Default)]
pub struct Mixer {
    actions: Vec<Action>,
    current: Option<String>,
}

impl Mixer {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn play(&mut self, name: &str, clip: Arc<Clip>, looping: bool, crossfade: f32, force: bool) {
        if !force && self.current.as_deref() == Some(name) {
            return;
        }

        let fading_in = !self.actions.is_empty() && crossfade > 0.0;
        for action in &mut self.actions {
            action.fade = Some(Fade {
                from: action.weight,
                to: 0.0,
                elapsed: 0.0,
                duration: crossfade,
            });
        }

        self.actions.push(Action {
            clip,
            time: 0.0,
            weight: if fading_in { 0.0 } else { 1.0 },
            fade: fading_in.then_some(Fade {
                from: 0.0,
                to: 1.0,
                elapsed: 0.0,
                duration: crossfade,
            }),
            looping,
        });
        self.current = Some(name.to_string());
    }

    /// Fade everything out (overlay cleared).
    pub fn stop(&mut self, crossfade: f32) {
        for action in &mut self.actions {
            action.fade = Some(Fade {
                from: action.weight,
                to: 0.0,
                elapsed: 0.0,
                duration: crossfade,
            });
        }
        self.current = None;
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// True while any action still contributes, including ones fading out
    /// after a stop.
    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    /// True when the current clip is a one-shot that has reached its end.
    pub fn is_finished(&self) -> bool {
        match self.actions.last() {
            Some(action) => !action.looping && action.time >= action.clip.duration,
            None => true,
        }
    }

    /// Advance all actions and write the weight-blended pose into the
    /// skeleton. Bones no active track touches keep their current transform.
    pub fn update(&mut self, dt: f32, skeleton: &mut Skeleton) {
        for action in &mut self.actions {
            action.advance(dt);
        }
        self.actions.retain(|a| !a.finished_fading_out());

        // Sequential normalized blend: each action folds into the pose with
        // weight w / accumulated_w, so two half-weight actions average.
        let mut accumulated = vec![0.0f32; skeleton.len()];
        for action in &self.actions {
            if action.weight <= 0.0 {
                continue;
            }
            for track in &action.clip.tracks {
                let Some(i) = skeleton.bone_index(&track.bone) else {
                    continue;
                };
                let sampled = track.sample(action.time);
                let total = accumulated[i] + action.weight;
                let f = action.weight / total;
                accumulated[i] = total;
                let bone = skeleton.bone_mut(i);
                if let Some(p) = sampled.position {
                    bone.position = bone.position.lerp(p, f);
                }
                if let Some(r) = sampled.rotation {
                    bone.rotation = bone.rotation.slerp(r, f);
                }
                if let Some(s) = sampled.scale {
                    bone.scale = bone.scale.lerp(s, f);
                }
            }
        }
    }
}

/// The dual-mixer engine the skeletal pose target drives.
pub struct BlendEngine {
    body: Mixer,
    upper: Mixer,
    crossfade: f32,
    lower_snapshot: Vec<BoneSnapshot>,
    missing: HashSet<String>,
}

impl BlendEngine {
    pub fn new(crossfade: f32) -> Self {
        Self {
            body: Mixer::default(),
            upper: Mixer::default(),
            crossfade,
            lower_snapshot: Vec::new(),
            missing: HashSet::new(),
        }
    }

    // Requested every frame, so log only the first miss per clip name.
    fn warn_missing(&mut self, name: &str) {
        if self.missing.insert(name.to_string()) {
            warn!(clip = name, "no clip registered");
        }
    }

    pub fn body_clip(&self) -> Option<&str> {
        self.body.current()
    }

    pub fn upper_clip(&self) -> Option<&str> {
        self.upper.current()
    }

    /// Play on the body layer (whole skeleton).
    pub fn play_body(&mut self, name: &str, library: &ClipLibrary, looping: bool, force: bool) {
        if !force && self.body.current() == Some(name) {
            return;
        }
        match library.pick(name) {
            Some(clip) => {
                debug!(clip = name, layer = "body", "play");
                self.body.play(name, clip, looping, self.crossfade, force);
            }
            None => self.warn_missing(name),
        }
    }

    /// Play on the upper-body overlay layer.
    pub fn play_upper(
        &mut self,
        name: &str,
        library: &ClipLibrary,
        skeleton: &Skeleton,
        looping: bool,
        force: bool,
    ) {
        if !skeleton.has_layers() {
            // No lower-body split: the frame resolver collapses such rigs to
            // a single body clip, so there is no overlay to drive.
            return;
        }
        if !force && self.upper.current() == Some(name) {
            return;
        }
        match library.pick(name) {
            Some(clip) => {
                debug!(clip = name, layer = "upper", "play");
                self.upper.play(name, clip, looping, self.crossfade, force);
            }
            None => self.warn_missing(name),
        }
    }

    pub fn clear_upper(&mut self) {
        if self.upper.is_active() {
            self.upper.stop(self.crossfade);
        }
    }

    /// Advance both mixers. The lower-body snapshot protects the body clip's
    /// leg pose from the overlay pass.
    pub fn update(&mut self, dt: f32, skeleton: &mut Skeleton) {
        self.body.update(dt, skeleton);

        if self.upper.has_actions() && skeleton.has_layers() {
            skeleton.save_lower(&mut self.lower_snapshot);
            self.upper.update(dt, skeleton);
            let snapshot = std::mem::take(&mut self.lower_snapshot);
            skeleton.restore_lower(&snapshot);
            self.lower_snapshot = snapshot;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.body.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clips::BoneTrack;
    use crate::skeleton::test_skeleton;

    fn constant_clip(name: &str, bone: &str, y: f32) -> Clip {
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

    fn library() -> ClipLibrary {
        let mut lib = ClipLibrary::default();
        lib.add("idle", constant_clip("Idle", "mixamorigHips", 1.0));
        lib.add("walk", constant_clip("Walking", "mixamorigHips", 2.0));
        lib.add("wave", constant_clip("Waving", "mixamorigLeftArm", 5.0));
        lib.add(
            "wave-legs",
            constant_clip("Waving Legs", "mixamorigHips", 9.0),
        );
        lib
    }

    #[test]
    fn crossfade_converges_to_new_clip() {
        let mut skel = test_skeleton();
        let lib = library();
        let mut engine = BlendEngine::new(0.3);
        let hips = skel.bone_index("mixamorigHips").unwrap();

        engine.play_body("idle", &lib, true, false);
        engine.update(0.016, &mut skel);
        assert!((skel.bones()[hips].position.y - 1.0).abs() < 1e-5);

        engine.play_body("walk", &lib, true, false);
        // Mid-fade: between the two poses
        engine.update(0.15, &mut skel);
        let mid = skel.bones()[hips].position.y;
        assert!(mid > 1.0 && mid < 2.0, "mid-fade pose {mid}");
        // Past the fade: pure walk
        engine.update(0.3, &mut skel);
        assert!((skel.bones()[hips].position.y - 2.0).abs() < 1e-3);
    }

    #[test]
    fn replaying_current_clip_is_a_no_op() {
        let mut skel = test_skeleton();
        let lib = library();
        let mut engine = BlendEngine::new(0.3);
        engine.play_body("idle", &lib, true, false);
        engine.update(0.5, &mut skel);
        engine.play_body("idle", &lib, true, false);
        // Still one steady action at full weight, no restarted fade
        engine.update(0.016, &mut skel);
        let hips = skel.bone_index("mixamorigHips").unwrap();
        assert!((skel.bones()[hips].position.y - 1.0).abs() < 1e-5);
        assert_eq!(engine.body_clip(), Some("idle"));
    }

    #[test]
    fn overlay_preserves_lower_body() {
        let mut skel = test_skeleton();
        let lib = library();
        let mut engine = BlendEngine::new(0.0);

        engine.play_body("walk", &lib, true, false);
        // Overlay clip that (incorrectly) animates the hips too
        engine.play_upper("wave-legs", &lib, &skel, true, false);
        engine.update(0.016, &mut skel);

        let hips = skel.bone_index("mixamorigHips").unwrap();
        // Hips restored from the snapshot: body clip wins on lower body
        assert!((skel.bones()[hips].position.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn overlay_drives_upper_bones() {
        let mut skel = test_skeleton();
        let lib = library();
        let mut engine = BlendEngine::new(0.0);

        engine.play_body("walk", &lib, true, false);
        engine.play_upper("wave", &lib, &skel, true, false);
        engine.update(0.016, &mut skel);

        let arm = skel.bone_index("mixamorigLeftArm").unwrap();
        assert!((skel.bones()[arm].position.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn forced_replay_restarts_a_clamped_one_shot() {
        let mut skel = test_skeleton();
        let mut lib = ClipLibrary::default();
        // Ramp from 0 to 10 over one second, so the timeline position is
        // visible in the sampled pose
        lib.add(
            "jump",
            Clip {
                name: "Jump".to_string(),
                duration: 1.0,
                tracks: vec![BoneTrack {
                    bone: "mixamorigHips".to_string(),
                    times: vec![0.0, 1.0],
                    positions: Some(vec![[0.0, 0.0, 0.0], [0.0, 10.0, 0.0]]),
                    rotations: None,
                    scales: None,
                }],
            },
        );
        let mut engine = BlendEngine::new(0.0);
        let hips = skel.bone_index("mixamorigHips").unwrap();

        engine.play_body("jump", &lib, false, false);
        engine.update(2.0, &mut skel);
        assert!(engine.is_finished());
        assert!((skel.bones()[hips].position.y - 10.0).abs() < 1e-4);

        // Unforced replay of the playing clip stays clamped at the end
        engine.play_body("jump", &lib, false, false);
        engine.update(0.1, &mut skel);
        assert!(engine.is_finished());
        assert!((skel.bones()[hips].position.y - 10.0).abs() < 1e-4);

        // Forced replay restarts the timeline from zero
        engine.play_body("jump", &lib, false, true);
        assert!(!engine.is_finished());
        engine.update(0.1, &mut skel);
        assert!((skel.bones()[hips].position.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn missing_clip_warns_once_per_name() {
        let lib = library();
        let mut engine = BlendEngine::new(0.0);
        engine.play_body("ghost", &lib, true, false);
        engine.play_body("ghost", &lib, true, false);
        engine.play_body("phantom", &lib, true, false);
        assert_eq!(engine.missing.len(), 2);
        assert_eq!(engine.body_clip(), None);
    }

    #[test]
    fn one_shot_clamps_on_final_frame() {
        let mut skel = test_skeleton();
        let lib = library();
        let mut engine = BlendEngine::new(0.0);
        engine.play_body("idle", &lib, false, false);
        assert!(!engine.is_finished());
        engine.update(2.0, &mut skel);
        assert!(engine.is_finished());
        // Clamped, still posed at the final frame
        let hips = skel.bone_index("mixamorigHips").unwrap();
        assert!((skel.bones()[hips].position.y - 1.0).abs() < 1e-5);
    }
}
