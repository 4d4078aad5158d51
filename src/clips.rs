//! Clip catalog and layer-to-clip resolution for the skeletal backend.
//!
//! A clip is a named, fixed-duration set of keyframed bone tracks. Each
//! command name may resolve to several interchangeable takes ("Talking 1",
//! "Talking 2", ...); the library picks one at random per playback.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Quat, Vec3};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::compositor::LayerState;

/// Command name → animation file base name. The loader probes for the exact
/// file first, then numbered variants until one is missing. Dropping extra
/// files into the animations directory picks them up with no code changes.
pub const CLIP_FILES: &[(&str, &str)] = &[
    // Body
    ("idle", "Idle"),
    ("walk", "Walking"),
    ("sit", "Sitting"),
    ("jump", "Jump"),
    ("lie-down", "Lying Down"),
    ("crouch", "Crouch To Stand"),
    ("turn-left", "Left Turn"),
    ("turn-right", "Right Turn"),
    ("dying", "Dying"),
    // Arms / gestures
    ("wave", "Waving"),
    ("hands-up", "Hands Up"),
    ("thumbs-up", "Thumbs Up"),
    ("peace", "Peace Sign"),
    ("pointing", "Pointing"),
    ("heart", "Blow Kiss"),
    ("talk", "Talking"),
    ("pray", "Praying"),
    ("clap", "Standing Clap"),
    // Face / expressions
    ("happy", "Happy Idle"),
    ("angry", "Angry"),
    ("laughing", "Laughing"),
    ("tired", "Yawning"),
    ("sleeping", "Sleeping Idle"),
    ("focused", "Thinking"),
    ("talking", "Talking"),
    // Full-body overrides
    ("twirl", "Spin"),
    ("front-kick", "Front Kick"),
    ("roundhouse", "Roundhouse Kick"),
    ("mr-bean", "Silly Dancing"),
    ("breakdance", "Breakdance Uprock Var 2"),
    ("twerk", "Dancing Twerk"),
    ("joyful-jump", "Joyful Jump"),
    ("pose", "Female Standing Pose"),
];

const STEP_BODIES: &[&str] = &["step-front", "step-back", "step-left", "step-right"];
const TURN_BODIES: &[&str] = &["turn-left", "turn-right"];

/// Clips that play once and clamp on their final frame.
const ONE_SHOT: &[&str] = &[
    "jump", "joyful-jump", "front-kick", "roundhouse", "twirl",
    "wave", "thumbs-up", "peace", "pointing", "heart",
    "tired", "crouch", "clap", "breakdance",
];

pub fn should_loop(clip_name: &str) -> bool {
    !ONE_SHOT.contains(&clip_name)
}

/// Body clip plus optional upper-body overlay resolved from the layer state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipLayers {
    pub body_clip: String,
    pub upper_clip: Option<String>,
}

/// Resolve the layer state to separate body and upper-body clips, so walking
/// and waving can play simultaneously.
///
/// When body is idle with an overlay, the overlay is promoted to the body
/// slot: a dedicated wave/happy clip looks better than layering on idle.
pub fn resolve_clip_layers(layers: &LayerState) -> ClipLayers {
    if let Some(full) = &layers.full {
        return ClipLayers {
            body_clip: full.clone(),
            upper_clip: None,
        };
    }

    let body = layers.body.as_str();
    let mut body_clip = "idle";
    if STEP_BODIES.contains(&body) {
        body_clip = "walk";
    } else if TURN_BODIES.contains(&body) {
        body_clip = body;
    } else if !body.is_empty() && body != "idle" {
        body_clip = body;
    }

    // Arms gestures take priority over face expressions
    let mut upper_clip = None;
    if layers.arms != "auto" && !layers.arms.is_empty() {
        upper_clip = Some(layers.arms.clone());
    } else if layers.face != "auto" && !layers.face.is_empty() {
        upper_clip = Some(layers.face.clone());
    }

    if body_clip == "idle" {
        if let Some(upper) = upper_clip {
            return ClipLayers {
                body_clip: upper,
                upper_clip: None,
            };
        }
    }

    ClipLayers {
        body_clip: body_clip.to_string(),
        upper_clip,
    }
}

/// Single-clip fallback for rigs without a lower-body bone split. Same
/// resolution as the layered form, except the overlay is dropped whenever a
/// non-idle body clip claims the skeleton.
pub fn resolve_clip_name(layers: &LayerState) -> String {
    let resolved = resolve_clip_layers(layers);
    resolved.body_clip
}

// ── Clip data ─────────────────────────────────────────────

/// Keyframed channels for one bone. Channels are optional; a missing channel
/// leaves that component of the bone untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneTrack {
    pub bone: String,
    pub times: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<[f32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotations: Option<Vec<[f32; 4]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<Vec<[f32; 3]>>,
}

/// One sampled bone pose. `None` channels defer to the current bone value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackSample {
    pub position: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
}

impl BoneTrack {
    /// Sample the track at `time` seconds with linear/slerp interpolation,
    /// clamping outside the keyframe range.
    pub fn sample(&self, time: f32) -> TrackSample {
        if self.times.is_empty() {
            return TrackSample::default();
        }
        let (i0, i1, f) = self.segment(time);
        TrackSample {
            position: self.positions.as_ref().map(|keys| {
                Vec3::from_array(keys[i0]).lerp(Vec3::from_array(keys[i1]), f)
            }),
            rotation: self.rotations.as_ref().map(|keys| {
                Quat::from_array(keys[i0]).slerp(Quat::from_array(keys[i1]), f)
            }),
            scale: self.scales.as_ref().map(|keys| {
                Vec3::from_array(keys[i0]).lerp(Vec3::from_array(keys[i1]), f)
            }),
        }
    }

    fn segment(&self, time: f32) -> (usize, usize, f32) {
        let n = self.times.len();
        if time <= self.times[0] || n == 1 {
            return (0, 0, 0.0);
        }
        if time >= self.times[n - 1] {
            return (n - 1, n - 1, 0.0);
        }
        let i1 = self.times.partition_point(|&k| k <= time).min(n - 1);
        let i0 = i1 - 1;
        let span = self.times[i1] - self.times[i0];
        let f = if span > 0.0 {
            (time - self.times[i0]) / span
        } else {
            0.0
        };
        (i0, i1, f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<BoneTrack>,
}

/// Clips keyed by command name, 1..N interchangeable takes per name.
#[derive(Debug, Default)]
pub struct ClipLibrary {
    clips: HashMap<String, Vec<Arc<Clip>>>,
}

impl ClipLibrary {
    pub fn add(&mut self, command: impl Into<String>, clip: Clip) {
        self.clips.entry(command.into()).or_default().push(Arc::new(clip));
    }

    pub fn has(&self, command: &str) -> bool {
        self.clips.contains_key(command)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Pick a take for the command, random among variants.
    pub fn pick(&self, command: &str) -> Option<Arc<Clip>> {
        let variants = self.clips.get(command)?;
        variants.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn variant_count(&self, command: &str) -> usize {
        self.clips.get(command).map_or(0, |v| v.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers(body: &str, arms: &str, face: &str, full: Option<&str>) -> LayerState {
        LayerState {
            body: body.to_string(),
            arms: arms.to_string(),
            face: face.to_string(),
            full: full.map(|s| s.to_string()),
        }
    }

    #[test]
    fn promotion_rule_for_idle_with_overlay() {
        let resolved = resolve_clip_layers(&layers("idle", "wave", "auto", None));
        assert_eq!(resolved.body_clip, "wave");
        assert_eq!(resolved.upper_clip, None);
    }

    #[test]
    fn step_body_keeps_face_overlay() {
        let resolved = resolve_clip_layers(&layers("step-front", "auto", "happy", None));
        assert_eq!(resolved.body_clip, "walk");
        assert_eq!(resolved.upper_clip, Some("happy".to_string()));
    }

    #[test]
    fn full_wins_over_everything() {
        let resolved = resolve_clip_layers(&layers("step-left", "wave", "happy", Some("twirl")));
        assert_eq!(resolved.body_clip, "twirl");
        assert_eq!(resolved.upper_clip, None);
    }

    #[test]
    fn arms_take_priority_over_face() {
        let resolved = resolve_clip_layers(&layers("sit", "wave", "happy", None));
        assert_eq!(resolved.body_clip, "sit");
        assert_eq!(resolved.upper_clip, Some("wave".to_string()));
    }

    #[test]
    fn turns_resolve_verbatim() {
        let resolved = resolve_clip_layers(&layers("turn-left", "auto", "auto", None));
        assert_eq!(resolved.body_clip, "turn-left");
        assert_eq!(resolved.upper_clip, None);
    }

    #[test]
    fn single_clip_fallback_drops_overlay_under_busy_body() {
        assert_eq!(resolve_clip_name(&layers("sit", "wave", "auto", None)), "sit");
        assert_eq!(resolve_clip_name(&layers("step-front", "auto", "happy", None)), "walk");
        assert_eq!(resolve_clip_name(&layers("idle", "wave", "auto", None)), "wave");
        assert_eq!(resolve_clip_name(&layers("idle", "auto", "happy", None)), "happy");
        assert_eq!(
            resolve_clip_name(&layers("sit", "wave", "auto", Some("twirl"))),
            "twirl"
        );
        assert_eq!(resolve_clip_name(&layers("idle", "auto", "auto", None)), "idle");
    }

    #[test]
    fn loop_tagging() {
        assert!(should_loop("idle"));
        assert!(should_loop("walk"));
        assert!(!should_loop("jump"));
        assert!(!should_loop("wave"));
        assert!(!should_loop("roundhouse"));
    }

    #[test]
    fn track_sampling_interpolates_and_clamps() {
        let track = BoneTrack {
            bone: "mixamorigHips".to_string(),
            times: vec![0.0, 1.0, 2.0],
            positions: Some(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 2.0, 0.0]]),
            rotations: None,
            scales: None,
        };
        let mid = track.sample(0.5).position.unwrap();
        assert!((mid.x - 0.5).abs() < 1e-6);
        let clamped = track.sample(5.0).position.unwrap();
        assert_eq!(clamped, Vec3::new(1.0, 2.0, 0.0));
        let before = track.sample(-1.0).position.unwrap();
        assert_eq!(before, Vec3::ZERO);
        assert!(track.sample(0.5).rotation.is_none());
    }

    #[test]
    fn library_supports_variants() {
        let mut lib = ClipLibrary::default();
        for i in 0..3 {
            lib.add(
                "talking",
                Clip {
                    name: format!("Talking {i}"),
                    duration: 1.0,
                    tracks: vec![],
                },
            );
        }
        assert_eq!(lib.variant_count("talking"), 3);
        assert!(lib.pick("talking").is_some());
        assert!(lib.pick("absent").is_none());
    }
}
