//! Animation function library for the primitive rig.
//!
//! Each layer function takes a command key, the elapsed clock in seconds and
//! (for gestures) a progress fraction, and unconditionally writes every
//! transform it controls for that key. Callers reset the rig to neutral
//! before invoking. Unknown keys are no-ops, never errors.

use std::f32::consts::PI;

use glam::Vec3;

use crate::rig::{PrimitiveRig, RigParts};

pub const BODY_KEYS: &[&str] = &[
    "idle", "sit", "step-front", "step-back", "step-left", "step-right", "jump", "jump-fwd",
    "lie-up", "lie-side", "turn-left", "turn-right",
];

pub const ARM_KEYS: &[&str] = &[
    "auto", "wave", "hands-up", "thumbs-up", "peace", "pointing", "heart", "talk",
];

pub const FACE_KEYS: &[&str] = &[
    "auto", "happy", "angry", "laughing", "tired", "sleeping", "focused", "talking",
];

pub const FULL_KEYS: &[&str] = &["twirl", "front-kick", "roundhouse", "mr-bean"];

/// Body gestures that manage heading/position inside their own function and
/// are therefore exempt from the generic heading update.
pub const BODY_SELF_ROTATING: &[&str] = &["jump-fwd", "lie-up", "lie-side"];

/// Full-override keys that spin the avatar themselves.
pub const FULL_SELF_ROTATING: &[&str] = &["twirl", "roundhouse"];

pub fn is_self_rotating(key: &str) -> bool {
    BODY_SELF_ROTATING.contains(&key) || FULL_SELF_ROTATING.contains(&key)
}

/// True when some layer recognizes the key. Used to surface "missing
/// capability" hints for commands the library cannot express.
pub fn is_known_key(key: &str) -> bool {
    BODY_KEYS.contains(&key)
        || ARM_KEYS.contains(&key)
        || FACE_KEYS.contains(&key)
        || FULL_KEYS.contains(&key)
}

/// Universal breathing modifier: torso horizontal scale oscillation, slower
/// and deeper when the face layer is tired or sleeping. Applied every frame
/// regardless of layer state.
pub fn apply_breathing(parts: &mut RigParts, face: &str, t: f32) {
    let rate = match face {
        "sleeping" => 1.0,
        "tired" => 1.2,
        _ => 2.0,
    };
    let amp = if face == "tired" { 0.03 } else { 0.02 };
    parts.torso.scale.x = 1.0 + (t * rate).sin() * amp;
    parts.torso.scale.z = 1.0 + (t * rate).sin() * amp;
}

/// Idle head micro-motion. Skipped when the face is tired or sleeping, which
/// position the head themselves.
pub fn apply_head_bob(parts: &mut RigParts, t: f32) {
    parts.head_group.position.y += (t * 2.0).sin() * 0.015;
    parts.head_group.rotation.z = (t * 1.5).sin() * 0.03;
}

pub fn apply_body(name: &str, rig: &mut PrimitiveRig, t: f32, progress: f32) {
    let progress = progress.clamp(0.0, 1.0);
    let p = &mut rig.parts;
    match name {
        "idle" => {
            p.right_arm.rotation.x = (t * 2.0).sin() * 0.05;
            p.left_arm.rotation.x = -(t * 2.0).sin() * 0.05;
        }

        "step-front" | "step-back" | "step-left" | "step-right" => {
            // Leading leg depends on direction; the opposite arm swings.
            let is_left = name == "step-front" || name == "step-left";
            let (lead, trail, lead_arm, trail_arm) = if is_left {
                (
                    &mut p.left_leg,
                    &mut p.right_leg,
                    &mut p.right_arm,
                    &mut p.left_arm,
                )
            } else {
                (
                    &mut p.right_leg,
                    &mut p.left_leg,
                    &mut p.left_arm,
                    &mut p.right_arm,
                )
            };

            if progress < 0.4 {
                // Phase 1: lead leg lifts and swings forward
                let phase = progress / 0.4;
                lead.rotation.x = -0.5 * (phase * PI).sin();
                lead_arm.rotation.x = 0.4 * (phase * PI).sin();
            } else if progress < 0.7 {
                // Phase 2: lead plants, trail lifts
                let phase = (progress - 0.4) / 0.3;
                trail.rotation.x = -0.3 * (phase * PI).sin();
                trail_arm.rotation.x = 0.3 * (phase * PI).sin();
            }
            // Phase 3 (0.7-1.0): settle, legs already neutral from the reset

            rig.root.position.y = (progress * PI).sin() * 0.04;
            lead_arm.rotation.z = -0.08;
            trail_arm.rotation.z = 0.08;
        }

        "jump" => {
            if progress < 0.2 {
                let sq = progress / 0.2;
                rig.root.position.y = -0.15 * sq;
                p.left_leg.rotation.x = 0.3 * sq;
                p.right_leg.rotation.x = 0.3 * sq;
                p.right_arm.rotation.z = -0.2 * sq;
                p.left_arm.rotation.z = 0.2 * sq;
                p.head_group.rotation.x = 0.05 * sq;
            } else if progress < 0.6 {
                let air = (progress - 0.2) / 0.4;
                rig.root.position.y = (air * PI).sin() * 1.4;
                let arm_up = (air * 2.0).min(1.0);
                p.right_arm.rotation.z = 1.2 * arm_up;
                p.left_arm.rotation.z = -1.2 * arm_up;
                p.right_elbow.rotation.z = 0.3 * arm_up;
                p.left_elbow.rotation.z = -0.3 * arm_up;
                p.left_leg.rotation.x = -0.25;
                p.right_leg.rotation.x = -0.25;
                p.mouth.scale = Vec3::new(1.4, 0.6, 0.4);
                p.left_brow.position.y = 0.25;
                p.right_brow.position.y = 0.25;
            } else {
                let land = (progress - 0.6) / 0.4;
                rig.root.position.y = -0.15 * (1.0 - land);
                p.left_leg.rotation.x = 0.3 * (1.0 - land);
                p.right_leg.rotation.x = 0.3 * (1.0 - land);
                p.right_arm.rotation.z = 1.2 * (1.0 - land);
                p.left_arm.rotation.z = -1.2 * (1.0 - land);
            }
        }

        "jump-fwd" => {
            // Self-rotating: leaps out, turns around, leaps back.
            let range = 2.0;
            let full = progress * 2.0;
            let (dir_out, lin) = if full < 1.0 {
                (true, full)
            } else {
                (false, 2.0 - full)
            };
            rig.root.position.z += lin * range;
            rig.root.rotation.y = if dir_out { 0.0 } else { PI };
            let bounce = (lin * 3.0).fract();
            rig.root.position.y = (bounce * PI).sin() * 0.7;
            let leap = (bounce * PI).sin();
            p.right_arm.rotation.x = -0.5 * leap;
            p.left_arm.rotation.x = 0.3 * leap;
            p.right_leg.rotation.x = 0.3 * leap;
            p.left_leg.rotation.x = -0.4 * leap;
            p.mouth.scale = Vec3::new(1.3, 0.4 + leap * 0.3, 0.4);
            p.left_brow.position.y = 0.2 + leap * 0.04;
            p.right_brow.position.y = 0.2 + leap * 0.04;
        }

        "sit" => {
            rig.root.position.y = -0.4;
            p.left_leg.rotation.x = -1.4;
            p.right_leg.rotation.x = -1.4;
            p.right_arm.rotation.x = -0.6;
            p.right_arm.rotation.z = -0.12;
            p.left_arm.rotation.x = -0.6;
            p.left_arm.rotation.z = 0.12;
            p.right_elbow.rotation.x = -0.4;
            p.left_elbow.rotation.x = -0.4;
            p.head_group.rotation.x = 0.08;
            p.mouth.scale = Vec3::new(1.2, 0.3, 0.4);
            p.left_eye.scale.y = 0.85;
            p.right_eye.scale.y = 0.85;
        }

        "lie-up" => {
            rig.root.rotation.x = -PI / 2.0;
            rig.root.rotation.y = 0.0;
            rig.root.position.y = -0.7;
            rig.root.position.z = 1.0;
            p.right_arm.rotation.z = -0.2;
            p.left_arm.rotation.z = 0.2;
            p.left_eye.scale.y = 0.08;
            p.right_eye.scale.y = 0.08;
            p.mouth.scale = Vec3::new(1.0, 0.25, 0.4);
            p.left_brow.position.y = 0.19;
            p.right_brow.position.y = 0.19;
            p.left_brow.rotation.z = 0.05;
            p.right_brow.rotation.z = -0.05;
        }

        "lie-side" => {
            rig.root.rotation.z = PI / 2.0;
            rig.root.rotation.y = 0.0;
            rig.root.position.y = -0.5;
            p.head_group.rotation.z = -0.15;
            p.left_arm.rotation.z = -1.2;
            p.left_elbow.rotation.z = 1.0;
            p.right_arm.rotation.x = -0.2;
            p.right_arm.rotation.z = -0.1;
            p.left_leg.rotation.x = -0.2;
            p.right_leg.rotation.x = -0.35;
            p.left_eye.scale.y = 0.08;
            p.right_eye.scale.y = 0.08;
            p.mouth.scale = Vec3::new(0.9, 0.22, 0.4);
        }

        _ => {}
    }
}

pub fn apply_arms(name: &str, p: &mut RigParts, t: f32) {
    if name == "auto" {
        return;
    }

    // Layer-local reset: arms override whatever hints the body layer set.
    p.left_arm.rotation = Vec3::ZERO;
    p.right_arm.rotation = Vec3::ZERO;
    p.left_elbow.rotation = Vec3::ZERO;
    p.right_elbow.rotation = Vec3::ZERO;

    match name {
        "wave" => {
            p.right_arm.rotation.z = 1.5;
            p.right_arm.rotation.x = 0.3;
            p.right_elbow.rotation.z = 0.8 + (t * 6.0).sin() * 0.3;
            p.left_arm.rotation.z = 0.08;
            p.left_arm.rotation.x = (t * 2.0).sin() * 0.05;
        }

        "hands-up" => {
            p.right_arm.rotation.z = 1.4;
            p.right_arm.rotation.x = 0.2;
            p.left_arm.rotation.z = -1.4;
            p.left_arm.rotation.x = 0.2;
            p.right_elbow.rotation.z = 0.7 + (t * 3.0).sin() * 0.1;
            p.left_elbow.rotation.z = -0.7 - (t * 3.0).sin() * 0.1;
        }

        "thumbs-up" => {
            p.right_hand.visible = false;
            p.thumbs_up.visible = true;
            p.right_arm.rotation.z = 1.0;
            p.right_arm.rotation.x = 0.3;
            p.right_elbow.rotation.z = 0.5;
            p.left_arm.rotation.x = (t * 2.0).sin() * 0.05;
        }

        "peace" => {
            p.right_hand.visible = false;
            p.peace.visible = true;
            p.right_arm.rotation.z = 1.3;
            p.right_arm.rotation.x = 0.4;
            p.right_elbow.rotation.z = 0.6;
            p.left_arm.rotation.z = 0.3;
            p.left_arm.rotation.x = -0.2;
        }

        "pointing" => {
            p.right_hand.visible = false;
            p.pointing.visible = true;
            p.right_arm.rotation.x = -1.3;
            p.right_arm.rotation.z = -0.1;
            p.left_arm.rotation.x = (t * 2.0).sin() * 0.03;
        }

        "heart" => {
            p.heart.visible = true;
            p.heart.position.y = 2.15 + (t * 2.0).sin() * 0.06;
            p.heart.rotation.y = (t * 1.5).sin() * 0.3;
            let scale = 2.5 + (t * 3.0).sin() * 0.15;
            p.heart.scale = Vec3::splat(scale);
            p.right_arm.rotation.z = -0.8;
            p.right_arm.rotation.x = -0.5;
            p.left_arm.rotation.z = 0.8;
            p.left_arm.rotation.x = -0.5;
            p.right_elbow.rotation.x = -0.8;
            p.left_elbow.rotation.x = -0.8;
        }

        "talk" => {
            p.right_arm.rotation.z = -0.4 + (t * 3.0).sin() * 0.2;
            p.right_arm.rotation.x = -0.3 + (t * 2.5).sin() * 0.15;
            p.left_arm.rotation.z = 0.3 - (t * 2.7).sin() * 0.15;
            p.left_arm.rotation.x = -0.2 + (t * 2.2).cos() * 0.12;
        }

        _ => {}
    }
}

pub fn apply_face(name: &str, p: &mut RigParts, t: f32) {
    if name == "auto" {
        return;
    }

    match name {
        "happy" => {
            p.mouth.scale = Vec3::new(1.6, 0.5, 0.4);
            p.left_eye.scale.y = 0.85;
            p.right_eye.scale.y = 0.85;
            p.left_brow.position.y = 0.23;
            p.right_brow.position.y = 0.23;
        }

        "angry" => {
            p.left_brow.rotation.z = -0.25;
            p.right_brow.rotation.z = 0.25;
            p.left_brow.position.y = 0.16;
            p.right_brow.position.y = 0.16;
            p.left_eye.scale.y = 0.65;
            p.right_eye.scale.y = 0.65;
            p.mouth.scale = Vec3::new(1.0, 0.25, 0.4);
            p.mouth.position.y = -0.18;
            p.head_group.rotation.x = -0.1;
            // Head micro-tremor
            p.head_group.rotation.z = (t * 25.0).sin() * 0.02;
        }

        "laughing" => {
            p.mouth.scale = Vec3::new(1.5, 0.7 + (t * 6.0).sin().abs() * 0.3, 0.4);
            p.left_eye.scale.y = 0.4;
            p.right_eye.scale.y = 0.4;
            p.left_brow.position.y = 0.24;
            p.right_brow.position.y = 0.24;
            p.head_group.rotation.x = 0.1;
            p.head_group.rotation.z = (t * 3.0).sin() * 0.06;
        }

        "tired" => {
            p.head_group.position.y = 1.28;
            p.head_group.rotation.x = 0.15 + (t * 0.8).sin() * 0.05;
            p.left_eye.scale.y = 0.35;
            p.right_eye.scale.y = 0.35;
            p.left_brow.position.y = 0.17;
            p.right_brow.position.y = 0.17;
            p.left_brow.rotation.z = 0.05;
            p.right_brow.rotation.z = -0.05;
            // Periodic yawn
            let cycle = (t * 0.3).fract();
            let open = if cycle < 0.3 {
                (cycle / 0.3 * PI).sin() * 0.8
            } else {
                0.0
            };
            p.mouth.scale = Vec3::new(1.1 + open * 0.3, 0.3 + open * 0.6, 0.4);
        }

        "sleeping" => {
            p.head_group.position.y = 1.25;
            p.head_group.rotation.x = 0.3;
            p.head_group.rotation.z = (t * 0.5).sin() * 0.04;
            p.left_eye.scale.y = 0.05;
            p.right_eye.scale.y = 0.05;
            p.left_brow.position.y = 0.18;
            p.right_brow.position.y = 0.18;
            p.left_brow.rotation.z = 0.05;
            p.right_brow.rotation.z = -0.05;
            p.mouth.scale = Vec3::new(0.8, 0.2, 0.4);
        }

        "focused" => {
            p.left_brow.position.y = 0.18;
            p.right_brow.position.y = 0.22;
            p.left_brow.rotation.z = 0.0;
            p.right_brow.rotation.z = -0.2;
            p.mouth.scale = Vec3::new(1.0, 0.3, 0.4);
        }

        "talking" => {
            p.head_group.position.y = 1.3 + (t * 3.0).sin() * 0.02;
            p.head_group.rotation.z = (t * 2.5).sin() * 0.06;
            p.head_group.rotation.x = (t * 1.8).sin() * 0.04;
            // Mouth oscillates faster than breathing
            p.mouth.scale.y = 0.35 + (t * 8.0).sin().abs() * 0.65;
        }

        _ => {}
    }
}

pub fn apply_full(name: &str, rig: &mut PrimitiveRig, t: f32) {
    let p = &mut rig.parts;
    match name {
        "twirl" => {
            rig.root.rotation.y = t * 10.0;
            p.right_leg.rotation.x = -0.3;
            p.right_leg.rotation.z = -0.6;
            p.right_arm.rotation.x = -0.6;
            p.right_arm.rotation.z = -0.35;
            p.left_arm.rotation.x = -0.6;
            p.left_arm.rotation.z = 0.35;
            p.right_elbow.rotation.x = -0.6;
            p.left_elbow.rotation.x = -0.6;
            rig.root.position.y = 0.06;
            p.mouth.scale = Vec3::new(1.2, 0.35, 0.4);
            p.left_eye.scale.y = 0.8;
            p.right_eye.scale.y = 0.8;
        }

        "front-kick" => {
            let cycle = (t * 2.0).fract();
            p.right_arm.rotation.x = -0.35;
            p.right_arm.rotation.z = -0.2;
            p.right_elbow.rotation.x = -0.7;
            p.left_arm.rotation.x = -0.35;
            p.left_arm.rotation.z = 0.2;
            p.left_elbow.rotation.x = -0.7;
            if cycle < 0.25 {
                let chamber = cycle / 0.25;
                p.right_leg.rotation.x = -0.8 * chamber;
            } else if cycle < 0.45 {
                let snap = (cycle - 0.25) / 0.2;
                p.right_leg.rotation.x = -0.8 - 0.5 * snap;
                p.head_group.rotation.x = 0.06 * snap;
                p.mouth.scale = Vec3::new(1.4, 0.55, 0.4);
                p.left_eye.scale.y = 0.75;
                p.right_eye.scale.y = 0.75;
            } else if cycle < 0.65 {
                p.right_leg.rotation.x = -1.3;
                p.head_group.rotation.x = 0.06;
                p.mouth.scale = Vec3::new(1.4, 0.55, 0.4);
            } else {
                let retract = (cycle - 0.65) / 0.35;
                p.right_leg.rotation.x = -1.3 * (1.0 - retract);
                p.head_group.rotation.x = 0.06 * (1.0 - retract);
            }
        }

        "roundhouse" => {
            let cycle = (t * 1.2).fract();
            p.right_arm.rotation.x = -0.3;
            p.right_arm.rotation.z = 0.3;
            p.left_arm.rotation.x = -0.3;
            p.left_arm.rotation.z = -0.3;
            p.right_elbow.rotation.x = -0.5;
            p.left_elbow.rotation.x = -0.5;
            if cycle < 0.2 {
                let chamber = cycle / 0.2;
                p.right_leg.rotation.x = -0.7 * chamber;
                p.right_leg.rotation.z = -0.3 * chamber;
                rig.root.rotation.y = 0.0;
            } else if cycle < 0.6 {
                let ext = (cycle - 0.2) / 0.4;
                rig.root.rotation.y = -PI * 1.5 * ext;
                p.right_leg.rotation.x = -0.7 - 0.5 * ext;
                p.right_leg.rotation.z = -0.3 - 0.5 * ext;
                p.left_leg.rotation.x = 0.1;
                p.head_group.rotation.x = -0.08;
                p.mouth.scale = Vec3::new(1.4, 0.55, 0.4);
                p.left_eye.scale.y = 0.7;
                p.right_eye.scale.y = 0.7;
                p.left_brow.rotation.z = -0.2;
                p.right_brow.rotation.z = 0.2;
                p.left_brow.position.y = 0.17;
                p.right_brow.position.y = 0.17;
            } else {
                let recover = (cycle - 0.6) / 0.4;
                rig.root.rotation.y = -PI * 1.5 * (1.0 - recover);
                p.right_leg.rotation.x = -1.2 * (1.0 - recover);
                p.right_leg.rotation.z = -0.8 * (1.0 - recover);
            }
        }

        "mr-bean" => {
            let k1 = (t * 4.0).sin().max(0.0);
            let k2 = (t * 4.0 + PI).sin().max(0.0);
            p.right_leg.rotation.x = -k1 * 0.9;
            p.left_leg.rotation.x = -k2 * 0.9;
            p.right_arm.rotation.x = (t * 5.3).sin() * 0.8;
            p.right_arm.rotation.z = 0.5 + (t * 6.1).sin() * 0.4;
            p.left_arm.rotation.x = (t * 3.7).sin() * 0.7;
            p.left_arm.rotation.z = -0.5 - (t * 4.3).sin() * 0.35;
            p.right_elbow.rotation.x = -0.8 + (t * 7.0).sin() * 0.3;
            p.left_elbow.rotation.x = -0.8 + (t * 5.0).sin() * 0.3;
            p.head_group.rotation.z = (t * 7.2).sin() * 0.15;
            p.head_group.rotation.x = (t * 4.8).sin() * 0.12;
            rig.root.position.y = (t * 4.0).sin().abs() * 0.1;
            p.mouth.scale = Vec3::new(1.5, 0.4 + (t * 3.0).sin().abs() * 0.4, 0.4);
            p.left_eye.scale.y = 0.6 + (t * 5.0).sin() * 0.3;
            p.right_eye.scale.y = 0.6 + (t * 5.5).sin() * 0.3;
            p.left_brow.position.y = 0.2 + (t * 6.0).sin() * 0.06;
            p.right_brow.position.y = 0.2 + (t * 4.0).sin() * 0.06;
        }

        _ => {}
    }
}
