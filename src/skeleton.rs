//! Named bone set for the skeletal-mesh backend.
//!
//! The mesh itself is a renderer asset; the core only sees bone names and
//! local transforms. Bone names follow the Mixamo convention the clip files
//! use, with the upper-body subset split out for overlay blending.

use std::collections::HashMap;

use glam::{Quat, Vec3};

/// Mixamo upper-body bone names (spine, arms, head + fingers). Everything
/// else counts as lower body and keeps the body clip's pose under an overlay.
pub const UPPER_BONE_NAMES: &[&str] = &[
    "mixamorigSpine", "mixamorigSpine1", "mixamorigSpine2",
    "mixamorigNeck", "mixamorigHead", "mixamorigHeadTop_End",
    "mixamorigLeftShoulder", "mixamorigLeftArm", "mixamorigLeftForeArm", "mixamorigLeftHand",
    "mixamorigLeftHandThumb1", "mixamorigLeftHandThumb2", "mixamorigLeftHandThumb3",
    "mixamorigLeftHandIndex1", "mixamorigLeftHandIndex2", "mixamorigLeftHandIndex3",
    "mixamorigLeftHandMiddle1", "mixamorigLeftHandMiddle2", "mixamorigLeftHandMiddle3",
    "mixamorigLeftHandRing1", "mixamorigLeftHandRing2", "mixamorigLeftHandRing3",
    "mixamorigLeftHandPinky1", "mixamorigLeftHandPinky2", "mixamorigLeftHandPinky3",
    "mixamorigRightShoulder", "mixamorigRightArm", "mixamorigRightForeArm", "mixamorigRightHand",
    "mixamorigRightHandThumb1", "mixamorigRightHandThumb2", "mixamorigRightHandThumb3",
    "mixamorigRightHandIndex1", "mixamorigRightHandIndex2", "mixamorigRightHandIndex3",
    "mixamorigRightHandMiddle1", "mixamorigRightHandMiddle2", "mixamorigRightHandMiddle3",
    "mixamorigRightHandRing1", "mixamorigRightHandRing2", "mixamorigRightHandRing3",
    "mixamorigRightHandPinky1", "mixamorigRightHandPinky2", "mixamorigRightHandPinky3",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Saved transform of one bone, used to protect the lower body during
/// upper-body overlay blending. Lifetime: one frame.
#[derive(Debug, Clone, Copy)]
pub struct BoneSnapshot {
    pub bone: usize,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
    index: HashMap<String, usize>,
    lower: Vec<usize>,
    head: Option<usize>,
    neck: Option<usize>,
    bind: Vec<(Vec3, Quat, Vec3)>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Self {
        let index: HashMap<String, usize> = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        let lower = bones
            .iter()
            .enumerate()
            .filter(|(_, b)| !UPPER_BONE_NAMES.contains(&b.name.as_str()))
            .map(|(i, _)| i)
            .collect();
        let head = index.get("mixamorigHead").copied();
        let neck = index.get("mixamorigNeck").copied();
        let bind = bones.iter().map(|b| (b.position, b.rotation, b.scale)).collect();
        Self {
            bones,
            index,
            lower,
            head,
            neck,
            bind,
        }
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone_mut(&mut self, i: usize) -> &mut Bone {
        &mut self.bones[i]
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// True when the rig has distinct lower-body bones, i.e. layered overlay
    /// playback is meaningful.
    pub fn has_layers(&self) -> bool {
        !self.lower.is_empty()
    }

    /// Restore every bone to its bind pose.
    pub fn reset_to_bind(&mut self) {
        for (bone, (p, r, s)) in self.bones.iter_mut().zip(self.bind.iter()) {
            bone.position = *p;
            bone.rotation = *r;
            bone.scale = *s;
        }
    }

    /// Snapshot the lower-body bone subset into the caller's buffer, reusing
    /// its allocation frame over frame.
    pub fn save_lower(&self, out: &mut Vec<BoneSnapshot>) {
        out.clear();
        for &i in &self.lower {
            let b = &self.bones[i];
            out.push(BoneSnapshot {
                bone: i,
                position: b.position,
                rotation: b.rotation,
                scale: b.scale,
            });
        }
    }

    pub fn restore_lower(&mut self, saved: &[BoneSnapshot]) {
        for snap in saved {
            let b = &mut self.bones[snap.bone];
            b.position = snap.position;
            b.rotation = snap.rotation;
            b.scale = snap.scale;
        }
    }

    /// Head tracking: multiply a yaw rotation onto neck (40%) and head (60%),
    /// after all clip blending so it is never overwritten.
    pub fn apply_look_at(&mut self, mouse_x: f32, max_yaw: f32) {
        let yaw = mouse_x.clamp(-1.0, 1.0) * max_yaw;
        if let Some(neck) = self.neck {
            let q = Quat::from_rotation_y(yaw * 0.4);
            let b = &mut self.bones[neck];
            b.rotation *= q;
        }
        if let Some(head) = self.head {
            let q = Quat::from_rotation_y(yaw * 0.6);
            let b = &mut self.bones[head];
            b.rotation *= q;
        }
    }
}

#[cfg(test)]
pub(crate) fn test_skeleton() -> Skeleton {
    Skeleton::new(vec![
        Bone::new("mixamorigHips", None),
        Bone::new("mixamorigSpine", Some(0)),
        Bone::new("mixamorigNeck", Some(1)),
        Bone::new("mixamorigHead", Some(2)),
        Bone::new("mixamorigLeftArm", Some(1)),
        Bone::new("mixamorigRightArm", Some(1)),
        Bone::new("mixamorigLeftUpLeg", Some(0)),
        Bone::new("mixamorigRightUpLeg", Some(0)),
    ])
}
