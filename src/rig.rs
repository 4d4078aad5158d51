//! Procedural primitive rig: a set of named rigid sub-transforms driven by
//! direct assignment from the animation function library.
//!
//! The renderer owns the actual meshes; this structure mirrors the pivot
//! groups it exposes (shoulders, elbows, hips, head group, face meshes and
//! the swap-in gesture hands) so the core can be driven and tested headless.

use glam::Vec3;

/// One controllable part: local position, XYZ euler rotation, scale and a
/// visibility flag for the swap-in gesture meshes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub visible: bool,
}

impl PartTransform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
        }
    }

    pub fn hidden(position: Vec3) -> Self {
        Self {
            visible: false,
            ..Self::at(position)
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

/// Root transform of the whole avatar. `rotation.y` is the heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootTransform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for RootTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RigParts {
    pub torso: PartTransform,
    pub head_group: PartTransform,
    pub left_eye: PartTransform,
    pub right_eye: PartTransform,
    pub left_brow: PartTransform,
    pub right_brow: PartTransform,
    pub mouth: PartTransform,
    pub left_arm: PartTransform,
    pub right_arm: PartTransform,
    pub left_elbow: PartTransform,
    pub right_elbow: PartTransform,
    pub left_hand: PartTransform,
    pub right_hand: PartTransform,
    pub left_leg: PartTransform,
    pub right_leg: PartTransform,
    // Gesture meshes, hidden at rest
    pub thumbs_up: PartTransform,
    pub peace: PartTransform,
    pub pointing: PartTransform,
    pub heart: PartTransform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveRig {
    pub root: RootTransform,
    pub parts: RigParts,
}

impl Default for PrimitiveRig {
    fn default() -> Self {
        let mut rig = Self {
            root: RootTransform::default(),
            parts: RigParts {
                torso: PartTransform::at(Vec3::new(0.0, 0.55, 0.0)),
                head_group: PartTransform::at(Vec3::new(0.0, 1.3, 0.0)),
                left_eye: PartTransform::at(Vec3::new(-0.15, 0.08, 0.38)),
                right_eye: PartTransform::at(Vec3::new(0.15, 0.08, 0.38)),
                left_brow: PartTransform::at(Vec3::new(-0.15, 0.2, 0.38)),
                right_brow: PartTransform::at(Vec3::new(0.15, 0.2, 0.38)),
                mouth: PartTransform::at(Vec3::new(0.0, -0.15, 0.38)),
                left_arm: PartTransform::at(Vec3::new(-0.48, 0.85, 0.0)),
                right_arm: PartTransform::at(Vec3::new(0.48, 0.85, 0.0)),
                left_elbow: PartTransform::at(Vec3::new(0.0, -0.45, 0.0)),
                right_elbow: PartTransform::at(Vec3::new(0.0, -0.45, 0.0)),
                left_hand: PartTransform::at(Vec3::new(0.0, -0.33, 0.0)),
                right_hand: PartTransform::at(Vec3::new(0.0, -0.33, 0.0)),
                left_leg: PartTransform::at(Vec3::new(-0.15, 0.02, 0.0)),
                right_leg: PartTransform::at(Vec3::new(0.15, 0.02, 0.0)),
                thumbs_up: PartTransform::hidden(Vec3::new(0.0, -0.33, 0.0)),
                peace: PartTransform::hidden(Vec3::new(0.0, -0.33, 0.0)),
                pointing: PartTransform::hidden(Vec3::new(0.0, -0.33, 0.0)),
                heart: PartTransform::hidden(Vec3::new(0.0, 2.15, 0.15)),
            },
        };
        rig.reset_defaults();
        rig
    }
}

impl PrimitiveRig {
    /// Reset every controllable part to its rest transform. Called at the top
    /// of every frame before any layer function runs; layer functions write
    /// unconditionally and rely on this baseline.
    pub fn reset_defaults(&mut self) {
        let p = &mut self.parts;

        // Root: position is re-derived from spatial state each frame, x/z
        // rotation belongs to lie poses only.
        self.root.position = Vec3::ZERO;
        self.root.rotation.x = 0.0;
        self.root.rotation.z = 0.0;

        p.torso.scale = Vec3::ONE;

        p.head_group.position.y = 1.3;
        p.head_group.rotation = Vec3::ZERO;

        p.left_arm.rotation = Vec3::ZERO;
        p.right_arm.rotation = Vec3::ZERO;
        p.left_elbow.rotation = Vec3::ZERO;
        p.right_elbow.rotation = Vec3::ZERO;

        // Legs reset on all axes (roundhouse uses z)
        p.left_leg.rotation = Vec3::ZERO;
        p.right_leg.rotation = Vec3::ZERO;

        p.right_hand.visible = true;
        p.thumbs_up.visible = false;
        p.peace.visible = false;
        p.pointing.visible = false;
        p.heart.visible = false;
        p.heart.position = Vec3::new(0.0, 2.15, 0.15);
        p.heart.rotation = Vec3::ZERO;
        p.heart.scale = Vec3::splat(2.5);

        p.left_brow.position.y = 0.2;
        p.right_brow.position.y = 0.2;
        p.left_brow.rotation.z = 0.15;
        p.right_brow.rotation.z = -0.15;
        p.left_eye.scale = Vec3::ONE;
        p.right_eye.scale = Vec3::ONE;
        p.mouth.scale = Vec3::new(1.3, 0.35, 0.4);
        p.mouth.position.y = -0.15;
    }

    /// True when every transform is finite (no NaN/Infinity leaked out of an
    /// animation function).
    pub fn all_finite(&self) -> bool {
        let p = &self.parts;
        self.root.position.is_finite()
            && self.root.rotation.is_finite()
            && [
                &p.torso, &p.head_group, &p.left_eye, &p.right_eye, &p.left_brow, &p.right_brow,
                &p.mouth, &p.left_arm, &p.right_arm, &p.left_elbow, &p.right_elbow, &p.left_hand,
                &p.right_hand, &p.left_leg, &p.right_leg, &p.thumbs_up, &p.peace, &p.pointing,
                &p.heart,
            ]
            .iter()
            .all(|t| t.is_finite())
    }
}
