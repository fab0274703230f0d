//! Ground-adaptive foot placement for a two-legged character.
//!
//! Each foot is probed straight down against the ground. The hips drop by half the
//! height difference between the two contacts, then each leg (hip, knee, foot) is
//! solved with two-bone IK so the foot lands on its contact point. The knee is
//! steered by a hint point offset from the current knee in its own frame, so legs
//! keep bending forward.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use stride_core::{Result, StrideError, Transform};

use crate::hierarchy::JointHierarchy;
use crate::ik::{solve_two_bone_ik_on, TwoBoneIkSettings};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
}

/// Scene query used to find the ground under each foot.
pub trait GroundProbe {
    /// Closest hit along `direction` from `origin` within `max_distance`.
    fn raycast_closest(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit>;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootPlacementSettings {
    /// Height of the foot joint above the sole.
    pub foot_bone_height: f32,
    /// How far above the foot each probe starts.
    pub probe_lift: f32,
    pub probe_distance: f32,
    /// Offset from the knee, in the knee's frame, used as the bend hint.
    pub knee_hint_offset: Vec3,
    pub alpha: f32,
}

impl Default for FootPlacementSettings {
    fn default() -> Self {
        Self {
            foot_bone_height: 0.0,
            probe_lift: 0.3,
            probe_distance: 1.0,
            knee_hint_offset: Vec3::new(0.0, 0.0, 0.4),
            alpha: 1.0,
        }
    }
}

pub struct FootPlacement {
    pub hips: usize,
    pub left_foot: usize,
    pub right_foot: usize,
    pub settings: FootPlacementSettings,
}

impl FootPlacement {
    /// Each foot's parent is taken as its knee and the knee's parent as its hip.
    pub fn new(hips: usize, left_foot: usize, right_foot: usize) -> Self {
        Self {
            hips,
            left_foot,
            right_foot,
            settings: FootPlacementSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: FootPlacementSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adapts the pose in `hierarchy` to the ground reported by `probe`.
    ///
    /// Returns `Ok(false)` and leaves the pose untouched when either foot has no
    /// ground beneath it.
    pub fn update<H, P>(&self, hierarchy: &mut H, probe: &P) -> Result<bool>
    where
        H: JointHierarchy + ?Sized,
        P: GroundProbe + ?Sized,
    {
        let len = hierarchy.joint_count();
        for index in [self.hips, self.left_foot, self.right_foot] {
            if index >= len {
                return Err(StrideError::JointOutOfRange { index, len });
            }
        }

        let left = self.probe_below(hierarchy.world_transform(self.left_foot).position, probe);
        let right = self.probe_below(hierarchy.world_transform(self.right_foot).position, probe);
        let (Some(left), Some(right)) = (left, right) else {
            log::trace!("No ground under one of the feet, skipping foot placement");
            return Ok(false);
        };

        self.lower_hips(hierarchy, (left.point.y - right.point.y).abs() / 2.0);
        self.place_foot(hierarchy, self.left_foot, left.point)?;
        self.place_foot(hierarchy, self.right_foot, right.point)?;
        Ok(true)
    }

    fn probe_below<P: GroundProbe + ?Sized>(&self, foot: Vec3, probe: &P) -> Option<RayHit> {
        let origin = foot + Vec3::Y * self.settings.probe_lift;
        probe.raycast_closest(origin, Vec3::NEG_Y, self.settings.probe_distance)
    }

    fn lower_hips<H: JointHierarchy + ?Sized>(&self, hierarchy: &mut H, offset: f32) {
        let parent = hierarchy.parent_world_transform(self.hips);
        let mut world = hierarchy.world_transform(self.hips);
        world.position.y -= offset;
        hierarchy.set_local_transform(self.hips, &Transform::relative(&world, &parent));
    }

    fn place_foot<H: JointHierarchy + ?Sized>(&self, hierarchy: &mut H, foot: usize, ground: Vec3) -> Result<()> {
        let knee = hierarchy.parent(foot).ok_or(StrideError::MissingParent(foot))?;
        let hip = hierarchy.parent(knee).ok_or(StrideError::MissingParent(knee))?;

        let target = ground + Vec3::Y * self.settings.foot_bone_height;
        let knee_world = hierarchy.world_transform(knee);
        let hint = knee_world.position + knee_world.transform_vector(self.settings.knee_hint_offset);

        solve_two_bone_ik_on(
            hierarchy,
            hip,
            knee,
            foot,
            target,
            Some(hint),
            &TwoBoneIkSettings {
                alpha: self.settings.alpha,
            },
        )
    }
}
