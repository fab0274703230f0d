//! Stride - analytic limb IK and pose utilities for skeletal animation
//!
//! The core crate holds the transform algebra; the animation crate builds poses,
//! skeletons, two-bone IK and foot placement on top of it.

pub use stride_animation as animation;
pub use stride_core as core;

pub mod prelude {
    pub use crate::core::{Result, StrideError, Transform};
    pub use crate::animation::{
        solve_two_bone_ik, solve_two_bone_ik_local, solve_two_bone_ik_on,
        FootPlacement, FootPlacementSettings, GroundProbe, JointHierarchy, Pose, PoseBuffer,
        RayHit, Skeleton, TwoBoneChain, TwoBoneIkSettings,
    };
    pub use glam;
    pub use glam::{Quat, Vec3};
}
