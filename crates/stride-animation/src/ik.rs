//! Analytic two-bone IK.
//!
//! Solves a three-joint chain (root, middle, end), such as hip/knee/ankle or
//! shoulder/elbow/wrist, with triangle trigonometry instead of iteration. The
//! root only rotates in place, both bone lengths are kept, and the end joint keeps
//! its world rotation.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use stride_core::{Result, StrideError, Transform};
use thiserror::Error;

use crate::hierarchy::JointHierarchy;

/// Bones shorter than this are treated as zero-length.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Tolerance used by [`ChainInvariants::check`].
pub const INVARIANT_EPSILON: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoBoneIkSettings {
    /// Blend between the input pose (0) and the solved pose (1). Clamped to [0, 1].
    pub alpha: f32,
}

impl Default for TwoBoneIkSettings {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

/// Transforms of three consecutive joints. Local or world space depending on use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoBoneChain {
    pub root: Transform,
    pub middle: Transform,
    pub end: Transform,
}

impl TwoBoneChain {
    pub fn new(root: Transform, middle: Transform, end: Transform) -> Self {
        Self { root, middle, end }
    }

    /// Converts a local chain to world space under `ancestor`, the world transform
    /// of the root's parent.
    pub fn to_world(&self, ancestor: &Transform) -> Self {
        let root = Transform::multiply(&self.root, ancestor);
        let middle = Transform::multiply(&self.middle, &root);
        let end = Transform::multiply(&self.end, &middle);
        Self { root, middle, end }
    }

    /// Inverse of [`TwoBoneChain::to_world`]. Each joint is made relative to its
    /// parent as it is now, not as it was before solving.
    pub fn to_local(&self, ancestor: &Transform) -> Self {
        Self {
            end: Transform::relative(&self.end, &self.middle),
            middle: Transform::relative(&self.middle, &self.root),
            root: Transform::relative(&self.root, ancestor),
        }
    }

    pub fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            root: Transform::lerp(&a.root, &b.root, t),
            middle: Transform::lerp(&a.middle, &b.middle, t),
            end: Transform::lerp(&a.end, &b.end, t),
        }
    }

    /// Upper (root to middle) and lower (middle to end) bone lengths. Only
    /// meaningful for a world-space chain.
    pub fn bone_lengths(&self) -> (f32, f32) {
        (
            self.root.position.distance(self.middle.position),
            self.middle.position.distance(self.end.position),
        )
    }
}

/// Solves a local-space chain and returns the blended local transforms.
///
/// `ancestor` is the world transform of the root's parent (identity for a root
/// joint). `target` and `hint` are world-space; `hint` defaults to the middle
/// joint's current world position. Fails without producing anything if either
/// bone has zero length.
pub fn solve_two_bone_ik_local(
    chain: &TwoBoneChain,
    ancestor: &Transform,
    target: Vec3,
    hint: Option<Vec3>,
    alpha: f32,
) -> Result<TwoBoneChain> {
    let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };

    let mut world = chain.to_world(ancestor);
    solve_two_bone_ik(&mut world, target, hint)?;
    let solved = world.to_local(ancestor);

    Ok(TwoBoneChain::lerp(chain, &solved, alpha))
}

/// Solves a world-space chain in place.
///
/// Root and middle rotations are changed by the shortest arc that carries each
/// bone onto its solved direction. The middle and end joints move; the end joint's
/// rotation is left as it was.
pub fn solve_two_bone_ik(chain: &mut TwoBoneChain, target: Vec3, hint: Option<Vec3>) -> Result<()> {
    let hint = hint.unwrap_or(chain.middle.position);

    let a = chain.root.position;
    let b = chain.middle.position;
    let c = chain.end.position;
    let (b_solved, c_solved) = solve_two_bone_ik_positions(a, b, c, target, hint)?;

    let root_delta = Quat::from_rotation_arc((b - a).normalize(), (b_solved - a).normalize());
    chain.root.rotation = (root_delta * chain.root.rotation).normalize();

    let middle_delta = Quat::from_rotation_arc((c - b).normalize(), (c_solved - b_solved).normalize());
    chain.middle.rotation = (middle_delta * chain.middle.rotation).normalize();
    chain.middle.position = b_solved;

    chain.end.position = c_solved;

    Ok(())
}

/// Solves joint positions only. Returns the new middle and end positions.
///
/// `a`, `b`, `c` are the current root, middle and end positions. The middle joint
/// bends toward the side of the root→target axis that `hint` lies on.
pub fn solve_two_bone_ik_positions(
    a: Vec3,
    b: Vec3,
    c: Vec3,
    target: Vec3,
    hint: Vec3,
) -> Result<(Vec3, Vec3)> {
    let d_ab = a.distance(b);
    let d_bc = b.distance(c);
    if d_ab < DEGENERATE_EPSILON || d_bc < DEGENERATE_EPSILON {
        log::warn!("Rejecting two-bone IK on zero-length bone ({d_ab}, {d_bc})");
        return Err(StrideError::DegenerateBone {
            upper: d_ab,
            lower: d_bc,
        });
    }

    let to_target = target - a;
    let d_at = to_target.length();
    let dir_at = reach_direction(a, b, c, to_target, d_at);

    let chain_length = d_ab + d_bc;
    if d_at >= chain_length {
        log::trace!("IK target out of reach ({d_at} >= {chain_length}), extending chain");
        return Ok((a + dir_at * d_ab, a + dir_at * chain_length));
    }

    // Inside the inner sphere the target can't be touched without stretching a
    // bone; fold the chain as far as it goes instead.
    let min_reach = (d_ab - d_bc).abs();
    let (d_at, c_solved) = if d_at < min_reach {
        log::trace!("IK target inside minimum reach ({d_at} < {min_reach}), folding chain");
        (min_reach, a + dir_at * min_reach)
    } else {
        (d_at, target)
    };

    // Law of cosines for the angle at A.
    let cos_a = if d_at < DEGENERATE_EPSILON {
        0.0
    } else {
        ((d_ab * d_ab + d_at * d_at - d_bc * d_bc) / (2.0 * d_ab * d_at)).clamp(-1.0, 1.0)
    };

    // D is the foot of the height line through the solved middle joint.
    let d_ad = d_ab * cos_a;
    let height = (d_ab * d_ab - d_ad * d_ad).max(0.0).sqrt();
    let bend = bend_direction(a, b, hint, dir_at);

    Ok((a + dir_at * d_ad + bend * height, c_solved))
}

fn reach_direction(a: Vec3, b: Vec3, c: Vec3, to_target: Vec3, d_at: f32) -> Vec3 {
    if d_at >= DEGENERATE_EPSILON {
        return to_target / d_at;
    }
    log::debug!("IK target coincides with chain root, reaching along the current chain");
    normalize_above(c - a).unwrap_or_else(|| (b - a).normalize())
}

fn bend_direction(a: Vec3, b: Vec3, hint: Vec3, dir_at: Vec3) -> Vec3 {
    if let Some(bend) = normalize_above((hint - a).reject_from_normalized(dir_at)) {
        return bend;
    }
    log::debug!("IK hint is collinear with the target axis, keeping the current bend");
    normalize_above((b - a).reject_from_normalized(dir_at))
        .unwrap_or_else(|| dir_at.any_orthonormal_vector())
}

fn normalize_above(v: Vec3) -> Option<Vec3> {
    let length = v.length();
    (length >= DEGENERATE_EPSILON).then(|| v / length)
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum InvariantViolation {
    #[error("root moved from {expected} to {actual}")]
    RootMoved { expected: Vec3, actual: Vec3 },

    #[error("upper bone length changed from {expected} to {actual}")]
    UpperLengthChanged { expected: f32, actual: f32 },

    #[error("lower bone length changed from {expected} to {actual}")]
    LowerLengthChanged { expected: f32, actual: f32 },

    #[error("end rotation changed from {expected} to {actual}")]
    EndRotationChanged { expected: Quat, actual: Quat },
}

/// Properties a full-weight two-bone solve must keep, captured from the
/// world-space chain before solving.
#[derive(Clone, Copy, Debug)]
pub struct ChainInvariants {
    root_position: Vec3,
    upper_length: f32,
    lower_length: f32,
    end_rotation: Quat,
}

impl ChainInvariants {
    pub fn capture(world: &TwoBoneChain) -> Self {
        let (upper_length, lower_length) = world.bone_lengths();
        Self {
            root_position: world.root.position,
            upper_length,
            lower_length,
            end_rotation: world.end.rotation,
        }
    }

    pub fn check(&self, world: &TwoBoneChain) -> std::result::Result<(), InvariantViolation> {
        if !world.root.position.abs_diff_eq(self.root_position, INVARIANT_EPSILON) {
            return Err(InvariantViolation::RootMoved {
                expected: self.root_position,
                actual: world.root.position,
            });
        }

        let (upper, lower) = world.bone_lengths();
        if (upper - self.upper_length).abs() > INVARIANT_EPSILON {
            return Err(InvariantViolation::UpperLengthChanged {
                expected: self.upper_length,
                actual: upper,
            });
        }
        if (lower - self.lower_length).abs() > INVARIANT_EPSILON {
            return Err(InvariantViolation::LowerLengthChanged {
                expected: self.lower_length,
                actual: lower,
            });
        }

        let rotation = world.end.rotation;
        if !rotation.abs_diff_eq(self.end_rotation, INVARIANT_EPSILON)
            && !rotation.abs_diff_eq(-self.end_rotation, INVARIANT_EPSILON)
        {
            return Err(InvariantViolation::EndRotationChanged {
                expected: self.end_rotation,
                actual: rotation,
            });
        }

        Ok(())
    }
}

/// Solves three consecutive joints of `hierarchy` and writes the result back.
///
/// `middle` must be a child of `root` and `end` a child of `middle`. Nothing is
/// written if the chain is rejected. Debug builds re-read the hierarchy after a
/// full-weight solve and assert [`ChainInvariants`].
pub fn solve_two_bone_ik_on<H: JointHierarchy + ?Sized>(
    hierarchy: &mut H,
    root: usize,
    middle: usize,
    end: usize,
    target: Vec3,
    hint: Option<Vec3>,
    settings: &TwoBoneIkSettings,
) -> Result<()> {
    let len = hierarchy.joint_count();
    for index in [root, middle, end] {
        if index >= len {
            return Err(StrideError::JointOutOfRange { index, len });
        }
    }
    if hierarchy.parent(middle) != Some(root) || hierarchy.parent(end) != Some(middle) {
        return Err(StrideError::NotAChain { root, middle, end });
    }

    let ancestor = hierarchy.parent_world_transform(root);
    let input = TwoBoneChain::new(
        hierarchy.local_transform(root),
        hierarchy.local_transform(middle),
        hierarchy.local_transform(end),
    );

    let invariants = cfg!(debug_assertions).then(|| ChainInvariants::capture(&input.to_world(&ancestor)));

    let solved = solve_two_bone_ik_local(&input, &ancestor, target, hint, settings.alpha)?;
    hierarchy.set_local_transform(root, &solved.root);
    hierarchy.set_local_transform(middle, &solved.middle);
    hierarchy.set_local_transform(end, &solved.end);

    if let Some(invariants) = invariants.filter(|_| settings.alpha >= 1.0) {
        let after = TwoBoneChain::new(
            hierarchy.world_transform(root),
            hierarchy.world_transform(middle),
            hierarchy.world_transform(end),
        );
        if let Err(violation) = invariants.check(&after) {
            panic!("two-bone IK invariant violated: {violation}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn straight_leg() -> TwoBoneChain {
        TwoBoneChain::new(
            Transform::IDENTITY,
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
        )
    }

    fn bent_arm_world() -> TwoBoneChain {
        TwoBoneChain::new(
            Transform::from_position_rotation(Vec3::new(0.2, 1.4, 0.1), Quat::from_rotation_y(0.3)),
            Transform::from_position_rotation(Vec3::new(0.5, 1.1, 0.3), Quat::from_rotation_x(-0.4)),
            Transform::from_position_rotation(Vec3::new(0.9, 1.2, 0.5), Quat::from_rotation_z(1.0)),
        )
    }

    #[test]
    fn test_positions_reachable_target_is_hit() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, -1.0, 0.0);
        let c = Vec3::new(0.0, -2.0, 0.0);
        let target = Vec3::new(0.3, -1.2, 0.4);
        let (b2, c2) = solve_two_bone_ik_positions(a, b, c, target, Vec3::Z).unwrap();

        assert!(c2.abs_diff_eq(target, EPS));
        assert!((a.distance(b2) - 1.0).abs() < EPS);
        assert!((b2.distance(c2) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_positions_unreachable_target_extends_chain() {
        let a = Vec3::new(1.0, 1.0, 1.0);
        let b = a + Vec3::new(0.0, -0.6, 0.0);
        let c = b + Vec3::new(0.4, 0.0, 0.0);
        let target = a + Vec3::new(3.0, 4.0, 0.0);
        let (b2, c2) = solve_two_bone_ik_positions(a, b, c, target, b).unwrap();

        let dir = Vec3::new(0.6, 0.8, 0.0);
        assert!(b2.abs_diff_eq(a + dir * 0.6, EPS));
        assert!(c2.abs_diff_eq(a + dir * 1.0, EPS));
    }

    #[test]
    fn test_positions_bend_follows_hint() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, -1.0, 0.0);
        let c = Vec3::new(0.0, -2.0, 0.0);
        let target = Vec3::new(0.0, -1.5, 0.0);

        let (forward, _) = solve_two_bone_ik_positions(a, b, c, target, Vec3::new(0.0, -1.0, 5.0)).unwrap();
        let (backward, _) = solve_two_bone_ik_positions(a, b, c, target, Vec3::new(0.0, -1.0, -5.0)).unwrap();
        assert!(forward.z > 0.1);
        assert!(backward.z < -0.1);
        assert!(forward.x.abs() < EPS && backward.x.abs() < EPS);
    }

    #[test]
    fn test_positions_hint_out_of_plane_is_projected() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, -1.0, 0.0);
        let c = Vec3::new(0.0, -2.0, 0.0);
        let target = Vec3::new(0.0, -1.5, 0.0);
        // Hint has a component along the target axis; only the perpendicular part counts.
        let (b2, _) = solve_two_bone_ik_positions(a, b, c, target, Vec3::new(2.0, -30.0, 0.0)).unwrap();
        let expected_height = (1.0f32 - 0.75 * 0.75).sqrt();
        assert!(b2.abs_diff_eq(Vec3::new(expected_height, -0.75, 0.0), EPS));
    }

    #[test]
    fn test_positions_collinear_hint_does_not_produce_nan() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, -1.0, 0.0);
        let c = Vec3::new(0.0, -2.0, 0.0);
        let target = Vec3::new(0.0, -1.5, 0.0);
        // Straight chain, hint on the target axis: nothing picks a side.
        let (b2, c2) = solve_two_bone_ik_positions(a, b, c, target, Vec3::new(0.0, -3.0, 0.0)).unwrap();

        assert!(b2.is_finite() && c2.is_finite());
        assert!(c2.abs_diff_eq(target, EPS));
        assert!((a.distance(b2) - 1.0).abs() < EPS);
        assert!((b2.distance(c2) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_positions_collinear_hint_keeps_current_bend() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, -0.7, 0.7);
        let c = Vec3::new(0.0, -1.4, 0.0);
        let target = Vec3::new(0.0, -1.2, 0.0);
        let (b2, _) = solve_two_bone_ik_positions(a, b, c, target, Vec3::new(0.0, -2.0, 0.0)).unwrap();
        assert!(b2.z > 0.0);
    }

    #[test]
    fn test_positions_target_at_root() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, -1.0, 0.0);
        let c = Vec3::new(0.0, -1.0, 1.0);
        let (b2, c2) = solve_two_bone_ik_positions(a, b, c, a, b).unwrap();

        assert!(b2.is_finite() && c2.is_finite());
        assert!(c2.abs_diff_eq(a, EPS));
        assert!((a.distance(b2) - 1.0).abs() < EPS);
        assert!((b2.distance(c2) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_positions_target_inside_minimum_reach_folds() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, -1.0, 0.0);
        let c = Vec3::new(0.0, -1.4, 0.0);
        let target = Vec3::new(0.0, -0.2, 0.0);
        let (b2, c2) = solve_two_bone_ik_positions(a, b, c, target, Vec3::Z).unwrap();

        assert!(c2.abs_diff_eq(Vec3::new(0.0, -0.6, 0.0), EPS));
        assert!((a.distance(b2) - 1.0).abs() < EPS);
        assert!((b2.distance(c2) - 0.4).abs() < EPS);
    }

    #[test]
    fn test_zero_length_bone_is_rejected() {
        let a = Vec3::ZERO;
        let result = solve_two_bone_ik_positions(a, a, Vec3::X, Vec3::Y, Vec3::Z);
        assert!(matches!(result, Err(StrideError::DegenerateBone { .. })));

        let mut chain = TwoBoneChain::new(
            Transform::IDENTITY,
            Transform::IDENTITY,
            Transform::from_position(Vec3::X),
        );
        let before = chain;
        assert!(solve_two_bone_ik(&mut chain, Vec3::Y, None).is_err());
        assert_eq!(chain, before);
    }

    #[test]
    fn test_world_solve_keeps_invariants() {
        let mut chain = bent_arm_world();
        let invariants = ChainInvariants::capture(&chain);
        let target = Vec3::new(0.6, 0.9, 0.6);
        solve_two_bone_ik(&mut chain, target, Some(Vec3::new(0.5, 1.0, -1.0))).unwrap();

        assert_eq!(invariants.check(&chain), Ok(()));
        assert!(chain.end.position.abs_diff_eq(target, EPS));
        assert_eq!(chain.end.rotation, bent_arm_world().end.rotation);
    }

    #[test]
    fn test_world_solve_rotates_bones_onto_solved_directions() {
        let mut chain = bent_arm_world();
        let original = chain;
        solve_two_bone_ik(&mut chain, Vec3::new(0.6, 0.9, 0.6), None).unwrap();

        // A point fixed to the upper bone follows it to the solved middle joint.
        let upper_local = original.root.rotation.inverse() * (original.middle.position - original.root.position);
        let moved = chain.root.position + chain.root.rotation * upper_local;
        assert!(moved.abs_diff_eq(chain.middle.position, EPS));

        let lower_local = original.middle.rotation.inverse() * (original.end.position - original.middle.position);
        let moved = chain.middle.position + chain.middle.rotation * lower_local;
        assert!(moved.abs_diff_eq(chain.end.position, EPS));
    }

    #[test]
    fn test_invariants_detect_stretching() {
        let chain = bent_arm_world();
        let invariants = ChainInvariants::capture(&chain);
        let mut stretched = chain;
        stretched.end.position += Vec3::splat(0.1);
        assert!(matches!(
            invariants.check(&stretched),
            Err(InvariantViolation::LowerLengthChanged { .. })
        ));

        let mut twisted = chain;
        twisted.end.rotation = Quat::from_rotation_y(2.0);
        assert!(matches!(
            invariants.check(&twisted),
            Err(InvariantViolation::EndRotationChanged { .. })
        ));
    }

    #[test]
    fn test_local_solve_alpha_boundaries() {
        let chain = straight_leg();
        let ancestor = Transform::from_position(Vec3::new(0.0, 2.0, 0.0));
        let target = Vec3::new(0.0, 0.5, 0.5);

        let untouched = solve_two_bone_ik_local(&chain, &ancestor, target, None, 0.0).unwrap();
        assert_eq!(untouched, chain);

        let full = solve_two_bone_ik_local(&chain, &ancestor, target, None, 1.0).unwrap();
        let mut world = chain.to_world(&ancestor);
        solve_two_bone_ik(&mut world, target, None).unwrap();
        assert_eq!(full, world.to_local(&ancestor));

        let over = solve_two_bone_ik_local(&chain, &ancestor, target, None, 7.0).unwrap();
        assert_eq!(over, full);
        let under = solve_two_bone_ik_local(&chain, &ancestor, target, None, -1.0).unwrap();
        assert_eq!(under, chain);
    }

    #[test]
    fn test_local_solve_partial_alpha_keeps_root_and_lengths() {
        let chain = straight_leg();
        let ancestor = Transform::IDENTITY;
        let target = Vec3::new(0.0, -1.2, 0.8);
        let half = solve_two_bone_ik_local(&chain, &ancestor, target, Some(Vec3::new(0.0, -1.0, 1.0)), 0.5).unwrap();

        let before = chain.to_world(&ancestor);
        let after = half.to_world(&ancestor);
        assert!(after.root.position.abs_diff_eq(before.root.position, EPS));
        let (upper, lower) = after.bone_lengths();
        assert!((upper - 1.0).abs() < 1e-3);
        assert!((lower - 1.0).abs() < 1e-3);
        assert!(after.end.position.distance(target) < before.end.position.distance(target));
    }

    #[test]
    fn test_local_solve_under_scaled_rotated_parent() {
        let chain = TwoBoneChain::new(
            Transform::from_position_rotation(Vec3::new(0.1, 0.0, 0.0), Quat::from_rotation_x(0.2)),
            Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
            Transform::from_position(Vec3::new(0.0, -0.4, 0.1)),
        );
        let ancestor = Transform::new(Vec3::new(1.0, 3.0, -2.0), Quat::from_rotation_y(1.3), Vec3::splat(1.5));
        let world = chain.to_world(&ancestor);
        let invariants = ChainInvariants::capture(&world);
        let (upper, lower) = world.bone_lengths();
        let target = world.root.position + Vec3::new(0.3, -0.9, 0.2).normalize() * (upper + lower) * 0.8;

        let solved = solve_two_bone_ik_local(&chain, &ancestor, target, None, 1.0).unwrap();
        let solved_world = solved.to_world(&ancestor);
        assert_eq!(invariants.check(&solved_world), Ok(()));
        assert!(solved_world.end.position.abs_diff_eq(target, 1e-3));
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: TwoBoneIkSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, TwoBoneIkSettings::default());
        let settings: TwoBoneIkSettings = serde_json::from_str(r#"{"alpha": 0.25}"#).unwrap();
        assert_eq!(settings.alpha, 0.25);
    }
}
