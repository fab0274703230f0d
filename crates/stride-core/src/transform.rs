use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Translation, rotation and per-axis scale of a joint.
///
/// Whether a transform is local (relative to its parent) or world space is up to
/// the caller; the type itself carries no space tag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.position
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * (self.scale * vector)
    }

    /// Interpolates between `a` and `b`.
    ///
    /// `t == 0.0` and `t == 1.0` return copies of `a` and `b` untouched, so blending
    /// with a boundary weight never introduces drift. In between, position and scale
    /// are lerped and rotation takes the shortest-arc slerp.
    pub fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        if t == 0.0 {
            return *a;
        }
        if t == 1.0 {
            return *b;
        }
        Self {
            position: a.position.lerp(b.position, t),
            rotation: a.rotation.slerp(b.rotation, t).normalize(),
            scale: a.scale.lerp(b.scale, t),
        }
    }

    /// Composes `first` as a child of `second`.
    ///
    /// The child's position is scaled by the parent's scale, rotated by the parent's
    /// rotation and then offset by the parent's position:
    /// `T_p + R_p * (S_p * T_c)`.
    pub fn multiply(first: &Self, second: &Self) -> Self {
        Self {
            position: second.position + second.rotation * (second.scale * first.position),
            rotation: (second.rotation * first.rotation).normalize(),
            scale: first.scale * second.scale,
        }
    }

    /// Expresses `first` relative to `second`; the exact inverse of [`Transform::multiply`].
    ///
    /// `Transform::multiply(&Transform::relative(&x, &p), &p)` reproduces `x` up to
    /// floating point error.
    ///
    /// Every component of `second.scale` must be non-zero, since the result divides
    /// by it. Debug builds assert this; release builds will produce infinities.
    pub fn relative(first: &Self, second: &Self) -> Self {
        debug_assert!(
            second.scale.abs().min_element() > f32::EPSILON,
            "relative() against a parent with a zero scale component: {:?}",
            second.scale
        );

        let inv_rotation = second.rotation.inverse();
        Self {
            position: inv_rotation * (first.position - second.position) / second.scale,
            rotation: (inv_rotation * first.rotation).normalize(),
            scale: first.scale / second.scale,
        }
    }

    /// Component-wise comparison with a tolerance. `q` and `-q` are treated as the
    /// same rotation.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && self.scale.abs_diff_eq(other.scale, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Transform {
    fn from(mat: Mat4) -> Self {
        let (scale, rotation, position) = mat.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }
}
