use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use stride_core::Transform;

/// Scalars per joint: position (3), rotation (4), scale (3).
pub const JOINT_STRIDE: usize = 10;

/// One joint's transform laid out as ten contiguous `f32`s.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PackedJoint {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl From<&Transform> for PackedJoint {
    fn from(t: &Transform) -> Self {
        Self {
            position: t.position.to_array(),
            rotation: t.rotation.to_array(),
            scale: t.scale.to_array(),
        }
    }
}

impl From<&PackedJoint> for Transform {
    fn from(p: &PackedJoint) -> Self {
        Transform {
            position: Vec3::from_array(p.position),
            rotation: Quat::from_array(p.rotation),
            scale: Vec3::from_array(p.scale),
        }
    }
}

/// Fixed-length packed storage for a skeleton's joint transforms.
///
/// Indexing past the end is a programming error and panics.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseBuffer {
    joints: Box<[PackedJoint]>,
}

impl PoseBuffer {
    /// Creates a buffer of `count` identity transforms.
    pub fn new(count: usize) -> Self {
        let identity = PackedJoint::from(&Transform::IDENTITY);
        Self {
            joints: vec![identity; count].into_boxed_slice(),
        }
    }

    pub fn from_transforms(transforms: &[Transform]) -> Self {
        Self {
            joints: transforms.iter().map(PackedJoint::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn get(&self, index: usize) -> Transform {
        Transform::from(self.joint(index))
    }

    /// Reads the transform at `index` into `out`.
    pub fn read(&self, index: usize, out: &mut Transform) {
        let joint = self.joint(index);
        out.position = Vec3::from_array(joint.position);
        out.rotation = Quat::from_array(joint.rotation);
        out.scale = Vec3::from_array(joint.scale);
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_array(self.joint(index).position)
    }

    pub fn rotation(&self, index: usize) -> Quat {
        Quat::from_array(self.joint(index).rotation)
    }

    pub fn scale(&self, index: usize) -> Vec3 {
        Vec3::from_array(self.joint(index).scale)
    }

    pub fn set(&mut self, index: usize, value: &Transform) {
        *self.joint_mut(index) = PackedJoint::from(value);
    }

    pub fn set_position(&mut self, index: usize, value: Vec3) {
        self.joint_mut(index).position = value.to_array();
    }

    pub fn set_rotation(&mut self, index: usize, value: Quat) {
        self.joint_mut(index).rotation = value.to_array();
    }

    pub fn set_scale(&mut self, index: usize, value: Vec3) {
        self.joint_mut(index).scale = value.to_array();
    }

    /// Overwrites `other` with this buffer's contents. Both buffers must hold the
    /// same number of joints.
    pub fn copy_into(&self, other: &mut PoseBuffer) {
        assert_eq!(
            self.len(),
            other.len(),
            "copy_into between pose buffers of different length"
        );
        other.joints.copy_from_slice(&self.joints);
    }

    /// Sets every scalar to zero. Note the rotations are then zero quaternions, not
    /// identity; callers accumulating weighted poses start from this state.
    pub fn zero_clear(&mut self) {
        self.joints.fill(PackedJoint::zeroed());
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Transform> + '_ {
        self.joints.iter().map(Transform::from)
    }

    /// Flat view of the buffer, `JOINT_STRIDE` scalars per joint.
    pub fn as_scalars(&self) -> &[f32] {
        bytemuck::cast_slice(&self.joints[..])
    }

    fn joint(&self, index: usize) -> &PackedJoint {
        let len = self.joints.len();
        assert!(index < len, "joint index {index} out of range for pose buffer of {len} joints");
        &self.joints[index]
    }

    fn joint_mut(&mut self, index: usize) -> &mut PackedJoint {
        let len = self.joints.len();
        assert!(index < len, "joint index {index} out of range for pose buffer of {len} joints");
        &mut self.joints[index]
    }
}
