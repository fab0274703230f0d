use std::collections::HashMap;

use glam::Mat4;
use stride_core::{Result, StrideError, Transform};

use crate::hierarchy::JointHierarchy;
use crate::pose::Pose;

pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub local_transform: Transform,
}

/// A named joint hierarchy with one local transform per bone.
///
/// Bones are stored parent-first: `add_bone` only accepts parents that already
/// exist, which keeps every top-down traversal a single forward pass.
pub struct Skeleton {
    bones: Vec<Bone>,
    bone_names: HashMap<String, usize>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self {
            bones: Vec::new(),
            bone_names: HashMap::new(),
        }
    }

    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        local_transform: Transform,
    ) -> Result<usize> {
        let index = self.bones.len();
        if let Some(parent) = parent {
            if parent >= index {
                return Err(StrideError::InvalidParent {
                    joint: index,
                    parent: parent as i64,
                });
            }
        }

        let name = name.into();
        self.bone_names.insert(name.clone(), index);
        self.bones.push(Bone {
            name,
            parent,
            local_transform,
        });
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Result<&Bone> {
        self.bones.get(index).ok_or(StrideError::JointOutOfRange {
            index,
            len: self.bones.len(),
        })
    }

    pub fn find_bone(&self, name: &str) -> Result<usize> {
        self.bone_names
            .get(name)
            .copied()
            .ok_or_else(|| StrideError::UnknownJoint(name.to_string()))
    }

    pub fn parent_table(&self) -> Vec<Option<usize>> {
        self.bones.iter().map(|bone| bone.parent).collect()
    }

    pub fn compute_world_transforms(&self) -> Vec<Transform> {
        let mut transforms: Vec<Transform> = Vec::with_capacity(self.bones.len());

        for bone in &self.bones {
            let world = match bone.parent {
                Some(parent) => Transform::multiply(&bone.local_transform, &transforms[parent]),
                None => bone.local_transform,
            };
            transforms.push(world);
        }

        transforms
    }

    pub fn compute_bone_matrices(&self) -> Vec<Mat4> {
        self.compute_world_transforms()
            .iter()
            .map(Transform::to_matrix)
            .collect()
    }

    /// Captures the current local transforms as a [`Pose`].
    pub fn rest_pose(&self) -> Result<Pose> {
        let mut pose = Pose::new(self.parent_table())?;
        for (index, bone) in self.bones.iter().enumerate() {
            pose.set(index, &bone.local_transform);
        }
        Ok(pose)
    }

    /// Overwrites every bone's local transform from a local-space pose.
    pub fn apply_pose(&mut self, pose: &Pose) -> Result<()> {
        if pose.len() != self.bones.len() {
            return Err(StrideError::JointCountMismatch {
                expected: self.bones.len(),
                actual: pose.len(),
            });
        }
        for (index, bone) in self.bones.iter_mut().enumerate() {
            bone.local_transform = pose.get(index);
        }
        Ok(())
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}

impl JointHierarchy for Skeleton {
    fn joint_count(&self) -> usize {
        self.bones.len()
    }

    fn parent(&self, joint: usize) -> Option<usize> {
        self.bones[joint].parent
    }

    fn local_transform(&self, joint: usize) -> Transform {
        self.bones[joint].local_transform
    }

    fn set_local_transform(&mut self, joint: usize, transform: &Transform) {
        self.bones[joint].local_transform = *transform;
    }
}
