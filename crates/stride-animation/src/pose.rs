use std::sync::Arc;

use stride_core::{Result, StrideError, Transform};

use crate::pose_buffer::PoseBuffer;

/// A full set of joint transforms plus the parent table that gives them meaning.
///
/// The same type holds local-space poses (each transform relative to its parent)
/// and pose-space poses (each transform relative to the skeleton origin); which
/// one a `Pose` holds is up to the caller. Parents always precede their children,
/// so both conversions are a single top-down pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    transforms: PoseBuffer,
    parents: Arc<[Option<usize>]>,
}

impl Pose {
    /// Creates an identity pose for the given parent table.
    pub fn new(parents: impl Into<Arc<[Option<usize>]>>) -> Result<Self> {
        let parents = parents.into();
        validate_parents(&parents)?;
        Ok(Self {
            transforms: PoseBuffer::new(parents.len()),
            parents,
        })
    }

    /// Creates an identity pose from a flat parent table where `-1` marks a root.
    pub fn from_parent_table(table: &[i32]) -> Result<Self> {
        let parents = table
            .iter()
            .enumerate()
            .map(|(joint, &parent)| match parent {
                -1 => Ok(None),
                p if p >= 0 => Ok(Some(p as usize)),
                p => Err(StrideError::InvalidParent {
                    joint,
                    parent: p as i64,
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(parents)
    }

    /// Creates a pose sharing `self`'s parent table, with identity transforms.
    pub fn new_like(&self) -> Self {
        Self {
            transforms: PoseBuffer::new(self.len()),
            parents: Arc::clone(&self.parents),
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn parent(&self, joint: usize) -> Option<usize> {
        self.parents[joint]
    }

    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    pub fn transforms(&self) -> &PoseBuffer {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut PoseBuffer {
        &mut self.transforms
    }

    pub fn get(&self, joint: usize) -> Transform {
        self.transforms.get(joint)
    }

    pub fn set(&mut self, joint: usize, transform: &Transform) {
        self.transforms.set(joint, transform);
    }

    /// Writes the pose-space equivalent of this local pose into `out`.
    pub fn to_pose_space(&self, out: &mut Pose) -> Result<()> {
        self.check_same_size(out)?;
        for joint in 0..self.len() {
            let local = self.transforms.get(joint);
            let composed = match self.parents[joint] {
                // Parent already converted: it precedes `joint`.
                Some(parent) => Transform::multiply(&local, &out.transforms.get(parent)),
                None => local,
            };
            out.transforms.set(joint, &composed);
        }
        Ok(())
    }

    /// Writes the local-space equivalent of this pose-space pose into `out`.
    pub fn to_local_space(&self, out: &mut Pose) -> Result<()> {
        self.check_same_size(out)?;
        for joint in 0..self.len() {
            let transform = self.transforms.get(joint);
            let local = match self.parents[joint] {
                Some(parent) => Transform::relative(&transform, &self.transforms.get(parent)),
                None => transform,
            };
            out.transforms.set(joint, &local);
        }
        Ok(())
    }

    fn check_same_size(&self, other: &Pose) -> Result<()> {
        if self.len() != other.len() {
            return Err(StrideError::JointCountMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_parents(parents: &[Option<usize>]) -> Result<()> {
    for (joint, parent) in parents.iter().enumerate() {
        if let Some(parent) = *parent {
            if parent >= joint {
                return Err(StrideError::InvalidParent {
                    joint,
                    parent: parent as i64,
                });
            }
        }
    }
    Ok(())
}
