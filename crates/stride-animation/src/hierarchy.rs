use stride_core::Transform;

/// Read/write access to a host's joint transforms.
///
/// This is the seam between the solvers in this crate and whatever owns the
/// joints (a scene graph, an ECS, or the in-crate [`crate::Skeleton`]). Joints are
/// addressed by index; every method may assume `joint < self.joint_count()`.
pub trait JointHierarchy {
    fn joint_count(&self) -> usize;

    fn parent(&self, joint: usize) -> Option<usize>;

    fn local_transform(&self, joint: usize) -> Transform;

    fn set_local_transform(&mut self, joint: usize, transform: &Transform);

    fn world_transform(&self, joint: usize) -> Transform {
        let local = self.local_transform(joint);
        match self.parent(joint) {
            Some(parent) => Transform::multiply(&local, &self.world_transform(parent)),
            None => local,
        }
    }

    /// World transform of `joint`'s parent, or identity for a root joint.
    fn parent_world_transform(&self, joint: usize) -> Transform {
        self.parent(joint)
            .map(|parent| self.world_transform(parent))
            .unwrap_or(Transform::IDENTITY)
    }
}
