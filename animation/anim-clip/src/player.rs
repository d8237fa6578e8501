//! Per-bone pose storage written by a blend tree

use std::sync::Arc;

use glam::Mat4;

use crate::clip::AnimationLibrary;
use crate::error::{ClipError, Result};
use crate::skeleton::Skeleton;

/// Holds the local and model pose of one skeleton instance
///
/// A blend tree writes `local_pose` once per bone per frame and then calls
/// [`AnimationPlayer::compute_model_pose`].
#[derive(custom_debug::Debug, Clone)]
pub struct AnimationPlayer {
    skeleton: Arc<Skeleton>,
    library: Arc<AnimationLibrary>,
    #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
    local_pose: Vec<Mat4>,
    #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
    model_pose: Vec<Mat4>,
}

impl AnimationPlayer {
    /// Creates a player resting in the skeleton's bind pose.
    pub fn new(skeleton: Arc<Skeleton>, library: Arc<AnimationLibrary>) -> Self {
        let local_pose = skeleton.local_bind().to_vec();
        let model_pose = skeleton.model_bind().to_vec();
        Self {
            skeleton,
            library,
            local_pose,
            model_pose,
        }
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn library(&self) -> &AnimationLibrary {
        &self.library
    }

    pub fn bone_count(&self) -> usize {
        self.skeleton.bone_count()
    }

    pub fn local_pose(&self) -> &[Mat4] {
        &self.local_pose
    }

    pub fn model_pose(&self) -> &[Mat4] {
        &self.model_pose
    }

    pub fn set_local_pose(&mut self, bone: usize, matrix: Mat4) -> Result<()> {
        let count = self.local_pose.len();
        let slot = self
            .local_pose
            .get_mut(bone)
            .ok_or(ClipError::BoneOutOfRange { index: bone, count })?;
        *slot = matrix;
        Ok(())
    }

    /// Recomputes model space matrices from the local pose.
    pub fn compute_model_pose(&mut self) {
        let root_bind = self.skeleton.root_bind();
        for (index, bone) in self.skeleton.bones().iter().enumerate() {
            let parent = bone.parent.map_or(root_bind, |p| self.model_pose[p]);
            self.model_pose[index] = parent * self.local_pose[index];
        }
    }

    /// Restores both pose arrays to the bind pose.
    pub fn reset_to_bind_pose(&mut self) {
        self.local_pose.copy_from_slice(self.skeleton.local_bind());
        self.model_pose.copy_from_slice(self.skeleton.model_bind());
    }
}
