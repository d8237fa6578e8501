//! Bone hierarchy and bind poses

use glam::Mat4;
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::error::{ClipError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct BoneInfo {
    pub name: String,
    /// Parent bone; always a lower index than the bone itself
    pub parent: Option<usize>,
}

impl BoneInfo {
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
        }
    }
}

/// A bone hierarchy with its bind pose
///
/// `model_bind` is derived from `local_bind` by walking the parent chain,
/// starting each root bone from `root_bind`.
#[derive(custom_debug::Debug, Clone)]
pub struct Skeleton {
    #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
    bones: Vec<BoneInfo>,
    #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
    local_bind: Vec<Mat4>,
    #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
    model_bind: Vec<Mat4>,
    root_bind: Mat4,
}

impl Skeleton {
    pub fn new(bones: Vec<BoneInfo>, local_bind: Vec<Mat4>, root_bind: Mat4) -> Result<Self> {
        if bones.len() != local_bind.len() {
            return Err(ClipError::InvalidSkeleton(format!(
                "{} bones but {} bind matrices",
                bones.len(),
                local_bind.len()
            )));
        }
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent
                && parent >= index
            {
                return Err(ClipError::InvalidSkeleton(format!(
                    "bone '{}' ({}) has parent {} which does not precede it",
                    bone.name, index, parent
                )));
            }
        }

        let mut model_bind = Vec::with_capacity(bones.len());
        for (bone, local) in bones.iter().zip(&local_bind) {
            let parent = bone.parent.map_or(root_bind, |p| model_bind[p]);
            model_bind.push(parent * *local);
        }

        Ok(Self {
            bones,
            local_bind,
            model_bind,
            root_bind,
        })
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bones(&self) -> &[BoneInfo] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&BoneInfo> {
        self.bones.get(index)
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn local_bind(&self) -> &[Mat4] {
        &self.local_bind
    }

    pub fn model_bind(&self) -> &[Mat4] {
        &self.model_bind
    }

    pub fn root_bind(&self) -> Mat4 {
        self.root_bind
    }
}
