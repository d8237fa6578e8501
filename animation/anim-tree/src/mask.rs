//! Per-bone inclusion masks for Blend2 and Add2 nodes

use anim_clip::Skeleton;
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::error::{AnimTreeError, Result};

const WORDS: usize = 8;
const WORD_BITS: usize = u32::BITS as usize;

/// A fixed-size bitset over at most [`BoneMask::MAX_BONES`] bones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct BoneMask {
    bits: [u32; WORDS],
    bone_count: usize,
}

impl BoneMask {
    pub const MAX_BONES: usize = WORDS * WORD_BITS;

    /// An empty mask sized for `bone_count` bones.
    pub fn empty(bone_count: usize) -> Result<Self> {
        if bone_count > Self::MAX_BONES {
            log::warn!(
                "Failed to create bone mask: {} bones exceed the maximum of {}",
                bone_count,
                Self::MAX_BONES
            );
            return Err(AnimTreeError::BoneMaskTooLarge {
                max: Self::MAX_BONES,
                count: bone_count,
            });
        }
        Ok(Self {
            bits: [0; WORDS],
            bone_count,
        })
    }

    /// Builds a mask selecting the named bones of `skeleton`.
    pub fn from_bone_names(skeleton: &Skeleton, names: &[&str]) -> Result<Self> {
        let mut mask = Self::empty(skeleton.bone_count())?;
        for name in names {
            let Some(index) = skeleton.bone_index(name) else {
                log::warn!("Failed to create bone mask: bone \"{}\" not found", name);
                return Err(AnimTreeError::BoneNotFound((*name).to_string()));
            };
            mask.insert(index);
        }
        Ok(mask)
    }

    /// Builds a mask from bone indices; indices outside `bone_count` are ignored.
    pub fn from_indices(bone_count: usize, bones: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut mask = Self::empty(bone_count)?;
        for bone in bones {
            if bone < bone_count {
                mask.insert(bone);
            }
        }
        Ok(mask)
    }

    fn insert(&mut self, bone: usize) {
        self.bits[bone / WORD_BITS] |= 1 << (bone % WORD_BITS);
    }

    pub fn contains(&self, bone: usize) -> bool {
        bone < Self::MAX_BONES && self.bits[bone / WORD_BITS] & (1 << (bone % WORD_BITS)) != 0
    }

    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.bone_count).filter(|&bone| self.contains(bone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anim_clip::BoneInfo;
    use glam::Mat4;

    fn skeleton(count: usize) -> Skeleton {
        let bones = (0..count)
            .map(|i| BoneInfo::new(format!("bone{}", i), i.checked_sub(1)))
            .collect();
        Skeleton::new(bones, vec![Mat4::IDENTITY; count], Mat4::IDENTITY).unwrap()
    }

    #[test]
    fn test_from_bone_names() {
        let mask = BoneMask::from_bone_names(&skeleton(40), &["bone1", "bone33"]).unwrap();
        assert!(mask.contains(1));
        assert!(mask.contains(33));
        assert!(!mask.contains(0));
        assert!(!mask.contains(32));
        assert_eq!(mask.len(), 2);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 33]);
    }

    #[test]
    fn test_unknown_bone() {
        let result = BoneMask::from_bone_names(&skeleton(3), &["bone0", "tail"]);
        assert!(matches!(result, Err(AnimTreeError::BoneNotFound(name)) if name == "tail"));
    }

    #[test]
    fn test_too_many_bones() {
        assert!(matches!(
            BoneMask::from_bone_names(&skeleton(257), &[]),
            Err(AnimTreeError::BoneMaskTooLarge { max: 256, count: 257 })
        ));
    }

    #[test]
    fn test_contains_past_capacity() {
        let mask = BoneMask::from_indices(256, [255]).unwrap();
        assert!(mask.contains(255));
        assert!(!mask.contains(256));
        assert!(!mask.contains(10_000));
    }
}
