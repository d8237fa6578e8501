#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use super::{NodeId, NodePool};
use crate::error::{AnimTreeError, Result};
use crate::mask::BoneMask;
use crate::motion::{BoneSample, UpdateInfo};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Blend2Params {
    /// Bones affected by the blend; all bones when absent
    pub mask: Option<BoneMask>,
    /// 0 keeps the main input, 1 the blend input
    pub blend: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Add2Params {
    /// Bones affected by the addition; all bones when absent
    pub mask: Option<BoneMask>,
    /// Scale applied to the additive input
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combine {
    Blend,
    Add,
}

/// Shared body of Blend2 and Add2: a main input, a secondary input and a
/// factor applied to the secondary one
#[derive(Debug)]
pub(crate) struct PairNode {
    pub(crate) inputs: [Option<NodeId>; 2],
    pub(crate) mask: Option<BoneMask>,
    pub(crate) factor: f32,
}

impl PairNode {
    pub(crate) fn new(mask: Option<BoneMask>, factor: f32) -> Self {
        Self {
            inputs: [None, None],
            mask,
            factor,
        }
    }

    fn input(&self, owner: NodeId, input: usize) -> Result<NodeId> {
        self.inputs[input].ok_or(AnimTreeError::UnconnectedInput { node: owner, input })
    }

    /// The secondary input is advanced for bookkeeping only.
    pub(crate) fn update(
        &self,
        pool: &mut NodePool,
        owner: NodeId,
        elapsed: f32,
        window: f32,
    ) -> Result<UpdateInfo> {
        let info = pool.update(self.input(owner, 0)?, elapsed, window)?;
        pool.update(self.input(owner, 1)?, elapsed, 0.0)?;
        Ok(info)
    }

    pub(crate) fn eval(
        &self,
        pool: &mut NodePool,
        owner: NodeId,
        bone: usize,
        want_motion: bool,
        combine: Combine,
    ) -> Result<BoneSample> {
        let main = pool.eval(self.input(owner, 0)?, bone, want_motion)?;
        if !self.mask.is_none_or(|mask| mask.contains(bone)) {
            return Ok(main);
        }

        let secondary = pool.eval(self.input(owner, 1)?, bone, want_motion)?;
        let weight = self.factor.clamp(0.0, 1.0);
        let transform = match combine {
            Combine::Blend => main.transform.lerp(&secondary.transform, weight),
            Combine::Add => main.transform.add_scaled(&secondary.transform, weight),
        };
        let root = match (main.root, secondary.root) {
            (Some(a), Some(b)) => Some(a.lerp(&b, weight)),
            (a, b) => a.or(b),
        };

        Ok(BoneSample { transform, root })
    }

    pub(crate) fn reset(&self, pool: &mut NodePool) -> Result<()> {
        for input in self.inputs.iter().flatten() {
            pool.reset(*input)?;
        }
        Ok(())
    }
}
