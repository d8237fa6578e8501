use anim_clip::Transform;
use anim_utils::{float_eq, remap};
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use super::{NodeId, NodePool};
use crate::error::{AnimTreeError, Result};
use crate::motion::{BoneSample, RootMotion, UpdateInfo};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct SwitchParams {
    /// Keep the playback of a newly activated input instead of resetting it
    pub synced: bool,
    pub active_input: usize,
    /// Crossfade time between inputs, in seconds
    pub cross_fade: f32,
}

#[derive(Debug)]
pub(crate) struct SwitchNode {
    pub(crate) inputs: Vec<Option<NodeId>>,
    pub(crate) params: SwitchParams,
    weights: Vec<f32>,
    inverse_sum: f32,
    previous_input: usize,
}

impl SwitchNode {
    pub(crate) fn new(input_count: usize, params: SwitchParams) -> Self {
        let mut node = Self {
            inputs: vec![None; input_count],
            params,
            weights: vec![0.0; input_count],
            inverse_sum: 1.0,
            previous_input: 0,
        };
        node.select_only_active();
        node
    }

    fn select_only_active(&mut self) {
        self.weights.fill(0.0);
        if let Some(weight) = self.weights.get_mut(self.params.active_input) {
            *weight = 1.0;
        }
        self.inverse_sum = 1.0;
    }

    /// Weights divided by their sum.
    pub(crate) fn normalized_weights(&self) -> Vec<f32> {
        self.weights.iter().map(|w| w * self.inverse_sum).collect()
    }

    fn input(&self, owner: NodeId, input: usize) -> Result<NodeId> {
        self.inputs[input].ok_or(AnimTreeError::UnconnectedInput { node: owner, input })
    }

    fn check_active(&self, owner: NodeId) -> Result<usize> {
        let active = self.params.active_input;
        if active >= self.inputs.len() {
            log::warn!(
                "Failed to update switch {}: active input {} out of range ({})",
                owner,
                active,
                self.inputs.len()
            );
            return Err(AnimTreeError::SwitchInputOutOfRange {
                node: owner,
                active,
                count: self.inputs.len(),
            });
        }
        Ok(active)
    }

    /// Every input is advanced so inactive branches keep cycling while they
    /// fade out. A switch never reports itself done.
    pub(crate) fn update(&mut self, pool: &mut NodePool, owner: NodeId, elapsed: f32) -> Result<UpdateInfo> {
        let active = self.check_active(owner)?;

        if active != self.previous_input && !self.params.synced {
            pool.reset(self.input(owner, active)?)?;
        }
        for input in 0..self.inputs.len() {
            pool.update(self.input(owner, input)?, elapsed, 0.0)?;
        }
        self.previous_input = active;

        let cross_fade = self.params.cross_fade;
        if cross_fade <= elapsed {
            self.select_only_active();
        } else {
            let step = remap(elapsed, 0.0, cross_fade, 0.0, 1.0);
            for (i, weight) in self.weights.iter_mut().enumerate() {
                let sign = if i == active { 1.0 } else { -1.0 };
                *weight = (*weight + sign * step).clamp(0.0, 1.0);
            }
        }

        let sum: f32 = self.weights.iter().sum();
        self.inverse_sum = if sum > 0.0 { 1.0 / sum } else { 1.0 };

        Ok(UpdateInfo::default())
    }

    /// Weighted average of the inputs. Every input is evaluated so hidden
    /// clips keep their root motion bookkeeping current, but only inputs
    /// with non-zero weight contribute. Rotations are combined by slerping
    /// towards each input by its share of the running weight total.
    pub(crate) fn eval(
        &self,
        pool: &mut NodePool,
        owner: NodeId,
        bone: usize,
        want_motion: bool,
    ) -> Result<BoneSample> {
        let mut transform = Transform::ZERO;
        let mut root = want_motion.then_some(RootMotion::ZERO);
        let mut total = 0.0;

        for (index, weight) in self.weights.iter().enumerate() {
            let sample = pool.eval(self.input(owner, index)?, bone, want_motion)?;
            let weight = weight * self.inverse_sum;
            if float_eq(weight, 0.0) {
                continue;
            }

            total += weight;
            let share = weight / total;

            transform = accumulate(&transform, &sample.transform, weight, share);
            if let (Some(acc), Some(motion)) = (root.as_mut(), sample.root) {
                acc.motion = accumulate(&acc.motion, &motion.motion, weight, share);
                acc.distance = accumulate(&acc.distance, &motion.distance, weight, share);
            }
        }

        Ok(BoneSample { transform, root })
    }

    pub(crate) fn reset(&mut self, pool: &mut NodePool) -> Result<()> {
        self.select_only_active();
        for input in self.inputs.iter().flatten() {
            pool.reset(*input)?;
        }
        Ok(())
    }
}

/// Adds `weight` of `next` to a running weighted sum.
fn accumulate(acc: &Transform, next: &Transform, weight: f32, share: f32) -> Transform {
    Transform {
        translation: acc.translation + next.translation * weight,
        rotation: if share >= 1.0 {
            next.rotation
        } else {
            acc.rotation.slerp(next.rotation, share)
        },
        scale: acc.scale + next.scale * weight,
    }
}
