//! Values passed up and down the tree during the two evaluation passes

use anim_clip::Transform;

/// Root bone movement extracted during evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMotion {
    /// Movement since the previous frame
    pub motion: Transform,
    /// Offset of the current sample from the clip's first key
    pub distance: Transform,
}

impl Default for RootMotion {
    fn default() -> Self {
        Self::ZERO
    }
}

impl RootMotion {
    pub const ZERO: Self = Self {
        motion: Transform::ZERO,
        distance: Transform::ZERO,
    };

    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            motion: self.motion.lerp(&other.motion, t),
            distance: self.distance.lerp(&other.distance, t),
        }
    }
}

/// Result of advancing a node in time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UpdateInfo {
    /// The node reached the point where an outgoing transition may fire
    pub done: bool,
    /// Seconds of the step the node actually used
    pub consumed: f32,
}

impl UpdateInfo {
    /// A node with nothing left to play.
    pub(crate) const FINISHED: Self = Self {
        done: true,
        consumed: 0.0,
    };
}

/// Output of evaluating one bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneSample {
    pub transform: Transform,
    /// Present only for the root bone when motion was requested
    pub root: Option<RootMotion>,
}

impl BoneSample {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            root: None,
        }
    }
}
