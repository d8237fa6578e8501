//! Construction-time configuration

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Blend tree sizing and root motion settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct TreeConfig {
    /// Maximum number of nodes the pool can hold
    pub max_nodes: usize,
    /// Bone whose movement is extracted as root motion
    pub root_bone: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_nodes: 32,
            root_bone: None,
        }
    }
}

impl TreeConfig {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            max_nodes,
            ..Self::default()
        }
    }

    pub fn with_root_bone(mut self, bone: usize) -> Self {
        self.root_bone = Some(bone);
        self
    }
}

/// State machine capacities
///
/// With `travel` enabled, `max_states` also bounds the length of a travel
/// path and `max_edges` the number of partial paths explored at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct StateMachineConfig {
    pub max_states: usize,
    pub max_edges: usize,
    pub travel: bool,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            max_states: 8,
            max_edges: 16,
            travel: false,
        }
    }
}

impl StateMachineConfig {
    pub fn new(max_states: usize, max_edges: usize) -> Self {
        Self {
            max_states,
            max_edges,
            travel: false,
        }
    }

    pub fn with_travel(mut self) -> Self {
        self.travel = true;
        self
    }
}
