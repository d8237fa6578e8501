//! Blend tree node kinds and the pool that owns them
//!
//! Nodes reference each other by [`NodeId`]. While a node runs its own
//! update or eval it is moved out of the pool and its slot holds
//! [`Node::Vacant`], so a node graph that loops back onto itself is
//! reported as an error instead of recursing forever.

mod blend;
mod clip;
mod state_machine;
mod switch;
mod travel;

use std::fmt;

pub use blend::{Add2Params, Blend2Params};
pub use clip::{ClipCallback, ClipParams, ClipSample, PlaybackState};
pub use state_machine::{EdgeId, EdgeInfo, EdgeMode, EdgeParams, EdgeStatus, StateId};
pub use switch::SwitchParams;
pub use travel::TravelOutcome;

pub(crate) use blend::{Combine, PairNode};
pub(crate) use clip::ClipNode;
pub(crate) use state_machine::StateMachineNode;
pub(crate) use switch::SwitchNode;

use crate::error::{AnimTreeError, Result};
use crate::motion::{BoneSample, UpdateInfo};

/// Handle of a node inside one tree's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Clip,
    Blend2,
    Add2,
    Switch,
    StateMachine,
    /// Wrapper letting a state machine report itself done
    Exit,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clip => "Clip",
            Self::Blend2 => "Blend2",
            Self::Add2 => "Add2",
            Self::Switch => "Switch",
            Self::StateMachine => "StateMachine",
            Self::Exit => "Exit",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub(crate) enum Node {
    Clip(ClipNode),
    Blend2(PairNode),
    Add2(PairNode),
    Switch(SwitchNode),
    StateMachine(StateMachineNode),
    Exit { nested: NodeId },
    Vacant,
}

impl Node {
    pub(crate) fn kind(&self) -> Option<NodeKind> {
        match self {
            Self::Clip(_) => Some(NodeKind::Clip),
            Self::Blend2(_) => Some(NodeKind::Blend2),
            Self::Add2(_) => Some(NodeKind::Add2),
            Self::Switch(_) => Some(NodeKind::Switch),
            Self::StateMachine(_) => Some(NodeKind::StateMachine),
            Self::Exit { .. } => Some(NodeKind::Exit),
            Self::Vacant => None,
        }
    }
}

/// Fixed-capacity arena holding every node of a tree
#[derive(Debug)]
pub(crate) struct NodePool {
    nodes: Vec<Node>,
    capacity: usize,
    root_bone: Option<usize>,
}

impl NodePool {
    pub(crate) fn new(capacity: usize, root_bone: Option<usize>) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
            root_bone,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn root_bone(&self) -> Option<usize> {
        self.root_bone
    }

    pub(crate) fn insert(&mut self, node: Node) -> Result<NodeId> {
        if self.nodes.len() >= self.capacity {
            log::warn!(
                "Failed to create {} node: node pool is full ({})",
                node.kind().map_or_else(|| "vacant".to_string(), |k| k.to_string()),
                self.capacity
            );
            return Err(AnimTreeError::PoolExhausted(self.capacity));
        }
        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(AnimTreeError::InvalidNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(AnimTreeError::InvalidNode(id))
    }

    pub(crate) fn kind(&self, id: NodeId) -> Result<NodeKind> {
        self.get(id)?.kind().ok_or(AnimTreeError::VacantNode(id))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Moves a node out of its slot for the duration of a pass.
    fn take(&mut self, id: NodeId) -> Result<Node> {
        let slot = self.get_mut(id)?;
        match std::mem::replace(slot, Node::Vacant) {
            Node::Vacant => {
                log::warn!("Node {} was reached while already being processed", id);
                Err(AnimTreeError::VacantNode(id))
            }
            node => Ok(node),
        }
    }

    fn restore(&mut self, id: NodeId, node: Node) {
        self.nodes[id.0] = node;
    }

    /// Advances `id` by `elapsed` seconds. `window` is the crossfade time of
    /// the transition that may follow this node.
    pub(crate) fn update(&mut self, id: NodeId, elapsed: f32, window: f32) -> Result<UpdateInfo> {
        let mut node = self.take(id)?;
        let result = match &mut node {
            Node::Clip(clip) => Ok(clip.update(elapsed, window)),
            Node::Blend2(pair) | Node::Add2(pair) => pair.update(self, id, elapsed, window),
            Node::Switch(switch) => switch.update(self, id, elapsed),
            Node::StateMachine(stm) => stm.update(self, id, elapsed),
            Node::Exit { nested } => self.update(*nested, elapsed, window),
            Node::Vacant => Err(AnimTreeError::VacantNode(id)),
        };
        self.restore(id, node);
        result
    }

    /// Evaluates `bone`. Root motion is produced only when `want_motion` is
    /// set and `bone` is the tree's root bone.
    pub(crate) fn eval(&mut self, id: NodeId, bone: usize, want_motion: bool) -> Result<BoneSample> {
        let want_motion = want_motion && self.root_bone == Some(bone);
        let mut node = self.take(id)?;
        let result = match &mut node {
            Node::Clip(clip) => Ok(clip.eval(bone, self.root_bone, want_motion)),
            Node::Blend2(pair) => pair.eval(self, id, bone, want_motion, Combine::Blend),
            Node::Add2(pair) => pair.eval(self, id, bone, want_motion, Combine::Add),
            Node::Switch(switch) => switch.eval(self, id, bone, want_motion),
            Node::StateMachine(stm) => stm.eval(self, id, bone, want_motion),
            Node::Exit { nested } => self.eval(*nested, bone, want_motion),
            Node::Vacant => Err(AnimTreeError::VacantNode(id)),
        };
        self.restore(id, node);
        result
    }

    /// Rewinds the playback state of the subtree rooted at `id`.
    pub(crate) fn reset(&mut self, id: NodeId) -> Result<()> {
        let mut node = self.take(id)?;
        let result = match &mut node {
            Node::Clip(clip) => {
                clip.reset();
                Ok(())
            }
            Node::Blend2(pair) | Node::Add2(pair) => pair.reset(self),
            Node::Switch(switch) => switch.reset(self),
            Node::StateMachine(stm) => stm.reset(self, id),
            Node::Exit { nested } => self.reset(*nested),
            Node::Vacant => Err(AnimTreeError::VacantNode(id)),
        };
        self.restore(id, node);
        result
    }
}
