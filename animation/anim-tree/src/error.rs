use anim_clip::ClipError;
use thiserror::Error;

use crate::node::{NodeId, NodeKind};

/// Errors raised while building or evaluating a blend tree
#[derive(Error, Debug)]
pub enum AnimTreeError {
    #[error("Node pool is full (capacity {0})")]
    PoolExhausted(usize),

    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    #[error("Node {0} does not exist")]
    InvalidNode(NodeId),

    #[error("Node {0} is already being evaluated (cyclic node graph)")]
    VacantNode(NodeId),

    #[error("Node {node} is a {found} node, expected {expected}")]
    WrongNodeKind {
        node: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("Cannot connect node {child} to input {input} of {kind} node {parent}")]
    InvalidConnection {
        parent: NodeId,
        kind: NodeKind,
        child: NodeId,
        input: usize,
    },

    #[error("Input {input} of node {node} is not connected")]
    UnconnectedInput { node: NodeId, input: usize },

    #[error("Switch node {node}: active input {active} out of range ({count} inputs)")]
    SwitchInputOutOfRange {
        node: NodeId,
        active: usize,
        count: usize,
    },

    #[error("State machine {node} is full ({capacity} states)")]
    StateCapacity { node: NodeId, capacity: usize },

    #[error("State machine {node} is full ({capacity} edges)")]
    EdgeCapacity { node: NodeId, capacity: usize },

    #[error("State {state} cannot take another outgoing edge ({capacity} max)")]
    OutEdgeCapacity { state: usize, capacity: usize },

    #[error("Invalid state index {state} (state machine has {count} states)")]
    InvalidState { state: usize, count: usize },

    #[error("Invalid edge index {edge} (state machine has {count} edges)")]
    InvalidEdge { edge: usize, count: usize },

    #[error("State machine {0} has no states")]
    EmptyStateMachine(NodeId),

    #[error("Transition cycle detected: state {state} re-entered with {remaining}s left")]
    TransitionCycle { state: usize, remaining: f32 },

    #[error("State machine consumed more time than elapsed ({0}s left)")]
    TimeOverrun(f32),

    #[error("No root node set")]
    NoRootNode,

    #[error("Root bone {bone} out of range ({count} bones)")]
    InvalidRootBone { bone: usize, count: usize },

    #[error("Bone mask supports at most {max} bones, skeleton has {count}")]
    BoneMaskTooLarge { max: usize, count: usize },

    #[error("Bone not found: {0}")]
    BoneNotFound(String),

    #[error("Clip error: {0}")]
    Clip(#[from] ClipError),
}

pub type Result<T> = std::result::Result<T, AnimTreeError>;
