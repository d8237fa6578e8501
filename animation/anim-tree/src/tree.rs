//! Blend tree driver
//!
//! An [`AnimationTree`] owns the node pool and the [`AnimationPlayer`] it
//! poses. Nodes are created through the tree, wired with
//! [`AnimationTree::connect`], and the whole graph is evaluated once per
//! frame with [`AnimationTree::update`].

use std::fmt;

use anim_clip::{AnimationPlayer, Transform};

use crate::config::{StateMachineConfig, TreeConfig};
use crate::error::{AnimTreeError, Result};
use crate::motion::{BoneSample, RootMotion, UpdateInfo};
use crate::node::{
    Add2Params, Blend2Params, ClipCallback, ClipNode, ClipParams, EdgeId, EdgeInfo, EdgeParams,
    Node, NodeId, NodeKind, NodePool, PairNode, StateId, StateMachineNode, SwitchNode,
    SwitchParams, TravelOutcome,
};

type PoseCallbackFn = dyn FnMut(&AnimationPlayer, usize, &mut Transform);

/// Tree-wide hook run on the final local transform of every bone
pub struct PoseCallback(Box<PoseCallbackFn>);

impl PoseCallback {
    pub fn new(callback: impl FnMut(&AnimationPlayer, usize, &mut Transform) + 'static) -> Self {
        Self(Box::new(callback))
    }
}

impl fmt::Debug for PoseCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PoseCallback")
    }
}

/// A graph of animation nodes driving one skeleton
#[derive(Debug)]
pub struct AnimationTree {
    player: AnimationPlayer,
    pool: NodePool,
    root: Option<NodeId>,
    callback: Option<PoseCallback>,
}

impl AnimationTree {
    pub fn new(player: AnimationPlayer, config: TreeConfig) -> Result<Self> {
        if let Some(bone) = config.root_bone
            && bone >= player.bone_count()
        {
            log::warn!(
                "Root bone {} out of range ({} bones)",
                bone,
                player.bone_count()
            );
            return Err(AnimTreeError::InvalidRootBone {
                bone,
                count: player.bone_count(),
            });
        }

        Ok(Self {
            player,
            pool: NodePool::new(config.max_nodes, config.root_bone),
            root: None,
            callback: None,
        })
    }

    pub fn player(&self) -> &AnimationPlayer {
        &self.player
    }

    pub fn root_bone(&self) -> Option<usize> {
        self.pool.root_bone()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.pool.len()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn set_pose_callback(&mut self, callback: Option<PoseCallback>) {
        self.callback = callback;
    }

    // ---------------------------------------------------------------------
    // Node creation
    // ---------------------------------------------------------------------

    /// Creates a node playing the library clip named `clip`.
    pub fn create_clip_node(&mut self, clip: &str, params: ClipParams) -> Result<NodeId> {
        let Some(resource) = self.player.library().get(clip) else {
            log::debug!("Failed to create clip node: clip \"{}\" not found", clip);
            return Err(AnimTreeError::ClipNotFound(clip.to_string()));
        };
        let node = ClipNode::new(resource, params, self.pool.root_bone());
        self.pool.insert(Node::Clip(node))
    }

    pub fn create_blend2_node(&mut self, params: Blend2Params) -> Result<NodeId> {
        self.pool
            .insert(Node::Blend2(PairNode::new(params.mask, params.blend)))
    }

    pub fn create_add2_node(&mut self, params: Add2Params) -> Result<NodeId> {
        self.pool
            .insert(Node::Add2(PairNode::new(params.mask, params.weight)))
    }

    pub fn create_switch_node(&mut self, inputs: usize, params: SwitchParams) -> Result<NodeId> {
        self.pool
            .insert(Node::Switch(SwitchNode::new(inputs, params)))
    }

    pub fn create_state_machine_node(&mut self, config: StateMachineConfig) -> Result<NodeId> {
        self.pool
            .insert(Node::StateMachine(StateMachineNode::new(config)))
    }

    /// Creates a pass-through node. A state machine whose active state wraps
    /// this node reports itself done to its parent.
    pub fn create_exit_node(&mut self, nested: NodeId) -> Result<NodeId> {
        self.pool.get(nested)?;
        self.pool.insert(Node::Exit { nested })
    }

    /// Adds a state wrapping `node` to the state machine `stm`.
    pub fn create_state(&mut self, stm: NodeId, node: NodeId, max_out_edges: usize) -> Result<StateId> {
        self.pool.get(node)?;
        self.state_machine_mut(stm)?.add_state(stm, node, max_out_edges)
    }

    pub fn create_edge(
        &mut self,
        stm: NodeId,
        begin: StateId,
        end: StateId,
        params: EdgeParams,
    ) -> Result<EdgeId> {
        self.state_machine_mut(stm)?.add_edge(stm, begin, end, params)
    }

    /// Plugs `child` into input `input` of `parent`.
    ///
    /// Blend2 and Add2 take input 0 (main) and 1 (blend/add); a Switch takes
    /// any input below its input count.
    pub fn connect(&mut self, parent: NodeId, child: NodeId, input: usize) -> Result<()> {
        self.pool.get(child)?;
        let kind = self.pool.kind(parent)?;
        let slot = match self.pool.get_mut(parent)? {
            Node::Blend2(pair) | Node::Add2(pair) if parent != child => pair.inputs.get_mut(input),
            Node::Switch(switch) if parent != child => switch.inputs.get_mut(input),
            _ => None,
        };

        match slot {
            Some(slot) => {
                *slot = Some(child);
                Ok(())
            }
            None => {
                log::warn!(
                    "Failed to connect node {} to input {} of {} node {}",
                    child,
                    input,
                    kind,
                    parent
                );
                Err(AnimTreeError::InvalidConnection {
                    parent,
                    kind,
                    child,
                    input,
                })
            }
        }
    }

    pub fn set_root(&mut self, node: NodeId) -> Result<()> {
        self.pool.get(node)?;
        self.root = Some(node);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    pub fn node_kind(&self, node: NodeId) -> Result<NodeKind> {
        self.pool.kind(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, NodeKind)> + '_ {
        self.pool
            .iter()
            .filter_map(|(id, node)| node.kind().map(|kind| (id, kind)))
    }

    /// Child inputs of a combinator or exit node; empty for other kinds.
    pub fn node_inputs(&self, node: NodeId) -> Result<Vec<Option<NodeId>>> {
        Ok(match self.pool.get(node)? {
            Node::Blend2(pair) | Node::Add2(pair) => pair.inputs.to_vec(),
            Node::Switch(switch) => switch.inputs.clone(),
            Node::Exit { nested } => vec![Some(*nested)],
            Node::Clip(_) | Node::StateMachine(_) => Vec::new(),
            Node::Vacant => return Err(AnimTreeError::VacantNode(node)),
        })
    }

    pub fn clip_name(&self, node: NodeId) -> Result<&str> {
        Ok(self.clip(node)?.clip().name())
    }

    /// Nodes wrapped by the states of `stm`, indexed by state.
    pub fn state_nodes(&self, stm: NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .state_machine(stm)?
            .states
            .iter()
            .map(|state| state.node)
            .collect())
    }

    pub fn edges(&self, stm: NodeId) -> Result<Vec<EdgeInfo>> {
        Ok(self.state_machine(stm)?.edge_infos())
    }

    pub fn state_machine_config(&self, stm: NodeId) -> Result<StateMachineConfig> {
        Ok(self.state_machine(stm)?.config())
    }

    // ---------------------------------------------------------------------
    // Parameters
    // ---------------------------------------------------------------------

    pub fn clip_params(&self, node: NodeId) -> Result<ClipParams> {
        Ok(self.clip(node)?.params())
    }

    pub fn set_clip_params(&mut self, node: NodeId, params: ClipParams) -> Result<()> {
        self.clip_mut(node)?.set_params(params);
        Ok(())
    }

    pub fn set_clip_callback(&mut self, node: NodeId, callback: Option<ClipCallback>) -> Result<()> {
        self.clip_mut(node)?.set_callback(callback);
        Ok(())
    }

    /// Whole clip durations covered by the last update of a looping clip.
    pub fn clip_loop_crossings(&self, node: NodeId) -> Result<u32> {
        Ok(self.clip(node)?.loops())
    }

    pub fn blend2_params(&self, node: NodeId) -> Result<Blend2Params> {
        let pair = self.pair(node, NodeKind::Blend2)?;
        Ok(Blend2Params {
            mask: pair.mask,
            blend: pair.factor,
        })
    }

    pub fn set_blend2_params(&mut self, node: NodeId, params: Blend2Params) -> Result<()> {
        let pair = self.pair_mut(node, NodeKind::Blend2)?;
        pair.mask = params.mask;
        pair.factor = params.blend;
        Ok(())
    }

    pub fn add2_params(&self, node: NodeId) -> Result<Add2Params> {
        let pair = self.pair(node, NodeKind::Add2)?;
        Ok(Add2Params {
            mask: pair.mask,
            weight: pair.factor,
        })
    }

    pub fn set_add2_params(&mut self, node: NodeId, params: Add2Params) -> Result<()> {
        let pair = self.pair_mut(node, NodeKind::Add2)?;
        pair.mask = params.mask;
        pair.factor = params.weight;
        Ok(())
    }

    pub fn switch_params(&self, node: NodeId) -> Result<SwitchParams> {
        Ok(self.switch(node)?.params)
    }

    /// Replaces the switch parameters. The active input is validated on the
    /// next update.
    pub fn set_switch_params(&mut self, node: NodeId, params: SwitchParams) -> Result<()> {
        self.switch_mut(node)?.params = params;
        Ok(())
    }

    /// Per-input weights normalized to sum to one.
    pub fn switch_weights(&self, node: NodeId) -> Result<Vec<f32>> {
        Ok(self.switch(node)?.normalized_weights())
    }

    pub fn edge_params(&self, stm: NodeId, edge: EdgeId) -> Result<EdgeParams> {
        Ok(self.state_machine(stm)?.edge(edge)?.params)
    }

    pub fn set_edge_params(&mut self, stm: NodeId, edge: EdgeId, params: EdgeParams) -> Result<()> {
        self.state_machine_mut(stm)?.edge_mut(edge)?.params = params;
        Ok(())
    }

    /// Crossfade progress of `edge`, 0 to 1.
    pub fn edge_weight(&self, stm: NodeId, edge: EdgeId) -> Result<f32> {
        Ok(self.state_machine(stm)?.edge(edge)?.weight)
    }

    /// The state the machine is in or transitioning to.
    pub fn active_state(&self, stm: NodeId) -> Result<StateId> {
        Ok(self.state_machine(stm)?.active_state())
    }

    /// The state still dominating the output: the source of an unfinished
    /// crossfade, otherwise the active state.
    pub fn current_state(&self, stm: NodeId) -> Result<StateId> {
        Ok(self.state_machine(stm)?.current_state())
    }

    /// Requests a transition to `target`, over several edges if needed.
    pub fn travel_to(&mut self, stm: NodeId, target: StateId) -> Result<TravelOutcome> {
        let mut machine = self.take_state_machine(stm)?;
        let result = machine.travel_to(&mut self.pool, stm, target);
        self.restore(stm, Node::StateMachine(machine));
        result
    }

    /// Rewinds the playback of the subtree rooted at `node`.
    pub fn reset_node(&mut self, node: NodeId) -> Result<()> {
        self.pool.reset(node)
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    /// Runs the time-advance pass only. Negative steps are ignored.
    pub fn advance(&mut self, elapsed: f32) -> Result<UpdateInfo> {
        let root = self.root.ok_or(AnimTreeError::NoRootNode)?;
        if elapsed < 0.0 {
            return Ok(UpdateInfo::default());
        }
        self.pool.update(root, elapsed, 0.0)
    }

    /// Runs the evaluation pass for one bone, with root motion when `bone`
    /// is the root bone.
    pub fn evaluate_bone(&mut self, bone: usize) -> Result<BoneSample> {
        let root = self.root.ok_or(AnimTreeError::NoRootNode)?;
        self.pool.eval(root, bone, true)
    }

    /// Advances the tree by `elapsed` seconds and poses every bone of the
    /// player.
    ///
    /// Returns the root motion of the frame (zero without a root bone). On
    /// failure the player is reset to its bind pose and the error returned;
    /// the next call starts afresh. Negative steps are ignored.
    pub fn update(&mut self, elapsed: f32) -> Result<RootMotion> {
        if elapsed < 0.0 {
            return Ok(RootMotion::ZERO);
        }

        self.run_frame(elapsed).inspect_err(|err| {
            log::error!("Animation tree failed: {}", err);
            self.player.reset_to_bind_pose();
        })
    }

    fn run_frame(&mut self, elapsed: f32) -> Result<RootMotion> {
        let root = self.root.ok_or(AnimTreeError::NoRootNode)?;
        self.pool.update(root, elapsed, 0.0)?;

        let mut frame_motion = RootMotion::ZERO;
        for bone in 0..self.player.bone_count() {
            let sample = self.pool.eval(root, bone, true)?;
            let mut transform = sample.transform;

            if self.pool.root_bone() == Some(bone) {
                let motion = sample.root.unwrap_or_default();
                transform = transform - motion.distance;
                frame_motion = motion;
            }

            if let Some(callback) = &mut self.callback {
                (callback.0)(&self.player, bone, &mut transform);
            }

            self.player.set_local_pose(bone, transform.to_matrix())?;
        }

        self.player.compute_model_pose();
        Ok(frame_motion)
    }

    // ---------------------------------------------------------------------
    // Typed node access
    // ---------------------------------------------------------------------

    fn wrong_kind(&self, node: NodeId, expected: NodeKind) -> AnimTreeError {
        match self.pool.kind(node) {
            Ok(found) => {
                log::warn!("Node {} is a {} node, expected {}", node, found, expected);
                AnimTreeError::WrongNodeKind {
                    node,
                    expected,
                    found,
                }
            }
            Err(err) => err,
        }
    }

    fn clip(&self, node: NodeId) -> Result<&ClipNode> {
        match self.pool.get(node)? {
            Node::Clip(clip) => Ok(clip),
            _ => Err(self.wrong_kind(node, NodeKind::Clip)),
        }
    }

    fn clip_mut(&mut self, node: NodeId) -> Result<&mut ClipNode> {
        if !matches!(self.pool.get(node)?, Node::Clip(_)) {
            return Err(self.wrong_kind(node, NodeKind::Clip));
        }
        match self.pool.get_mut(node)? {
            Node::Clip(clip) => Ok(clip),
            _ => Err(AnimTreeError::InvalidNode(node)),
        }
    }

    fn pair(&self, node: NodeId, expected: NodeKind) -> Result<&PairNode> {
        match (self.pool.get(node)?, expected) {
            (Node::Blend2(pair), NodeKind::Blend2) | (Node::Add2(pair), NodeKind::Add2) => Ok(pair),
            _ => Err(self.wrong_kind(node, expected)),
        }
    }

    fn pair_mut(&mut self, node: NodeId, expected: NodeKind) -> Result<&mut PairNode> {
        self.pair(node, expected)?;
        match self.pool.get_mut(node)? {
            Node::Blend2(pair) | Node::Add2(pair) => Ok(pair),
            _ => Err(AnimTreeError::InvalidNode(node)),
        }
    }

    fn switch(&self, node: NodeId) -> Result<&SwitchNode> {
        match self.pool.get(node)? {
            Node::Switch(switch) => Ok(switch),
            _ => Err(self.wrong_kind(node, NodeKind::Switch)),
        }
    }

    fn switch_mut(&mut self, node: NodeId) -> Result<&mut SwitchNode> {
        self.switch(node)?;
        match self.pool.get_mut(node)? {
            Node::Switch(switch) => Ok(switch),
            _ => Err(AnimTreeError::InvalidNode(node)),
        }
    }

    fn state_machine(&self, node: NodeId) -> Result<&StateMachineNode> {
        match self.pool.get(node)? {
            Node::StateMachine(stm) => Ok(stm),
            _ => Err(self.wrong_kind(node, NodeKind::StateMachine)),
        }
    }

    fn state_machine_mut(&mut self, node: NodeId) -> Result<&mut StateMachineNode> {
        self.state_machine(node)?;
        match self.pool.get_mut(node)? {
            Node::StateMachine(stm) => Ok(stm),
            _ => Err(AnimTreeError::InvalidNode(node)),
        }
    }

    /// Moves a state machine out of the pool so it can reset its states.
    fn take_state_machine(&mut self, node: NodeId) -> Result<StateMachineNode> {
        self.state_machine(node)?;
        match std::mem::replace(self.pool.get_mut(node)?, Node::Vacant) {
            Node::StateMachine(stm) => Ok(stm),
            other => {
                self.restore(node, other);
                Err(AnimTreeError::InvalidNode(node))
            }
        }
    }

    fn restore(&mut self, node: NodeId, value: Node) {
        if let Ok(slot) = self.pool.get_mut(node) {
            *slot = value;
        }
    }
}
