//! Scene files: a skeleton, its clips and a blend tree, described in YAML or
//! JSON and turned into a ready-to-run [`AnimationTree`]

use std::path::Path;
use std::sync::Arc;

use anim_clip::{
    AnimationClip, AnimationLibrary, AnimationPlayer, BoneInfo, Channel, ClipError, Interpolate,
    Skeleton, Track,
};
use anim_tree::{
    Add2Params, AnimTreeError, AnimationTree, Blend2Params, BoneMask, ClipParams, EdgeParams,
    NodeId, PlaybackState, StateId, StateMachineConfig, SwitchParams, TreeConfig,
};
use anyhow::{Context, bail};
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Unknown bone: {0}")]
    UnknownBone(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Node name used twice: {0}")]
    DuplicateNode(String),

    #[error("Node {0} is not a state machine")]
    NotAStateMachine(String),

    #[error("State machine {machine} has no state named {state}")]
    UnknownState { machine: String, state: String },

    #[error("Switch {node} has no input {input}")]
    SwitchInput { node: String, input: usize },

    #[error(transparent)]
    Clip(#[from] ClipError),

    #[error(transparent)]
    Tree(#[from] AnimTreeError),
}

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Deserialize)]
pub struct Scene {
    pub skeleton: SkeletonDesc,
    #[serde(default)]
    pub clips: Vec<ClipDesc>,
    #[serde(default)]
    pub tree: TreeDesc,
    pub nodes: Vec<NodeDesc>,
    pub root: String,
    #[serde(default)]
    pub events: Vec<EventDesc>,
}

#[derive(Debug, Deserialize)]
pub struct SkeletonDesc {
    pub bones: Vec<BoneDesc>,
}

/// A bone and its local bind transform
#[derive(Debug, Deserialize)]
pub struct BoneDesc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

#[derive(Debug, Deserialize)]
pub struct ClipDesc {
    pub name: String,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: f32,
    /// Length in ticks
    pub duration: f32,
    #[serde(default)]
    pub channels: Vec<ChannelDesc>,
}

fn default_ticks_per_second() -> f32 {
    30.0
}

#[derive(Debug, Deserialize)]
pub struct ChannelDesc {
    pub bone: String,
    #[serde(default)]
    pub translation: Option<TrackDesc<Vec3>>,
    #[serde(default)]
    pub rotation: Option<TrackDesc<Quat>>,
    #[serde(default)]
    pub scale: Option<TrackDesc<Vec3>>,
}

#[derive(Debug, Deserialize)]
pub struct TrackDesc<T> {
    /// Key times in ticks
    pub times: Vec<f32>,
    pub values: Vec<T>,
}

impl<T: Interpolate> TrackDesc<T> {
    fn build(self) -> Result<Track<T>> {
        Ok(Track::new(self.times, self.values)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TreeDesc {
    pub max_nodes: usize,
    /// Bone whose movement is extracted as root motion
    pub root_bone: Option<String>,
}

impl Default for TreeDesc {
    fn default() -> Self {
        Self {
            max_nodes: TreeConfig::default().max_nodes,
            root_bone: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NodeDesc {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeDef,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDef {
    Clip {
        clip: String,
        #[serde(default)]
        playback: PlaybackState,
        #[serde(default)]
        looper: bool,
    },
    Blend2 {
        main: String,
        blend: String,
        #[serde(default)]
        factor: f32,
        #[serde(default)]
        mask: Vec<String>,
    },
    Add2 {
        main: String,
        add: String,
        #[serde(default)]
        weight: f32,
        #[serde(default)]
        mask: Vec<String>,
    },
    Switch {
        inputs: Vec<String>,
        #[serde(default)]
        active: usize,
        #[serde(default)]
        cross_fade: f32,
        #[serde(default)]
        synced: bool,
    },
    StateMachine {
        #[serde(default)]
        config: StateMachineConfig,
        states: Vec<StateDesc>,
        #[serde(default)]
        edges: Vec<EdgeDesc>,
    },
    Exit {
        nested: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct StateDesc {
    pub name: String,
    pub node: String,
    #[serde(default = "default_out_edges")]
    pub max_out_edges: usize,
}

fn default_out_edges() -> usize {
    4
}

#[derive(Debug, Deserialize)]
pub struct EdgeDesc {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub params: EdgeParams,
}

#[derive(Debug, Deserialize)]
pub struct EventDesc {
    /// Frame before whose update the event is applied
    pub frame: usize,
    #[serde(flatten)]
    pub action: ActionDesc,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionDesc {
    Travel { machine: String, state: String },
    Switch { node: String, input: usize },
    Blend { node: String, value: f32 },
    Add { node: String, value: f32 },
    Speed { node: String, speed: f32 },
}

impl Scene {
    /// Reads a scene, picking the parser from the file extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("yaml" | "yml") => serde_yaml_ng::from_str(&text)
                .with_context(|| format!("Failed to parse YAML scene: {}", path.display())),
            Some("json") => serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse JSON scene: {}", path.display())),
            _ => bail!(
                "Unsupported scene format: {} (expected .yaml, .yml or .json)",
                path.display()
            ),
        }
    }

    pub fn build(self) -> Result<BuiltScene> {
        let skeleton = Arc::new(build_skeleton(&self.skeleton)?);

        let mut library = AnimationLibrary::new();
        for clip in self.clips {
            library.insert(build_clip(&skeleton, clip)?)?;
        }

        let mut config = TreeConfig::new(self.tree.max_nodes);
        if let Some(bone) = &self.tree.root_bone {
            config = config.with_root_bone(bone_index(&skeleton, bone)?);
        }

        let player = AnimationPlayer::new(skeleton, Arc::new(library));
        let tree = AnimationTree::new(player, config)?;
        let mut builder = TreeBuilder {
            tree,
            nodes: Vec::new(),
            machines: Vec::new(),
        };

        for node in &self.nodes {
            builder.create(node)?;
        }
        for node in &self.nodes {
            builder.wire(node)?;
        }

        let root = builder.node(&self.root)?;
        builder.tree.set_root(root)?;

        let events = self
            .events
            .into_iter()
            .map(|event| {
                Ok(ScheduledEvent {
                    frame: event.frame,
                    event: builder.resolve(event.action)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Built scene: {} nodes, {} state machines, {} events",
            builder.nodes.len(),
            builder.machines.len(),
            events.len()
        );

        Ok(BuiltScene {
            tree: builder.tree,
            nodes: builder.nodes,
            machines: builder.machines,
            root,
            events,
        })
    }
}

fn bone_index(skeleton: &Skeleton, name: &str) -> Result<usize> {
    skeleton
        .bone_index(name)
        .ok_or_else(|| SceneError::UnknownBone(name.to_string()))
}

fn build_skeleton(desc: &SkeletonDesc) -> Result<Skeleton> {
    let mut bones = Vec::with_capacity(desc.bones.len());
    let mut local_bind = Vec::with_capacity(desc.bones.len());

    for bone in &desc.bones {
        // parents have to be declared first
        let parent = match &bone.parent {
            Some(name) => Some(
                bones
                    .iter()
                    .position(|b: &BoneInfo| &b.name == name)
                    .ok_or_else(|| SceneError::UnknownBone(name.clone()))?,
            ),
            None => None,
        };
        bones.push(BoneInfo::new(bone.name.clone(), parent));
        local_bind.push(Mat4::from_scale_rotation_translation(
            bone.scale,
            bone.rotation.normalize(),
            bone.translation,
        ));
    }

    Ok(Skeleton::new(bones, local_bind, Mat4::IDENTITY)?)
}

fn build_clip(skeleton: &Skeleton, desc: ClipDesc) -> Result<AnimationClip> {
    let channels = desc
        .channels
        .into_iter()
        .map(|channel| {
            let mut built = Channel::new(bone_index(skeleton, &channel.bone)?);
            if let Some(track) = channel.translation {
                built = built.with_translation(track.build()?);
            }
            if let Some(track) = channel.rotation {
                built = built.with_rotation(track.build()?);
            }
            if let Some(track) = channel.scale {
                built = built.with_scale(track.build()?);
            }
            Ok(built)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AnimationClip::new(
        desc.name,
        desc.ticks_per_second,
        desc.duration,
        channels,
    )?)
}

/// A state machine node with the names of its states, in creation order
#[derive(Debug)]
pub struct MachineInfo {
    pub name: String,
    pub node: NodeId,
    pub states: Vec<String>,
}

impl MachineInfo {
    pub fn state_name(&self, state: StateId) -> &str {
        self.states.get(state.index()).map_or("?", String::as_str)
    }

    fn state(&self, name: &str) -> Result<StateId> {
        self.states
            .iter()
            .position(|s| s == name)
            .map(StateId::new)
            .ok_or_else(|| SceneError::UnknownState {
                machine: self.name.clone(),
                state: name.to_string(),
            })
    }
}

/// A scene event with its references resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Travel { machine: NodeId, state: StateId },
    Switch { node: NodeId, input: usize },
    Blend { node: NodeId, value: f32 },
    Add { node: NodeId, value: f32 },
    Speed { node: NodeId, speed: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub frame: usize,
    pub event: Event,
}

#[derive(Debug)]
pub struct BuiltScene {
    pub tree: AnimationTree,
    pub nodes: Vec<(String, NodeId)>,
    pub machines: Vec<MachineInfo>,
    pub root: NodeId,
    pub events: Vec<ScheduledEvent>,
}

impl BuiltScene {
    pub fn node_name(&self, node: NodeId) -> &str {
        self.nodes
            .iter()
            .find(|(_, id)| *id == node)
            .map_or("?", |(name, _)| name.as_str())
    }

    pub fn machine(&self, node: NodeId) -> Option<&MachineInfo> {
        self.machines.iter().find(|m| m.node == node)
    }

    /// Applies `event` to the tree and describes what it did.
    pub fn apply(&mut self, event: Event) -> anim_tree::Result<String> {
        let tree = &mut self.tree;
        let description = match event {
            Event::Travel { machine, state } => {
                let outcome = tree.travel_to(machine, state)?;
                let info = self.machines.iter().find(|m| m.node == machine);
                format!(
                    "travel {} -> {}: {:?}",
                    info.map_or("?", |m| m.name.as_str()),
                    info.map_or("?", |m| m.state_name(state)),
                    outcome
                )
            }
            Event::Switch { node, input } => {
                let mut params = tree.switch_params(node)?;
                params.active_input = input;
                tree.set_switch_params(node, params)?;
                format!("switch {} -> input {}", self.node_name(node), input)
            }
            Event::Blend { node, value } => {
                let mut params = tree.blend2_params(node)?;
                params.blend = value;
                tree.set_blend2_params(node, params)?;
                format!("blend {} = {}", self.node_name(node), value)
            }
            Event::Add { node, value } => {
                let mut params = tree.add2_params(node)?;
                params.weight = value;
                tree.set_add2_params(node, params)?;
                format!("add {} = {}", self.node_name(node), value)
            }
            Event::Speed { node, speed } => {
                let mut params = tree.clip_params(node)?;
                params.state.speed = speed;
                tree.set_clip_params(node, params)?;
                format!("speed {} = {}", self.node_name(node), speed)
            }
        };
        log::info!("Applied event: {}", description);
        Ok(description)
    }
}

struct TreeBuilder {
    tree: AnimationTree,
    nodes: Vec<(String, NodeId)>,
    machines: Vec<MachineInfo>,
}

impl TreeBuilder {
    fn node(&self, name: &str) -> Result<NodeId> {
        self.nodes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
            .ok_or_else(|| SceneError::UnknownNode(name.to_string()))
    }

    fn machine(&self, name: &str) -> Result<&MachineInfo> {
        self.node(name)?;
        self.machines
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| SceneError::NotAStateMachine(name.to_string()))
    }

    fn mask(&self, bones: &[String]) -> Result<Option<BoneMask>> {
        if bones.is_empty() {
            return Ok(None);
        }
        let names: Vec<&str> = bones.iter().map(String::as_str).collect();
        Ok(Some(BoneMask::from_bone_names(
            self.tree.player().skeleton(),
            &names,
        )?))
    }

    /// First pass: every node exists before anything is connected. Exit
    /// nodes need their nested node declared earlier.
    fn create(&mut self, desc: &NodeDesc) -> Result<()> {
        if self.node(&desc.name).is_ok() {
            return Err(SceneError::DuplicateNode(desc.name.clone()));
        }

        let id = match &desc.kind {
            NodeDef::Clip {
                clip,
                playback,
                looper,
            } => self.tree.create_clip_node(
                clip,
                ClipParams {
                    state: *playback,
                    looper: *looper,
                },
            )?,
            NodeDef::Blend2 { factor, mask, .. } => {
                let mask = self.mask(mask)?;
                self.tree.create_blend2_node(Blend2Params {
                    mask,
                    blend: *factor,
                })?
            }
            NodeDef::Add2 { weight, mask, .. } => {
                let mask = self.mask(mask)?;
                self.tree.create_add2_node(Add2Params {
                    mask,
                    weight: *weight,
                })?
            }
            NodeDef::Switch {
                inputs,
                active,
                cross_fade,
                synced,
            } => self.tree.create_switch_node(
                inputs.len(),
                SwitchParams {
                    synced: *synced,
                    active_input: *active,
                    cross_fade: *cross_fade,
                },
            )?,
            NodeDef::StateMachine { config, .. } => {
                let id = self.tree.create_state_machine_node(*config)?;
                self.machines.push(MachineInfo {
                    name: desc.name.clone(),
                    node: id,
                    states: Vec::new(),
                });
                id
            }
            NodeDef::Exit { nested } => {
                let nested = self.node(nested)?;
                self.tree.create_exit_node(nested)?
            }
        };

        log::debug!("Created node {} as {}", desc.name, id);
        self.nodes.push((desc.name.clone(), id));
        Ok(())
    }

    /// Second pass: inputs, states and edges.
    fn wire(&mut self, desc: &NodeDesc) -> Result<()> {
        let id = self.node(&desc.name)?;
        match &desc.kind {
            NodeDef::Blend2 {
                main, blend: other, ..
            }
            | NodeDef::Add2 {
                main, add: other, ..
            } => {
                let (main, other) = (self.node(main)?, self.node(other)?);
                self.tree.connect(id, main, 0)?;
                self.tree.connect(id, other, 1)?;
            }
            NodeDef::Switch { inputs, .. } => {
                for (input, name) in inputs.iter().enumerate() {
                    let child = self.node(name)?;
                    self.tree.connect(id, child, input)?;
                }
            }
            NodeDef::StateMachine { states, edges, .. } => {
                let mut names = Vec::with_capacity(states.len());
                for state in states {
                    let node = self.node(&state.node)?;
                    self.tree.create_state(id, node, state.max_out_edges)?;
                    names.push(state.name.clone());
                }
                if let Some(machine) = self.machines.iter_mut().find(|m| m.node == id) {
                    machine.states = names;
                }

                let machine = self.machine(&desc.name)?;
                let resolved = edges
                    .iter()
                    .map(|edge| Ok((machine.state(&edge.from)?, machine.state(&edge.to)?, edge.params)))
                    .collect::<Result<Vec<_>>>()?;
                for (from, to, params) in resolved {
                    self.tree.create_edge(id, from, to, params)?;
                }
            }
            NodeDef::Clip { .. } | NodeDef::Exit { .. } => {}
        }
        Ok(())
    }

    fn resolve(&self, action: ActionDesc) -> Result<Event> {
        Ok(match action {
            ActionDesc::Travel { machine, state } => {
                let info = self.machine(&machine)?;
                Event::Travel {
                    machine: info.node,
                    state: info.state(&state)?,
                }
            }
            ActionDesc::Switch { node, input } => {
                let id = self.node(&node)?;
                let inputs = self.tree.node_inputs(id)?.len();
                if input >= inputs {
                    return Err(SceneError::SwitchInput { node, input });
                }
                Event::Switch { node: id, input }
            }
            ActionDesc::Blend { node, value } => Event::Blend {
                node: self.node(&node)?,
                value,
            },
            ActionDesc::Add { node, value } => Event::Add {
                node: self.node(&node)?,
                value,
            },
            ActionDesc::Speed { node, speed } => Event::Speed {
                node: self.node(&node)?,
                speed,
            },
        })
    }
}
