//! Animation blend tree evaluation for skeletal characters
//!
//! A tree is a pool of nodes of a few kinds:
//! - **Clip**: plays one animation clip, looping or clamped
//! - **Blend2** / **Add2**: interpolate or add a second input, optionally
//!   limited to a [`BoneMask`]
//! - **Switch**: crossfades between any number of inputs
//! - **StateMachine**: states connected by crossfading edges, with
//!   multi-hop [travel](AnimationTree::travel_to) requests
//! - **Exit**: lets a nested state machine report itself done
//!
//! Each frame [`AnimationTree::update`] first advances time through the
//! graph, then evaluates every bone top-down and writes the result into the
//! [`AnimationPlayer`](anim_clip::AnimationPlayer). Movement of the
//! configured root bone is returned as [`RootMotion`].
//!
//! # Example
//!
//! ```rust,ignore
//! use anim_tree::{
//!     AnimationTree, ClipParams, EdgeMode, EdgeParams, EdgeStatus, StateMachineConfig,
//!     TreeConfig,
//! };
//!
//! let mut tree = AnimationTree::new(player, TreeConfig::new(8).with_root_bone(0))?;
//! let idle = tree.create_clip_node("idle", ClipParams::default())?;
//! let walk = tree.create_clip_node("walk", ClipParams::default())?;
//!
//! let stm = tree.create_state_machine_node(StateMachineConfig::new(2, 2).with_travel())?;
//! let s_idle = tree.create_state(stm, idle, 1)?;
//! let s_walk = tree.create_state(stm, walk, 1)?;
//! tree.create_edge(stm, s_idle, s_walk, EdgeParams { cross_fade: 0.25, ..Default::default() })?;
//! tree.set_root(stm)?;
//!
//! tree.travel_to(stm, s_walk)?;
//! let motion = tree.update(1.0 / 60.0)?;
//! character.translate(motion.motion.translation);
//! ```

pub mod config;
pub mod error;
pub mod mask;
pub mod motion;
pub mod node;
pub mod tree;

pub use config::{StateMachineConfig, TreeConfig};
pub use error::{AnimTreeError, Result};
pub use mask::BoneMask;
pub use motion::{BoneSample, RootMotion, UpdateInfo};
pub use node::{
    Add2Params, Blend2Params, ClipCallback, ClipParams, ClipSample, EdgeId, EdgeInfo, EdgeMode,
    EdgeParams, EdgeStatus, NodeId, NodeKind, PlaybackState, StateId, SwitchParams, TravelOutcome,
};
pub use tree::{AnimationTree, PoseCallback};
