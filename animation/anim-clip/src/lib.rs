//! Keyframed animation clips, skeletons and the pose player.
//!
//! This crate holds the data a blend tree samples from and writes into:
//!
//! - [`Transform`] and its blending arithmetic
//! - [`Track`] / [`Channel`] / [`AnimationClip`] keyframe storage and sampling
//! - [`AnimationLibrary`] for shared, named clips
//! - [`Skeleton`] bone hierarchy with bind poses
//! - [`AnimationPlayer`] per-bone local and model pose arrays

pub mod clip;
pub mod error;
pub mod player;
pub mod skeleton;
pub mod track;
pub mod transform;

pub use clip::{AnimationClip, AnimationLibrary, Channel};
pub use error::{ClipError, Result};
pub use player::AnimationPlayer;
pub use skeleton::{BoneInfo, Skeleton};
pub use track::{Interpolate, Track, find_key_frames};
pub use transform::Transform;
