//! Small helpers shared by the animtree-rs crates.
//!
//! - [`debug`]: `Debug` formatting that trims large collections such as
//!   keyframe tracks and per-bone poses down to a short preview.
//! - [`math`]: relative float comparison and range remapping used by the
//!   clip player and the blend tree.

pub mod debug;
pub mod math;

pub use math::{float_eq, remap};
