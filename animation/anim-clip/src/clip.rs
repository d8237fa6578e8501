//! Animation clips and the shared clip library

use std::sync::Arc;

use glam::{Quat, Vec3};
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::error::{ClipError, Result};
use crate::track::Track;
use crate::transform::Transform;

/// Keyframes driving one bone
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Channel {
    pub bone: usize,
    pub translation: Option<Track<Vec3>>,
    pub rotation: Option<Track<Quat>>,
    pub scale: Option<Track<Vec3>>,
}

impl Channel {
    pub fn new(bone: usize) -> Self {
        Self {
            bone,
            translation: None,
            rotation: None,
            scale: None,
        }
    }

    pub fn with_translation(mut self, track: Track<Vec3>) -> Self {
        self.translation = Some(track);
        self
    }

    pub fn with_rotation(mut self, track: Track<Quat>) -> Self {
        self.rotation = Some(track);
        self
    }

    pub fn with_scale(mut self, track: Track<Vec3>) -> Self {
        self.scale = Some(track);
        self
    }

    /// Samples the channel at `ticks`. Missing or empty tracks yield the
    /// identity component.
    pub fn sample(&self, ticks: f32) -> Transform {
        Transform {
            translation: sample_or(self.translation.as_ref(), ticks, Vec3::ZERO),
            rotation: sample_or(self.rotation.as_ref(), ticks, Quat::IDENTITY),
            scale: sample_or(self.scale.as_ref(), ticks, Vec3::ONE),
        }
    }

    /// Transforms made of the first keys and of the last keys.
    pub fn rest_keys(&self) -> (Transform, Transform) {
        let first = Transform {
            translation: key_or(self.translation.as_ref(), Track::first, Vec3::ZERO),
            rotation: key_or(self.rotation.as_ref(), Track::first, Quat::IDENTITY),
            scale: key_or(self.scale.as_ref(), Track::first, Vec3::ONE),
        };
        let last = Transform {
            translation: key_or(self.translation.as_ref(), Track::last, Vec3::ZERO),
            rotation: key_or(self.rotation.as_ref(), Track::last, Quat::IDENTITY),
            scale: key_or(self.scale.as_ref(), Track::last, Vec3::ONE),
        };
        (first, last)
    }
}

fn sample_or<T: crate::track::Interpolate>(track: Option<&Track<T>>, ticks: f32, default: T) -> T {
    track.and_then(|t| t.sample(ticks)).unwrap_or(default)
}

fn key_or<T: crate::track::Interpolate>(
    track: Option<&Track<T>>,
    key: fn(&Track<T>) -> Option<T>,
    default: T,
) -> T {
    track.and_then(key).unwrap_or(default)
}

/// An immutable keyframed animation
///
/// `duration` is expressed in ticks; `ticks_per_second` converts playback
/// time in seconds to ticks.
#[derive(custom_debug::Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct AnimationClip {
    name: String,
    ticks_per_second: f32,
    duration: f32,
    #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
    channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(
        name: impl Into<String>,
        ticks_per_second: f32,
        duration: f32,
        channels: Vec<Channel>,
    ) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| ClipError::InvalidClip {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if !(ticks_per_second > 0.0 && ticks_per_second.is_finite()) {
            return Err(invalid("ticks per second must be positive"));
        }
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(invalid("duration must be positive"));
        }
        for (i, channel) in channels.iter().enumerate() {
            if channels[..i].iter().any(|c| c.bone == channel.bone) {
                return Err(invalid(&format!("bone {} has two channels", channel.bone)));
            }
        }

        Ok(Self {
            name,
            ticks_per_second,
            duration,
            channels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ticks_per_second(&self) -> f32 {
        self.ticks_per_second
    }

    /// Duration in ticks.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn duration_seconds(&self) -> f32 {
        self.duration / self.ticks_per_second
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, bone: usize) -> Option<&Channel> {
        self.channels.iter().find(|c| c.bone == bone)
    }

    /// Samples `bone` at `ticks`, or `None` when the clip does not animate it.
    pub fn sample(&self, bone: usize, ticks: f32) -> Option<Transform> {
        self.channel(bone).map(|c| c.sample(ticks))
    }
}

/// Named clips shared between players and blend trees
#[derive(custom_debug::Debug, Clone, Default)]
pub struct AnimationLibrary {
    #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
    clips: Vec<Arc<AnimationClip>>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips(clips: impl IntoIterator<Item = AnimationClip>) -> Result<Self> {
        let mut library = Self::new();
        for clip in clips {
            library.insert(clip)?;
        }
        Ok(library)
    }

    pub fn insert(&mut self, clip: AnimationClip) -> Result<Arc<AnimationClip>> {
        if self.clips.iter().any(|c| c.name() == clip.name()) {
            log::warn!("Clip '{}' is already in the library", clip.name());
            return Err(ClipError::DuplicateClip(clip.name().to_string()));
        }
        log::debug!("Added clip '{}' ({} channels)", clip.name(), clip.channels().len());
        let clip = Arc::new(clip);
        self.clips.push(Arc::clone(&clip));
        Ok(clip)
    }

    pub fn get(&self, name: &str) -> Option<Arc<AnimationClip>> {
        let clip = self.clips.iter().find(|c| c.name() == name).cloned();
        if clip.is_none() {
            log::warn!("Clip '{}' not found in library of {} clips", name, self.clips.len());
        }
        clip
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AnimationClip>> {
        self.clips.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide_clip() -> AnimationClip {
        let channel = Channel::new(0).with_translation(
            Track::new(vec![0.0, 30.0], vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0)]).unwrap(),
        );
        AnimationClip::new("slide", 30.0, 30.0, vec![channel]).unwrap()
    }

    #[test]
    fn test_sample_missing_tracks_are_identity() {
        let clip = slide_clip();
        let pose = clip.sample(0, 15.0).unwrap();
        assert!((pose.translation.z - 1.5).abs() < 0.001);
        assert_eq!(pose.rotation, Quat::IDENTITY);
        assert_eq!(pose.scale, Vec3::ONE);
        assert!(clip.sample(7, 0.0).is_none());
    }

    #[test]
    fn test_rest_keys() {
        let clip = slide_clip();
        let (first, last) = clip.channel(0).unwrap().rest_keys();
        assert_eq!(first.translation, Vec3::ZERO);
        assert_eq!(last.translation, Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(last.scale, Vec3::ONE);
    }

    #[test]
    fn test_duration_seconds() {
        let clip = AnimationClip::new("idle", 24.0, 48.0, Vec::new()).unwrap();
        assert!((clip.duration_seconds() - 2.0).abs() < 0.0001);
    }

    #[test]
    fn test_invalid_clip() {
        assert!(AnimationClip::new("bad", 0.0, 10.0, Vec::new()).is_err());
        assert!(AnimationClip::new("bad", 30.0, 0.0, Vec::new()).is_err());
        assert!(
            AnimationClip::new("bad", 30.0, 1.0, vec![Channel::new(1), Channel::new(1)]).is_err()
        );
    }

    #[test]
    fn test_library_lookup_and_duplicates() {
        let mut library = AnimationLibrary::new();
        library.insert(slide_clip()).unwrap();
        assert!(library.get("slide").is_some());
        assert!(library.get("run").is_none());
        assert!(matches!(
            library.insert(slide_clip()),
            Err(ClipError::DuplicateClip(_))
        ));
        assert_eq!(library.len(), 1);
    }
}
