use std::fmt;
use std::sync::Arc;

use anim_clip::{AnimationClip, Transform};
use anim_utils::float_eq;
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::motion::{BoneSample, RootMotion, UpdateInfo};

/// Playback position and flags of a clip node
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct PlaybackState {
    /// Position in seconds
    pub current_time: f32,
    /// Playback rate; negative plays backwards
    pub speed: f32,
    pub play: bool,
    pub looping: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            speed: 1.0,
            play: true,
            looping: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct ClipParams {
    pub state: PlaybackState,
    /// Report the clip as done when it reaches the crossfade window of the
    /// following transition
    pub looper: bool,
}

/// What a [`ClipCallback`] is told about the sample it may modify
#[derive(Debug, Clone, Copy)]
pub struct ClipSample<'a> {
    pub clip: &'a AnimationClip,
    pub state: PlaybackState,
    pub bone: usize,
}

type ClipCallbackFn = dyn FnMut(&ClipSample<'_>, &mut Transform);

/// Per-node hook run on every sampled bone transform
pub struct ClipCallback(Box<ClipCallbackFn>);

impl ClipCallback {
    pub fn new(callback: impl FnMut(&ClipSample<'_>, &mut Transform) + 'static) -> Self {
        Self(Box::new(callback))
    }

    fn call(&mut self, sample: &ClipSample<'_>, transform: &mut Transform) {
        (self.0)(sample, transform);
    }
}

impl fmt::Debug for ClipCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClipCallback")
    }
}

/// Cached root bone keys used to stitch motion across loop boundaries
#[derive(Debug, Clone, Copy)]
struct RootTrack {
    first_key: Transform,
    last_key: Transform,
    /// Root bone sample of the previous frame
    previous: Transform,
}

impl RootTrack {
    fn motion(&self, current: Transform, boundaries: Option<u32>, forward: bool) -> RootMotion {
        let motion = match boundaries {
            Some(count) if count > 0 => {
                let (start, end) = if forward {
                    (self.first_key, self.last_key)
                } else {
                    (self.last_key, self.first_key)
                };
                let spans = (end - start) * (count - 1) as f32;
                (spans + (end - self.previous) + (current - start)).normalized_rotation()
            }
            _ => current - self.previous,
        };

        RootMotion {
            motion,
            distance: current - self.first_key,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ClipNode {
    clip: Arc<AnimationClip>,
    params: ClipParams,
    callback: Option<ClipCallback>,
    root: Option<RootTrack>,
    /// Loop boundaries crossed by the last update, if it crossed any
    boundaries: Option<u32>,
    /// Whole clip durations covered by the last update
    loops: u32,
    /// Playback stopped by reaching the end of a non-looping clip
    auto_stopped: bool,
}

impl ClipNode {
    pub(crate) fn new(clip: Arc<AnimationClip>, params: ClipParams, root_bone: Option<usize>) -> Self {
        let root = root_bone.map(|bone| match clip.channel(bone) {
            Some(channel) => {
                let (first_key, last_key) = channel.rest_keys();
                RootTrack {
                    first_key,
                    last_key,
                    previous: channel.sample(params.state.current_time * clip.ticks_per_second()),
                }
            }
            None => RootTrack {
                first_key: Transform::ZERO,
                last_key: Transform::ZERO,
                previous: Transform::ZERO,
            },
        });

        Self {
            clip,
            params,
            callback: None,
            root,
            boundaries: None,
            loops: 0,
            auto_stopped: false,
        }
    }

    pub(crate) fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub(crate) fn params(&self) -> ClipParams {
        self.params
    }

    pub(crate) fn set_params(&mut self, params: ClipParams) {
        self.params = params;
        self.auto_stopped = false;
    }

    pub(crate) fn set_callback(&mut self, callback: Option<ClipCallback>) {
        self.callback = callback;
    }

    pub(crate) fn loops(&self) -> u32 {
        self.loops
    }

    pub(crate) fn update(&mut self, elapsed: f32, window: f32) -> UpdateInfo {
        let state = &mut self.params.state;
        if !state.play {
            return UpdateInfo::FINISHED;
        }

        let speed = state.speed;
        let duration = self.clip.duration_seconds();
        let step = speed * elapsed;
        let time = state.current_time + step;
        let mut elapsed = elapsed;

        state.current_time = time;
        self.boundaries = None;
        self.loops = 0;

        let crossed = (speed < 0.0 && time <= 0.0) || (speed > 0.0 && time >= duration);
        if crossed {
            if state.looping {
                let boundaries = if speed > 0.0 {
                    (time / duration).floor()
                } else {
                    (-time / duration).floor() + 1.0
                };
                let wrapped = time - boundaries.copysign(speed) * duration;
                state.current_time = wrapped.clamp(0.0, duration);
                self.boundaries = Some(boundaries as u32);
                self.loops = (step.abs() / duration).floor() as u32;
            } else {
                let clamped = time.clamp(0.0, duration);
                let overshoot = time - clamped;
                elapsed = if float_eq(step, 0.0) {
                    0.0
                } else {
                    elapsed * (1.0 - overshoot / step)
                };
                state.current_time = clamped;
                state.play = false;
                self.auto_stopped = true;
            }
        }

        let window_start = (duration - window).clamp(0.0, duration);
        let in_window = (speed < 0.0 && time <= window) || (speed > 0.0 && time >= window_start);

        UpdateInfo {
            done: in_window && self.params.looper,
            consumed: elapsed,
        }
    }

    pub(crate) fn eval(&mut self, bone: usize, root_bone: Option<usize>, want_motion: bool) -> BoneSample {
        let state = self.params.state;
        let ticks = state.current_time * self.clip.ticks_per_second();
        let mut transform = self
            .clip
            .channel(bone)
            .map_or(Transform::ZERO, |channel| channel.sample(ticks));

        if let Some(callback) = &mut self.callback {
            let sample = ClipSample {
                clip: &self.clip,
                state,
                bone,
            };
            callback.call(&sample, &mut transform);
        }

        let mut sample = BoneSample::new(transform);
        if root_bone != Some(bone) {
            return sample;
        }

        if let Some(root) = &mut self.root {
            if want_motion {
                sample.root = Some(root.motion(transform, self.boundaries, state.speed > 0.0));
            }
            root.previous = transform;
        }
        sample
    }

    pub(crate) fn reset(&mut self) {
        let state = &mut self.params.state;
        state.current_time = if state.speed >= 0.0 {
            0.0
        } else {
            self.clip.duration_seconds()
        };
        if self.auto_stopped {
            state.play = true;
            self.auto_stopped = false;
        }
        if let Some(root) = &mut self.root {
            root.previous = if state.speed >= 0.0 {
                root.first_key
            } else {
                root.last_key
            };
        }
        self.boundaries = None;
        self.loops = 0;
    }
}
