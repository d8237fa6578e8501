//! Keyframe tracks and key search

use std::fmt;

use glam::{Quat, Vec3};
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::error::{ClipError, Result};

/// Values that can be interpolated between two keys
pub trait Interpolate: Copy {
    fn interpolate(&self, other: &Self, t: f32) -> Self;
}

impl Interpolate for Vec3 {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self.lerp(*other, t)
    }
}

impl Interpolate for Quat {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self.slerp(*other, t)
    }
}

/// Finds the pair of keys bracketing `time`
///
/// Returns `None` for an empty track. Otherwise returns `(first, second, t)`
/// where `t` is the interpolation factor between the two keys. Times before
/// the first key or after the last key clamp to that key.
pub fn find_key_frames(times: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    let last = times.len().checked_sub(1)?;

    if last == 0 || time <= times[0] {
        return Some((0, 0, 0.0));
    }
    if time >= times[last] {
        return Some((last, last, 0.0));
    }

    // Largest index with times[index] <= time
    let mut low = 0;
    let mut high = last;
    while low < high {
        let mid = (low + high).div_ceil(2);
        if times[mid] <= time {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    let span = times[low + 1] - times[low];
    let t = if span > 0.0 {
        ((time - times[low]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some((low, low + 1, t))
}

/// Keyframes of one transform component, with times in ticks
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Track<T> {
    times: Vec<f32>,
    values: Vec<T>,
}

impl<T: Interpolate> Track<T> {
    pub fn new(times: Vec<f32>, values: Vec<T>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(ClipError::TrackLengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        if let Some(index) = times.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(ClipError::UnsortedKeys(index + 1));
        }
        Ok(Self { times, values })
    }

    /// A track holding a single key at tick 0.
    pub fn constant(value: T) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
        }
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first(&self) -> Option<T> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<T> {
        self.values.last().copied()
    }

    /// Samples the track at `ticks`.
    pub fn sample(&self, ticks: f32) -> Option<T> {
        let (a, b, t) = find_key_frames(&self.times, ticks)?;
        if a == b {
            return Some(self.values[a]);
        }
        Some(self.values[a].interpolate(&self.values[b], t))
    }
}

impl<T: fmt::Debug> fmt::Debug for Track<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Trimmed<'a, V>(&'a Vec<V>);

        impl<V: fmt::Debug> fmt::Debug for Trimmed<'_, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                anim_utils::debug::trimmed_collection_fmt(self.0, f)
            }
        }

        f.debug_struct("Track")
            .field("times", &Trimmed(&self.times))
            .field("values", &Trimmed(&self.values))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_find_key_frames_empty() {
        assert_eq!(find_key_frames(&[], 1.0), None);
    }

    #[test_case(-5.0, (0, 0) ; "before first")]
    #[test_case(0.0, (0, 0) ; "at first")]
    #[test_case(5.0, (0, 1) ; "first span")]
    #[test_case(10.0, (1, 2) ; "on inner key")]
    #[test_case(25.0, (2, 3) ; "last span")]
    #[test_case(30.0, (3, 3) ; "at last")]
    #[test_case(99.0, (3, 3) ; "after last")]
    fn test_find_key_frames_brackets(time: f32, expected: (usize, usize)) {
        let times = [0.0, 10.0, 20.0, 30.0];
        let (a, b, _) = find_key_frames(&times, time).unwrap();
        assert_eq!((a, b), expected);
    }

    #[test]
    fn test_find_key_frames_single_key() {
        assert_eq!(find_key_frames(&[4.0], 100.0), Some((0, 0, 0.0)));
    }

    #[test]
    fn test_sample_interpolates() {
        let track = Track::new(vec![0.0, 10.0], vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)])
            .unwrap();
        let v = track.sample(2.5).unwrap();
        assert!((v.x - 2.5).abs() < 0.001);
    }

    #[test]
    fn test_new_rejects_mismatch_and_unsorted() {
        assert!(matches!(
            Track::new(vec![0.0, 1.0], vec![Vec3::ZERO]),
            Err(ClipError::TrackLengthMismatch { times: 2, values: 1 })
        ));
        assert!(matches!(
            Track::new(vec![0.0, 2.0, 1.0], vec![Vec3::ZERO; 3]),
            Err(ClipError::UnsortedKeys(2))
        ));
    }

    #[test]
    fn test_debug_is_trimmed() {
        let track = Track::new((0..8).map(|i| i as f32).collect(), vec![Vec3::ZERO; 8]).unwrap();
        let text = format!("{:?}", track);
        assert!(text.contains("+ 5 elements"));
    }
}
