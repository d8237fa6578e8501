#![allow(dead_code)]

use std::sync::Arc;

use anim_clip::{AnimationClip, AnimationLibrary, AnimationPlayer, BoneInfo, Channel, Skeleton, Track};
use anim_tree::{AnimationTree, ClipParams, PlaybackState, TreeConfig};
use glam::{Mat4, Quat, Vec3};

pub const BONES: usize = 3;
pub const TICKS_PER_SECOND: f32 = 30.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn skeleton() -> Skeleton {
    Skeleton::new(
        vec![
            BoneInfo::new("root", None),
            BoneInfo::new("spine", Some(0)),
            BoneInfo::new("arm", Some(1)),
        ],
        vec![
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::Y),
            Mat4::from_translation(Vec3::X),
        ],
        Mat4::IDENTITY,
    )
    .unwrap()
}

/// Every bone held at one pose for `seconds`.
pub fn pose_clip(name: &str, translation: Vec3, rotation: Quat, seconds: f32) -> AnimationClip {
    let channels = (0..BONES)
        .map(|bone| {
            Channel::new(bone)
                .with_translation(Track::constant(translation))
                .with_rotation(Track::constant(rotation))
        })
        .collect();
    AnimationClip::new(name, TICKS_PER_SECOND, seconds * TICKS_PER_SECOND, channels).unwrap()
}

/// The root bone travels `distance` along +Z over `seconds`.
pub fn slide_clip(name: &str, distance: f32, seconds: f32) -> AnimationClip {
    let ticks = seconds * TICKS_PER_SECOND;
    let root = Channel::new(0).with_translation(
        Track::new(vec![0.0, ticks], vec![Vec3::ZERO, Vec3::new(0.0, 0.0, distance)]).unwrap(),
    );
    AnimationClip::new(name, TICKS_PER_SECOND, ticks, vec![root]).unwrap()
}

pub fn tree(clips: Vec<AnimationClip>, config: TreeConfig) -> AnimationTree {
    let library = AnimationLibrary::from_clips(clips).unwrap();
    let player = AnimationPlayer::new(Arc::new(skeleton()), Arc::new(library));
    AnimationTree::new(player, config).unwrap()
}

pub fn paused() -> ClipParams {
    ClipParams {
        state: PlaybackState {
            play: false,
            ..PlaybackState::default()
        },
        looper: false,
    }
}

pub fn playing(speed: f32, looping: bool) -> ClipParams {
    ClipParams {
        state: PlaybackState {
            current_time: 0.0,
            speed,
            play: true,
            looping,
        },
        looper: false,
    }
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.0001
}

pub fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 0.0001
}
