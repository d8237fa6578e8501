use thiserror::Error;

/// Errors raised while building clips, skeletons and players
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("Track has {times} key times but {values} values")]
    TrackLengthMismatch { times: usize, values: usize },

    #[error("Track key times are not sorted at key {0}")]
    UnsortedKeys(usize),

    #[error("Invalid clip '{name}': {reason}")]
    InvalidClip { name: String, reason: String },

    #[error("Duplicate clip name: {0}")]
    DuplicateClip(String),

    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),

    #[error("Bone index out of range: {index} (bone count {count})")]
    BoneOutOfRange { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, ClipError>;
