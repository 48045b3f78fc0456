use std::io;

use thiserror::Error;

/// 格式化与挂载阶段的错误
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("at least two disks are required, got {0}")]
    TooFewDisks(usize),

    #[error("inode and data block counts must be positive")]
    ZeroCount,

    #[error("disk too small: need {need} bytes, have {have}")]
    DiskTooSmall { need: u64, have: u64 },

    #[error("disk {disk} does not carry a valid superblock")]
    BadMagic { disk: usize },

    #[error("filesystem was created with {declared} disks, {supplied} supplied")]
    DiskCountMismatch { declared: u32, supplied: usize },

    #[error("disk {disk} belongs to a different filesystem")]
    InconsistentSet { disk: usize },

    #[error("disk {disk} is corrupted: {reason}")]
    Corrupted { disk: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}
