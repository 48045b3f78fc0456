use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("already exists")]
    AlreadyExists,

    #[error("not found")]
    NotFound,

    #[error("is a directory")]
    IsADirectory,

    #[error("not a directory")]
    NotADirectory,

    #[error("directory not empty")]
    DirectoryNotEmpty,

    /// inode 或数据块位图已耗尽
    #[error("no space left on device")]
    NoSpace,

    #[error("file name too long")]
    NameTooLong,

    #[error("file too large")]
    FileTooLarge,

    /// 空路径、根目录等无法作为操作对象的路径
    #[error("invalid path")]
    InvalidPath,

    #[error("corrupted on-disk structure: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
