mod dirent;
mod error;
mod stat;

pub use self::{
    dirent::{DirEntry, DirEntryType},
    error::Error,
    stat::{Stat, StatFs},
};

pub type Result<T, E = Error> = core::result::Result<T, E>;
