//! # 磁盘数据结构层
//!
//! 每块磁盘的布局：
//! 超级块 | inode 位图 | 数据块位图 | 填充至 512 字节边界 | inode 区域 | 数据块区域
//!
//! 所有记录均以小端序显式编解码，不直接把磁盘字节解释为结构体。

use std::io::Cursor;

use binrw::{BinRead, BinResult, BinWrite};

use crate::{BLOCK_SIZE, DIR_ENTRY_SIZE};

mod super_block;
pub use super_block::{RaidMode, SuperBlock, UnknownRaidMode};

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{BlockId, BlockPtr, DiskInode, IndirectBlock, InodeId, InodeKind};

/// 文件项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::{check_name, DirEntry, NAME_LENGTH_LIMIT};

/// 定长的磁盘记录
pub trait Record: Sized {
    /// 编码后的字节数
    const SIZE: usize;

    fn decode(bytes: &[u8]) -> BinResult<Self>;

    fn encode(&self) -> Vec<u8>;
}

macro_rules! impl_record {
    ($($ty:ty => $size:expr),* $(,)?) => {$(
        impl Record for $ty {
            const SIZE: usize = $size;

            fn decode(bytes: &[u8]) -> BinResult<Self> {
                <Self as BinRead>::read(&mut Cursor::new(bytes))
            }

            fn encode(&self) -> Vec<u8> {
                let mut cursor = Cursor::new(Vec::with_capacity(Self::SIZE));
                BinWrite::write(self, &mut cursor).expect("writing into memory never fails");
                let bytes = cursor.into_inner();
                debug_assert_eq!(bytes.len(), Self::SIZE);
                bytes
            }
        }
    )*};
}

impl_record! {
    SuperBlock => 64,
    DiskInode => 116,
    DirEntry => DIR_ENTRY_SIZE,
    IndirectBlock => BLOCK_SIZE,
    BlockPtr => 8,
}
