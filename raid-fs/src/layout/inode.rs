use binrw::binrw;
use derive_more::{Display, From, Into};
use enumflags2::{bitflags, BitFlags};

use crate::{INDIRECT_COUNT, N_BLOCKS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Display)]
#[repr(transparent)]
pub struct InodeId(pub u32);

impl InodeId {
    pub const ROOT: Self = Self(0);
}

/// 数据块的逻辑编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Display)]
#[repr(transparent)]
pub struct BlockId(pub u32);

/// 磁盘上的块指针，以 -1 表示未分配
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPtr(
    #[br(map = |raw: i64| u32::try_from(raw).ok().map(BlockId))]
    #[bw(map = |ptr: &Option<BlockId>| ptr.map_or(-1i64, |id| i64::from(id.0)))]
    Option<BlockId>,
);

impl BlockPtr {
    pub const NONE: Self = Self(None);

    #[inline]
    pub fn get(self) -> Option<BlockId> {
        self.0
    }

    #[inline]
    pub fn take(&mut self) -> Option<BlockId> {
        self.0.take()
    }
}

impl From<BlockId> for BlockPtr {
    fn from(id: BlockId) -> Self {
        Self(Some(id))
    }
}

#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    Directory = 0o040000,
    Regular = 0o100000,
}

/// 磁盘上的 inode，每个占据一整个块
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInode {
    pub num: u32,
    /// 类型位与权限位
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub nlinks: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    /// 前 7 个为直接索引，最后一个指向间接块
    pub blocks: [BlockPtr; N_BLOCKS],
}

impl DiskInode {
    pub fn new(num: InodeId, kind: InodeKind, perm: u16, uid: u32, gid: u32, now: i64) -> Self {
        Self {
            num: num.0,
            mode: kind as u32 | u32::from(perm & 0o7777),
            uid,
            gid,
            size: 0,
            nlinks: match kind {
                InodeKind::Directory => 2,
                InodeKind::Regular => 1,
            },
            atime: now,
            mtime: now,
            ctime: now,
            blocks: [BlockPtr::NONE; N_BLOCKS],
        }
    }

    /// 无法识别的类型位按普通文件处理
    pub fn kind(&self) -> InodeKind {
        let flags = BitFlags::<InodeKind>::from_bits_truncate(self.mode);
        if flags.contains(InodeKind::Directory) {
            InodeKind::Directory
        } else {
            InodeKind::Regular
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind() == InodeKind::Directory
    }

    #[inline]
    pub fn perm(&self) -> u16 {
        (self.mode & 0o7777) as u16
    }

    pub fn set_perm(&mut self, perm: u16) {
        self.mode = (self.mode & !0o7777) | u32::from(perm & 0o7777);
    }

    #[inline]
    pub fn indirect(&self) -> Option<BlockId> {
        self.blocks[N_BLOCKS - 1].get()
    }

    /// 更新修改时间与状态改变时间
    pub fn touch(&mut self, now: i64) {
        self.mtime = now;
        self.ctime = now;
    }
}

/// 间接块，全部位于同一个数据块内
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectBlock {
    pub entries: [BlockPtr; INDIRECT_COUNT],
}

impl IndirectBlock {
    pub fn empty() -> Self {
        Self {
            entries: [BlockPtr::NONE; INDIRECT_COUNT],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|ptr| ptr.get().is_none())
    }
}
