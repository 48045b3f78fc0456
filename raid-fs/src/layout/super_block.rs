use core::fmt;
use core::str::FromStr;

use binrw::binrw;

use crate::layout::Record;
use crate::{BLOCK_SIZE, COUNT_ALIGN};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 定位其它连续区域；
/// - 记录该盘在磁盘组中的位置。
///
/// 同一磁盘组内各盘的超级块除`disk_order`外完全相同。
#[binrw]
#[brw(little, magic = 0x7766_7331u32)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub num_inodes: u64,
    pub num_data_blocks: u64,
    /// inode 位图的字节偏移
    pub i_bitmap_ptr: u64,
    /// 数据块位图的字节偏移
    pub d_bitmap_ptr: u64,
    /// inode 区域的字节偏移，对齐到块
    pub i_blocks_ptr: u64,
    /// 数据块区域的字节偏移
    pub d_blocks_ptr: u64,
    pub raid_mode: RaidMode,
    /// 该盘在磁盘组中的序号
    pub disk_order: u32,
    pub total_disks: u32,
}

/// 冗余模式
#[binrw]
#[brw(repr = u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaidMode {
    /// RAID 0：每个逻辑块只存在于一块盘上
    Striped = 0,
    /// RAID 1：所有盘保存相同内容
    Mirrored = 1,
    /// RAID 1v：镜像，读取时多数表决
    Verified = 2,
}

impl SuperBlock {
    /// 计算布局，`num_inodes`与`num_data_blocks`向上取整到 32 的倍数
    pub fn new(raid_mode: RaidMode, total_disks: u32, num_inodes: u64, num_data_blocks: u64) -> Self {
        let num_inodes = num_inodes.next_multiple_of(COUNT_ALIGN);
        let num_data_blocks = num_data_blocks.next_multiple_of(COUNT_ALIGN);
        let block = BLOCK_SIZE as u64;

        let i_bitmap_ptr = <Self as Record>::SIZE as u64;
        let d_bitmap_ptr = i_bitmap_ptr + num_inodes.div_ceil(8);
        let i_blocks_ptr = (d_bitmap_ptr + num_data_blocks.div_ceil(8)).next_multiple_of(block);
        let d_blocks_ptr = i_blocks_ptr + num_inodes * block;

        Self {
            num_inodes,
            num_data_blocks,
            i_bitmap_ptr,
            d_bitmap_ptr,
            i_blocks_ptr,
            d_blocks_ptr,
            raid_mode,
            disk_order: 0,
            total_disks,
        }
    }

    pub fn with_order(&self, disk_order: u32) -> Self {
        Self {
            disk_order,
            ..self.clone()
        }
    }

    /// 每块盘上实际可分配的数据块个数：
    /// 条带模式下数据分散到各盘，镜像模式下每块盘都要容纳全部数据块
    pub fn data_blocks_per_disk(&self) -> u64 {
        match self.raid_mode {
            RaidMode::Striped => self.num_data_blocks.div_ceil(self.total_disks.max(1) as u64),
            RaidMode::Mirrored | RaidMode::Verified => self.num_data_blocks,
        }
    }

    /// 第`disk`块盘上可分配的数据块个数。
    /// 条带模式下余数分给序号靠前的盘，各盘之和恰为`num_data_blocks`
    pub fn data_blocks_on_disk(&self, disk: usize) -> u64 {
        match self.raid_mode {
            RaidMode::Striped => {
                let n = self.total_disks.max(1) as u64;
                let base = self.num_data_blocks / n;
                base + u64::from((disk as u64) < self.num_data_blocks % n)
            }
            RaidMode::Mirrored | RaidMode::Verified => self.num_data_blocks,
        }
    }

    /// 每块盘至少需要的字节数
    pub fn required_capacity(&self) -> u64 {
        self.d_blocks_ptr + self.data_blocks_per_disk() * BLOCK_SIZE as u64
    }

    /// 两个超级块是否描述同一个磁盘组
    pub fn same_set(&self, other: &Self) -> bool {
        self.with_order(0) == other.with_order(0)
    }
}

impl RaidMode {
    /// 命令行中使用的记号
    pub fn token(self) -> &'static str {
        match self {
            Self::Striped => "0",
            Self::Mirrored => "1",
            Self::Verified => "1v",
        }
    }

    /// 读取时是否需要多数表决
    #[inline]
    pub fn votes(self) -> bool {
        self == Self::Verified
    }
}

impl FromStr for RaidMode {
    type Err = UnknownRaidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::Striped),
            "1" => Ok(Self::Mirrored),
            "1v" => Ok(Self::Verified),
            _ => Err(UnknownRaidMode(s.to_owned())),
        }
    }
}

impl fmt::Display for RaidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown RAID mode `{0}`, expected one of 0, 1, 1v")]
pub struct UnknownRaidMode(String);
