/* raid-fs 的整体架构，自上而下 */

// 文件操作层：创建、读写、删除、列目录等操作
mod ops;
pub use ops::{Owner, SetAttr};

// 路径解析层：从根目录逐级查找
mod path;
pub use path::components;

// 目录项管理：目录数据块内的追加与交换删除
mod dir;

// 磁盘块管理器层：格式化、挂载、inode 与数据块的分配
mod rfs;
pub use rfs::RaidFileSystem;

// RAID 转换层：逻辑块到磁盘的映射与多数表决
mod raid;
pub use raid::{elect, BlockSlot};

// 磁盘数据结构层：表示磁盘文件系统的数据结构
pub mod layout;

// 磁盘访问层：按字节读写块设备
mod disk;

mod error;
pub use error::LayoutError;

pub use block_dev::BLOCK_SIZE;

pub const MAGIC: u32 = 0x7766_7331;

/// inode 中块指针的个数：7 个直接索引 + 1 个间接索引
pub const N_BLOCKS: usize = 8;
/// 直接索引个数
pub const DIRECT_COUNT: usize = N_BLOCKS - 1;
/// 间接块可容纳的块指针个数
pub const INDIRECT_COUNT: usize = BLOCK_SIZE / 8;
/// 单个文件最多占用的数据块个数
pub const MAX_FILE_BLOCKS: usize = DIRECT_COUNT + INDIRECT_COUNT;
pub const MAX_FILE_SIZE: u64 = (MAX_FILE_BLOCKS * BLOCK_SIZE) as u64;

/// 目录项大小恒为32字节
pub const DIR_ENTRY_SIZE: usize = 32;
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;
/// 目录只使用直接索引，最多容纳的目录项个数
pub const DIR_ENTRY_CAP: usize = DIRECT_COUNT * ENTRIES_PER_BLOCK;

/// inode 与数据块的个数都向上取整到它的倍数
pub const COUNT_ALIGN: u64 = 32;

pub type Result<T, E = vfs::Error> = core::result::Result<T, E>;

type DataBlock = [u8; BLOCK_SIZE];
