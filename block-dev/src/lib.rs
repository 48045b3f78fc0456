//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、镜像文件等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 文件系统的每一块磁盘都是一个块设备，挂载期间始终持有。

use std::any::Any;
use std::io;

mod ram;

pub use self::ram::RamDisk;

/// 块设备的块大小
pub const BLOCK_SIZE: usize = 512;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 读出编号为`block_id`的块，`buf`长度恒为[`BLOCK_SIZE`]
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> io::Result<()>;

    /// 写入编号为`block_id`的块，`buf`长度恒为[`BLOCK_SIZE`]
    fn write_block(&self, block_id: usize, buf: &[u8]) -> io::Result<()>;

    /// 设备的总块数
    fn num_blocks(&self) -> usize;

    /// 设备的总字节数
    #[inline]
    fn capacity(&self) -> u64 {
        (self.num_blocks() * BLOCK_SIZE) as u64
    }
}

/// 越界访问时返回的错误
pub fn out_of_range(block_id: usize, num_blocks: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("block {block_id} is beyond the device end ({num_blocks} blocks)"),
    )
}
