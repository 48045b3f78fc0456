#[cfg(test)]
mod tests;

mod fuse;
pub use fuse::{errno, RaidFuse};

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::{out_of_range, BlockDevice, BLOCK_SIZE};

/// 以普通文件作为磁盘
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    num_blocks: usize,
}

impl BlockFile {
    pub fn new(file: File) -> io::Result<Self> {
        let num_blocks = (file.metadata()?.len() / BLOCK_SIZE as u64) as usize;
        Ok(Self {
            file: Mutex::new(file),
            num_blocks,
        })
    }

    /// 以读写方式打开已有的镜像文件
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(OpenOptions::new().read(true).write(true).open(path)?)
    }

    /// 打开镜像文件，不存在则创建，并保证至少有`len`字节
    pub fn create(path: impl AsRef<Path>, len: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if file.metadata()?.len() < len {
            file.set_len(len)?;
        }

        Self::new(file)
    }

    fn seek_to(&self, block_id: usize) -> io::Result<std::sync::MutexGuard<'_, File>> {
        if block_id >= self.num_blocks {
            return Err(out_of_range(block_id, self.num_blocks));
        }
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("block file lock poisoned"))?;
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))?;

        Ok(file)
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> io::Result<()> {
        self.seek_to(block_id)?.read_exact(buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> io::Result<()> {
        self.seek_to(block_id)?.write_all(buf)
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }
}
