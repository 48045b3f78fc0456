use std::io;

use spin::Mutex;

use crate::{out_of_range, BlockDevice, BLOCK_SIZE};

/// 内存中的块设备，主要用于测试
#[derive(Debug)]
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(num_blocks: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; num_blocks * BLOCK_SIZE]),
        }
    }

    /// 字节视图的快照
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// 绕开文件系统直接改写某个字节，模拟磁盘静默损坏
    pub fn corrupt(&self, offset: usize, f: impl FnOnce(u8) -> u8) {
        let mut data = self.data.lock();
        data[offset] = f(data[offset]);
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> io::Result<()> {
        let data = self.data.lock();
        let start = block_id * BLOCK_SIZE;
        let src = data
            .get(start..start + BLOCK_SIZE)
            .ok_or_else(|| out_of_range(block_id, data.len() / BLOCK_SIZE))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> io::Result<()> {
        let mut data = self.data.lock();
        let num_blocks = data.len() / BLOCK_SIZE;
        let start = block_id * BLOCK_SIZE;
        let dest = data
            .get_mut(start..start + BLOCK_SIZE)
            .ok_or_else(|| out_of_range(block_id, num_blocks))?;
        dest.copy_from_slice(buf);
        Ok(())
    }

    fn num_blocks(&self) -> usize {
        self.data.lock().len() / BLOCK_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_back_written_block() {
        let disk = RamDisk::new(4);
        let block = [0xAB; BLOCK_SIZE];
        disk.write_block(2, &block).unwrap();

        let mut buf = [0; BLOCK_SIZE];
        disk.read_block(2, &mut buf).unwrap();
        assert_eq!(buf, block);
        disk.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, [0; BLOCK_SIZE]);
    }

    #[test]
    fn beyond_end() {
        let disk = RamDisk::new(2);
        let mut buf = [0; BLOCK_SIZE];
        let err = disk.read_block(2, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(disk.capacity(), 1024);
    }
}
