//! # 磁盘访问层
//!
//! 把块设备包装成可按字节偏移读写的磁盘，非整块的写入采用读-改-写。

use std::io;
use std::sync::Arc;

use block_dev::BlockDevice;

use crate::layout::Record;
use crate::BLOCK_SIZE;

#[derive(Clone)]
pub struct Disk(Arc<dyn BlockDevice>);

impl Disk {
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        Self(device)
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.0.capacity()
    }

    /// 从字节偏移`offset`处读满`buf`
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut block = [0; BLOCK_SIZE];
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done as u64;
            let block_id = (pos / BLOCK_SIZE as u64) as usize;
            let start = (pos % BLOCK_SIZE as u64) as usize;
            let len = (BLOCK_SIZE - start).min(buf.len() - done);

            self.0.read_block(block_id, &mut block)?;
            buf[done..done + len].copy_from_slice(&block[start..start + len]);
            done += len;
        }

        Ok(())
    }

    /// 把`data`写到字节偏移`offset`处
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let mut block = [0; BLOCK_SIZE];
        let mut done = 0;
        while done < data.len() {
            let pos = offset + done as u64;
            let block_id = (pos / BLOCK_SIZE as u64) as usize;
            let start = (pos % BLOCK_SIZE as u64) as usize;
            let len = (BLOCK_SIZE - start).min(data.len() - done);

            if len < BLOCK_SIZE {
                self.0.read_block(block_id, &mut block)?;
            }
            block[start..start + len].copy_from_slice(&data[done..done + len]);
            self.0.write_block(block_id, &block)?;
            done += len;
        }

        Ok(())
    }

    pub fn zero_range(&self, offset: u64, len: u64) -> io::Result<()> {
        let zeros = [0; BLOCK_SIZE];
        let mut done = 0;
        while done < len {
            let step = (len - done).min(BLOCK_SIZE as u64);
            self.write_at(offset + done, &zeros[..step as usize])?;
            done += step;
        }

        Ok(())
    }

    /// 读取并解码一个定长记录
    pub fn read_record<R: Record>(&self, offset: u64) -> io::Result<R> {
        let mut bytes = vec![0; R::SIZE];
        self.read_at(offset, &mut bytes)?;
        R::decode(&bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    }

    pub fn write_record<R: Record>(&self, offset: u64, record: &R) -> io::Result<()> {
        self.write_at(offset, &record.encode())
    }
}

#[cfg(test)]
mod tests {
    use block_dev::RamDisk;

    use super::*;

    #[test]
    fn unaligned_access() {
        let disk = Disk::new(Arc::new(RamDisk::new(4)));
        let data: Vec<u8> = (0..=255).cycle().take(700).collect();
        disk.write_at(300, &data).unwrap();

        let mut buf = vec![0; 700];
        disk.read_at(300, &mut buf).unwrap();
        assert_eq!(buf, data);

        let mut head = [0xAA; 300];
        disk.read_at(0, &mut head).unwrap();
        assert!(head.iter().all(|&b| b == 0));

        disk.zero_range(400, 100).unwrap();
        disk.read_at(300, &mut buf).unwrap();
        assert!(buf[100..200].iter().all(|&b| b == 0));
        assert_eq!(buf[200..], data[200..]);
    }

    #[test]
    fn beyond_end() {
        let disk = Disk::new(Arc::new(RamDisk::new(1)));
        let err = disk.write_at(500, &[0; 20]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
