#![allow(dead_code)]

use std::sync::Arc;

use block_dev::{BlockDevice, RamDisk};
use raid_fs::layout::RaidMode;
use raid_fs::{Owner, RaidFileSystem};

/// 每块内存盘的块数
pub const DISK_BLOCKS: usize = 256;

pub fn ram_disks(count: usize) -> Vec<Arc<RamDisk>> {
    (0..count)
        .map(|_| Arc::new(RamDisk::new(DISK_BLOCKS)))
        .collect()
}

pub fn devices(disks: &[Arc<RamDisk>]) -> Vec<Arc<dyn BlockDevice>> {
    disks
        .iter()
        .map(|disk| disk.clone() as Arc<dyn BlockDevice>)
        .collect()
}

pub fn format(
    disks: &[Arc<RamDisk>],
    mode: RaidMode,
    inodes: u64,
    blocks: u64,
) -> RaidFileSystem {
    RaidFileSystem::format(devices(disks), mode, inodes, blocks, Owner::default()).unwrap()
}

/// 不会与块边界对齐的测试数据
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

pub const OWNER: Owner = Owner { uid: 1000, gid: 100 };
