//! # RAID 转换层
//!
//! 决定一个逻辑数据块存放在哪些磁盘上，并在校验镜像模式下对多份副本表决。

use core::ops::Range;

use crate::layout::RaidMode;
use crate::DIRECT_COUNT;

/// 数据块在文件中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSlot {
    /// 文件的第 L 个逻辑块
    Data(usize),
    /// 间接块本身
    Indirect,
}

impl BlockSlot {
    fn index(self) -> usize {
        match self {
            Self::Data(index) => index,
            Self::Indirect => DIRECT_COUNT,
        }
    }
}

impl RaidMode {
    /// 持有该块的磁盘下标
    pub fn targets(self, slot: BlockSlot, disks: usize) -> Range<usize> {
        match self {
            Self::Striped => {
                let disk = slot.index() % disks;
                disk..disk + 1
            }
            Self::Mirrored | Self::Verified => 0..disks,
        }
    }
}

/// 多数表决：返回与最多副本（含自身）一致的副本下标，平票取下标最小者
pub fn elect<T: AsRef<[u8]>>(copies: &[T]) -> usize {
    let mut winner = 0;
    let mut best = 0;
    for (i, copy) in copies.iter().enumerate() {
        let votes = copies
            .iter()
            .filter(|other| other.as_ref() == copy.as_ref())
            .count();
        if votes > best {
            winner = i;
            best = votes;
        }
    }

    winner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn striped_placement() {
        let mode = RaidMode::Striped;
        assert_eq!(mode.targets(BlockSlot::Data(0), 2), 0..1);
        assert_eq!(mode.targets(BlockSlot::Data(5), 2), 1..2);
        assert_eq!(mode.targets(BlockSlot::Data(9), 3), 0..1);
        assert_eq!(mode.targets(BlockSlot::Indirect, 2), 1..2);
        assert_eq!(mode.targets(BlockSlot::Indirect, 3), 1..2);
        assert_eq!(mode.targets(BlockSlot::Indirect, 7), 0..1);
    }

    #[test]
    fn mirrored_placement() {
        assert_eq!(RaidMode::Mirrored.targets(BlockSlot::Data(3), 3), 0..3);
        assert_eq!(RaidMode::Verified.targets(BlockSlot::Indirect, 4), 0..4);
    }

    #[test]
    fn vote() {
        assert_eq!(elect(&[[1u8], [2], [2]]), 1);
        assert_eq!(elect(&[[1u8], [1], [2]]), 0);
        assert_eq!(elect(&[[3u8], [1], [2]]), 0);
        assert_eq!(elect(&[[3u8], [1], [1], [3]]), 0);
        assert_eq!(elect(&[[9u8]]), 0);
    }
}
