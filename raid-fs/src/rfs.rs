//! # 磁盘块管理器层
//!
//! 构建出磁盘组的布局并使用：格式化、挂载，
//! 以及 inode 与数据块在各块磁盘上的分配与读写。

use core::ops::Range;
use std::sync::Arc;

use block_dev::BlockDevice;
use log::{debug, info, warn};

use crate::disk::Disk;
use crate::layout::*;
use crate::raid::{elect, BlockSlot};
use crate::{DataBlock, LayoutError, Owner, Result};
use crate::{BLOCK_SIZE, DIRECT_COUNT, MAX_FILE_BLOCKS};

/// 挂载期间的文件系统上下文，持有全部磁盘
pub struct RaidFileSystem {
    /// 按`disk_order`排列
    disks: Vec<Disk>,
    /// 0 号盘的超级块
    sb: SuperBlock,
}

/// 位图所管理的区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Area {
    Inodes,
    Data,
}

impl RaidFileSystem {
    /// 在一组磁盘上创建新的文件系统，根目录的属主为`owner`
    pub fn format(
        devices: Vec<Arc<dyn BlockDevice>>,
        mode: RaidMode,
        num_inodes: u64,
        num_data_blocks: u64,
        owner: Owner,
    ) -> Result<Self, LayoutError> {
        if devices.len() < 2 {
            return Err(LayoutError::TooFewDisks(devices.len()));
        }
        if num_inodes == 0 || num_data_blocks == 0 {
            return Err(LayoutError::ZeroCount);
        }

        let sb = SuperBlock::new(mode, devices.len() as u32, num_inodes, num_data_blocks);
        let disks: Vec<Disk> = devices.into_iter().map(Disk::new).collect();

        let need = sb.required_capacity();
        let have = disks.iter().map(Disk::capacity).min().unwrap_or(0);
        if have < need {
            return Err(LayoutError::DiskTooSmall { need, have });
        }

        let root = DiskInode::new(
            InodeId::ROOT,
            InodeKind::Directory,
            0o755,
            owner.uid,
            owner.gid,
            crate::ops::now(),
        );
        for (order, disk) in disks.iter().enumerate() {
            disk.write_record(0, &sb.with_order(order as u32))?;
            // 两个位图以及对齐用的填充
            disk.zero_range(sb.i_bitmap_ptr, sb.i_blocks_ptr - sb.i_bitmap_ptr)?;
            disk.write_at(sb.i_bitmap_ptr, &[0b1])?;
            disk.zero_range(sb.i_blocks_ptr, BLOCK_SIZE as u64)?;
            disk.write_record(sb.i_blocks_ptr, &root)?;
        }

        info!(
            "formatted {} disks in mode {}: {} inodes, {} data blocks",
            disks.len(),
            mode,
            sb.num_inodes,
            sb.num_data_blocks
        );

        Ok(Self { disks, sb })
    }

    /// 挂载已有的文件系统，磁盘按各自超级块中的`disk_order`重新排列
    pub fn open(devices: Vec<Arc<dyn BlockDevice>>) -> Result<Self, LayoutError> {
        if devices.is_empty() {
            return Err(LayoutError::TooFewDisks(0));
        }

        let disks: Vec<Disk> = devices.into_iter().map(Disk::new).collect();
        let sb = read_super_block(&disks[0], 0)?;
        if sb.total_disks as usize != disks.len() {
            return Err(LayoutError::DiskCountMismatch {
                declared: sb.total_disks,
                supplied: disks.len(),
            });
        }

        let mut ordered: Vec<Option<Disk>> = vec![None; disks.len()];
        for (index, disk) in disks.into_iter().enumerate() {
            let own = read_super_block(&disk, index)?;
            if !own.same_set(&sb) {
                return Err(LayoutError::InconsistentSet { disk: index });
            }
            let have = disk.capacity();
            if have < sb.required_capacity() {
                return Err(LayoutError::DiskTooSmall {
                    need: sb.required_capacity(),
                    have,
                });
            }
            match ordered.get_mut(own.disk_order as usize) {
                Some(slot) if slot.is_none() => *slot = Some(disk),
                _ => return Err(LayoutError::InconsistentSet { disk: index }),
            }
        }
        let disks: Vec<Disk> = ordered.into_iter().flatten().collect();

        info!(
            "mounted {} disks in mode {}: {} inodes, {} data blocks",
            disks.len(),
            sb.raid_mode,
            sb.num_inodes,
            sb.num_data_blocks
        );

        Ok(Self {
            disks,
            sb: sb.with_order(0),
        })
    }

    #[inline]
    pub fn mode(&self) -> RaidMode {
        self.sb.raid_mode
    }

    #[inline]
    pub fn disk_count(&self) -> usize {
        self.disks.len()
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.sb
    }

    #[inline]
    fn all_disks(&self) -> Range<usize> {
        0..self.disks.len()
    }

    /// 从`disks`中读出`len`字节，校验镜像模式下多数表决
    fn read_replicated(&self, disks: Range<usize>, offset: u64, len: usize) -> Result<Vec<u8>> {
        if !self.mode().votes() {
            let mut buf = vec![0; len];
            self.disks[disks.start].read_at(offset, &mut buf)?;
            return Ok(buf);
        }

        let mut copies = Vec::with_capacity(disks.len());
        for disk in &self.disks[disks] {
            let mut buf = vec![0; len];
            disk.read_at(offset, &mut buf)?;
            copies.push(buf);
        }
        let winner = elect(&copies);
        for (index, copy) in copies.iter().enumerate() {
            if copy != &copies[winner] {
                warn!("disk {index} diverges at offset {offset:#x}, using disk {winner}");
            }
        }

        Ok(copies.swap_remove(winner))
    }

    fn read_replicated_record<R: Record>(&self, disks: Range<usize>, offset: u64) -> Result<R> {
        let bytes = self.read_replicated(disks, offset, R::SIZE)?;
        R::decode(&bytes).map_err(|err| vfs::Error::Corrupted(err.to_string()))
    }

    /* inode */

    /// inode 在每块磁盘上的字节偏移
    #[inline]
    pub(crate) fn locate(&self, ino: InodeId) -> u64 {
        self.sb.i_blocks_ptr + u64::from(ino.0) * BLOCK_SIZE as u64
    }

    /// 读出已分配的 inode，未分配或越界时返回[`vfs::Error::NotFound`]
    pub(crate) fn load_inode(&self, ino: InodeId) -> Result<DiskInode> {
        if !self.read_inode_bitmap()?.is_set(ino.0 as usize) {
            return Err(vfs::Error::NotFound);
        }

        self.read_replicated_record(self.all_disks(), self.locate(ino))
    }

    /// 把 inode 写到每块磁盘上
    pub(crate) fn store_inode(&self, inode: &DiskInode) -> Result<()> {
        let offset = self.locate(InodeId(inode.num));
        for disk in &self.disks {
            disk.write_record(offset, inode)?;
        }

        Ok(())
    }

    pub(crate) fn update_inode<V>(
        &self,
        ino: InodeId,
        f: impl FnOnce(&mut DiskInode) -> V,
    ) -> Result<V> {
        let mut inode = self.load_inode(ino)?;
        let ret = f(&mut inode);
        self.store_inode(&inode)?;

        Ok(ret)
    }

    /* 位图 */

    fn bitmap_area(&self, area: Area) -> (u64, usize) {
        match area {
            Area::Inodes => (self.sb.i_bitmap_ptr, self.sb.num_inodes as usize),
            Area::Data => (self.sb.d_bitmap_ptr, self.sb.num_data_blocks as usize),
        }
    }

    pub(crate) fn read_bitmap(&self, disk: usize, area: Area) -> Result<Bitmap> {
        let (offset, len) = self.bitmap_area(area);
        let mut bytes = vec![0; len.div_ceil(8)];
        self.disks[disk].read_at(offset, &mut bytes)?;

        Ok(Bitmap::from_bytes(&bytes, len))
    }

    /// 读出`disks`共同维护的位图，校验镜像模式下逐字节多数表决
    fn read_replicated_bitmap(&self, disks: Range<usize>, area: Area) -> Result<Bitmap> {
        let (offset, len) = self.bitmap_area(area);
        let bytes = self.read_replicated(disks, offset, len.div_ceil(8))?;

        Ok(Bitmap::from_bytes(&bytes, len))
    }

    #[inline]
    fn read_inode_bitmap(&self) -> Result<Bitmap> {
        self.read_replicated_bitmap(self.all_disks(), Area::Inodes)
    }

    /// 在`disks`的位图上设置或清除第`index`位
    fn mark(&self, disks: Range<usize>, area: Area, index: usize, used: bool) -> Result<()> {
        let (offset, _) = self.bitmap_area(area);
        for disk in disks {
            let mut bitmap = self.read_bitmap(disk, area)?;
            if used {
                bitmap.set(index);
            } else {
                bitmap.clear(index);
            }
            self.disks[disk].write_at(offset + (index / 8) as u64, &[bitmap.byte(index)])?;
        }

        Ok(())
    }

    /// 查找空闲 inode，并在所有磁盘上占用它
    pub(crate) fn alloc_inode(&mut self) -> Result<InodeId> {
        let index = self
            .read_inode_bitmap()?
            .find_first_clear()
            .ok_or(vfs::Error::NoSpace)?;
        self.mark(self.all_disks(), Area::Inodes, index, true)?;
        debug!("allocated inode {index}");

        Ok(InodeId(index as u32))
    }

    pub(crate) fn free_inode(&mut self, ino: InodeId) -> Result<()> {
        self.mark(self.all_disks(), Area::Inodes, ino.0 as usize, false)?;
        debug!("freed inode {ino}");

        Ok(())
    }

    /* 数据块 */

    #[inline]
    fn data_offset(&self, id: BlockId) -> u64 {
        self.sb.d_blocks_ptr + u64::from(id.0) * BLOCK_SIZE as u64
    }

    #[inline]
    fn targets(&self, slot: BlockSlot) -> Range<usize> {
        self.mode().targets(slot, self.disks.len())
    }

    /// 为文件中`slot`位置的块分配数据块，分配到的块已清零
    pub(crate) fn alloc_data(&mut self, slot: BlockSlot) -> Result<BlockId> {
        let targets = self.targets(slot);
        let limit = self.sb.data_blocks_on_disk(targets.start) as usize;
        let index = self
            .read_replicated_bitmap(targets.clone(), Area::Data)?
            .find_first_clear_below(limit)
            .ok_or(vfs::Error::NoSpace)?;
        self.mark(targets.clone(), Area::Data, index, true)?;

        let id = BlockId(index as u32);
        for disk in &self.disks[targets.clone()] {
            disk.zero_range(self.data_offset(id), BLOCK_SIZE as u64)?;
        }
        debug!("allocated data block {id} on disks {targets:?}");

        Ok(id)
    }

    pub(crate) fn free_data(&mut self, slot: BlockSlot, id: BlockId) -> Result<()> {
        let targets = self.targets(slot);
        self.mark(targets.clone(), Area::Data, id.0 as usize, false)?;
        debug!("freed data block {id} on disks {targets:?}");

        Ok(())
    }

    pub(crate) fn read_data(&self, slot: BlockSlot, id: BlockId) -> Result<DataBlock> {
        let bytes = self.read_replicated(self.targets(slot), self.data_offset(id), BLOCK_SIZE)?;
        let mut block = [0; BLOCK_SIZE];
        block.copy_from_slice(&bytes);

        Ok(block)
    }

    /// 从块内偏移`offset`处写入`data`
    pub(crate) fn write_data(
        &self,
        slot: BlockSlot,
        id: BlockId,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        let pos = self.data_offset(id) + offset as u64;
        for disk in &self.disks[self.targets(slot)] {
            disk.write_at(pos, data)?;
        }

        Ok(())
    }

    pub(crate) fn read_indirect(&self, id: BlockId) -> Result<IndirectBlock> {
        self.read_replicated_record(self.targets(BlockSlot::Indirect), self.data_offset(id))
    }

    fn write_indirect(&self, id: BlockId, table: &IndirectBlock) -> Result<()> {
        self.write_data(BlockSlot::Indirect, id, 0, &table.encode())
    }

    /// 文件第`index`个逻辑块对应的数据块
    pub(crate) fn block_of(&self, inode: &DiskInode, index: usize) -> Result<Option<BlockId>> {
        if index < DIRECT_COUNT {
            return Ok(inode.blocks[index].get());
        }
        if index >= MAX_FILE_BLOCKS {
            return Ok(None);
        }

        match inode.indirect() {
            Some(indirect) => Ok(self.read_indirect(indirect)?.entries[index - DIRECT_COUNT].get()),
            None => Ok(None),
        }
    }

    /// 文件第`index`个逻辑块对应的数据块，不存在则分配。
    ///
    /// 只修改内存中的`inode`，由调用者写回。
    pub(crate) fn block_or_alloc(&mut self, inode: &mut DiskInode, index: usize) -> Result<BlockId> {
        if index < DIRECT_COUNT {
            if let Some(id) = inode.blocks[index].get() {
                return Ok(id);
            }
            let id = self.alloc_data(BlockSlot::Data(index))?;
            inode.blocks[index] = id.into();
            return Ok(id);
        }
        if index >= MAX_FILE_BLOCKS {
            return Err(vfs::Error::FileTooLarge);
        }

        let indirect = match inode.indirect() {
            Some(indirect) => indirect,
            None => {
                let indirect = self.alloc_data(BlockSlot::Indirect)?;
                self.write_indirect(indirect, &IndirectBlock::empty())?;
                inode.blocks[DIRECT_COUNT] = indirect.into();
                indirect
            }
        };
        let mut table = self.read_indirect(indirect)?;
        if let Some(id) = table.entries[index - DIRECT_COUNT].get() {
            return Ok(id);
        }
        let id = self.alloc_data(BlockSlot::Data(index))?;
        table.entries[index - DIRECT_COUNT] = id.into();
        self.write_indirect(indirect, &table)?;

        Ok(id)
    }

    /// 释放逻辑编号不小于`keep`的全部数据块，间接块空了也一并释放。
    ///
    /// 只修改内存中的`inode`，由调用者写回。
    pub(crate) fn release_blocks(&mut self, inode: &mut DiskInode, keep: usize) -> Result<()> {
        for index in keep..DIRECT_COUNT {
            if let Some(id) = inode.blocks[index].take() {
                self.free_data(BlockSlot::Data(index), id)?;
            }
        }

        let Some(indirect) = inode.indirect() else {
            return Ok(());
        };
        let mut table = self.read_indirect(indirect)?;
        for i in keep.saturating_sub(DIRECT_COUNT)..table.entries.len() {
            if let Some(id) = table.entries[i].take() {
                self.free_data(BlockSlot::Data(DIRECT_COUNT + i), id)?;
            }
        }
        if table.is_empty() {
            self.free_data(BlockSlot::Indirect, indirect)?;
            inode.blocks[DIRECT_COUNT] = BlockPtr::NONE;
        } else {
            self.write_indirect(indirect, &table)?;
        }

        Ok(())
    }

    /// 数据块总数与空闲数，条带模式下对各盘求和
    pub(crate) fn data_usage(&self) -> Result<(u64, u64)> {
        match self.mode() {
            RaidMode::Striped => {
                let mut free = 0;
                for disk in self.all_disks() {
                    let used = self.read_bitmap(disk, Area::Data)?.count_set() as u64;
                    free += self.sb.data_blocks_on_disk(disk).saturating_sub(used);
                }
                Ok((self.sb.num_data_blocks, free))
            }
            RaidMode::Mirrored | RaidMode::Verified => {
                let total = self.sb.num_data_blocks;
                let used = self
                    .read_replicated_bitmap(self.all_disks(), Area::Data)?
                    .count_set() as u64;
                Ok((total, total.saturating_sub(used)))
            }
        }
    }

    pub(crate) fn inode_usage(&self) -> Result<(u64, u64)> {
        let used = self.read_inode_bitmap()?.count_set() as u64;
        Ok((self.sb.num_inodes, self.sb.num_inodes - used))
    }
}

fn read_super_block(disk: &Disk, index: usize) -> Result<SuperBlock, LayoutError> {
    let mut bytes = [0; SuperBlock::SIZE];
    disk.read_at(0, &mut bytes)?;
    SuperBlock::decode(&bytes).map_err(|err| match err {
        binrw::Error::BadMagic { .. } => LayoutError::BadMagic { disk: index },
        err => LayoutError::Corrupted {
            disk: index,
            reason: err.to_string(),
        },
    })
}
