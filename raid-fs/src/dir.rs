//! # 目录项管理
//!
//! 目录的数据块中紧密排列着目录项，目录大小恒为目录项个数乘以 32。
//! 追加总在末尾进行；删除时用最后一项填补空位。

use crate::layout::{BlockPtr, DirEntry, DiskInode, InodeId, Record};
use crate::raid::BlockSlot;
use crate::{RaidFileSystem, Result};
use crate::{DIR_ENTRY_CAP, DIR_ENTRY_SIZE, ENTRIES_PER_BLOCK};

/// 第`index`个目录项所在的块槽与块内偏移
#[inline]
fn entry_pos(index: usize) -> (usize, usize) {
    (
        index / ENTRIES_PER_BLOCK,
        index % ENTRIES_PER_BLOCK * DIR_ENTRY_SIZE,
    )
}

#[inline]
fn entry_count(dir: &DiskInode) -> usize {
    dir.size as usize / DIR_ENTRY_SIZE
}

impl RaidFileSystem {
    pub(crate) fn dir_entries(&self, dir: &DiskInode) -> Result<Vec<DirEntry>> {
        let count = entry_count(dir);
        if count > DIR_ENTRY_CAP {
            return Err(vfs::Error::Corrupted(format!(
                "directory {} holds {count} entries",
                dir.num
            )));
        }

        let mut entries = Vec::with_capacity(count);
        for slot in 0..count.div_ceil(ENTRIES_PER_BLOCK) {
            let id = dir.blocks[slot].get().ok_or(vfs::Error::NotFound)?;
            let block = self.read_data(BlockSlot::Data(slot), id)?;
            let in_block = (count - slot * ENTRIES_PER_BLOCK).min(ENTRIES_PER_BLOCK);
            for raw in block.chunks_exact(DIR_ENTRY_SIZE).take(in_block) {
                let entry =
                    DirEntry::decode(raw).map_err(|err| vfs::Error::Corrupted(err.to_string()))?;
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    pub(crate) fn find_child(&self, dir: &DiskInode, name: &str) -> Result<Option<InodeId>> {
        Ok(self
            .dir_entries(dir)?
            .into_iter()
            .find(|entry| entry.name_bytes() == name.as_bytes())
            .map(|entry| entry.inode()))
    }

    #[inline]
    pub(crate) fn dir_is_full(dir: &DiskInode) -> bool {
        entry_count(dir) >= DIR_ENTRY_CAP
    }

    /// 在目录末尾追加目录项，必要时为目录分配新的数据块。
    ///
    /// 只修改内存中的`dir`，由调用者写回。
    pub(crate) fn append_entry(&mut self, dir: &mut DiskInode, entry: &DirEntry) -> Result<()> {
        if Self::dir_is_full(dir) {
            return Err(vfs::Error::NoSpace);
        }

        let (slot, offset) = entry_pos(entry_count(dir));
        let id = match dir.blocks[slot].get() {
            Some(id) => id,
            None => {
                let id = self.alloc_data(BlockSlot::Data(slot))?;
                dir.blocks[slot] = id.into();
                id
            }
        };
        self.write_data(BlockSlot::Data(slot), id, offset, &entry.encode())?;
        dir.size += DIR_ENTRY_SIZE as u64;

        Ok(())
    }

    /// 删除指向`ino`的目录项：最后一项移入空位，清零最后一项，
    /// 最后一个数据块因此变空时将其释放。
    ///
    /// 只修改内存中的`dir`，由调用者写回。
    pub(crate) fn remove_entry(&mut self, dir: &mut DiskInode, ino: InodeId) -> Result<()> {
        let entries = self.dir_entries(dir)?;
        let index = entries
            .iter()
            .position(|entry| entry.inode() == ino)
            .ok_or(vfs::Error::NotFound)?;
        let last = entries.len() - 1;

        let block_at = |slot: usize| dir.blocks[slot].get().ok_or(vfs::Error::NotFound);
        if index != last {
            let (slot, offset) = entry_pos(index);
            self.write_data(
                BlockSlot::Data(slot),
                block_at(slot)?,
                offset,
                &entries[last].encode(),
            )?;
        }
        let (last_slot, last_offset) = entry_pos(last);
        let last_block = block_at(last_slot)?;
        self.write_data(
            BlockSlot::Data(last_slot),
            last_block,
            last_offset,
            &[0; DIR_ENTRY_SIZE],
        )?;
        dir.size -= DIR_ENTRY_SIZE as u64;

        if last_offset == 0 {
            self.free_data(BlockSlot::Data(last_slot), last_block)?;
            dir.blocks[last_slot] = BlockPtr::NONE;
        }

        Ok(())
    }
}
