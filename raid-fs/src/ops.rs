//! # 文件操作层
//!
//! 以路径或 inode 为对象的文件操作。
//! 路径形式的操作先解析出 inode，再交给对应的`*_at`或`*_inode`形式。
//!
//! 修改磁盘的操作都需要`&mut self`，因此同一时刻至多一个修改者。

use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use vfs::{DirEntryType, Stat, StatFs};

use crate::layout::{check_name, DirEntry, DiskInode, InodeId, InodeKind, NAME_LENGTH_LIMIT};
use crate::raid::BlockSlot;
use crate::{RaidFileSystem, Result};
use crate::{BLOCK_SIZE, DIRECT_COUNT, MAX_FILE_SIZE};

/// 新建文件的属主
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// 需要修改的属性，`None`表示保持不变
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetAttr {
    pub perm: Option<u16>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub atime: Option<i64>,
    pub mtime: Option<i64>,
}

/// 当前的秒级时间戳
pub(crate) fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

impl RaidFileSystem {
    /* 查询 */

    pub fn getattr(&self, path: &str) -> Result<Stat> {
        self.stat_inode(self.resolve(path, 0)?)
    }

    pub fn stat_inode(&self, ino: InodeId) -> Result<Stat> {
        let inode = self.load_inode(ino)?;
        let blocks = self.count_blocks(&inode)?;

        Ok(Stat {
            inode: u64::from(inode.num),
            mode: match inode.kind() {
                InodeKind::Directory => DirEntryType::Directory,
                InodeKind::Regular => DirEntryType::Regular,
            },
            perm: inode.perm(),
            uid: inode.uid,
            gid: inode.gid,
            links: inode.nlinks,
            size: inode.size,
            block_size: BLOCK_SIZE as u64,
            blocks,
            atime: inode.atime,
            mtime: inode.mtime,
            ctime: inode.ctime,
        })
    }

    /// 占用的数据块个数，包括间接块
    fn count_blocks(&self, inode: &DiskInode) -> Result<u64> {
        let mut count = inode.blocks[..DIRECT_COUNT]
            .iter()
            .filter(|ptr| ptr.get().is_some())
            .count();
        if let Some(indirect) = inode.indirect() {
            let table = self.read_indirect(indirect)?;
            count += 1 + table.entries.iter().filter(|ptr| ptr.get().is_some()).count();
        }

        Ok(count as u64)
    }

    /// 在目录`parent`中按名称查找
    pub fn lookup(&self, parent: InodeId, name: &str) -> Result<Stat> {
        let dir = self.load_dir(parent)?;
        let ino = self.find_child(&dir, name)?.ok_or(vfs::Error::NotFound)?;

        self.stat_inode(ino)
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<vfs::DirEntry>> {
        self.readdir_inode(self.resolve(path, 0)?)
    }

    pub fn readdir_inode(&self, ino: InodeId) -> Result<Vec<vfs::DirEntry>> {
        let dir = self.load_dir(ino)?;
        self.dir_entries(&dir)?
            .into_iter()
            .map(|entry| {
                let child = self.load_inode(entry.inode())?;
                Ok(vfs::DirEntry {
                    inode: u64::from(child.num),
                    ty: match child.kind() {
                        InodeKind::Directory => DirEntryType::Directory,
                        InodeKind::Regular => DirEntryType::Regular,
                    },
                    name: entry.name(),
                })
            })
            .collect()
    }

    pub fn statfs(&self) -> Result<StatFs> {
        let (blocks, free_blocks) = self.data_usage()?;
        let (inodes, free_inodes) = self.inode_usage()?;

        Ok(StatFs {
            block_size: BLOCK_SIZE as u64,
            blocks,
            free_blocks,
            inodes,
            free_inodes,
            name_max: NAME_LENGTH_LIMIT as u32 - 1,
        })
    }

    fn load_dir(&self, ino: InodeId) -> Result<DiskInode> {
        let dir = self.load_inode(ino)?;
        if !dir.is_dir() {
            return Err(vfs::Error::NotADirectory);
        }

        Ok(dir)
    }

    /* 创建 */

    /// 创建普通文件
    pub fn mknod(&mut self, path: &str, perm: u16, owner: Owner) -> Result<InodeId> {
        let (parent, name) = self.resolve_parent(path)?;
        self.create_at(parent, &name, InodeKind::Regular, perm, owner)
    }

    pub fn mkdir(&mut self, path: &str, perm: u16, owner: Owner) -> Result<InodeId> {
        let (parent, name) = self.resolve_parent(path)?;
        self.create_at(parent, &name, InodeKind::Directory, perm, owner)
    }

    /// 在目录`parent`下创建子 inode。
    ///
    /// 目录项无法写入时释放刚分配的 inode，失败的创建不会留下目录项。
    pub fn create_at(
        &mut self,
        parent: InodeId,
        name: &str,
        kind: InodeKind,
        perm: u16,
        owner: Owner,
    ) -> Result<InodeId> {
        check_name(name)?;
        let mut dir = self.load_dir(parent)?;
        if self.find_child(&dir, name)?.is_some() {
            return Err(vfs::Error::AlreadyExists);
        }
        if Self::dir_is_full(&dir) {
            return Err(vfs::Error::NoSpace);
        }

        let ino = self.alloc_inode()?;
        let now = now();
        self.store_inode(&DiskInode::new(ino, kind, perm, owner.uid, owner.gid, now))?;

        let entry = DirEntry::new(name, ino)?;
        if let Err(err) = self.append_entry(&mut dir, &entry) {
            self.free_inode(ino)?;
            return Err(err);
        }
        if kind == InodeKind::Directory {
            dir.nlinks += 1;
        }
        dir.touch(now);
        self.store_inode(&dir)?;
        debug!("created {kind:?} `{name}` as inode {ino} under {parent}");

        Ok(ino)
    }

    /* 读写 */

    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        let ino = self.resolve(path, 0)?;
        self.write_inode(ino, offset, data)
    }

    /// 从`offset`处写入`data`，按需分配数据块与间接块。
    ///
    /// 空间耗尽时已写入的块保留，文件大小反映已写入的部分。
    pub fn write_inode(&mut self, ino: InodeId, offset: u64, data: &[u8]) -> Result<usize> {
        let mut inode = self.load_inode(ino)?;
        if inode.is_dir() {
            return Err(vfs::Error::IsADirectory);
        }
        if data.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(vfs::Error::FileTooLarge)?;
        if end > MAX_FILE_SIZE {
            return Err(vfs::Error::FileTooLarge);
        }

        let written = self.write_blocks(&mut inode, offset, data);
        inode.touch(now());
        self.store_inode(&inode)?;
        let written = written?;
        debug!("wrote {written} bytes at {offset} to inode {ino}");

        Ok(written)
    }

    fn write_blocks(&mut self, inode: &mut DiskInode, offset: u64, data: &[u8]) -> Result<usize> {
        let mut done = 0;
        while done < data.len() {
            let pos = offset + done as u64;
            let index = (pos / BLOCK_SIZE as u64) as usize;
            let start = (pos % BLOCK_SIZE as u64) as usize;
            let len = (BLOCK_SIZE - start).min(data.len() - done);

            let id = self.block_or_alloc(inode, index)?;
            self.write_data(BlockSlot::Data(index), id, start, &data[done..done + len])?;
            done += len;
            inode.size = inode.size.max(pos + len as u64);
        }

        Ok(done)
    }

    pub fn read(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.read_inode(self.resolve(path, 0)?, offset, len)
    }

    /// 读出至多`len`字节，遇到未分配的块时提前结束
    pub fn read_inode(&self, ino: InodeId, offset: u64, len: usize) -> Result<Vec<u8>> {
        let inode = self.load_inode(ino)?;
        if inode.is_dir() {
            return Err(vfs::Error::IsADirectory);
        }
        if offset >= inode.size {
            return Ok(Vec::new());
        }

        let len = (inode.size - offset).min(len as u64) as usize;
        let mut buf = Vec::with_capacity(len);
        while buf.len() < len {
            let pos = offset + buf.len() as u64;
            let index = (pos / BLOCK_SIZE as u64) as usize;
            let start = (pos % BLOCK_SIZE as u64) as usize;
            let step = (BLOCK_SIZE - start).min(len - buf.len());

            let Some(id) = self.block_of(&inode, index)? else {
                break;
            };
            let block = self.read_data(BlockSlot::Data(index), id)?;
            buf.extend_from_slice(&block[start..start + step]);
        }

        Ok(buf)
    }

    /// 改变文件大小：缩小时释放多余的块并清零最后一块的尾部，增大时只修改大小
    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let ino = self.resolve(path, 0)?;
        self.truncate_inode(ino, size)
    }

    pub fn truncate_inode(&mut self, ino: InodeId, size: u64) -> Result<()> {
        let mut inode = self.load_inode(ino)?;
        if inode.is_dir() {
            return Err(vfs::Error::IsADirectory);
        }
        if size > MAX_FILE_SIZE {
            return Err(vfs::Error::FileTooLarge);
        }

        if size < inode.size {
            let keep = size.div_ceil(BLOCK_SIZE as u64) as usize;
            self.release_blocks(&mut inode, keep)?;

            let tail = size as usize % BLOCK_SIZE;
            if tail != 0 {
                if let Some(id) = self.block_of(&inode, keep - 1)? {
                    let zeros = [0; BLOCK_SIZE];
                    self.write_data(BlockSlot::Data(keep - 1), id, tail, &zeros[tail..])?;
                }
            }
        }
        inode.size = size;
        inode.touch(now());
        self.store_inode(&inode)?;
        debug!("truncated inode {ino} to {size} bytes");

        Ok(())
    }

    pub fn set_attr(&mut self, path: &str, attr: SetAttr) -> Result<Stat> {
        let ino = self.resolve(path, 0)?;
        self.set_attr_inode(ino, attr)
    }

    pub fn set_attr_inode(&mut self, ino: InodeId, attr: SetAttr) -> Result<Stat> {
        self.update_inode(ino, |inode| {
            if let Some(perm) = attr.perm {
                inode.set_perm(perm);
            }
            if let Some(uid) = attr.uid {
                inode.uid = uid;
            }
            if let Some(gid) = attr.gid {
                inode.gid = gid;
            }
            if let Some(atime) = attr.atime {
                inode.atime = atime;
            }
            if let Some(mtime) = attr.mtime {
                inode.mtime = mtime;
            }
            inode.ctime = now();
        })?;

        self.stat_inode(ino)
    }

    /* 删除 */

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.resolve_parent(path)?;
        self.unlink_at(parent, &name)
    }

    /// 删除普通文件，释放它的全部数据块
    pub fn unlink_at(&mut self, parent: InodeId, name: &str) -> Result<()> {
        let mut dir = self.load_dir(parent)?;
        let ino = self.find_child(&dir, name)?.ok_or(vfs::Error::NotFound)?;
        let mut inode = self.load_inode(ino)?;
        if inode.is_dir() {
            return Err(vfs::Error::IsADirectory);
        }

        self.release_blocks(&mut inode, 0)?;
        self.free_inode(ino)?;
        self.remove_entry(&mut dir, ino)?;
        dir.touch(now());
        self.store_inode(&dir)?;
        debug!("unlinked `{name}` (inode {ino}) from {parent}");

        Ok(())
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.resolve_parent(path)?;
        self.rmdir_at(parent, &name)
    }

    /// 删除空目录
    pub fn rmdir_at(&mut self, parent: InodeId, name: &str) -> Result<()> {
        let mut dir = self.load_dir(parent)?;
        let ino = self.find_child(&dir, name)?.ok_or(vfs::Error::NotFound)?;
        let mut inode = self.load_inode(ino)?;
        if !inode.is_dir() {
            return Err(vfs::Error::NotADirectory);
        }
        if inode.size != 0 {
            return Err(vfs::Error::DirectoryNotEmpty);
        }

        self.release_blocks(&mut inode, 0)?;
        self.free_inode(ino)?;
        self.remove_entry(&mut dir, ino)?;
        dir.nlinks = dir.nlinks.saturating_sub(1);
        dir.touch(now());
        self.store_inode(&dir)?;
        debug!("removed directory `{name}` (inode {ino}) from {parent}");

        Ok(())
    }
}
