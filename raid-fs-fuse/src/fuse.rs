//! 把 [`RaidFileSystem`] 接到 FUSE 上。
//!
//! FUSE 的根目录编号为 1，因此 FUSE inode 编号等于磁盘 inode 编号加一。

use std::ffi::{c_int, OsStr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use log::{debug, error};
use raid_fs::layout::{InodeId, InodeKind};
use raid_fs::{Owner, RaidFileSystem, SetAttr};
use vfs::{DirEntryType, Stat};

const TTL: Duration = Duration::from_secs(1);

pub struct RaidFuse {
    fs: RaidFileSystem,
}

impl RaidFuse {
    pub fn new(fs: RaidFileSystem) -> Self {
        Self { fs }
    }
}

/// `vfs::Error`对应的 errno
pub fn errno(err: &vfs::Error) -> c_int {
    use vfs::Error::*;

    match err {
        AlreadyExists => libc::EEXIST,
        NotFound => libc::ENOENT,
        IsADirectory => libc::EISDIR,
        NotADirectory => libc::ENOTDIR,
        DirectoryNotEmpty => libc::ENOTEMPTY,
        NoSpace => libc::ENOSPC,
        NameTooLong => libc::ENAMETOOLONG,
        FileTooLarge => libc::EFBIG,
        InvalidPath => libc::EINVAL,
        Corrupted(_) | Io(_) => libc::EIO,
    }
}

fn inode_id(ino: u64) -> Option<InodeId> {
    ino.checked_sub(1)
        .and_then(|ino| u32::try_from(ino).ok())
        .map(InodeId)
}

fn file_type(ty: DirEntryType) -> FileType {
    match ty {
        DirEntryType::Directory => FileType::Directory,
        DirEntryType::Regular => FileType::RegularFile,
    }
}

fn timestamp(secs: i64) -> SystemTime {
    match u64::try_from(secs) {
        Ok(secs) => UNIX_EPOCH + Duration::from_secs(secs),
        Err(_) => UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()),
    }
}

fn seconds(time: TimeOrNow) -> i64 {
    let time = match time {
        TimeOrNow::SpecificTime(time) => time,
        TimeOrNow::Now => SystemTime::now(),
    };
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

pub(crate) fn file_attr(stat: &Stat) -> FileAttr {
    FileAttr {
        ino: stat.inode + 1,
        size: stat.size,
        blocks: stat.blocks,
        atime: timestamp(stat.atime),
        mtime: timestamp(stat.mtime),
        ctime: timestamp(stat.ctime),
        crtime: timestamp(stat.ctime),
        kind: file_type(stat.mode),
        perm: stat.perm,
        nlink: stat.links,
        uid: stat.uid,
        gid: stat.gid,
        rdev: 0,
        blksize: stat.block_size as u32,
        flags: 0,
    }
}

macro_rules! try_reply {
    ($reply:ident, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => {
                let errno = errno(&err);
                if errno == libc::EIO {
                    error!("{err}");
                } else {
                    debug!("{err}");
                }
                $reply.error(errno);
                return;
            }
        }
    };
}

macro_rules! arg {
    ($reply:ident, $value:expr) => {
        match $value {
            Some(value) => value,
            None => {
                $reply.error(libc::EINVAL);
                return;
            }
        }
    };
}

impl RaidFuse {
    fn create_entry(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        kind: InodeKind,
        mode: u32,
        umask: u32,
    ) -> raid_fs::Result<Stat> {
        let parent = inode_id(parent).ok_or(vfs::Error::NotFound)?;
        let name = name.to_str().ok_or(vfs::Error::InvalidPath)?;
        let perm = (mode & !umask & 0o7777) as u16;
        let owner = Owner {
            uid: req.uid(),
            gid: req.gid(),
        };
        let ino = self.fs.create_at(parent, name, kind, perm, owner)?;

        self.fs.stat_inode(ino)
    }
}

impl Filesystem for RaidFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let parent = arg!(reply, inode_id(parent));
        let name = arg!(reply, name.to_str());
        let stat = try_reply!(reply, self.fs.lookup(parent, name));
        reply.entry(&TTL, &file_attr(&stat), 0);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let ino = arg!(reply, inode_id(ino));
        let stat = try_reply!(reply, self.fs.stat_inode(ino));
        reply.attr(&TTL, &file_attr(&stat));
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let ino = arg!(reply, inode_id(ino));
        if let Some(size) = size {
            try_reply!(reply, self.fs.truncate_inode(ino, size));
        }
        let attr = SetAttr {
            perm: mode.map(|mode| (mode & 0o7777) as u16),
            uid,
            gid,
            atime: atime.map(seconds),
            mtime: mtime.map(seconds),
        };
        let stat = try_reply!(reply, self.fs.set_attr_inode(ino, attr));
        reply.attr(&TTL, &file_attr(&stat));
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let kind = mode & libc::S_IFMT as u32;
        if kind != 0 && kind != libc::S_IFREG as u32 {
            reply.error(libc::EPERM);
            return;
        }
        let stat = try_reply!(
            reply,
            self.create_entry(req, parent, name, InodeKind::Regular, mode, umask)
        );
        reply.entry(&TTL, &file_attr(&stat), 0);
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        let stat = try_reply!(
            reply,
            self.create_entry(req, parent, name, InodeKind::Directory, mode, umask)
        );
        reply.entry(&TTL, &file_attr(&stat), 0);
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let stat = try_reply!(
            reply,
            self.create_entry(req, parent, name, InodeKind::Regular, mode, umask)
        );
        reply.created(&TTL, &file_attr(&stat), 0, 0, 0);
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let parent = arg!(reply, inode_id(parent));
        let name = arg!(reply, name.to_str());
        try_reply!(reply, self.fs.unlink_at(parent, name));
        reply.ok();
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let parent = arg!(reply, inode_id(parent));
        let name = arg!(reply, name.to_str());
        try_reply!(reply, self.fs.rmdir_at(parent, name));
        reply.ok();
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let ino = arg!(reply, inode_id(ino));
        let offset = arg!(reply, u64::try_from(offset).ok());
        let data = try_reply!(reply, self.fs.read_inode(ino, offset, size as usize));
        reply.data(&data);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let ino = arg!(reply, inode_id(ino));
        let offset = arg!(reply, u64::try_from(offset).ok());
        let written = try_reply!(reply, self.fs.write_inode(ino, offset, data));
        reply.written(written as u32);
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let id = arg!(reply, inode_id(ino));
        let entries = try_reply!(reply, self.fs.readdir_inode(id));

        // 父目录编号没有记录在磁盘上，交给内核处理
        let dots = [(ino, FileType::Directory, "."), (ino, FileType::Directory, "..")];
        let children = entries
            .iter()
            .map(|entry| (entry.inode + 1, file_type(entry.ty), entry.name.as_str()));
        for (i, (ino, kind, name)) in dots
            .into_iter()
            .chain(children)
            .enumerate()
            .skip(offset as usize)
        {
            if reply.add(ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let statfs = try_reply!(reply, self.fs.statfs());
        reply.statfs(
            statfs.blocks,
            statfs.free_blocks,
            statfs.free_blocks,
            statfs.inodes,
            statfs.free_inodes,
            statfs.block_size as u32,
            statfs.name_max,
            statfs.block_size as u32,
        );
    }
}
