use std::io;
use std::sync::Arc;

use block_dev::BlockDevice;
use raid_fs::layout::RaidMode;
use raid_fs::{Owner, RaidFileSystem};
use tempfile::TempDir;

use crate::fuse::file_attr;
use crate::{errno, BlockFile};

const IMAGE_SIZE: u64 = 256 * 512;

fn images(dir: &TempDir, count: usize) -> Vec<Arc<dyn BlockDevice>> {
    (0..count)
        .map(|i| {
            let disk = BlockFile::create(dir.path().join(format!("disk{i}.img")), IMAGE_SIZE)
                .unwrap();
            Arc::new(disk) as Arc<dyn BlockDevice>
        })
        .collect()
}

#[test]
fn block_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.img");
    let disk = BlockFile::create(&path, 4 * 512).unwrap();
    assert_eq!(disk.num_blocks(), 4);

    disk.write_block(3, &[0xAB; 512]).unwrap();
    let mut buf = [0; 512];
    disk.read_block(3, &mut buf).unwrap();
    assert_eq!(buf, [0xAB; 512]);
    disk.read_block(0, &mut buf).unwrap();
    assert_eq!(buf, [0; 512]);

    let err = disk.read_block(4, &mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

    // 已有的镜像不会被截断
    drop(disk);
    let disk = BlockFile::create(&path, 512).unwrap();
    assert_eq!(disk.num_blocks(), 4);
    disk.read_block(3, &mut buf).unwrap();
    assert_eq!(buf, [0xAB; 512]);
}

#[test]
fn format_and_mount_images() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = RaidFileSystem::format(
        images(&dir, 3),
        RaidMode::Verified,
        32,
        32,
        Owner::default(),
    )
    .unwrap();
    fs.mkdir("/docs", 0o755, Owner::default()).unwrap();
    fs.mknod("/docs/readme", 0o644, Owner::default()).unwrap();
    fs.write("/docs/readme", 0, b"raid on files").unwrap();
    drop(fs);

    let paths: Vec<_> = (0..3)
        .rev()
        .map(|i| dir.path().join(format!("disk{i}.img")))
        .collect();
    let devices = paths
        .iter()
        .map(|path| Arc::new(BlockFile::open(path).unwrap()) as Arc<dyn BlockDevice>)
        .collect();
    let fs = RaidFileSystem::open(devices).unwrap();
    assert_eq!(fs.read("/docs/readme", 0, 100).unwrap(), b"raid on files");
}

#[test]
fn errno_mapping() {
    assert_eq!(errno(&vfs::Error::NotFound), libc::ENOENT);
    assert_eq!(errno(&vfs::Error::AlreadyExists), libc::EEXIST);
    assert_eq!(errno(&vfs::Error::NoSpace), libc::ENOSPC);
    assert_eq!(errno(&vfs::Error::DirectoryNotEmpty), libc::ENOTEMPTY);
    assert_eq!(errno(&vfs::Error::NameTooLong), libc::ENAMETOOLONG);
    assert_eq!(
        errno(&vfs::Error::Io(io::Error::other("broken disk"))),
        libc::EIO
    );
}

#[test]
fn fuse_inode_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs =
        RaidFileSystem::format(images(&dir, 2), RaidMode::Striped, 32, 32, Owner::default())
            .unwrap();
    fs.mknod("/f", 0o600, Owner { uid: 7, gid: 8 }).unwrap();

    let root = file_attr(&fs.getattr("/").unwrap());
    assert_eq!(root.ino, fuser::FUSE_ROOT_ID);
    assert_eq!(root.kind, fuser::FileType::Directory);

    let file = file_attr(&fs.getattr("/f").unwrap());
    assert_eq!(file.ino, 2);
    assert_eq!(file.kind, fuser::FileType::RegularFile);
    assert_eq!(file.perm, 0o600);
    assert_eq!((file.uid, file.gid), (7, 8));
}
