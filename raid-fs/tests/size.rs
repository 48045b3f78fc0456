use raid_fs::layout::{BlockPtr, DirEntry, DiskInode, IndirectBlock, Record, SuperBlock};
use raid_fs::{BLOCK_SIZE, DIR_ENTRY_SIZE, MAX_FILE_SIZE};

#[test]
fn layout() {
    assert_eq!(64, SuperBlock::SIZE);
    assert_eq!(116, DiskInode::SIZE);
    assert_eq!(32, DirEntry::SIZE);
    assert_eq!(512, IndirectBlock::SIZE);
    assert_eq!(8, BlockPtr::SIZE);
    assert!(DiskInode::SIZE <= BLOCK_SIZE);
    assert_eq!(DIR_ENTRY_SIZE, DirEntry::SIZE);
    assert_eq!(36352, MAX_FILE_SIZE);
}
