use binrw::binrw;

use crate::layout::InodeId;

/// 文件名最大长度，包括结尾的 NUL
pub const NAME_LENGTH_LIMIT: usize = 28;

/// 目录项
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: [u8; NAME_LENGTH_LIMIT],
    inode: u32,
}

impl DirEntry {
    /// 名称最多 27 字节，不能为空，不能含有`/`或 NUL
    pub fn new(name: &str, inode: InodeId) -> vfs::Result<Self> {
        check_name(name)?;

        let mut bytes = [0; NAME_LENGTH_LIMIT];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            name: bytes,
            inode: inode.0,
        })
    }

    /// 截至第一个 NUL 的名称字节
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LENGTH_LIMIT);
        &self.name[..len]
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    #[inline]
    pub fn inode(&self) -> InodeId {
        InodeId(self.inode)
    }
}

pub fn check_name(name: &str) -> vfs::Result<()> {
    if name.is_empty() || name.bytes().any(|b| b == b'/' || b == 0) {
        return Err(vfs::Error::InvalidPath);
    }
    if name.len() >= NAME_LENGTH_LIMIT {
        return Err(vfs::Error::NameTooLong);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Record;

    #[test]
    fn name_limits() {
        let longest = "a".repeat(27);
        let entry = DirEntry::new(&longest, InodeId(9)).unwrap();
        assert_eq!(entry.name(), longest);
        assert_eq!(entry.inode(), InodeId(9));

        assert!(matches!(
            DirEntry::new(&"a".repeat(28), InodeId(1)),
            Err(vfs::Error::NameTooLong)
        ));
        assert!(matches!(DirEntry::new("", InodeId(1)), Err(vfs::Error::InvalidPath)));
        assert!(matches!(DirEntry::new("a/b", InodeId(1)), Err(vfs::Error::InvalidPath)));
    }

    #[test]
    fn layout() {
        let bytes = DirEntry::new("hello", InodeId(0x0102)).unwrap().encode();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..6], b"hello\0");
        assert_eq!(&bytes[28..], &[0x02, 0x01, 0, 0]);
    }
}
