//! # 路径解析层

use crate::layout::InodeId;
use crate::{RaidFileSystem, Result};

/// 按`/`切分路径，忽略空的分量
pub fn components(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

impl RaidFileSystem {
    /// 从根目录出发逐级查找，忽略路径最后的`drop`个分量
    pub(crate) fn resolve(&self, path: &str, drop: usize) -> Result<InodeId> {
        let names = components(path);
        let keep = names
            .len()
            .checked_sub(drop)
            .ok_or(vfs::Error::InvalidPath)?;

        self.walk(&names[..keep])
    }

    /// 返回父目录的 inode 与最后一个分量
    pub(crate) fn resolve_parent(&self, path: &str) -> Result<(InodeId, String)> {
        let mut names = components(path);
        let name = names.pop().ok_or(vfs::Error::InvalidPath)?;

        Ok((self.walk(&names)?, name))
    }

    fn walk(&self, names: &[String]) -> Result<InodeId> {
        let mut ino = InodeId::ROOT;
        for name in names {
            let dir = self.load_inode(ino)?;
            if !dir.is_dir() {
                return Err(vfs::Error::NotADirectory);
            }
            ino = self
                .find_child(&dir, name)?
                .ok_or(vfs::Error::NotFound)?;
        }

        Ok(ino)
    }
}

#[cfg(test)]
mod tests {
    use super::components;

    #[test]
    fn split() {
        assert_eq!(components("/a/b/c"), ["a", "b", "c"]);
        assert_eq!(components("a//b/"), ["a", "b"]);
        assert!(components("/").is_empty());
        assert!(components("").is_empty());
    }
}
