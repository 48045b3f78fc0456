use bitvec::prelude::*;

/// 磁盘上的分配位图，字节内低位在前
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: BitVec<u8, Lsb0>,
}

impl Bitmap {
    /// 全部清零、含`len`位的位图
    pub fn new(len: usize) -> Self {
        Self {
            bits: bitvec![u8, Lsb0; 0; len],
        }
    }

    /// 从磁盘字节构造，多余的位被截掉
    pub fn from_bytes(bytes: &[u8], len: usize) -> Self {
        let mut bits = BitVec::<u8, Lsb0>::from_slice(bytes);
        bits.resize(len, false);
        Self { bits }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn find_first_clear(&self) -> Option<usize> {
        self.bits.first_zero()
    }

    /// 在前`limit`位中查找第一个空闲位
    pub fn find_first_clear_below(&self, limit: usize) -> Option<usize> {
        let limit = limit.min(self.len());
        self.bits[..limit].first_zero()
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.bits.get(index).is_some_and(|bit| *bit)
    }

    /// 越界时什么也不做
    pub fn set(&mut self, index: usize) {
        if index < self.len() {
            self.bits.set(index, true);
        }
    }

    /// 越界时什么也不做
    pub fn clear(&mut self, index: usize) {
        if index < self.len() {
            self.bits.set(index, false);
        }
    }

    pub fn count_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// 含第`index`位的那个字节
    pub fn byte(&self, index: usize) -> u8 {
        self.bits.as_raw_slice()[index / 8]
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.as_raw_slice().to_vec()
    }

    /// 分配前`limit`位中第一个空闲位
    pub fn alloc(&mut self, limit: usize) -> Option<usize> {
        let index = self.find_first_clear_below(limit)?;
        self.set(index);
        Some(index)
    }
}
