//! 已确认序号的记录
//!
//! 用高水位 + 稀疏集合表示：`< first_unconfirmed` 的序号全部已确认，
//! 之上零散确认的序号放在 `above` 中。序号一旦确认就不会被撤销。

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct PacketNumMonitor {
    first_unconfirmed: u64,
    above: BTreeSet<u64>,
}

impl PacketNumMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn compact(&mut self) {
        while self.above.remove(&self.first_unconfirmed) {
            self.first_unconfirmed += 1;
        }
    }

    /// 确认单个序号；返回是否为新确认。
    pub fn confirm_one(&mut self, num: u64) -> bool {
        if self.is_confirmed(num) {
            return false;
        }
        self.above.insert(num);
        self.compact();
        true
    }

    /// 确认所有 `< end` 的序号；返回新确认的个数。
    pub fn confirm_to(&mut self, end: u64) -> u64 {
        if end <= self.first_unconfirmed {
            return 0;
        }
        let sparse = self.above.range(..end).count() as u64;
        let newly = end - self.first_unconfirmed - sparse;
        self.above = self.above.split_off(&end);
        self.first_unconfirmed = end;
        self.compact();
        newly
    }

    pub fn is_confirmed(&self, num: u64) -> bool {
        num < self.first_unconfirmed || self.above.contains(&num)
    }

    /// 最小的未确认序号（即连续前缀的长度）
    pub fn first_unconfirmed(&self) -> u64 {
        self.first_unconfirmed
    }

    /// 最大的已确认序号
    pub fn last_confirmed(&self) -> Option<u64> {
        self.above
            .iter()
            .next_back()
            .copied()
            .or_else(|| self.first_unconfirmed.checked_sub(1))
    }

    pub fn confirmed_count(&self) -> u64 {
        self.first_unconfirmed + self.above.len() as u64
    }
}
