//! 循环游标
//!
//! 在有序键集合上做 round-robin。游标只记住上一次服务的键，每次都从当前
//! 键集合重新推导位置，因此中途增删元素不会让游标失效，也不会跳过或
//! 重复服务游标处的相邻元素。

use std::collections::BTreeSet;
use std::ops::Bound;

#[derive(Debug, Clone)]
pub struct LoopCursor<K> {
    last: Option<K>,
}

impl<K> Default for LoopCursor<K> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<K: Ord + Copy> LoopCursor<K> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// 下一个要服务的键（不移动游标）。
    pub fn next_in(&self, keys: &BTreeSet<K>) -> Option<K> {
        match self.last {
            Some(last) => keys
                .range((Bound::Excluded(last), Bound::Unbounded))
                .next()
                .or_else(|| keys.iter().next())
                .copied(),
            None => keys.iter().next().copied(),
        }
    }

    /// 取下一个键并移动游标。
    pub fn advance(&mut self, keys: &BTreeSet<K>) -> Option<K> {
        let next = self.next_in(keys)?;
        self.last = Some(next);
        Some(next)
    }

    /// 从游标之后开始的一整圈顺序。
    pub fn rotation<'a, I>(&self, keys: I) -> Vec<K>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let all: Vec<K> = keys.into_iter().copied().collect();
        match self.last {
            Some(last) => {
                let split = all.partition_point(|k| *k <= last);
                all[split..].iter().chain(&all[..split]).copied().collect()
            }
            None => all,
        }
    }

    pub fn commit(&mut self, key: K) {
        self.last = Some(key);
    }

    pub fn last(&self) -> Option<K> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
