//! 包标志位
//!
//! 包头里有一个 64 位的扩展字段，按名字划分成若干位段，用来标记包类型
//! （DATA/ACK）并在收发端之间捎带少量标量（例如平均 RTT），而不必修改
//! `Packet` 的结构。位段布局由 `FlagManager` 统一登记。

use crate::error::SimError;
use std::collections::HashMap;

const WORD_BITS: u32 = u64::BITS;

fn mask(len: u32) -> u64 {
    if len >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// 64 位标志字；记录哪些位被写过，未写过的位段读出为 `None`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PacketFlags {
    bits: u64,
    written: u64,
}

impl PacketFlags {
    pub fn raw(&self) -> u64 {
        self.bits
    }

    fn set_range(&mut self, start: u32, len: u32, value: u64) {
        let m = mask(len) << start;
        self.bits = (self.bits & !m) | ((value << start) & m);
        self.written |= m;
    }

    fn get_range(&self, start: u32, len: u32) -> Option<u64> {
        let m = mask(len) << start;
        if self.written & m != m {
            return None;
        }
        Some((self.bits & m) >> start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlagField {
    start: u32,
    len: u32,
}

/// 位段登记表：名字 -> (起始位, 长度)，按登记顺序紧凑排列。
#[derive(Debug, Default)]
pub struct FlagManager {
    next_pos: u32,
    fields: HashMap<String, FlagField>,
}

impl FlagManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个需要区分 `values_count` 种取值的位段。
    pub fn register_by_amount(&mut self, name: &str, values_count: u64) -> Result<(), SimError> {
        if values_count <= 1 {
            return Err(SimError::invalid(
                "values_count",
                format!("flag `{name}` needs at least two values, got {values_count}"),
            ));
        }
        let len = WORD_BITS - (values_count - 1).leading_zeros();
        self.register_by_length(name, len)
    }

    /// 登记一个固定位宽的位段。
    pub fn register_by_length(&mut self, name: &str, len: u32) -> Result<(), SimError> {
        if len == 0 {
            return Err(SimError::invalid("len", format!("flag `{name}` has zero width")));
        }
        if self.fields.contains_key(name) {
            return Err(SimError::DuplicateFlag(name.to_string()));
        }
        let available = WORD_BITS - self.next_pos;
        if len > available {
            return Err(SimError::FlagOverflow {
                name: name.to_string(),
                needed: len,
                available,
            });
        }
        self.fields.insert(
            name.to_string(),
            FlagField {
                start: self.next_pos,
                len,
            },
        );
        self.next_pos += len;
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// 剩余未登记的位数
    pub fn free_bits(&self) -> u32 {
        WORD_BITS - self.next_pos
    }

    fn field(&self, name: &str) -> Result<FlagField, SimError> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| SimError::FlagNotRegistered(name.to_string()))
    }

    pub fn set(&self, flags: &mut PacketFlags, name: &str, value: u64) -> Result<(), SimError> {
        let field = self.field(name)?;
        if value > mask(field.len) {
            return Err(SimError::FlagValueTooLarge {
                name: name.to_string(),
                value,
            });
        }
        flags.set_range(field.start, field.len, value);
        Ok(())
    }

    /// 读取位段；从未写过时返回 `Ok(None)`。
    pub fn get(&self, flags: &PacketFlags, name: &str) -> Result<Option<u64>, SimError> {
        let field = self.field(name)?;
        Ok(flags.get_range(field.start, field.len))
    }
}
