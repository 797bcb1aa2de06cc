//! 尾丢弃 FIFO
//!
//! 不变式：`sum(sizes) == occupancy <= capacity`。入队会超出容量时直接拒绝，
//! 由调用方负责记录丢包。

use std::collections::VecDeque;

use crate::error::SimError;
use crate::net::Packet;
use crate::sim::Size;

#[derive(Debug)]
pub struct PacketQueue {
    capacity: Size,
    occupancy: Size,
    q: VecDeque<Packet>,
}

impl PacketQueue {
    pub fn new(capacity: Size) -> Self {
        Self {
            capacity,
            occupancy: Size::ZERO,
            q: VecDeque::new(),
        }
    }

    /// 入队：成功返回 Ok；若超出容量则返回 Err(pkt)
    pub fn push(&mut self, pkt: Packet) -> Result<(), Packet> {
        let next = self.occupancy.bytes().checked_add(pkt.size.bytes());
        match next {
            Some(total) if total <= self.capacity.bytes() => {
                self.occupancy = Size(total);
                self.q.push_back(pkt);
                Ok(())
            }
            _ => Err(pkt),
        }
    }

    pub fn front(&self) -> Result<&Packet, SimError> {
        self.q.front().ok_or(SimError::EmptyQueue)
    }

    pub fn pop(&mut self) -> Result<Packet, SimError> {
        let pkt = self.q.pop_front().ok_or(SimError::EmptyQueue)?;
        self.occupancy = self.occupancy.saturating_sub(pkt.size);
        Ok(pkt)
    }

    /// 清空队列，返回被丢弃的包数
    pub fn clear(&mut self) -> usize {
        let n = self.q.len();
        self.q.clear();
        self.occupancy = Size::ZERO;
        n
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn occupancy(&self) -> Size {
        self.occupancy
    }

    pub fn capacity(&self) -> Size {
        self.capacity
    }

    /// 占用率 occupancy / capacity；零容量队列视为已满。
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity.is_zero() {
            return 1.0;
        }
        self.occupancy.bytes() as f64 / self.capacity.bytes() as f64
    }
}
