//! TCP 包在标志字中的布局
//!
//! - `type`：DATA / ACK / 累计 ACK
//! - `ack_ttl`：ACK 回显对应数据包到达时的 TTL
//! - `avg_rtt`：发送端的平均 RTT（f32 位模式，纳秒），接收端原样回显

use std::sync::LazyLock;

use crate::error::SimError;
use crate::net::{FlagManager, Packet, PacketFlags};
use crate::sim::SimTime;
use tracing::error;

pub const TYPE: &str = "type";
pub const ACK_TTL: &str = "ack_ttl";
pub const AVG_RTT: &str = "avg_rtt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Data,
    Ack,
    CollectiveAck,
}

impl PacketType {
    const COUNT: u64 = 3;

    fn code(self) -> u64 {
        match self {
            PacketType::Data => 0,
            PacketType::Ack => 1,
            PacketType::CollectiveAck => 2,
        }
    }

    fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(PacketType::Data),
            1 => Some(PacketType::Ack),
            2 => Some(PacketType::CollectiveAck),
            _ => None,
        }
    }

    pub fn is_ack(self) -> bool {
        matches!(self, PacketType::Ack | PacketType::CollectiveAck)
    }
}

fn register_layout() -> Result<FlagManager, SimError> {
    let mut m = FlagManager::new();
    m.register_by_amount(TYPE, PacketType::COUNT)?;
    m.register_by_amount(ACK_TTL, Packet::MAX_TTL as u64 + 1)?;
    m.register_by_length(AVG_RTT, u32::BITS)?;
    Ok(m)
}

static LAYOUT: LazyLock<FlagManager> = LazyLock::new(|| {
    register_layout().unwrap_or_else(|err| {
        error!(%err, "TCP 标志布局登记失败");
        FlagManager::new()
    })
});

pub fn set_type(flags: &mut PacketFlags, ty: PacketType) -> Result<(), SimError> {
    LAYOUT.set(flags, TYPE, ty.code())
}

pub fn packet_type(flags: &PacketFlags) -> Option<PacketType> {
    LAYOUT
        .get(flags, TYPE)
        .ok()
        .flatten()
        .and_then(PacketType::from_code)
}

pub fn set_ack_ttl(flags: &mut PacketFlags, ttl: u8) -> Result<(), SimError> {
    LAYOUT.set(flags, ACK_TTL, ttl as u64)
}

pub fn ack_ttl(flags: &PacketFlags) -> Option<u8> {
    LAYOUT.get(flags, ACK_TTL).ok().flatten().map(|v| v as u8)
}

pub fn set_avg_rtt(flags: &mut PacketFlags, rtt: SimTime) -> Result<(), SimError> {
    let bits = (rtt.as_nanos_f64() as f32).to_bits();
    LAYOUT.set(flags, AVG_RTT, bits as u64)
}

pub fn avg_rtt(flags: &PacketFlags) -> Option<SimTime> {
    let bits = LAYOUT.get(flags, AVG_RTT).ok().flatten()?;
    let ns = f32::from_bits(bits as u32);
    Some(SimTime::from_nanos_f64(ns as f64))
}
