//! 路由模块（含加权多路径）
//!
//! 每台设备内嵌一个路由模块：
//! - 目的节点 -> {出链路: 路径条数} 的路由表，由拓扑层的 BFS 预先填好；
//! - 一组入链路，按 round-robin 轮流服务；
//! - 一个包哈希器，用来在多条出链路之间按权重选路。

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::hasher::{EcmpHasher, PacketHasher};
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::loop_cursor::LoopCursor;
use super::packet::Packet;
use crate::error::SimError;
use crate::sim::SimTime;
use tracing::{trace, warn};

#[derive(Debug)]
pub struct RoutingModule {
    id: NodeId,
    inlinks: BTreeSet<LinkId>,
    next_inlink: LoopCursor<LinkId>,
    outlinks: BTreeSet<LinkId>,
    /// dest -> (link -> paths_count)
    table: HashMap<NodeId, BTreeMap<LinkId, u32>>,
    hasher: Box<dyn PacketHasher>,
}

impl RoutingModule {
    pub fn new(id: NodeId) -> Self {
        Self::with_hasher(id, Box::new(EcmpHasher))
    }

    pub fn with_hasher(id: NodeId, hasher: Box<dyn PacketHasher>) -> Self {
        Self {
            id,
            inlinks: BTreeSet::new(),
            next_inlink: LoopCursor::new(),
            outlinks: BTreeSet::new(),
            table: HashMap::new(),
            hasher,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn set_hasher(&mut self, hasher: Box<dyn PacketHasher>) {
        self.hasher = hasher;
    }

    /// 登记入链路；重复登记只告警并返回 false。
    pub fn add_inlink(&mut self, link: &Link) -> Result<bool, SimError> {
        if link.to != self.id {
            return Err(SimError::InvalidLinkEndpoint {
                link: link.id,
                node: self.id,
            });
        }
        if !self.inlinks.insert(link.id) {
            warn!(link = ?link.id, device = ?self.id, "入链路已登记过");
            return Ok(false);
        }
        Ok(true)
    }

    pub fn add_outlink(&mut self, link: &Link) -> Result<bool, SimError> {
        if link.from != self.id {
            return Err(SimError::InvalidLinkEndpoint {
                link: link.id,
                node: self.id,
            });
        }
        if !self.outlinks.insert(link.id) {
            warn!(link = ?link.id, device = ?self.id, "出链路已登记过");
            return Ok(false);
        }
        Ok(true)
    }

    /// 为 `dest` 增加经由 `link` 的 `paths_count` 条路径（累加）。
    pub fn update_routing_table(
        &mut self,
        dest: NodeId,
        link: &Link,
        paths_count: u32,
    ) -> Result<(), SimError> {
        if link.from != self.id {
            return Err(SimError::InvalidLinkEndpoint {
                link: link.id,
                node: self.id,
            });
        }
        let weight = self.table.entry(dest).or_default().entry(link.id).or_insert(0);
        *weight = weight.saturating_add(paths_count);
        Ok(())
    }

    pub fn routes_to(&self, dest: NodeId) -> Option<&BTreeMap<LinkId, u32>> {
        self.table.get(&dest)
    }

    /// 按哈希在加权出链路中选路；返回 (链路, 哈希值)。无路由返回 None。
    pub fn get_link_to_destination(&mut self, pkt: &Packet, now: SimTime) -> Option<(LinkId, u32)> {
        let links = self.table.get(&pkt.dst)?;
        let total: u64 = links.values().map(|w| *w as u64).sum();
        if total == 0 {
            return None;
        }
        let hash = self.hasher.hash(pkt, now);
        let point = hash as u64 % total;

        let mut cumulative = 0u64;
        for (link, weight) in links {
            cumulative += *weight as u64;
            if point < cumulative {
                trace!(device = ?self.id, dst = ?pkt.dst, link = ?link, hash, "选路");
                return Some((*link, hash));
            }
        }
        None
    }

    /// round-robin 取下一个入链路
    pub fn next_inlink(&mut self) -> Option<LinkId> {
        self.next_inlink.advance(&self.inlinks)
    }

    pub fn inlinks(&self) -> &BTreeSet<LinkId> {
        &self.inlinks
    }

    pub fn outlinks(&self) -> &BTreeSet<LinkId> {
        &self.outlinks
    }

    /// 链路被删除：从入/出链路集合与路由表中抹掉。
    pub fn forget_link(&mut self, link: LinkId) {
        self.inlinks.remove(&link);
        self.outlinks.remove(&link);
        self.table.retain(|_, links| {
            links.remove(&link);
            !links.is_empty()
        });
    }

    /// 目的节点被删除
    pub fn forget_destination(&mut self, dest: NodeId) {
        self.table.remove(&dest);
    }

    pub fn clear_table(&mut self) {
        self.table.clear();
    }
}
