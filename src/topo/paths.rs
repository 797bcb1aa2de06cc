//! 最短路径路由表
//!
//! 对每个目的节点在反向图上做 BFS，得到到目的节点的最短跳数；再按距离
//! 从近到远统计每个节点到目的节点的最短路径条数。节点 `v` 的出链路
//! `v -> w` 若满足 `dist[w] == dist[v] - 1`，就作为一条路由，权重为 `w`
//! 出发的最短路径条数。并行链路各自计数。

use std::collections::VecDeque;

use crate::net::{LinkId, NodeId};

/// 一条路由表项：在 `node` 上，去往 `dest` 的包可以走 `link`，共 `paths` 条最短路径。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub node: NodeId,
    pub dest: NodeId,
    pub link: LinkId,
    pub paths: u32,
}

/// `adj[v]` 为 `v` 的所有出链路 (链路, 对端)。
pub fn shortest_path_routes(node_count: usize, adj: &[Vec<(LinkId, NodeId)>]) -> Vec<RouteEntry> {
    let mut rev_adj: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    for (from, outs) in adj.iter().enumerate().take(node_count) {
        for &(_, to) in outs {
            if to.0 < node_count {
                rev_adj[to.0].push(NodeId(from));
            }
        }
    }

    let mut routes = Vec::new();
    let mut dist: Vec<u32> = vec![u32::MAX; node_count];
    let mut paths: Vec<u32> = vec![0; node_count];
    let mut order: Vec<NodeId> = Vec::with_capacity(node_count);
    let mut q: VecDeque<NodeId> = VecDeque::new();

    for dst_idx in 0..node_count {
        dist.fill(u32::MAX);
        paths.fill(0);
        order.clear();
        q.clear();

        dist[dst_idx] = 0;
        paths[dst_idx] = 1;
        q.push_back(NodeId(dst_idx));

        while let Some(v) = q.pop_front() {
            order.push(v);
            let dv = dist[v.0];
            for &pred in &rev_adj[v.0] {
                if dist[pred.0] == u32::MAX {
                    dist[pred.0] = dv + 1;
                    q.push_back(pred);
                }
            }
        }

        // BFS 顺序即距离非降序，前驱节点的路径数总在它之前算好
        for &v in order.iter().skip(1) {
            let dv = dist[v.0];
            let mut total = 0u32;
            for &(link, nh) in &adj[v.0] {
                if nh.0 < node_count && dist[nh.0] != u32::MAX && dist[nh.0] + 1 == dv {
                    total = total.saturating_add(paths[nh.0]);
                    routes.push(RouteEntry {
                        node: v,
                        dest: NodeId(dst_idx),
                        link,
                        paths: paths[nh.0],
                    });
                }
            }
            paths[v.0] = total;
        }
    }

    routes
}
