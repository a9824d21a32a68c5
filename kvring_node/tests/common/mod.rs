#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use kvring_node::constants::LOCALHOST;
use kvring_node::{Node, NodeConfig, RingServer};
use kvring_proto::Identifier;

pub fn addr(port: u16) -> String {
    format!("{}:{}", LOCALHOST, port)
}

pub fn test_config() -> NodeConfig {
    NodeConfig {
        rpc_timeout_ms: 1000,
        ..NodeConfig::default()
    }
}

/// Start a node that founds its own ring.
pub async fn start_node(port: u16) -> RingServer {
    let mut server = RingServer::new(Node::new(addr(port), test_config()));
    server.listen().await.expect("listen failed");
    tokio::time::sleep(Duration::from_millis(50)).await;
    server
}

/// Start a node and join it to the ring `bootstrap` belongs to.
pub async fn join_node(port: u16, bootstrap: &str) -> RingServer {
    let mut server = RingServer::new(Node::new(addr(port), test_config()));
    server
        .join(bootstrap)
        .await
        .unwrap_or_else(|e| panic!("{} failed to join via {}: {}", addr(port), bootstrap, e));
    server
}

/// Bring up one node per port; the first creates the ring and the rest join
/// through it, with a few stabilization rounds after each join.
pub async fn start_ring(ports: &[u16]) -> Vec<RingServer> {
    let mut servers = vec![start_node(ports[0]).await];
    let bootstrap = addr(ports[0]);
    for &port in &ports[1..] {
        servers.push(join_node(port, &bootstrap).await);
        stabilize_ring(&nodes(&servers), 3).await;
    }
    stabilize_ring(&nodes(&servers), 10).await;
    servers
}

pub fn nodes(servers: &[RingServer]) -> Vec<Node> {
    servers.iter().map(|s| s.node().clone()).collect()
}

pub async fn stabilize_ring(nodes: &[Node], rounds: usize) {
    for _ in 0..rounds {
        for node in nodes {
            node.check_predecessor().await;
            node.stabilize().await;
            node.fix_fingers().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Follow `successors[0]` from `nodes[0]` for `nodes.len()` hops.
pub async fn walk_ring(nodes: &[Node]) -> Vec<String> {
    let by_addr: HashMap<&str, &Node> = nodes.iter().map(|n| (n.addr.as_str(), n)).collect();
    let mut visited = Vec::new();
    let mut current = nodes[0].clone();
    for _ in 0..nodes.len() {
        let next = current.successor().await;
        visited.push(next.clone());
        match by_addr.get(next.as_str()) {
            Some(node) => current = (*node).clone(),
            None => panic!("{} points at unknown node {}", current.addr, next),
        }
    }
    visited
}

/// The node whose `(predecessor, id]` range contains `key_id`.
pub fn expected_owner(nodes: &[Node], key_id: &Identifier) -> String {
    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
        .iter()
        .find(|n| n.id >= *key_id)
        .unwrap_or(&sorted[0])
        .addr
        .clone()
}

pub async fn total_keys(nodes: &[Node]) -> usize {
    let mut total = 0;
    for node in nodes {
        total += node.key_count().await;
    }
    total
}
