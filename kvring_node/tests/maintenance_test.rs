use std::collections::HashSet;
use std::time::Duration;

use kvring_node::{Node, NodeConfig, RingServer};

mod common;
use common::{addr, nodes};

fn fast_config() -> NodeConfig {
    NodeConfig {
        stabilize_interval_ms: 50,
        check_predecessor_interval_ms: 50,
        fix_fingers_interval_ms: 50,
        rpc_timeout_ms: 1000,
        ..NodeConfig::default()
    }
}

/// Whether following `successors[0]` from `nodes[0]` visits every node once
/// and comes back.
async fn ring_closed(nodes: &[Node]) -> bool {
    let members: HashSet<&str> = nodes.iter().map(|n| n.addr.as_str()).collect();
    let mut seen = HashSet::new();
    let mut current = nodes[0].addr.clone();
    for _ in 0..nodes.len() {
        let Some(node) = nodes.iter().find(|n| n.addr == current) else {
            return false;
        };
        current = node.successor().await;
        if !members.contains(current.as_str()) || !seen.insert(current.clone()) {
            return false;
        }
    }
    current == nodes[0].addr
}

#[tokio::test]
async fn test_scheduled_maintenance_closes_ring_and_stops_on_quit() {
    let ports = [26000, 26001, 26002, 26003];
    let mut servers = Vec::new();

    let mut first = RingServer::new(Node::new(addr(ports[0]), fast_config()));
    first.listen().await.expect("listen failed");
    servers.push(first);
    for &port in &ports[1..] {
        let mut server = RingServer::new(Node::new(addr(port), fast_config()));
        server.join(&addr(ports[0])).await.expect("join failed");
        servers.push(server);
    }

    let all = nodes(&servers);
    let mut closed = false;
    for _ in 0..100 {
        if ring_closed(&all).await {
            closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(closed, "periodic stabilization never closed the ring");

    for node in &all {
        assert!(node.predecessor().await.is_some(), "{} has no predecessor", node.addr);
        let dump = node.dump().await;
        assert!(!dump.fingers.is_empty(), "{} never fixed a finger", node.addr);
    }

    let mut leaving = servers.remove(2);
    leaving.quit().await.expect("quit failed");
    let node = leaving.node();
    assert!(!node.is_listening());
    assert!(!leaving.is_running());

    let frozen = node.dump().await;
    let cursor = node.state.read().await.next_finger;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(node.dump().await, frozen, "state changed after quit");
    assert_eq!(node.state.read().await.next_finger, cursor, "fix_fingers still ticking");
}
