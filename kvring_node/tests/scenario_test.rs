use kvring_proto::hash;

mod common;
use common::{expected_owner, nodes, start_ring};

#[tokio::test]
async fn test_three_nodes_agree_on_alpha() {
    let servers = start_ring(&[25000, 25001, 25002]).await;
    let nodes = nodes(&servers);
    for node in &nodes {
        println!("Node {} ({})", node.id, node.addr);
    }

    let owner = nodes[1].put("alpha", "1").await.expect("put failed");
    assert_eq!(owner, expected_owner(&nodes, &hash("alpha")));

    for node in &nodes {
        let value = node.get("alpha").await.expect("get failed");
        assert_eq!(value.as_deref(), Some("1"), "get from {}", node.addr);
    }

    let dump = servers
        .iter()
        .find(|s| s.node().addr == owner)
        .unwrap()
        .dump()
        .await;
    assert_eq!(dump.store.get("alpha").map(String::as_str), Some("1"));
    assert_eq!(dump.address, owner);
}
