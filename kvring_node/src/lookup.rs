use kvring_proto::{between, Identifier};
use log::debug;

use crate::error::{ChordError, Result};
use crate::node::{Node, Peer};

impl Node {
    /// Address of the node responsible for `id`.
    ///
    /// Answers directly when `id` falls between this node and its first live
    /// successor, otherwise forwards to the closest live preceding node,
    /// falling back to farther candidates when a forward fails.
    pub async fn find_successor(&self, id: &Identifier) -> Result<String> {
        if *id == self.id {
            return Ok(self.addr.clone());
        }

        if let Some(successor) = self.first_live_successor().await {
            if between(&self.id, id, &successor.id, true) {
                return Ok(successor.addr);
            }
        }

        for candidate in self.preceding_candidates(id).await {
            if !self.is_alive(&candidate.addr).await {
                debug!("{}: skipping dead candidate {}", self.addr, candidate.addr);
                continue;
            }
            match self.find_successor_rpc(&candidate.addr, id).await {
                Ok(addr) => return Ok(addr),
                Err(e) => debug!(
                    "{}: forwarding lookup of {} to {} failed: {}",
                    self.addr, id, candidate.addr, e
                ),
            }
        }

        Err(ChordError::SuccessorNotFound(id.clone()))
    }

    /// First successor-list entry that answers a ping. This node always counts
    /// as alive.
    pub(crate) async fn first_live_successor(&self) -> Option<Peer> {
        for addr in self.successors().await {
            if self.is_alive(&addr).await {
                return Some(Peer::new(addr));
            }
        }
        None
    }

    /// Nodes strictly between this node and `id`, closest to `id` first:
    /// fingers from the longest reach down, then the successor list.
    async fn preceding_candidates(&self, id: &Identifier) -> Vec<Peer> {
        let state = self.state.read().await;
        let fingers = state.fingers.iter().rev().flatten();
        let successors = state.successors.iter().rev();

        let mut candidates: Vec<Peer> = Vec::new();
        for addr in fingers.chain(successors) {
            if candidates.iter().any(|c| &c.addr == addr) {
                continue;
            }
            let peer = Peer::new(addr.clone());
            if between(&self.id, &peer.id, id, false) {
                candidates.push(peer);
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;

    #[tokio::test]
    async fn test_single_node_owns_everything() {
        let node = Node::new("127.0.0.1:4100", NodeConfig::default());
        for key in ["a", "b", "alpha", ""] {
            let owner = node.find_successor(&kvring_proto::hash(key)).await.unwrap();
            assert_eq!(owner, node.addr);
        }
        assert_eq!(node.find_successor(&node.id).await.unwrap(), node.addr);
    }

    #[tokio::test]
    async fn test_candidates_exclude_self_and_overshoot() {
        let node = Node::new("127.0.0.1:4100", NodeConfig::default());
        let peers: Vec<Peer> = (4101..4110)
            .map(|p| Peer::new(format!("127.0.0.1:{p}")))
            .collect();
        {
            let mut state = node.state.write().await;
            for (i, peer) in peers.iter().enumerate() {
                state.fingers[i * 10] = Some(peer.addr.clone());
            }
            state.fingers[150] = Some(node.addr.clone());
        }

        let target = node.id.add_power_of_two(159);
        let candidates = node.preceding_candidates(&target).await;
        assert!(candidates.iter().all(|c| c.addr != node.addr));
        for c in &candidates {
            assert!(between(&node.id, &c.id, &target, false));
        }
        let expected = peers
            .iter()
            .filter(|p| between(&node.id, &p.id, &target, false))
            .count();
        assert_eq!(candidates.len(), expected);
    }
}
