use kvring_proto::between;
use log::{debug, info, warn};

use crate::constants::FINGER_TABLE_SIZE;
use crate::node::{Node, Peer};

impl Node {
    pub async fn is_alive(&self, addr: &str) -> bool {
        self.ping_rpc(addr).await.is_ok()
    }

    /// Repair the successor list and offer this node to the successor as its
    /// predecessor. Uses the first candidate that answers; a node with no
    /// reachable candidate stays as it is until the next tick.
    pub async fn stabilize(&self) {
        let candidates = self.successors().await;

        for (i, candidate) in candidates.iter().enumerate() {
            if !self.is_alive(candidate).await {
                debug!("{}: successor candidate {} is down", self.addr, candidate);
                continue;
            }

            let mut successor = Peer::new(candidate.clone());
            match self.get_predecessor_rpc(&successor.addr).await {
                Ok(Some(x)) => {
                    let x = Peer::new(x);
                    if between(&self.id, &x.id, &successor.id, false)
                        && self.is_alive(&x.addr).await
                    {
                        successor = x;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("{}: no predecessor from {}: {}", self.addr, successor.addr, e),
            }

            let list = self
                .refreshed_successor_list(&successor, &candidates[i + 1..])
                .await;
            {
                let mut state = self.state.write().await;
                if state.successors.first() != list.first() {
                    info!("{}: successor is now {}", self.addr, successor.addr);
                }
                state.successors = list;
            }

            if let Err(e) = self.notify_rpc(&successor.addr, &self.addr).await {
                debug!("{}: notify {} failed: {}", self.addr, successor.addr, e);
            }
            return;
        }

        warn!(
            "{}: none of {} successor candidates reachable",
            self.addr,
            candidates.len()
        );
    }

    /// `successor` followed by its own successor list. Positions the
    /// successor cannot supply keep the entries that followed it locally.
    async fn refreshed_successor_list(
        &self,
        successor: &Peer,
        stale_tail: &[String],
    ) -> Vec<String> {
        let len = self.config.successor_list_len.max(1);
        if successor.addr == self.addr {
            return vec![self.addr.clone(); len];
        }

        let mut list = vec![successor.addr.clone()];
        for index in 0..len - 1 {
            match self.pass_successor_rpc(&successor.addr, index).await {
                Ok(Some(addr)) => list.push(addr),
                Ok(None) => break,
                Err(e) => {
                    debug!(
                        "{}: pass successor from {} failed: {}",
                        self.addr, successor.addr, e
                    );
                    break;
                }
            }
        }
        for addr in stale_tail {
            if list.len() >= len {
                break;
            }
            list.push(addr.clone());
        }
        while list.len() < len {
            list.push(self.addr.clone());
        }
        list
    }

    /// Forget the predecessor if it no longer answers.
    pub async fn check_predecessor(&self) {
        let Some(predecessor) = self.predecessor().await else {
            return;
        };
        if self.is_alive(&predecessor).await {
            return;
        }

        let mut state = self.state.write().await;
        if state.predecessor.as_deref() == Some(predecessor.as_str()) {
            info!("{}: predecessor {} is down", self.addr, predecessor);
            state.predecessor = None;
        }
    }

    /// Refresh one finger per call, cycling through the whole table.
    pub async fn fix_fingers(&self) {
        let index = {
            let mut state = self.state.write().await;
            let index = state.next_finger;
            state.next_finger = (index + 1) % FINGER_TABLE_SIZE;
            index
        };

        let start = self.id.add_power_of_two(index);
        match self.find_successor(&start).await {
            Ok(addr) => {
                let mut state = self.state.write().await;
                state.fingers[index] = Some(addr);
            }
            Err(e) => debug!("{}: finger {} not refreshed: {}", self.addr, index + 1, e),
        }
    }
}
