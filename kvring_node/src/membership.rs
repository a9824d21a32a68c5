use kvring_proto::hash;
use log::{debug, info, warn};

use crate::error::{ChordError, Result};
use crate::node::{leaves_for_joiner, Node, Peer};
use crate::rpc::put_with;

impl Node {
    /// Start a new ring with this node as its only member.
    pub async fn create(&self) {
        let mut state = self.state.write().await;
        state.predecessor = None;
        state.successors = vec![self.addr.clone(); state.successors.len().max(1)];
        info!("{}: created new ring as {}", self.addr, self.id);
    }

    /// Attach to the ring that `bootstrap` belongs to and pull the keys this
    /// node now owns from its new successor.
    pub async fn join(&self, bootstrap: &str) -> Result<()> {
        if bootstrap.is_empty() {
            return Err(ChordError::MissingAddress("join"));
        }
        self.state.write().await.predecessor = None;

        let successor = if bootstrap == self.addr {
            self.find_successor(&self.id).await?
        } else {
            self.find_successor_rpc(bootstrap, &self.id).await?
        };
        if successor == self.addr {
            warn!("{}: {} resolved to this node, starting a new ring", self.addr, bootstrap);
            self.create().await;
            return Ok(());
        }

        {
            let mut state = self.state.write().await;
            let len = state.successors.len().max(1);
            state.successors = vec![successor.clone(); len];
        }
        info!("{}: joined via {}, successor is {}", self.addr, bootstrap, successor);

        self.migrate_when_joining_rpc(&successor).await
    }

    /// Hand `joiner` every key it now owns. `joiner` has just been placed
    /// directly before this node, so this node keeps `(joiner, self]`.
    pub async fn migrate_when_joining(&self, joiner: &str) -> Result<usize> {
        if joiner.is_empty() {
            return Err(ChordError::MissingAddress("migrate when joining"));
        }
        if joiner == self.addr {
            return Ok(0);
        }

        let joiner = Peer::new(joiner);
        let keys: Vec<String> = {
            let state = self.state.read().await;
            state
                .store
                .keys()
                .filter(|k| leaves_for_joiner(&joiner.id, &hash(k), &self.id))
                .cloned()
                .collect()
        };
        self.hand_off(&joiner.addr, keys).await
    }

    /// Give every local key to the first reachable successor other than this
    /// node. Returns how many keys were moved.
    pub async fn leave(&self) -> Result<usize> {
        let mut tried: Vec<String> = Vec::new();
        for candidate in self.successors().await {
            if candidate == self.addr || tried.contains(&candidate) {
                continue;
            }
            if !self.is_alive(&candidate).await {
                tried.push(candidate);
                continue;
            }
            return self.drain_to(&candidate).await;
        }

        let stranded = self.key_count().await;
        if stranded > 0 {
            warn!(
                "{}: no reachable successor, {} keys are lost",
                self.addr, stranded
            );
        }
        Ok(0)
    }

    /// Hand off until the store is empty or a pass moves nothing. Puts that
    /// were accepted while a pass was running are picked up by the next one.
    async fn drain_to(&self, target: &str) -> Result<usize> {
        let mut moved = 0;
        loop {
            let keys: Vec<String> = self.state.read().await.store.keys().cloned().collect();
            if keys.is_empty() {
                return Ok(moved);
            }
            let pass = self.hand_off(target, keys).await?;
            if pass == 0 {
                warn!(
                    "{}: {} keys could not be handed to {}",
                    self.addr,
                    self.key_count().await,
                    target
                );
                return Ok(moved);
            }
            moved += pass;
        }
    }

    /// Move `keys` to `target` one at a time. A key is removed locally only
    /// after `target` has accepted it, so an interrupted transfer can leave a
    /// key on both nodes but never on neither. Stops at the first put that
    /// fails; the remaining keys stay here.
    async fn hand_off(&self, target: &str, keys: Vec<String>) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut client = self.connect(target, "migrate").await?;

        let mut moved = 0;
        for key in keys {
            let Some(value) = self.get_local(&key).await else {
                continue;
            };

            if let Err(e) = put_with(&mut client, target, key.clone(), value.clone()).await {
                warn!("{}: migrating {} to {} failed: {}", self.addr, key, target, e);
                break;
            }
            debug!("{}: migrated ({}, {}) to {}", self.addr, key, value, target);

            let mut state = self.state.write().await;
            if state.store.get(&key) == Some(&value) {
                state.store.remove(&key);
            }
            moved += 1;
        }

        info!("{}: migrated {} keys to {}", self.addr, moved, target);
        Ok(moved)
    }
}
