use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use kvring_proto::chord::NodeState;
use kvring_proto::{between, hash, Identifier};
use log::info;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::NodeConfig;
use crate::constants::FINGER_TABLE_SIZE;
use crate::error::Result;

/// A ring member as seen from elsewhere: its address and the identifier
/// derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub addr: String,
    pub id: Identifier,
}

impl Peer {
    pub fn new(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let id = hash(&addr);
        Peer { addr, id }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: Identifier,
    pub addr: String,
    pub config: NodeConfig,
    pub state: Arc<RwLock<RingState>>,
    listening: CancellationToken,
}

/// Everything a node mutates, behind one lock.
#[derive(Debug)]
pub struct RingState {
    /// Nearest first; `successors[0]` is the current successor. Never empty.
    pub successors: Vec<String>,
    pub predecessor: Option<String>,
    /// `fingers[k]` is finger `k + 1`: the node at or after `id + 2^k`.
    pub fingers: Vec<Option<String>>,
    /// Next finger index refreshed by `fix_fingers`.
    pub next_finger: usize,
    pub store: HashMap<String, String>,
}

/// Read-only snapshot for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDump {
    pub address: String,
    pub id: Identifier,
    pub successors: Vec<String>,
    pub predecessor: Option<String>,
    /// Distinct finger entries, longest reach last.
    pub fingers: Vec<String>,
    pub store: BTreeMap<String, String>,
}

impl Node {
    pub fn new(addr: impl Into<String>, config: NodeConfig) -> Self {
        let addr = addr.into();
        let id = hash(&addr);
        let successors = vec![addr.clone(); config.successor_list_len.max(1)];

        Node {
            id,
            addr,
            config,
            state: Arc::new(RwLock::new(RingState {
                successors,
                predecessor: None,
                fingers: vec![None; FINGER_TABLE_SIZE],
                next_finger: 0,
                store: HashMap::new(),
            })),
            listening: CancellationToken::new(),
        }
    }

    /// False once the node has begun quitting or was stopped.
    pub fn is_listening(&self) -> bool {
        !self.listening.is_cancelled()
    }

    pub(crate) fn listening_token(&self) -> CancellationToken {
        self.listening.clone()
    }

    pub async fn successors(&self) -> Vec<String> {
        self.state.read().await.successors.clone()
    }

    pub async fn successor(&self) -> String {
        let state = self.state.read().await;
        state
            .successors
            .first()
            .cloned()
            .unwrap_or_else(|| self.addr.clone())
    }

    pub async fn successor_at(&self, index: usize) -> Option<String> {
        self.state.read().await.successors.get(index).cloned()
    }

    pub async fn predecessor(&self) -> Option<String> {
        self.state.read().await.predecessor.clone()
    }

    /// Offer `candidate` as predecessor. Returns whether it was adopted.
    pub async fn notify(&self, candidate: &str) -> bool {
        let candidate = Peer::new(candidate);
        let mut state = self.state.write().await;

        let adopt = match &state.predecessor {
            None => true,
            Some(current) => between(&hash(current), &candidate.id, &self.id, false),
        };
        if adopt && state.predecessor.as_deref() != Some(candidate.addr.as_str()) {
            info!("{}: predecessor is now {}", self.addr, candidate.addr);
            state.predecessor = Some(candidate.addr);
        }
        adopt
    }

    pub async fn put_local(&self, key: String, value: String) {
        self.state.write().await.store.insert(key, value);
    }

    pub async fn get_local(&self, key: &str) -> Option<String> {
        self.state.read().await.store.get(key).cloned()
    }

    pub async fn delete_local(&self, key: &str) -> bool {
        self.state.write().await.store.remove(key).is_some()
    }

    pub async fn key_count(&self) -> usize {
        self.state.read().await.store.len()
    }

    /// Store `key` on the node that owns it. Returns that node's address.
    pub async fn put(&self, key: &str, value: &str) -> Result<String> {
        let owner = self.find_successor(&hash(key)).await?;
        self.put_rpc(&owner, key, value).await?;
        Ok(owner)
    }

    /// Fetch `key` from the node that owns it. `None` when absent.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let owner = self.find_successor(&hash(key)).await?;
        self.get_rpc(&owner, key).await
    }

    /// Remove `key` from the node that owns it. False when it was absent.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let owner = self.find_successor(&hash(key)).await?;
        self.delete_rpc(&owner, key).await
    }

    pub async fn dump(&self) -> NodeDump {
        let state = self.state.read().await;
        let mut fingers: Vec<String> = Vec::new();
        for finger in state.fingers.iter().flatten() {
            if !fingers.contains(finger) {
                fingers.push(finger.clone());
            }
        }

        NodeDump {
            address: self.addr.clone(),
            id: self.id.clone(),
            successors: state.successors.clone(),
            predecessor: state.predecessor.clone(),
            fingers,
            store: state
                .store
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Whether a key held by `owner` belongs to `joiner`, which has just become
/// `owner`'s predecessor. `owner` keeps exactly `(joiner, owner]`.
pub fn leaves_for_joiner(joiner: &Identifier, key: &Identifier, owner: &Identifier) -> bool {
    !between(joiner, key, owner, true)
}

impl From<NodeDump> for NodeState {
    fn from(dump: NodeDump) -> Self {
        NodeState {
            address: dump.address,
            id: dump.id.to_bytes_be().to_vec(),
            successors: dump.successors,
            predecessor: dump.predecessor.unwrap_or_default(),
            finger_table: dump.fingers,
            store: dump.store.into_iter().collect(),
        }
    }
}
