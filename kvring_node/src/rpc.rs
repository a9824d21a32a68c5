//! Outbound calls. Each call dials a fresh channel bounded by the node's
//! `rpc_timeout`; calls addressed to the node itself run locally.

use std::time::Duration;

use kvring_proto::chord::chord_client::ChordClient;
use kvring_proto::chord::{
    DeleteRequest, Empty, FindSuccessorRequest, GetRequest, NodeAddress, PassSuccessorRequest,
    PutRequest,
};
use kvring_proto::Identifier;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use crate::error::{ChordError, Result};
use crate::node::Node;

pub(crate) type ChordChannel = ChordClient<Channel>;

fn unreachable(addr: &str, reason: impl ToString) -> ChordError {
    ChordError::Unreachable {
        addr: addr.to_string(),
        reason: reason.to_string(),
    }
}

fn remote(addr: &str, status: Status) -> ChordError {
    ChordError::Remote {
        addr: addr.to_string(),
        status,
    }
}

fn non_empty(address: String) -> Option<String> {
    if address.is_empty() {
        None
    } else {
        Some(address)
    }
}

impl Node {
    pub(crate) async fn connect(&self, addr: &str, op: &'static str) -> Result<ChordChannel> {
        self.connect_with_timeout(addr, op, self.config.rpc_timeout()).await
    }

    /// Like [`Node::connect`], with `timeout` bounding each request on the
    /// channel instead of `rpc_timeout`.
    async fn connect_with_timeout(
        &self,
        addr: &str,
        op: &'static str,
        timeout: Duration,
    ) -> Result<ChordChannel> {
        if addr.is_empty() {
            return Err(ChordError::MissingAddress(op));
        }
        let connect_timeout = self.config.rpc_timeout();
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))
            .map_err(|e| unreachable(addr, e))?
            .connect_timeout(connect_timeout)
            .timeout(timeout);

        match tokio::time::timeout(connect_timeout, endpoint.connect()).await {
            Ok(Ok(channel)) => Ok(ChordClient::new(channel)),
            Ok(Err(e)) => Err(unreachable(addr, e)),
            Err(_) => Err(unreachable(addr, "connect timed out")),
        }
    }

    pub(crate) async fn ping_rpc(&self, addr: &str) -> Result<()> {
        if addr == self.addr {
            return Ok(());
        }
        let mut client = self.connect(addr, "ping").await?;
        client
            .ping(Request::new(Empty {}))
            .await
            .map_err(|s| remote(addr, s))?;
        Ok(())
    }

    /// Never short-circuits: callers only forward to other nodes.
    pub(crate) async fn find_successor_rpc(&self, addr: &str, id: &Identifier) -> Result<String> {
        let mut client = self.connect(addr, "find successor").await?;
        let request = Request::new(FindSuccessorRequest {
            id: id.to_bytes_be().to_vec(),
        });
        let response = client
            .find_successor(request)
            .await
            .map_err(|s| remote(addr, s))?;
        non_empty(response.into_inner().address)
            .ok_or_else(|| ChordError::SuccessorNotFound(id.clone()))
    }

    pub(crate) async fn get_predecessor_rpc(&self, addr: &str) -> Result<Option<String>> {
        if addr == self.addr {
            return Ok(self.predecessor().await);
        }
        let mut client = self.connect(addr, "get predecessor").await?;
        let response = client
            .get_predecessor(Request::new(Empty {}))
            .await
            .map_err(|s| remote(addr, s))?;
        Ok(non_empty(response.into_inner().address))
    }

    pub(crate) async fn notify_rpc(&self, addr: &str, candidate: &str) -> Result<()> {
        if addr == self.addr {
            self.notify(candidate).await;
            return Ok(());
        }
        let mut client = self.connect(addr, "notify").await?;
        client
            .notify(Request::new(NodeAddress {
                address: candidate.to_string(),
            }))
            .await
            .map_err(|s| remote(addr, s))?;
        Ok(())
    }

    pub(crate) async fn pass_successor_rpc(
        &self,
        addr: &str,
        index: usize,
    ) -> Result<Option<String>> {
        if addr == self.addr {
            return Ok(self.successor_at(index).await);
        }
        let mut client = self.connect(addr, "pass successor").await?;
        let response = client
            .pass_successor(Request::new(PassSuccessorRequest {
                index: index as u32,
            }))
            .await
            .map_err(|s| remote(addr, s))?;
        Ok(non_empty(response.into_inner().address))
    }

    /// Bounded by `migration_timeout`: the callee moves every key this node
    /// now owns before answering.
    pub(crate) async fn migrate_when_joining_rpc(&self, addr: &str) -> Result<()> {
        let timeout = self.config.migration_timeout();
        let mut client = self
            .connect_with_timeout(addr, "migrate when joining", timeout)
            .await?;
        client
            .migrate_when_joining(Request::new(NodeAddress {
                address: self.addr.clone(),
            }))
            .await
            .map_err(|s| remote(addr, s))?;
        Ok(())
    }

    pub(crate) async fn put_rpc(&self, addr: &str, key: &str, value: &str) -> Result<()> {
        if addr == self.addr {
            self.put_local(key.to_string(), value.to_string()).await;
            return Ok(());
        }
        let mut client = self.connect(addr, "put").await?;
        put_with(&mut client, addr, key.to_string(), value.to_string()).await
    }

    pub(crate) async fn get_rpc(&self, addr: &str, key: &str) -> Result<Option<String>> {
        if addr == self.addr {
            return Ok(self.get_local(key).await);
        }
        let mut client = self.connect(addr, "get").await?;
        let response = client
            .get(Request::new(GetRequest {
                key: key.to_string(),
            }))
            .await
            .map_err(|s| remote(addr, s))?
            .into_inner();
        Ok(response.found.then_some(response.value))
    }

    pub(crate) async fn delete_rpc(&self, addr: &str, key: &str) -> Result<bool> {
        if addr == self.addr {
            return Ok(self.delete_local(key).await);
        }
        let mut client = self.connect(addr, "delete").await?;
        let response = client
            .delete(Request::new(DeleteRequest {
                key: key.to_string(),
            }))
            .await
            .map_err(|s| remote(addr, s))?;
        Ok(response.into_inner().deleted)
    }
}

/// Put over an already open client, for bulk transfers.
pub(crate) async fn put_with(
    client: &mut ChordChannel,
    addr: &str,
    key: String,
    value: String,
) -> Result<()> {
    let response = client
        .put(Request::new(PutRequest { key, value }))
        .await
        .map_err(|s| remote(addr, s))?;
    if response.into_inner().success {
        Ok(())
    } else {
        Err(remote(addr, Status::aborted("put declined")))
    }
}
