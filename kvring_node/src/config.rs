use std::net::{IpAddr, UdpSocket};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CHECK_PREDECESSOR_INTERVAL_MS, FIX_FINGERS_INTERVAL_MS, MIGRATION_TIMEOUT_MS, RPC_TIMEOUT_MS,
    STABILIZE_INTERVAL_MS, SUCCESSOR_LIST_LEN,
};
use crate::error::{ChordError, Result};

/// Tunables for one node. Every field has a default, so a config file only
/// needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub stabilize_interval_ms: u64,
    pub check_predecessor_interval_ms: u64,
    pub fix_fingers_interval_ms: u64,
    /// Connect and request budget for every outbound call.
    pub rpc_timeout_ms: u64,
    /// Budget for a whole join-time key transfer, which spans many puts.
    pub migration_timeout_ms: u64,
    pub successor_list_len: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            stabilize_interval_ms: STABILIZE_INTERVAL_MS,
            check_predecessor_interval_ms: CHECK_PREDECESSOR_INTERVAL_MS,
            fix_fingers_interval_ms: FIX_FINGERS_INTERVAL_MS,
            rpc_timeout_ms: RPC_TIMEOUT_MS,
            migration_timeout_ms: MIGRATION_TIMEOUT_MS,
            successor_list_len: SUCCESSOR_LIST_LEN,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: NodeConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        anyhow::ensure!(
            config.successor_list_len > 0,
            "successor_list_len must be at least 1"
        );
        Ok(config)
    }

    pub fn stabilize_interval(&self) -> Duration {
        Duration::from_millis(self.stabilize_interval_ms)
    }

    pub fn check_predecessor_interval(&self) -> Duration {
        Duration::from_millis(self.check_predecessor_interval_ms)
    }

    pub fn fix_fingers_interval(&self) -> Duration {
        Duration::from_millis(self.fix_fingers_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn migration_timeout(&self) -> Duration {
        Duration::from_millis(self.migration_timeout_ms)
    }
}

/// First non-loopback IPv4 address of this machine.
///
/// Connecting a UDP socket sends nothing; it only asks the kernel which local
/// interface would route to a public address.
pub fn local_address() -> Result<IpAddr> {
    let socket =
        UdpSocket::bind("0.0.0.0:0").map_err(|e| ChordError::LocalAddress(e.to_string()))?;
    socket
        .connect("8.8.8.8:80")
        .map_err(|e| ChordError::LocalAddress(e.to_string()))?;
    let ip = socket
        .local_addr()
        .map_err(|e| ChordError::LocalAddress(e.to_string()))?
        .ip();
    if ip.is_loopback() || ip.is_unspecified() || !ip.is_ipv4() {
        return Err(ChordError::LocalAddress(format!(
            "no non-loopback IPv4 interface (got {ip})"
        )));
    }
    Ok(ip)
}
