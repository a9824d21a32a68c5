pub mod config;
pub mod constants;
pub mod error;
mod lookup;
mod membership;
pub mod node;
mod rpc;
pub mod server;
mod service;
mod stabilize;

pub use config::NodeConfig;
pub use error::{ChordError, Result};
pub use node::{Node, NodeDump, Peer};
pub use server::RingServer;
