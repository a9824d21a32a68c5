use std::future::Future;
use std::time::Duration;

use kvring_proto::chord::chord_server::ChordServer;
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::error::{ChordError, Result};
use crate::node::{Node, NodeDump};

/// Owns a node's listening socket and its periodic maintenance tasks.
///
/// A server runs at most once: after [`RingServer::quit`] or
/// [`RingServer::abort`] a fresh `Node` and server are needed.
#[derive(Debug)]
pub struct RingServer {
    node: Node,
    listener: CancellationToken,
    serve: Option<JoinHandle<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl RingServer {
    pub fn new(node: Node) -> Self {
        RingServer {
            node,
            listener: CancellationToken::new(),
            serve: None,
            tasks: Vec::new(),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn is_running(&self) -> bool {
        self.serve.is_some()
    }

    /// Bind, found a new ring, and start maintenance.
    pub async fn listen(&mut self) -> Result<()> {
        self.start_serving().await?;
        self.node.create().await;
        self.spawn_maintenance();
        Ok(())
    }

    /// Bind, join the ring `bootstrap` belongs to, and start maintenance.
    ///
    /// If joining fails after the successor began moving keys here, those
    /// keys are handed back to it before the server stops.
    pub async fn join(&mut self, bootstrap: &str) -> Result<()> {
        if bootstrap.is_empty() {
            return Err(ChordError::MissingAddress("join"));
        }
        self.start_serving().await?;
        if let Err(e) = self.node.join(bootstrap).await {
            warn!("{}: join via {} failed: {}", self.node.addr, bootstrap, e);
            self.stop(true).await;
            return Err(e);
        }
        self.spawn_maintenance();
        Ok(())
    }

    /// Leave gracefully: stop maintenance, hand every key to a live
    /// successor, then release the socket. Returns how many keys moved.
    pub async fn quit(&mut self) -> Result<usize> {
        if !self.is_running() {
            return Err(ChordError::NotListening);
        }
        Ok(self.stop(true).await)
    }

    /// Stop without handing off keys, as if the process had died.
    pub async fn abort(&mut self) {
        self.stop(false).await;
    }

    pub async fn dump(&self) -> NodeDump {
        self.node.dump().await
    }

    async fn stop(&mut self, handoff: bool) -> usize {
        self.node.listening_token().cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("{}: maintenance task ended abnormally: {}", self.node.addr, e);
            }
        }

        let mut moved = 0;
        if handoff {
            match self.node.leave().await {
                Ok(n) => moved = n,
                Err(e) => warn!("{}: handoff failed: {}", self.node.addr, e),
            }
        }

        self.listener.cancel();
        if let Some(serve) = self.serve.take() {
            let grace = self.node.config.rpc_timeout();
            let abort = serve.abort_handle();
            if tokio::time::timeout(grace, serve).await.is_err() {
                abort.abort();
            }
        }
        info!("{}: stopped listening", self.node.addr);
        moved
    }

    async fn start_serving(&mut self) -> Result<()> {
        if self.is_running() || !self.node.is_listening() {
            return Err(ChordError::AlreadyRunning);
        }

        let addr = self.node.addr.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ChordError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let service = ChordServer::new(self.node.clone());
        let shutdown = self.listener.clone().cancelled_owned();
        let serve_addr = addr.clone();
        self.serve = Some(tokio::spawn(async move {
            let result = Server::builder()
                .add_service(service)
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
                .await;
            if let Err(e) = result {
                error!("{}: server error: {}", serve_addr, e);
            }
        }));

        info!("{}: listening as {}", addr, self.node.id);
        Ok(())
    }

    fn spawn_maintenance(&mut self) {
        let config = &self.node.config;
        let schedule = [
            (config.stabilize_interval(), Task::Stabilize),
            (config.check_predecessor_interval(), Task::CheckPredecessor),
            (config.fix_fingers_interval(), Task::FixFingers),
        ];
        for (period, task) in schedule {
            let handle = spawn_periodic(self.node.clone(), period, move |node| async move {
                match task {
                    Task::Stabilize => node.stabilize().await,
                    Task::CheckPredecessor => node.check_predecessor().await,
                    Task::FixFingers => node.fix_fingers().await,
                }
            });
            self.tasks.push(handle);
        }
    }
}

impl Drop for RingServer {
    fn drop(&mut self) {
        self.node.listening_token().cancel();
        self.listener.cancel();
    }
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Stabilize,
    CheckPredecessor,
    FixFingers,
}

/// Run `tick` every `period` until the node stops listening. A tick in
/// progress always finishes.
fn spawn_periodic<F, Fut>(node: Node, period: Duration, tick: F) -> JoinHandle<()>
where
    F: Fn(Node) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = node.listening_token();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => tick(node.clone()).await,
            }
        }
    })
}
