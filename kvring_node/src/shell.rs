use anyhow::{anyhow, bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};

use kvring_node::{Node, NodeConfig, RingServer};

const HELP: &str = "Available commands: help, port [p], create, join <addr>, put <key> <value>, \
                    get <key>, delete <key>, dump, quit, exit";

pub enum Flow {
    Continue,
    Exit,
}

/// Line-oriented front end over one `RingServer` at a time.
pub struct Shell {
    host: String,
    port: u16,
    config: NodeConfig,
    server: Option<RingServer>,
}

impl Shell {
    pub fn new(host: String, port: u16, config: NodeConfig) -> Self {
        Shell {
            host,
            port,
            config,
            server: None,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("Type \"help\" to learn about available commands");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            match self.execute(&line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(e) => println!("{e:#}"),
            }
        }

        if let Some(mut server) = self.server.take() {
            server.quit().await?;
        }
        Ok(())
    }

    pub async fn execute(&mut self, line: &str) -> anyhow::Result<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = words.collect();

        match command {
            "help" => println!("{HELP}"),
            "port" => self.port(&args)?,
            "create" => {
                let mut server = self.dispatch()?;
                server.listen().await?;
                println!("Created new ring, listening at {}", server.node().addr);
                self.server = Some(server);
            }
            "join" => {
                let addr = args.first().ok_or_else(|| anyhow!("join: lack valid address"))?;
                let mut server = self.dispatch()?;
                server.join(addr).await?;
                println!("Joined via {}, listening at {}", addr, server.node().addr);
                self.server = Some(server);
            }
            "put" => {
                let (key, value) = match args.as_slice() {
                    [key, rest @ ..] if !rest.is_empty() => (*key, rest.join(" ")),
                    _ => bail!("usage: put <key> <value>"),
                };
                let owner = self.node()?.put(key, &value).await?;
                println!("Put ({key}, {value}) at {owner}");
            }
            "get" => {
                let key = args.first().ok_or_else(|| anyhow!("usage: get <key>"))?;
                match self.node()?.get(key).await? {
                    Some(value) => println!("Get ({key}, {value})"),
                    None => bail!("get: {key} not found"),
                }
            }
            "delete" => {
                let key = args.first().ok_or_else(|| anyhow!("usage: delete <key>"))?;
                if self.node()?.delete(key).await? {
                    println!("Deleted {key}");
                } else {
                    bail!("delete: {key} not found");
                }
            }
            "dump" => {
                let server = self.server.as_ref().ok_or_else(not_running)?;
                let dump = server.dump().await;
                println!("{}", serde_json::to_string_pretty(&dump)?);
            }
            "quit" => {
                let mut server = self.server.take().ok_or_else(not_running)?;
                let moved = server.quit().await?;
                println!("Quit {}, handed off {} keys", server.node().addr, moved);
            }
            "exit" => return Ok(Flow::Exit),
            other => bail!("command not found: {other}"),
        }
        Ok(Flow::Continue)
    }

    fn port(&mut self, args: &[&str]) -> anyhow::Result<()> {
        match args.first() {
            None => println!("Current port is {}", self.port),
            Some(port) => {
                if self.server.is_some() {
                    bail!("can't change port while a node is running");
                }
                self.port = port.parse().context("port must be a number")?;
                println!("Port set to {}", self.port);
            }
        }
        Ok(())
    }

    fn dispatch(&self) -> anyhow::Result<RingServer> {
        if self.server.is_some() {
            bail!("already created or joined");
        }
        let addr = format!("{}:{}", self.host, self.port);
        Ok(RingServer::new(Node::new(addr, self.config.clone())))
    }

    fn node(&self) -> anyhow::Result<&Node> {
        self.server
            .as_ref()
            .map(RingServer::node)
            .ok_or_else(not_running)
    }
}

fn not_running() -> anyhow::Error {
    anyhow!("no node running; create or join first")
}
