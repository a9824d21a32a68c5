use std::path::PathBuf;

use clap::Parser;

use kvring_node::config::{local_address, NodeConfig};
use kvring_node::constants::DEFAULT_PORT;

mod shell;

use shell::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host to advertise; defaults to the first non-loopback IPv4 address
    #[arg(long)]
    host: Option<String>,

    /// JSON file overriding timing and list-length defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Create a new ring right away
    #[arg(long, conflicts_with = "join")]
    create: bool,

    /// Address of a node to join right away
    #[arg(short, long)]
    join: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    let host = match args.host {
        Some(host) => host,
        None => local_address()?.to_string(),
    };

    let mut shell = Shell::new(host, args.port, config);
    if args.create {
        shell.execute("create").await?;
    } else if let Some(addr) = args.join {
        shell.execute(&format!("join {addr}")).await?;
    }
    shell.run().await
}
