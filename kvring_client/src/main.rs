use clap::{Parser, Subcommand};
use kvring_proto::chord::chord_client::ChordClient;
use kvring_proto::chord::{DeleteRequest, Empty, FindSuccessorRequest, GetRequest, PutRequest};
use kvring_proto::{hash, Identifier};
use tonic::transport::Channel;
use tonic::Request;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address (host:port) of the node to ask
    #[arg(short, long, default_value = "127.0.0.1:3410")]
    node: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Put a key-value pair into the ring
    Put { key: String, value: String },
    /// Get a value from the ring
    Get { key: String },
    /// Delete a key from the ring
    Delete { key: String },
    /// Find the node responsible for a key
    FindSuccessor { key: String },
    /// Check that the node answers
    Ping,
    /// Print the node's ring state and store
    Dump,
}

async fn connect(addr: &str) -> Result<ChordClient<Channel>, Box<dyn std::error::Error>> {
    Ok(ChordClient::connect(format!("http://{}", addr)).await?)
}

async fn owner_of(
    client: &mut ChordClient<Channel>,
    id: &Identifier,
) -> Result<String, Box<dyn std::error::Error>> {
    let request = Request::new(FindSuccessorRequest {
        id: id.to_bytes_be().to_vec(),
    });
    Ok(client.find_successor(request).await?.into_inner().address)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut client = connect(&cli.node).await?;

    match cli.command {
        Commands::Put { key, value } => {
            let owner = owner_of(&mut client, &hash(&key)).await?;
            let mut owner_client = connect(&owner).await?;
            let request = Request::new(PutRequest {
                key: key.clone(),
                value: value.clone(),
            });
            if owner_client.put(request).await?.into_inner().success {
                println!("Put ({}, {}) at {}", key, value, owner);
            } else {
                println!("Put declined by {}", owner);
            }
        }
        Commands::Get { key } => {
            let owner = owner_of(&mut client, &hash(&key)).await?;
            let mut owner_client = connect(&owner).await?;
            let request = Request::new(GetRequest { key: key.clone() });
            let resp = owner_client.get(request).await?.into_inner();
            if resp.found {
                println!("Value: {}", resp.value);
            } else {
                println!("Key not found at {}", owner);
            }
        }
        Commands::Delete { key } => {
            let owner = owner_of(&mut client, &hash(&key)).await?;
            let mut owner_client = connect(&owner).await?;
            let request = Request::new(DeleteRequest { key: key.clone() });
            if owner_client.delete(request).await?.into_inner().deleted {
                println!("Deleted {} at {}", key, owner);
            } else {
                println!("Key not found at {}", owner);
            }
        }
        Commands::FindSuccessor { key } => {
            let id = hash(&key);
            let owner = owner_of(&mut client, &id).await?;
            println!("Successor of {} ({}): {}", key, id, owner);
        }
        Commands::Ping => {
            client.ping(Request::new(Empty {})).await?;
            println!("{} is alive", cli.node);
        }
        Commands::Dump => {
            let state = client.dump(Request::new(Empty {})).await?.into_inner();
            let id = Identifier::from_bytes_be(&state.id)
                .map(|id| id.to_string())
                .unwrap_or_default();
            println!("Address: {}", state.address);
            println!("ID: {}", id);
            println!("Successors: {:?}", state.successors);
            println!("Predecessor: {}", state.predecessor);
            println!("Fingers: {:?}", state.finger_table);
            let mut keys: Vec<_> = state.store.into_iter().collect();
            keys.sort();
            println!("Data: {:?}", keys);
        }
    }

    Ok(())
}
