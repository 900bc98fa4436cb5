//! WISP command line.
//!
//! `wisp serve` runs a relay node; `keygen`, `send` and `listen` exercise the
//! client SDK against a running relay.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use wisp_client::{Client, Event};
use wisp_crypto::{Identity, Keystore, PublicKey};
use wisp_relay::{RelayConfig, RelayNode};

/// WISP - federated end-to-end message relay
#[derive(Parser)]
#[command(name = "wisp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a relay node
    Serve {
        /// Listening port
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,

        /// Interface to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,

        /// Seed peer URL to dial at startup (repeatable)
        #[arg(long = "connect")]
        connect: Vec<String>,

        /// URL this node advertises to the federation
        #[arg(long)]
        public_url: Option<String>,
    },

    /// Generate an identity keypair and store it on disk
    Keygen {
        /// Keystore file to write
        #[arg(short, long, default_value = "wisp.key")]
        output: PathBuf,
    },

    /// Send one message to a recipient key
    Send {
        /// Relay URL to connect through
        #[arg(long)]
        relay: String,

        /// Recipient public key (64 hex characters)
        #[arg(long)]
        to: String,

        /// Keystore file with our identity; ephemeral when absent
        #[arg(short, long)]
        key: Option<PathBuf>,

        /// Attach an end-to-end signature the recipient can verify
        #[arg(long)]
        signed: bool,

        /// Message content
        message: String,
    },

    /// Connect to a relay and print incoming messages
    Listen {
        /// Relay URL to connect through
        #[arg(long)]
        relay: String,

        /// Keystore file with our identity; ephemeral when absent
        #[arg(short, long)]
        key: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| (if cli.verbose { "debug" } else { "info" }).into()),
        )
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            connect,
            public_url,
        } => serve(port, host, connect, public_url).await,
        Commands::Keygen { output } => keygen(output),
        Commands::Send {
            relay,
            to,
            key,
            signed,
            message,
        } => send(relay, to, key, signed, message).await,
        Commands::Listen { relay, key } => listen(relay, key).await,
    }
}

async fn serve(
    port: u16,
    host: IpAddr,
    seeds: Vec<String>,
    public_url: Option<String>,
) -> anyhow::Result<()> {
    let config = RelayConfig {
        host,
        port,
        public_url,
        seeds,
        ..RelayConfig::default()
    };
    let node = RelayNode::new(config);
    node.run().await.context("relay startup failed")?;
    Ok(())
}

fn keygen(output: PathBuf) -> anyhow::Result<()> {
    let keystore = Keystore::new(&output);
    let identity = Identity::generate();
    keystore
        .save(&identity)
        .with_context(|| format!("writing keystore {}", output.display()))?;

    println!("{}", hex::encode(identity.public_key()));
    tracing::info!(path = %output.display(), "keystore written");
    Ok(())
}

fn load_identity(key: Option<PathBuf>) -> anyhow::Result<Identity> {
    match key {
        Some(path) => Keystore::new(&path)
            .load_or_generate()
            .with_context(|| format!("loading keystore {}", path.display())),
        None => Ok(Identity::generate()),
    }
}

fn parse_key(hex_key: &str) -> anyhow::Result<PublicKey> {
    let bytes = hex::decode(hex_key).context("recipient key is not hex")?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("recipient key must be 32 bytes (64 hex characters)"))
}

async fn wait_authenticated(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<Event>,
) -> anyhow::Result<PublicKey> {
    let deadline = Duration::from_secs(10);
    tokio::time::timeout(deadline, async {
        while let Some(event) = events.recv().await {
            match event {
                Event::Authenticated { relay } => return Ok(relay),
                Event::Closed => anyhow::bail!("relay closed the session during authentication"),
                _ => {}
            }
        }
        anyhow::bail!("event channel ended during authentication")
    })
    .await
    .context("authentication timed out")?
}

async fn send(
    relay: String,
    to: String,
    key: Option<PathBuf>,
    signed: bool,
    message: String,
) -> anyhow::Result<()> {
    let recipient = parse_key(&to)?;
    let identity = load_identity(key)?;

    let (client, mut events) = Client::connect(&relay, identity)
        .await
        .with_context(|| format!("connecting to {relay}"))?;
    let relay_key = wait_authenticated(&mut events).await?;
    tracing::info!(relay = %hex::encode(&relay_key[..8]), "authenticated");

    if signed {
        client.send_signed(&recipient, message.as_bytes())?;
    } else {
        client.send(&recipient, message.as_bytes())?;
    }

    // give the writer task a moment to flush before tearing down
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.close();
    Ok(())
}

async fn listen(relay: String, key: Option<PathBuf>) -> anyhow::Result<()> {
    let identity = load_identity(key)?;
    println!("{}", hex::encode(identity.public_key()));

    // the client handle keeps the session's writer alive for the whole loop
    let (_client, mut events) = Client::connect(&relay, identity)
        .await
        .with_context(|| format!("connecting to {relay}"))?;
    let relay_key = wait_authenticated(&mut events).await?;
    tracing::info!(relay = %hex::encode(&relay_key[..8]), "authenticated, waiting for messages");

    while let Some(event) = events.recv().await {
        match event {
            Event::Message {
                sender,
                content,
                signed,
            } => {
                let marker = if signed { " (signed)" } else { "" };
                println!(
                    "{}{}: {}",
                    hex::encode(sender),
                    marker,
                    String::from_utf8_lossy(&content)
                );
            }
            Event::Closed => {
                tracing::info!("session closed");
                break;
            }
            _ => {}
        }
    }
    Ok(())
}
