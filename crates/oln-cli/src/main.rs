//! OLN node CLI.
//!
//! Talks to the Open Location Network over a NATS subject. Three ways
//! in: `listen` prints everything on the bus, `publish` sends one
//! message and exits, `chat` runs the full caching, filtering,
//! gossiping node with an interactive prompt. `hash` mines a
//! proof-of-work envelope without touching the network.

mod chat;
mod output;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sha1::{Digest, Sha1};

use oln_node::{Bus, NatsBus, DEFAULT_SERVER, DEFAULT_SUBJECT};
use oln_types::{Bundle, ServerInfo};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// olnnode — ephemeral location-aware chat over the Open Location Network.
#[derive(Parser)]
#[command(name = "olnnode", version, about)]
struct Cli {
    /// NATS server URL.
    #[arg(long, global = true, default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for OLN messages and print them.
    Listen,

    /// Publish a message to the OLN network.
    Publish {
        /// Message text (joined with spaces).
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Interactive chat mode with cache, filters, and gossip.
    Chat(ChatArgs),

    /// Mine a proof-of-work envelope and print it with its SHA-1.
    Hash {
        /// Required leading zero bits.
        bits: u32,
        /// Envelope keyword.
        keyword: String,
        /// Message text (joined with spaces).
        #[arg(required = true)]
        text: Vec<String>,
    },
}

/// Options for the `chat` subcommand.
#[derive(Args)]
pub struct ChatArgs {
    /// Comma-separated hashtags to filter (e.g. "#OLN,#test").
    #[arg(long)]
    pub tag: Option<String>,

    /// Comma-separated pluscode location filters.
    #[arg(long)]
    pub location: Option<String>,

    /// Maximum messages to cache.
    #[arg(long, default_value_t = 100)]
    pub max_cache: usize,

    /// Rebroadcast interval (e.g. "5m", "90s").
    #[arg(long, default_value = "5m")]
    pub rebroadcast: String,

    /// Auto-apply N-bit proof-of-work to all outbound messages.
    #[arg(long, default_value_t = 0)]
    pub auto_pow: u32,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Listen => listen(&cli.server).await,
        Commands::Publish { text } => publish(&cli.server, &text.join(" ")).await,
        Commands::Chat(args) => chat::run(&cli.server, args).await,
        Commands::Hash {
            bits,
            keyword,
            text,
        } => hash(bits, &keyword, &text.join(" ")),
    };

    if let Err(e) = result {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// listen
// ---------------------------------------------------------------------------

async fn listen(server: &str) -> oln_types::Result<()> {
    let bus = NatsBus::connect(server, DEFAULT_SUBJECT).await?;
    let mut inbound = bus.subscribe().await?;

    println!("Listening on {DEFAULT_SUBJECT} for OLN messages...");
    println!("Connected to: {server}");
    println!("Press Ctrl+C to stop");
    println!("{}", "-".repeat(60));

    loop {
        tokio::select! {
            maybe = inbound.recv() => {
                match maybe {
                    Some(bytes) => {
                        if let Ok(bundle) = Bundle::from_bytes(&bytes) {
                            for (hash, message) in &bundle.messages {
                                output::print_wire_message(hash, message);
                            }
                        }
                        // Malformed traffic is dropped silently.
                    }
                    None => {
                        return Err(oln_types::OlnError::Transport {
                            reason: "bus subscription closed".into(),
                        });
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// publish
// ---------------------------------------------------------------------------

async fn publish(server: &str, text: &str) -> oln_types::Result<()> {
    let bus = NatsBus::connect(server, DEFAULT_SUBJECT).await?;

    let outbound = oln_node::publish::compose(ServerInfo::default(), text, 0, Utc::now())?;
    bus.publish(outbound.bundle.to_bytes()?).await?;

    println!("Published: {text}");
    println!("Hash: {}", outbound.hash);
    if !outbound.message.tags.is_empty() {
        println!("Tags: {}", outbound.message.tags.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// hash
// ---------------------------------------------------------------------------

fn hash(bits: u32, keyword: &str, text: &str) -> oln_types::Result<()> {
    let envelope = oln_protocol::pow::encode(bits, keyword, text)?;
    let digest = Sha1::digest(envelope.as_bytes());
    println!("{envelope} {}", hex::encode(digest));
    Ok(())
}
