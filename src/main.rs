use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use disco_core::DiscoConfig;
use disco_discovery::DiscoveryService;
use disco_transport::MulticastTransport;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio_stream::StreamExt;
use tracing::{info, warn};

/// disco - service discovery over IP multicast
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/disco.yaml")]
    config: PathBuf,

    /// Override the multicast group
    #[arg(short, long, env = "DISCO_GROUP")]
    group: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe, broadcast one message and print what comes back
    Ping {
        #[arg(default_value = "ping")]
        message: String,
    },
    /// Broadcast a raw message
    Send { message: String },
    /// Print every datagram received on the group
    Watch,
    /// Announce a service and answer queries until interrupted
    Announce { source: String, name: String },
    /// Wait until every named service has announced itself
    Listen { names: Vec<String> },
    /// Ask the group for the owner of a name
    Query { source: String, name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = DiscoConfig::from_config_builder(&args.config)
        .with_context(|| format!("Failed to load config: {:?}", args.config))?;
    if let Some(group) = args.group {
        config.discovery.group_addr = group;
    }
    config.validate().context("Invalid configuration")?;

    let service = DiscoveryService::new(&config);
    let group = service.group().to_string();
    let transport = service.transport().clone();

    match args.command.unwrap_or(Command::Ping {
        message: "ping".to_string(),
    }) {
        Command::Ping { message } => ping(&transport, &group, &message).await?,
        Command::Send { message } => {
            transport.broadcast(&group, &message).await?;
            info!(%group, "Message sent");
        }
        Command::Watch => {
            let mut sub = transport.subscribe(&group).await?;
            loop {
                tokio::select! {
                    _ = signal::ctrl_c() => break,
                    next = sub.next() => match next {
                        Some(Ok(datagram)) => println!("{} {}", datagram.source, datagram.message),
                        Some(Err(e)) if !e.is_terminal() => warn!(error = %e, "Skipped datagram"),
                        Some(Err(e)) => return Err(e.into()),
                        None => break,
                    },
                }
            }
        }
        Command::Announce { source, name } => {
            let announcer = service.announce(&source, &name).await?;
            info!(%name, "Answering queries, press Ctrl-C to stop");
            signal::ctrl_c().await?;
            announcer.shutdown().await;
        }
        Command::Listen { names } => {
            let mut watch = service.listen_for(names).await?;
            while let Some(name) = watch.next().await {
                println!("{}", name?);
            }
        }
        Command::Query { source, name } => {
            let owner = service.query(&source, &name).await?;
            println!("{}", owner);
        }
    }

    service.shutdown();
    Ok(())
}

async fn ping(transport: &MulticastTransport, group: &str, message: &str) -> Result<()> {
    let mut sub = transport.subscribe(group).await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    transport.broadcast(group, message).await?;

    let datagram = tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .context("No datagram received")?
        .context("Subscription closed")??;

    println!("{:#?}", datagram);
    Ok(())
}
