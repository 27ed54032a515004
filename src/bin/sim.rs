//! Simulator binary

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use hivesync::common::{parse_duration, timestamp_now_millis};
use hivesync::dht::PeerBehavior;
use hivesync::messaging::IgnoreResponse;
use hivesync::{
    Config, DataManager, LoopbackTransport, MemoryDht, Message, MessageCorrelator, Metrics,
    PeerId, RecipientKey, WriteRequest,
};
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hivesync-sim")]
#[command(about = "Exercise quorum writes and request/response exchanges against simulated peers")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one replicated write against a simulated DHT
    Put {
        /// Location key
        #[arg(long, default_value = "user-a")]
        location: String,

        /// Content key
        #[arg(long, default_value = "meta")]
        content: String,

        /// Value to store
        #[arg(long, default_value = "hello")]
        value: String,

        /// Responsible peers that deny every put
        #[arg(long, default_value = "0")]
        deny: usize,

        /// Responsible peers that deny the first put only
        #[arg(long, default_value = "0")]
        flaky: usize,

        /// Responsible peers answering without a status
        #[arg(long, default_value = "0")]
        silent: usize,

        /// Override the configured retry count
        #[arg(long)]
        retries: Option<u32>,

        /// Spread the faults over random peers instead of the responsible ones
        #[arg(long)]
        scatter: bool,
    },

    /// Run one request/response exchange over a loopback transport
    Request {
        /// Responder delay (e.g. 200ms)
        #[arg(long, default_value = "10ms")]
        delay: String,

        /// Override the configured response timeout (e.g. 1s)
        #[arg(long)]
        timeout: Option<String>,

        /// Route by key instead of addressing the peer directly
        #[arg(long)]
        routed: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics = Arc::new(Metrics::new());

    match cli.command {
        Commands::Put {
            location,
            content,
            value,
            deny,
            flaky,
            silent,
            retries,
            scatter,
        } => {
            if let Some(retries) = retries {
                config.write.max_put_retries = retries;
            }
            let dht = MemoryDht::from_config(&config.dht);

            // faults go to the peers this key lands on unless scattered
            let behaviors = std::iter::repeat(PeerBehavior::Deny)
                .take(deny)
                .chain(std::iter::repeat(PeerBehavior::DenyTimes(1)).take(flaky))
                .chain(std::iter::repeat(PeerBehavior::Silent).take(silent));
            let targets = if scatter {
                let mut peers = dht.peers();
                peers.shuffle(&mut rand::thread_rng());
                peers
            } else {
                dht.responsible_peers(&location)
            };
            for (peer, behavior) in targets.iter().zip(behaviors) {
                tracing::info!("{} -> {:?}", peer, behavior);
                dht.set_behavior(peer, behavior);
            }

            let manager =
                DataManager::new(Arc::new(dht.clone()), &config.write).with_metrics(metrics.clone());
            let request = WriteRequest::new(location, content, Bytes::from(value))
                .with_version(timestamp_now_millis());
            let stored = manager.put(request.clone()).await?;

            println!("verdict:  {}", if stored { "stored" } else { "failed" });
            println!("puts:     {}", dht.put_count());
            println!("removes:  {}", dht.remove_count());
            println!(
                "replicas: {}",
                dht.replica_count(&request.version_key())
            );
        }
        Commands::Request {
            delay,
            timeout,
            routed,
        } => {
            if let Some(timeout) = timeout {
                config.messaging.response_timeout_ms =
                    u64::try_from(parse_duration(&timeout)?.as_millis())
                        .context("response timeout out of range")?;
            }
            let delay: Duration = parse_duration(&delay)?;

            let transport = LoopbackTransport::new();
            let responder = PeerId::new("peer-2");
            transport.add_responder(responder.clone(), delay, |message| {
                Some(message.payload.clone())
            });

            let me = PeerId::new(config.node_id.clone());
            let message = if routed {
                Message::routed(me, "user-b", Bytes::from_static(b"ping"))
            } else {
                Message::direct(me, responder, Bytes::from_static(b"ping"))
            }
            .expecting_response();

            let mut correlator = MessageCorrelator::from_config(
                Arc::new(transport),
                Arc::new(IgnoreResponse),
                &config.messaging,
            )
            .named("sim")
            .with_metrics(metrics.clone());

            match correlator
                .send(message, &RecipientKey::new(Bytes::from_static(b"peer-2-key")))
                .await
            {
                Ok(()) => println!("response received"),
                Err(e) => println!("exchange failed: {}", e),
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    tracing::debug!("\n{}", metrics.to_prometheus());
    Ok(())
}
