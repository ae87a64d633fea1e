//! Command line interface for the mahjong responder bots. Serves the HTTP
//! endpoints, answers a single event from a file, or posts a quiz.

mod access;
mod command;
mod compose;
mod config;
mod emoji;
mod error;
mod event;
mod mahjong;
mod nip19;
mod persona;
mod quiz;
mod relay;
mod responder;
mod server;
mod signer;
mod tags;

use std::{fs, net::SocketAddr, path::Path};

use anyhow::{anyhow, Context as _};
use clap::{Parser, Subcommand};
use config::Settings;
use event::Event;
use responder::Responder;
use signer::Signer;
use tracing::info;

/// Command line interface entry point.
#[derive(Parser)]
#[command(
    name = "jongbot",
    author,
    version,
    about = "Stateless mahjong responder for Nostr",
    short_flag = 'v',
    long_flag = "version"
)]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Launch the HTTP service.
    Serve,
    /// Answer one event read from a JSON file and print the result.
    Respond {
        /// Path to the JSON event file.
        file: String,
        /// Bot name from `BOT_KEYS`; a throwaway key is used when omitted.
        #[arg(long)]
        bot: Option<String>,
    },
    /// Generate a quiz puzzle with its answer and print both.
    Quiz {
        #[arg(long)]
        bot: Option<String>,
    },
}

/// Execute the selected CLI subcommand.
async fn run(cli: Cli) -> anyhow::Result<()> {
    ensure_env_file(&cli.env)?;
    let cfg = Settings::from_env(&cli.env)?;
    let responder = Responder::new(cfg.context());
    match cli.command {
        Commands::Serve => {
            let addr: SocketAddr = cfg.bind_http.as_str().parse()?;
            let bots = cfg.signers()?;
            if bots.is_empty() {
                tracing::warn!("BOT_KEYS is empty; every bot route answers 404");
            }
            info!(bots = bots.len(), relay = %cfg.relay_url, "starting");
            for (name, signer) in &bots {
                let npub = nip19::encode(nip19::NPUB, signer.public_key())?;
                info!(bot = %name, %npub, "identity");
            }
            let app = server::router(responder, bots, cfg.verify_sig);
            server::serve_http(addr, app, std::future::pending()).await?;
        }
        Commands::Respond { file, bot } => {
            let data = fs::read_to_string(&file).with_context(|| format!("reading {file}"))?;
            let ev: Event = serde_json::from_str(&data)?;
            if cfg.verify_sig {
                signer::verify_event(&ev).context("event failed verification")?;
            }
            let signer = pick_signer(&cfg, bot.as_deref())?;
            let out = responder.respond(Some(&ev), &signer).await?;
            print_events(out)?;
        }
        Commands::Quiz { bot } => {
            let signer = pick_signer(&cfg, bot.as_deref())?;
            let out = responder.respond(None, &signer).await?;
            print_events(out)?;
        }
    }
    Ok(())
}

/// Identity for a one-shot command: the named bot, or a fresh key.
fn pick_signer(cfg: &Settings, bot: Option<&str>) -> anyhow::Result<Signer> {
    match bot {
        Some(name) => cfg
            .signers()?
            .remove(name)
            .ok_or_else(|| anyhow!("bot `{name}` is not in BOT_KEYS")),
        None => Ok(Signer::generate()?),
    }
}

/// Print one event as an object, several as an array, none as nothing.
fn print_events(events: Option<Vec<Event>>) -> anyhow::Result<()> {
    match events.as_deref() {
        None | Some([]) => {}
        Some([single]) => println!("{}", serde_json::to_string(single)?),
        Some(many) => println!("{}", serde_json::to_string(many)?),
    }
    Ok(())
}

/// Create a default `.env` file if one is not already present at `path`.
fn ensure_env_file(path: &str) -> anyhow::Result<()> {
    let env_path = Path::new(path);
    if env_path.exists() {
        return Ok(());
    }
    if let Some(parent) = env_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut content = String::new();
    content.push_str("BIND_HTTP=127.0.0.1:8787\n");
    content.push_str("RELAY_URL=wss://yabu.me\n");
    content.push_str("RELAY_TIMEOUT_SECS=10\n");
    content.push_str("TOR_SOCKS=\n");
    content.push_str("VERIFY_SIG=1\n");
    content.push_str("BOT_KEYS=\n");
    content.push_str(&format!("QUIZ_CHANNEL={}\n", config::DEFAULT_QUIZ_CHANNEL));
    content.push_str("ALLOWED_CHANNELS=\n");
    content.push_str("DENIED_AUTHORS=\n");
    fs::write(env_path, content)?;
    Ok(())
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    run(cli).await
}
