use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use meshcall::model::IceServerConfig;
use meshcall::peer::{CallEngine, EngineConfig, SessionCommand, SessionConfig, SessionEvent};
use meshcall::server::RelayConfig;
use meshcall::RoomCode;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshcall")]
#[command(about = "Mesh video calls: signaling relay and headless participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay(RelayArgs),
    /// Join a room from the terminal: chat, captions and roster, no media.
    Join(JoinArgs),
}

#[derive(Args)]
struct TurnArgs {
    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    turn_credential: Option<String>,
}

impl TurnArgs {
    /// Default STUN servers, plus the TURN server when one is configured.
    fn ice_servers(&self) -> Vec<IceServerConfig> {
        let mut servers = IceServerConfig::default_stun();
        if let Some(url) = &self.turn_url {
            servers.push(IceServerConfig {
                urls: vec![url.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            });
        }
        servers
    }
}

#[derive(Args)]
struct RelayArgs {
    #[arg(long, env = "MESHCALL_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Origins allowed to open the WebSocket. Any origin when omitted.
    #[arg(long = "allowed-origin", env = "MESHCALL_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Chat messages kept per room for late joiners.
    #[arg(long, default_value_t = 100)]
    chat_history: usize,

    #[command(flatten)]
    turn: TurnArgs,
}

#[derive(Args)]
struct JoinArgs {
    #[arg(long, env = "MESHCALL_RELAY_URL", default_value = "ws://127.0.0.1:8000/ws")]
    relay: String,

    #[arg(short, long)]
    room: String,

    #[arg(short, long, default_value = "Guest")]
    name: String,

    /// Also send captions through the relay.
    #[arg(long)]
    relay_captions: bool,

    #[command(flatten)]
    turn: TurnArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Relay(args) => run_relay(args).await,
        Commands::Join(args) => run_join(args).await,
    }
}

async fn run_relay(args: RelayArgs) -> Result<()> {
    let config = RelayConfig {
        bind: args.bind,
        ice_servers: args.turn.ice_servers(),
        chat_history_limit: args.chat_history,
        allowed_origins: args.allowed_origins,
        ..RelayConfig::default()
    };

    println!("{}", "📡 Starting meshcall relay...".green().bold());
    println!("   🔌 Listening: ws://{}/ws", config.bind);
    if config.allowed_origins.is_empty() {
        println!("   🌐 Origins:   {}", "any".yellow());
    } else {
        println!("   🌐 Origins:   {}", config.allowed_origins.join(", "));
    }
    if args.turn.turn_url.is_none() {
        println!("   {}", "No TURN server configured, STUN only".yellow());
    }

    meshcall::server::serve(config).await
}

async fn run_join(args: JoinArgs) -> Result<()> {
    let room = RoomCode::parse(args.room).context("Invalid room code")?;

    let config = EngineConfig {
        relay_url: args.relay.clone(),
        room: room.clone(),
        session: SessionConfig {
            display_name: args.name,
            ice_servers: args.turn.ice_servers(),
            caption_relay_fallback: args.relay_captions,
            ..SessionConfig::default()
        },
    };

    println!("{}", format!("📞 Joining {room} via {}", args.relay).green().bold());

    let (engine, mut events) = CallEngine::connect(config)
        .await
        .context("Failed to reach the relay")?;

    tokio::spawn(read_stdin(engine.commands()));
    let engine_task = tokio::spawn(engine.run());

    while let Some(event) = events.recv().await {
        if !print_event(event) {
            break;
        }
    }

    engine_task.await?;
    Ok(())
}

/// Every stdin line is a chat message. `/quit` or end of input hangs up.
async fn read_stdin(commands: mpsc::UnboundedSender<SessionCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if commands.send(SessionCommand::Chat(line.to_owned())).is_err() {
            return;
        }
    }

    let _ = commands.send(SessionCommand::Teardown);
}

/// `false` once the session has closed.
fn print_event(event: SessionEvent) -> bool {
    match event {
        SessionEvent::Connected { participant_id } => {
            println!("{} {}", "✔ Connected as".green(), participant_id);
        }
        SessionEvent::RosterChanged { roster } => {
            println!("{}", format!("👥 {} in room", roster.len()).cyan());
        }
        SessionEvent::LinkState { remote, state } => {
            println!("   🔗 {remote}: {state:?}");
        }
        SessionEvent::Track { remote, track } => {
            println!("   🎥 {remote} sends {:?}", track.kind());
        }
        SessionEvent::Caption(caption) => {
            println!("{} {}: {}", "[caption]".magenta(), caption.sender.bold(), caption.text);
        }
        SessionEvent::Chat { text, sender, .. } => {
            println!("{}: {}", sender.bold(), text);
        }
        SessionEvent::ScreenShare { active } => {
            println!("   🖥  Screen share {}", if active { "on" } else { "off" });
        }
        SessionEvent::Error(e) => {
            eprintln!("{} {}", "✖".red(), e);
        }
        SessionEvent::Closed => {
            println!("{}", "👋 Call ended".green().bold());
            return false;
        }
    }
    true
}
