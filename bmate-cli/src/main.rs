use anyhow::{Context, Result};
use bmate_robot::media::ConfiguredMediaDevices;
use bmate_robot::{
    DeviceFileSink, NegotiationMode, Notice, Notifier, PartyDirectory, RobotConfig, RobotSession,
    RtcPeerConnector, SessionCommand, SessionDeps, SessionError, SessionSettings, WsTransport,
};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bmate-robot")]
#[command(about = "Streams the robot camera to viewers and drives its motors")]
struct Cli {
    #[arg(short, long, default_value = "./bconfig/configs.json")]
    config: PathBuf,

    /// Name announced to the relay.
    #[arg(long)]
    nickname: Option<String>,

    /// Serial device of the motor controller.
    #[arg(long)]
    device: Option<PathBuf>,

    #[arg(long)]
    single_peer: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the relay and serve viewers (default).
    Run,
    /// Print the effective configuration as JSON.
    ShowConfig,
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Registered { .. } => println!("{}", "Registered on relay".green().bold()),
            Notice::AccessUrl(url) => {
                println!("{} {}", "Share this link:".cyan().bold(), url.underline())
            }
            Notice::Movement(instruction) => println!(
                "{}",
                format!(
                    "move {} {}",
                    instruction.move_type.as_deref().unwrap_or("?"),
                    instruction.direction.as_deref().unwrap_or("?")
                )
                .dimmed()
            ),
            Notice::Error(err @ (SessionError::NoDevice | SessionError::InvalidInstruction(_))) => {
                println!("{}", err.to_string().yellow())
            }
            Notice::Error(err) => println!("{}", err.to_string().red()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Run => run(config).await,
    }
}

fn load_config(cli: &Cli) -> Result<RobotConfig> {
    let mut config = if cli.config.exists() {
        RobotConfig::load(&cli.config)?
    } else {
        warn!("Config {} not found, using defaults", cli.config.display());
        RobotConfig::default()
    };

    if let Some(nickname) = &cli.nickname {
        config.nick_name = nickname.clone();
    }
    if let Some(device) = &cli.device {
        config.device.path = Some(device.clone());
    }
    if cli.single_peer {
        config.mode = NegotiationMode::SinglePeer;
    }
    Ok(config)
}

async fn run(config: RobotConfig) -> Result<()> {
    println!("{}", "Starting bmate robot...".green().bold());

    let (relay_tx, relay_rx) = mpsc::channel(256);
    let (transport, relay_task) =
        WsTransport::spawn(config.signaling_url(), config.reconnect_delay(), relay_tx);

    let deps = SessionDeps {
        transport: Arc::new(transport),
        connector: Arc::new(RtcPeerConnector::new(&config.web_rtc.ice_servers)),
        devices: Arc::new(ConfiguredMediaDevices::new(config.media.sources.clone())),
        notifier: Arc::new(ConsoleNotifier),
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let session = RobotSession::new(SessionSettings::from_config(&config), deps, cmd_rx, relay_rx);
    let directory = session.directory();
    let mut session_task = tokio::spawn(session.run());

    if let Some(path) = &config.device.path {
        attach_device(&cmd_tx, path).await;
    }

    print_help();
    tokio::select! {
        _ = &mut session_task => warn!("Session stopped on its own"),
        res = read_console(&cmd_tx, &directory) => res?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    let _ = cmd_tx.send(SessionCommand::Shutdown).await;
    if !session_task.is_finished() {
        let _ = session_task.await;
    }
    relay_task.abort();

    println!("{}", "Bye".green());
    Ok(())
}

async fn read_console(
    cmd_tx: &mpsc::Sender<SessionCommand>,
    directory: &PartyDirectory,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let mut words = line.split_whitespace();
        let cmd = match words.next() {
            Some("share") => SessionCommand::RequestRoomAccess,
            Some("register") => SessionCommand::Register,
            Some("device") => {
                match words.next() {
                    Some(path) => attach_device(cmd_tx, Path::new(path)).await,
                    None => println!("{}", "usage: device <path>".yellow()),
                }
                continue;
            }
            Some("detach") => SessionCommand::DetachDevice,
            Some("viewers") => {
                print_viewers(directory);
                continue;
            }
            Some("quit") | Some("exit") => break,
            Some(_) => {
                print_help();
                continue;
            }
            None => continue,
        };

        if cmd_tx.send(cmd).await.is_err() {
            break;
        }
    }

    Ok(())
}

async fn attach_device(cmd_tx: &mpsc::Sender<SessionCommand>, path: &Path) {
    match DeviceFileSink::open(path).await {
        Ok(sink) => {
            let _ = cmd_tx
                .send(SessionCommand::AttachDevice(Arc::new(sink)))
                .await;
            println!("{} {}", "Robot device:".green(), path.display());
        }
        Err(e) => println!("{}", format!("{e:#}").red()),
    }
}

fn print_viewers(directory: &PartyDirectory) {
    let viewers = directory.snapshot();
    if viewers.is_empty() {
        println!("{}", "No viewers".dimmed());
        return;
    }
    for (id, state) in viewers {
        println!("  {} {}", id.to_string().bold(), state);
    }
}

fn print_help() {
    println!(
        "{}",
        "commands: share | register | device <path> | detach | viewers | quit".cyan()
    );
}
