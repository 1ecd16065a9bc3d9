//! presencectl - talk to presenced from the command line

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use presence_api::{ActivityKind, Command, EventPayload};
use presence_ipc::IpcClient;
use presence_util::{default_socket_path, StaffId};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "presencectl")]
#[command(about = "Control and inspect the presenced service", long_about = None)]
struct Args {
    /// Socket path (or set PRESENCE_SOCKET env var)
    #[arg(short, long, env = "PRESENCE_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON payloads
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show the current session and gate state
    State,
    /// Start confirmation cycles for a staff member
    Start {
        #[arg(long)]
        staff: String,
    },
    /// End the current session
    End,
    /// Approve the visible confirmation prompt
    Approve,
    /// Report user activity
    Activity {
        #[arg(value_enum)]
        kind: ActivityArg,
    },
    /// Confirmed and missed prompts for a day
    Tally {
        #[arg(long)]
        staff: String,
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Reload the service configuration
    Reload,
    /// Service health
    Health,
    Ping,
    /// Stream events until interrupted
    Watch,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ActivityArg {
    Pointer,
    Key,
    Click,
}

impl From<ActivityArg> for ActivityKind {
    fn from(arg: ActivityArg) -> Self {
        match arg {
            ActivityArg::Pointer => ActivityKind::Pointer,
            ActivityArg::Key => ActivityKind::Key,
            ActivityArg::Click => ActivityKind::Click,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(socket = %args.socket.display(), "Connecting to presenced");

    let mut client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to presenced at {:?}", args.socket))?;

    let command = match args.command {
        Cmd::Watch => return watch(client, args.json).await,
        Cmd::State => Command::GetState,
        Cmd::Start { staff } => Command::StartSession {
            staff_id: StaffId::parse(&staff).context("Invalid staff id")?,
        },
        Cmd::End => Command::EndSession,
        Cmd::Approve => Command::Approve,
        Cmd::Activity { kind } => Command::RecordActivity { kind: kind.into() },
        Cmd::Tally { staff, day } => Command::GetTally {
            staff_id: StaffId::parse(&staff).context("Invalid staff id")?,
            day,
        },
        Cmd::Reload => Command::ReloadConfig,
        Cmd::Health => Command::GetHealth,
        Cmd::Ping => Command::Ping,
    };

    let payload = client.call(command).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", render::payload(&payload));
    }

    Ok(())
}

async fn watch(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client.subscribe().await?;

    loop {
        let event = events.next().await?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", render::event(&event));
        }
        if matches!(event.payload, EventPayload::Shutdown) {
            return Ok(());
        }
    }
}
