use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use floorboard_cli::call::{CallError, CallSession, StubMedia};
use floorboard_cli::identity::{self, DeviceIdentity, IdentityError, LocalSettings};
use floorboard_cli::now_ms;
use floorboard_cli::poller::{Incoming, IncomingCall, NotificationPoller};
use floorboard_cli::source::{DataSource, InMemoryFixtureSource, RemoteHttpSource, SourceError};
use floorboard_cli::sync::{SyncEngine, SyncTimings};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wire::ChatMessage;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("setup needs a live server; drop --fixtures")]
    SetupWithFixtures,
}

#[derive(Parser, Debug)]
#[command(name = "floorboard-agent", about = "Floorboard kiosk device agent")]
struct Cli {
    /// Local settings file holding the device identity.
    #[arg(long, env = "FLOORBOARD_SETTINGS", default_value = "floorboard-agent.json")]
    settings: PathBuf,

    /// Serve everything from in-memory fixtures instead of the server.
    #[arg(long, default_value_t = false)]
    fixtures: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// First-run setup: probe the server, then register this device.
    Setup {
        #[arg(long, env = "FLOORBOARD_SERVER_URL", default_value = identity::DEFAULT_SERVER_URL)]
        server_url: String,
        #[arg(long)]
        name: String,
    },
    /// Sync the shared document and watch for calls and chat until Ctrl-C.
    Run {
        /// Accept incoming calls instead of declining them.
        #[arg(long, default_value_t = false)]
        answer_calls: bool,
    },
    /// List known devices.
    Devices,
    /// Rename this device.
    Rename { name: String },
    /// Send a chat message.
    Send {
        #[arg(long)]
        to: String,
        text: String,
    },
    /// List chat messages, newest first.
    Messages,
    /// Offer a call to another device.
    Call {
        #[arg(long)]
        to: String,
    },
    /// Print the shared document as the server holds it.
    State,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,floorboard_cli=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = LocalSettings::load(&cli.settings)?;

    if let Command::Setup { server_url, name } = &cli.command {
        if cli.fixtures {
            return Err(CliError::SetupWithFixtures);
        }
        let probe = RemoteHttpSource::new(server_url, "unknown")?;
        let identity = identity::setup(&probe, &cli.settings, server_url, name, now_ms()).await?;
        println!("{}", identity.device_id);
        return Ok(());
    }

    let (identity, source): (DeviceIdentity, Arc<dyn DataSource>) = if cli.fixtures {
        let identity = DeviceIdentity::from_settings(&settings).unwrap_or_else(|_| DeviceIdentity::preview());
        let source = Arc::new(InMemoryFixtureSource::new(&identity.device_id));
        (identity, source)
    } else {
        let identity = DeviceIdentity::from_settings(&settings)?;
        let source = Arc::new(RemoteHttpSource::for_identity(&identity)?);
        (identity, source)
    };

    match cli.command {
        Command::Setup { .. } => Ok(()),
        Command::Run { answer_calls } => run(identity, source, answer_calls).await,
        Command::Devices => print_json(&source.devices().await?),
        Command::Rename { name } => {
            source.rename_device(&identity.device_id, name.trim()).await?;
            let mut settings = settings;
            settings.device_name = Some(name.trim().to_owned());
            settings.save(&cli.settings)?;
            tracing::info!(device_id = %identity.device_id, name = %name.trim(), "device renamed");
            Ok(())
        }
        Command::Send { to, text } => {
            let now = now_ms();
            let message = ChatMessage {
                id: format!("msg_{now}"),
                from: identity.device_id.clone(),
                to,
                text,
                timestamp: now,
            };
            source.send_message(&message).await?;
            print_json(&message)
        }
        Command::Messages => print_json(&source.messages().await?),
        Command::Call { to } => {
            let mut session = CallSession::new(source, Arc::new(StubMedia), &identity);
            let notification_id = session.start_call(&to).await?;
            print_json(&serde_json::json!({ "notificationId": notification_id, "state": session.state().name() }))
        }
        Command::State => {
            let state = source.fetch_state().await?;
            print_json(&state)
        }
    }
}

async fn run(identity: DeviceIdentity, source: Arc<dyn DataSource>, answer_calls: bool) -> Result<(), CliError> {
    let timings = SyncTimings::default();
    let engine = SyncEngine::new(Arc::clone(&source), &identity, timings);
    let bootstrap = engine.bootstrap().await;
    tracing::info!(device_id = %identity.device_id, ?bootstrap, "agent started");

    if engine.is_connected() {
        if let Err(e) = source.register_device(&identity.device_id, &identity.device_name).await {
            tracing::warn!(error = %e, "device registration refresh failed");
        }
    }

    let polling = engine.spawn_polling();
    let (tx, mut rx) = mpsc::channel::<Incoming>(32);
    let poller = Arc::new(NotificationPoller::new(Arc::clone(&source), &identity, tx));
    let inbox = poller.spawn(timings.notification_poll);
    let mut calls = CallSession::new(Arc::clone(&source), Arc::new(StubMedia), &identity);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                print_json(&event)?;
                if let Incoming::Call(call) = event {
                    handle_call(&mut calls, call, answer_calls).await?;
                }
            }
        }
    }

    polling.abort();
    inbox.abort();
    if engine.has_pending_push() {
        engine.push_now().await?;
    }
    tracing::info!("agent stopped");
    Ok(())
}

async fn handle_call(calls: &mut CallSession, call: IncomingCall, answer: bool) -> Result<(), CliError> {
    if let Err(e) = calls.ring(call) {
        tracing::warn!(error = %e, "ignoring incoming call");
        return Ok(());
    }
    if !answer {
        calls.decline()?;
        return Ok(());
    }
    match calls.accept().await {
        Ok(answer) => {
            print_json(&serde_json::json!({
                "event": "answered",
                "answer": answer,
                "delivery": format!("{:?}", calls.answer_delivery()),
            }))?;
            // No media can flow without the answer reaching the caller.
            calls.end();
        }
        Err(e) => tracing::warn!(error = %e, "failed to accept call"),
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
