use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Select;
use nearspace_core::{Direction, Participant, ParticipantId, Room};
use nearspace_engine::{
    EngineConfig, LocalTrack, MediaDevices, MediaError, MediaSource, MediaSourceManager,
    OrchestratorHandle, PositionReporter, ProximityEngine, RelayClient, SPAWN_POSITION,
    SessionOrchestrator, SignalingError, SpatialModel, WALL_THICKNESS, WebRtcTransportFactory, pump,
    wall_segments,
};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cargo-nearspace")]
#[command(bin_name = "cargo-nearspace")]
enum Cli {
    Nearspace(NearspaceArgs),
}

#[derive(clap::Args)]
struct NearspaceArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a layout's rooms, or who is nearby whom for a set of participants.
    Inspect {
        /// Layout JSON. The built-in office map is used when omitted.
        #[arg(long)]
        layout: Option<String>,

        /// JSON array of participants to evaluate proximity for.
        #[arg(long)]
        participants: Option<String>,

        #[arg(long)]
        self_id: Option<String>,

        #[arg(long)]
        room: Option<String>,
    },

    /// Join a space through the relay and keep sessions with nearby participants.
    Join {
        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        space: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        layout: Option<String>,
    },
}

fn main() -> Result<()> {
    let Cli::Nearspace(args) = Cli::parse();

    match args.command {
        Commands::Inspect {
            layout,
            participants,
            self_id,
            room,
        } => {
            let model = load_layout(layout.as_deref())?;
            match participants {
                Some(path) => inspect_proximity(&model, &path, self_id)?,
                None => inspect_layout(&model, room)?,
            }
        }
        Commands::Join {
            config,
            space,
            name,
            layout,
        } => {
            let mut config = match config {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read config {}", path))?;
                    EngineConfig::from_json(&json)?
                }
                None => EngineConfig::default(),
            };
            if let Some(space) = space {
                config.space_id = space;
            }
            if let Some(name) = name {
                config.display_name = name;
            }
            config.validate()?;

            let model = load_layout(layout.as_deref())?;

            tokio::runtime::Runtime::new()
                .context("Failed to start runtime")?
                .block_on(join(config, model))?;
        }
    }

    Ok(())
}

fn load_layout(path: Option<&str>) -> Result<SpatialModel> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read layout {}", path))?;
            SpatialModel::from_json(&json).context("Invalid layout")
        }
        None => Ok(SpatialModel::reference_layout()),
    }
}

fn inspect_layout(model: &SpatialModel, room: Option<String>) -> Result<()> {
    println!("{}", format!("🗺  {} rooms", model.rooms().len()).green().bold());
    for room in model.rooms() {
        println!(
            "   {} {} ({}, {}) {}x{}",
            room.room_id.as_str().cyan(),
            room.name,
            room.bounds.x,
            room.bounds.y,
            room.bounds.width,
            room.bounds.height
        );
    }

    let selected: &Room = match room {
        Some(id) => model
            .rooms()
            .iter()
            .find(|r| r.room_id.as_str() == id)
            .with_context(|| format!("Unknown room {}", id))?,
        None => {
            let names: Vec<&str> = model.rooms().iter().map(|r| r.name.as_str()).collect();
            if names.is_empty() {
                return Ok(());
            }
            let index = Select::new()
                .with_prompt("Show walls of")
                .items(&names)
                .default(0)
                .interact()?;
            &model.rooms()[index]
        }
    };

    println!("{}", format!("🧱 Walls of {}", selected.name).yellow().bold());
    for wall in wall_segments(selected, WALL_THICKNESS) {
        println!(
            "   ({}, {}) {}x{}",
            wall.x, wall.y, wall.width, wall.height
        );
    }
    Ok(())
}

fn inspect_proximity(model: &SpatialModel, path: &str, self_id: Option<String>) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read participants {}", path))?;
    let mut participants: Vec<Participant> =
        serde_json::from_str(&json).context("Invalid participants file")?;

    // Participants without an explicit room are placed by the layout.
    for p in participants.iter_mut() {
        if p.room_id.is_none() {
            p.room_id = model.room_at(p.position.x, p.position.y);
        }
    }

    if participants.is_empty() {
        bail!("No participants in {}", path);
    }

    let observer_id = match self_id {
        Some(id) => ParticipantId::from(id),
        None => {
            let ids: Vec<&str> = participants
                .iter()
                .map(|p| p.participant_id.as_str())
                .collect();
            let index = Select::new()
                .with_prompt("Observe as")
                .items(&ids)
                .default(0)
                .interact()?;
            participants[index].participant_id.clone()
        }
    };

    let observer = participants
        .iter()
        .find(|p| p.participant_id == observer_id)
        .with_context(|| format!("Unknown participant {}", observer_id))?;

    let engine = ProximityEngine::default();
    let nearby = engine.compute_nearby(observer, participants.iter());

    let place = observer
        .room_id
        .as_ref()
        .map(|r| r.as_str().to_owned())
        .unwrap_or_else(|| "open space".to_owned());
    println!(
        "{}",
        format!("👀 {} in {}", observer.participant_id, place)
            .green()
            .bold()
    );

    for p in participants.iter().filter(|p| p.participant_id != observer_id) {
        if nearby.contains(&p.participant_id) {
            println!(
                "   {} {} (volume {:.2})",
                "●".green(),
                p.participant_id,
                engine.volume_for(observer, p)
            );
        } else {
            println!("   {} {}", "○".dimmed(), p.participant_id.to_string().dimmed());
        }
    }

    Ok(())
}

/// Capture backend for a terminal client: nothing to capture, so every
/// device request fails and sessions are receive-only.
struct ReceiveOnlyDevices;

#[async_trait]
impl MediaDevices for ReceiveOnlyDevices {
    async fn acquire(&self, source: MediaSource) -> Result<LocalTrack, MediaError> {
        Err(MediaError::DeviceUnavailable(source.label().to_owned()))
    }
}

async fn join(config: EngineConfig, model: SpatialModel) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    println!(
        "{}",
        format!("🚀 Joining {} as {}", config.space_id, config.self_id)
            .green()
            .bold()
    );

    let mut media = MediaSourceManager::new(Arc::new(ReceiveOnlyDevices));

    let (client, events) = RelayClient::connect(&config, SPAWN_POSITION).await?;
    let factory = WebRtcTransportFactory::new(config.transport_config());

    let (orchestrator, handle) = SessionOrchestrator::new(
        config.clone(),
        Arc::new(client.clone()),
        Arc::new(factory),
        media.subscribe(),
    );
    let remote_streams = orchestrator.remote_streams();

    let orchestrator_task = tokio::spawn(orchestrator.run());
    tokio::spawn(pump(events, handle.clone()));

    let mut reporter =
        PositionReporter::new(config.movement_threshold, config.max_updates_per_second);
    move_to(&handle, &client, &config, &model, &mut reporter, SPAWN_POSITION.x, SPAWN_POSITION.y)
        .await?;

    println!(
        "{}",
        "Commands: move <x> <y> | video | audio | screen | status | quit".cyan()
    );

    // Moves held back by the rate limit go out once it allows.
    let mut flush = tokio::time::interval(Duration::from_millis(100));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = flush.tick() => {
                if let Some(update) = reporter.take_pending(Instant::now()) {
                    publish(client.publish_move(&config.self_id, update));
                }
                continue;
            }
        };

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["move", x, y] => {
                let (Ok(x), Ok(y)) = (x.parse::<f64>(), y.parse::<f64>()) else {
                    println!("{}", "Usage: move <x> <y>".red());
                    continue;
                };
                move_to(&handle, &client, &config, &model, &mut reporter, x, y).await?;
            }
            ["video"] => {
                let flags = media.toggle_video().await;
                publish(client.publish_media(&config.self_id, flags));
                println!("   video: {}, audio: {}", flags.video, flags.audio);
            }
            ["audio"] => {
                let flags = media.toggle_audio().await;
                publish(client.publish_media(&config.self_id, flags));
                println!("   video: {}, audio: {}", flags.video, flags.audio);
            }
            ["screen"] => {
                let flags = media.toggle_screen_share().await;
                publish(client.publish_media(&config.self_id, flags));
                println!("   sharing: {}", media.is_screen_sharing());
            }
            ["status"] => {
                let snapshot = handle.snapshot().await?;
                let relay = if snapshot.ready {
                    "ready".green()
                } else {
                    "connecting".yellow()
                };
                println!(
                    "   relay {} | {} participants | nearby {:?}",
                    relay, snapshot.participants, snapshot.nearby
                );
                for (id, session) in &snapshot.sessions {
                    println!(
                        "   {} {:?} initiator={} remote_media={}",
                        id.to_string().cyan(),
                        session.state,
                        session.initiator,
                        remote_streams.contains(id)
                    );
                }
            }
            ["quit"] | ["exit"] => break,
            [] => {}
            _ => println!("{}", format!("Unknown command: {}", line).red()),
        }
    }

    handle.shutdown().await?;
    orchestrator_task.await?;
    println!("{}", "👋 Left the space".green().bold());
    Ok(())
}

async fn move_to(
    handle: &OrchestratorHandle,
    client: &RelayClient,
    config: &EngineConfig,
    model: &SpatialModel,
    reporter: &mut PositionReporter,
    x: f64,
    y: f64,
) -> Result<()> {
    let update = model.locate(x, y, Direction::Down, false);

    if reporter.should_emit(&update, Instant::now()) {
        publish(client.publish_move(&config.self_id, update.clone()));
    }
    handle.local_moved(update).await?;
    Ok(())
}

/// Relay hiccups are not fatal here: the client reconnects on its own and
/// the local state stays authoritative.
fn publish(result: Result<(), SignalingError>) {
    if let Err(e) = result {
        eprintln!("{}", format!("⚠️  Relay update not sent: {}", e).yellow());
    }
}
