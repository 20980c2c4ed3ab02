use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use race_physics::clock::SimulationClock;
use race_physics::net::{self, Broadcaster, Viewers};
use race_physics::runner::{LogSink, PresentationLoop, RenderSink, SimulationLoop};
use race_physics::state::{Command, Snapshot};
use race_physics::trail::TrailSegment;
use race_physics::{RaceWorld, SimConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Top-down racing physics simulation")]
struct Args {
    /// JSON race config; defaults describe the stock oval race.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve frames to websocket viewers on this address (e.g. 0.0.0.0:9001).
    #[arg(long)]
    listen: Option<String>,

    /// Seed for waypoint jitter, spawn positions and liveries.
    #[arg(long)]
    seed: Option<u64>,

    /// Step with a constant dt (seconds) instead of measured wall time.
    #[arg(long)]
    fixed_dt: Option<f64>,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("🚀 Starting race simulation...");

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.runtime.listen = Some(listen);
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let world = RaceWorld::from_config(&config, seed).context("building the starting grid")?;

    let clock = match args.fixed_dt {
        Some(dt) if dt > 0.0 => {
            info!("⏱️ Fixed step {dt}s");
            SimulationClock::fixed(dt)
        }
        Some(dt) => anyhow::bail!("--fixed-dt must be positive, got {dt}"),
        None => {
            // measured dt: replays are not reproducible
            SimulationClock::wall(config.runtime.max_dt)
        }
    };

    // -------------------------------
    // Channels between the loops
    // -------------------------------
    let (command_tx, command_rx) = mpsc::unbounded_channel::<Command>();
    let (frame_tx, frame_rx) = watch::channel(Arc::new(world.snapshot(0.0)));
    let (trail_tx, trail_rx) = mpsc::channel::<TrailSegment>(config.runtime.trail_channel.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut sim = SimulationLoop::new(world, clock, command_rx, frame_tx, trail_tx, shutdown_rx.clone())
        .with_idle(Duration::from_micros(config.runtime.sim_idle_us));
    if let Some(ticks) = args.ticks {
        sim = sim.with_max_ticks(ticks);
    }

    let period = Duration::from_millis(config.runtime.presentation_interval_ms);
    let sink: Box<dyn RenderSink> = match &config.runtime.listen {
        Some(addr) => {
            let viewers: Viewers = Arc::default();
            let listener = net::bind(addr).await.with_context(|| format!("binding {addr}"))?;
            tokio::spawn(net::serve(listener, Arc::clone(&viewers), command_tx.clone(), shutdown_rx.clone()));
            Box::new(Broadcaster::new(viewers))
        }
        None => Box::new(LogSink::new(200)),
    };
    let presentation = tokio::spawn(PresentationLoop::new(sink, frame_rx, trail_rx, shutdown_rx, period).run());

    // -------------------------------
    // Run until Ctrl-C or the tick limit
    // -------------------------------
    let simulation = tokio::spawn(sim.run());
    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            let _ = ctrl_c_shutdown.send(true);
        }
    });

    let world = simulation.await.context("simulation task panicked")?;
    let _ = shutdown_tx.send(true);
    if presentation.await.is_err() {
        warn!("⚠️ Presentation task panicked");
    }
    drop(command_tx);

    let last: Snapshot = world.snapshot(0.0);
    for v in &last.vehicles {
        info!(
            "🏁 {:<8} at ({:>6.1}, {:>6.1}) heading {:>5.1}° speed {:>5.1}",
            v.name, v.position.x, v.position.y, v.rotation, v.speed
        );
    }
    Ok(())
}
