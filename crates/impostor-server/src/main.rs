//! Authoritative Axum server for the impostor party game.
//!
//! Two listeners share one orchestrator:
//!
//! | Port    | Path           | Description                          |
//! |---------|----------------|--------------------------------------|
//! | `8765`  | `/`, `/ws`     | WebSocket for players                |
//! | `54813` | `/`, `/ws`     | WebSocket for admins                 |
//! | `54813` | `/api/players` | Current roster (JSON)                |
//!
//! Every game constant can be overridden by flag or environment variable;
//! see `--help`.

mod app;
mod error;
mod orchestrator;
mod player;
mod tasks;
mod ws_handler;

use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use impostor_core::rules::{self, GameConfig};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use app::AppState;
use error::ServerError;
use orchestrator::Orchestrator;

#[derive(Parser, Debug)]
#[command(name = "impostor-server", about = "Impostor game server")]
struct Cli {
    /// Address both listeners bind to.
    #[arg(long, env = "IMPOSTOR_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port of the player WebSocket endpoint.
    #[arg(long, env = "IMPOSTOR_PLAYER_PORT", default_value_t = 8765)]
    player_port: u16,

    /// Port of the admin WebSocket endpoint.
    #[arg(long, env = "IMPOSTOR_ADMIN_PORT", default_value_t = 54813)]
    admin_port: u16,

    /// Length of one game in seconds.
    #[arg(long, env = "IMPOSTOR_GAME_LENGTH", default_value_t = rules::GAME_TOTAL_LENGTH)]
    game_length: u32,

    /// Tasks handed to each crewmate.
    #[arg(long, env = "IMPOSTOR_STARTING_TASKS", default_value_t = rules::STARTING_TASK_COUNT)]
    starting_tasks: u32,

    /// Impostor draw probability and soft share cap.
    #[arg(long, env = "IMPOSTOR_AMOUNT", default_value_t = rules::IMPOSTOR_AMOUNT)]
    impostor_amount: f64,

    /// Seconds an emergency meeting stays open.
    #[arg(
        long,
        env = "IMPOSTOR_MEETING_LENGTH",
        default_value_t = rules::EMERGENCY_MEETING_LENGTH,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    meeting_length: u64,

    /// Minimum seconds between meetings.
    #[arg(long, env = "IMPOSTOR_MEETING_COOLDOWN", default_value_t = rules::MEETING_COOLDOWN)]
    meeting_cooldown: u64,

    /// Seconds between timer resyncs to players.
    #[arg(
        long,
        env = "IMPOSTOR_TIMER_INTERVAL",
        default_value_t = rules::TIMER_BROADCAST_INTERVAL_SECONDS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timer_interval: u64,

    /// Seconds between roster pushes to admins.
    #[arg(
        long,
        env = "IMPOSTOR_ROSTER_INTERVAL",
        default_value_t = rules::PLAYER_LIST_BROADCAST_INTERVAL_SECONDS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    roster_interval: u64,
}

impl Cli {
    fn game_config(&self) -> GameConfig {
        GameConfig {
            player_list_broadcast_interval_secs: self.roster_interval,
            timer_broadcast_interval_secs: self.timer_interval,
            emergency_meeting_length_secs: self.meeting_length,
            starting_task_count: self.starting_tasks,
            game_total_length_secs: self.game_length,
            impostor_amount: self.impostor_amount,
            meeting_cooldown_secs: self.meeting_cooldown,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialise tracing (respects RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let config = cli.game_config();
    let state = AppState {
        orchestrator: Orchestrator::shared(config),
    };

    let player_addr = SocketAddr::new(cli.host, cli.player_port);
    let admin_addr = SocketAddr::new(cli.host, cli.admin_port);
    let player_listener = bind(player_addr).await?;
    let admin_listener = bind(admin_addr).await?;

    let _tasks = tasks::spawn_background_tasks(&state.orchestrator).await;

    tracing::info!(?config, "Game configured");
    tracing::info!("Player endpoint listening on {player_addr}");
    tracing::info!("Admin endpoint listening on {admin_addr}");

    tokio::try_join!(
        axum::serve(player_listener, app::player_router(state.clone())).into_future(),
        axum::serve(admin_listener, app::admin_router(state)).into_future(),
    )?;
    Ok(())
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}
