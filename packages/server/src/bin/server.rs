//! Dojo game server.
//!
//! Runs the challenge/break game loop, accepts players over WebSocket, and
//! executes submitted code in docker containers.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin dojo-server
//! cargo run --bin dojo-server -- --host 0.0.0.0 --port 3000 --seed-file seed.json
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use dojo_server::{
    config::{HubConfig, ServerConfig},
    domain::SharedGameState,
    infrastructure::{
        message_pusher::ConnectionHub,
        repository::{InMemoryChallengeRepository, InMemoryUserRepository, load_seed_file},
        sandbox::{DockerSandbox, DockerSandboxConfig, ExecutorConfig, SandboxExecutor},
        state_store::InMemoryStateStore,
    },
    ui::{AppState, Server},
    usecase::{
        AuthenticateUserUseCase, ConnectPlayerUseCase, DisconnectPlayerUseCase, EventRouter,
        GameConfig, GameStateMachine, GetGameStateUseCase, RunCodeUseCase,
    },
};
use dojo_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "dojo-server")]
#[command(about = "Real-time coding challenge game server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "DOJO_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "DOJO_PORT", default_value = "8080")]
    port: u16,

    /// JSON file with challenges and users to load at startup
    #[arg(long, env = "DOJO_SEED_FILE")]
    seed_file: Option<PathBuf>,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "DOJO_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Length of the first countdown after startup, in seconds
    #[arg(long, env = "DOJO_BOOTSTRAP_SECONDS", default_value = "5")]
    bootstrap_seconds: u32,

    /// Length of a break, in seconds
    #[arg(long, env = "DOJO_BREAK_SECONDS", default_value = "3")]
    break_seconds: u32,

    /// Number of sandbox workers
    #[arg(long, env = "DOJO_WORKERS", default_value = "32")]
    workers: usize,

    /// Capacity of the execution queue
    #[arg(long, env = "DOJO_QUEUE_CAPACITY", default_value = "256")]
    queue_capacity: usize,

    /// Wall-clock limit for one execution, in seconds
    #[arg(long, env = "DOJO_EXECUTION_TIMEOUT", default_value = "10")]
    execution_timeout: u64,

    /// Cap on captured stdout and on captured stderr, in bytes
    #[arg(long, env = "DOJO_MAX_OUTPUT_BYTES", default_value = "65536")]
    max_output_bytes: usize,

    /// Path or name of the docker CLI
    #[arg(long, env = "DOJO_DOCKER", default_value = "docker")]
    docker: String,

    /// Capacity of each connection's outbound queue
    #[arg(long, env = "DOJO_OUTBOUND_QUEUE_CAPACITY", default_value = "256")]
    outbound_queue_capacity: usize,

    /// Largest inbound WebSocket message, in bytes
    #[arg(long, env = "DOJO_MAX_MESSAGE_SIZE", default_value = "16384")]
    max_message_size: usize,

    /// Seconds without any inbound frame before a connection is dropped
    #[arg(long, env = "DOJO_PONG_WAIT", default_value = "60")]
    pong_wait: u64,

    /// Seconds between server pings (defaults to 9/10 of the pong wait)
    #[arg(long, env = "DOJO_PING_PERIOD")]
    ping_period: Option<u64>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let pong_wait = Duration::from_secs(self.pong_wait);
        let ping_period = self
            .ping_period
            .map(Duration::from_secs)
            .unwrap_or(pong_wait * 9 / 10);

        ServerConfig {
            host: self.host,
            port: self.port,
            seed_file: self.seed_file,
            hub: HubConfig {
                outbound_queue_capacity: self.outbound_queue_capacity,
                max_message_size: self.max_message_size,
                pong_wait,
                ping_period,
                ..HubConfig::default()
            },
            game: GameConfig {
                bootstrap_seconds: self.bootstrap_seconds,
                break_seconds: self.break_seconds,
                ..GameConfig::default()
            },
            executor: ExecutorConfig {
                workers: self.workers,
                queue_capacity: self.queue_capacity,
                timeout: Duration::from_secs(self.execution_timeout),
            },
            sandbox: DockerSandboxConfig {
                docker_binary: self.docker,
                max_output_bytes: self.max_output_bytes,
                ..DockerSandboxConfig::default()
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = run(args.into_config()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    // Initialize dependencies in order:
    // 1. Repositories and shared state
    // 2. MessagePusher
    // 3. Sandbox executor
    // 4. UseCases
    // 5. Game loop and server

    // 1. Repositories (in-memory) and the shared state store
    let challenge_repository = Arc::new(InMemoryChallengeRepository::new());
    let user_repository = Arc::new(InMemoryUserRepository::new());
    if let Some(path) = &config.seed_file {
        let (challenges, users) = load_seed_file(path)
            .await?
            .apply(challenge_repository.as_ref(), user_repository.as_ref())
            .await?;
        tracing::info!(
            "Loaded {} challenges and {} users from {}",
            challenges,
            users,
            path.display()
        );
    } else {
        tracing::warn!("No seed file given, the game will wait for challenges");
    }
    let game_state = SharedGameState::new(Arc::new(InMemoryStateStore::new()));

    // 2. MessagePusher (WebSocket connection hub)
    let hub = Arc::new(ConnectionHub::new());

    // 3. Sandbox executor
    let sandbox = Arc::new(DockerSandbox::new(config.sandbox.clone()));
    let executor = Arc::new(SandboxExecutor::start(
        sandbox,
        hub.clone(),
        config.executor.clone(),
    ));

    // 4. UseCases
    let authenticate_user_usecase =
        Arc::new(AuthenticateUserUseCase::new(user_repository.clone()));
    let connect_player_usecase = Arc::new(ConnectPlayerUseCase::new(
        game_state.clone(),
        challenge_repository.clone(),
        user_repository.clone(),
        hub.clone(),
    ));
    let disconnect_player_usecase = Arc::new(DisconnectPlayerUseCase::new(
        game_state.clone(),
        hub.clone(),
    ));
    let run_code_usecase = Arc::new(RunCodeUseCase::new(
        game_state.clone(),
        challenge_repository.clone(),
        executor.clone(),
        hub.clone(),
    ));
    let event_router = Arc::new(EventRouter::new(run_code_usecase));
    let get_game_state_usecase = Arc::new(GetGameStateUseCase::new(
        game_state.clone(),
        hub.clone(),
    ));

    // 5. Game loop and server
    let game = Arc::new(GameStateMachine::new(
        game_state,
        challenge_repository,
        hub,
        config.game.clone(),
    ));
    game.bootstrap().await?;
    let game_handle = game.start();

    let server = Server::new(AppState {
        authenticate_user_usecase,
        connect_player_usecase,
        disconnect_player_usecase,
        event_router,
        get_game_state_usecase,
        hub_config: config.hub.clone(),
    });
    let result = server.run(&config.host, config.port).await;

    game_handle.stop().await;
    executor.shutdown().await;

    result
}
