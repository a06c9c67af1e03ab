//! The driver binary: loads the static catalog, builds the [`Hub`], and runs the
//! [`ironclad::driver::Driver`] control loop on the main thread. No socket layer lives here —
//! that's an external collaborator reached only through [`ironclad::transport`]; this binary's
//! own default is [`ironclad::transport::LoggingTransport`], which logs every outbound frame
//! instead of delivering it anywhere, so the simulation is runnable and observable standalone.

use std::time::{Duration, Instant};

use clap::Parser;
use ironclad::driver::{Driver, DriverConfig};
use ironclad::http::PlayerCountGauge;
use ironclad::transport::LoggingTransport;
use ironclad::Hub;
use ironclad_bot::BotConfig;

/// Environment/flags: an admin-unlock string, the listen port (unused without a real transport,
/// kept for parity with the wire contract's shape), `minPlayers`, and the bot max-spawn level.
#[derive(Parser)]
struct Args {
    /// Admin unlock string. A spawn/upgrade request authenticated with this value bypasses the
    /// normal level-1/score gates.
    #[arg(long)]
    auth: Option<String>,

    /// Listen port a real transport adapter would bind. Not consulted by this binary directly.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Floor on total connected sessions (real players + bots) the bot timer tops up to.
    #[arg(long, default_value_t = 4)]
    min_players: usize,

    /// Bots maintained per real player once `min_players` is already satisfied.
    #[arg(long, default_value_t = 0.5)]
    min_bot_ratio: f32,

    /// Highest boat level a bot may spawn at without authentication.
    #[arg(long, default_value_t = 2)]
    bot_max_spawn_level: u8,

    /// Highest boat level a bot will proactively upgrade into.
    #[arg(long, default_value_t = 3)]
    bot_level_ambition: u8,

    /// Starting world radius in meters.
    #[arg(long, default_value_t = 2_000.0)]
    world_radius: f32,

    /// Terrain procedural-generation seed.
    #[arg(long, default_value_t = 1)]
    terrain_seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    tracing::info!(port = args.port, min_players = args.min_players, "starting ironclad driver");

    let hub = Hub::new(args.world_radius, args.terrain_seed, args.bot_max_spawn_level, args.auth);

    let config = DriverConfig {
        min_players: args.min_players,
        min_bot_ratio: args.min_bot_ratio,
        bot: BotConfig { max_spawn_level: args.bot_max_spawn_level, level_ambition: args.bot_level_ambition },
        ..DriverConfig::default()
    };

    let now = Instant::now();
    let mut driver = Driver::new(hub, Box::new(LoggingTransport), config, ironclad_numerics::TICK_PERIOD, Duration::from_secs(30), now);

    let gauge: PlayerCountGauge = driver.player_count_gauge();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(10));
        tracing::info!(players = gauge.get(), status = %gauge.to_json(), "status");
    });

    driver.run();
}
