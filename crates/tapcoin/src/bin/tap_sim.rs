//! # TAPCOIN Tap Simulator
//!
//! Headless driver: loads a balance file, starts a regeneration ticker and a
//! tap journal, then plays a burst of taps and logs what happened.
//!
//! ```bash
//! # Reference balance, 500 taps, 20 taps per second
//! ./tap_sim
//!
//! # Custom balance and journal
//! ./tap_sim data/config/tap_economy.toml 2000 50 /tmp/taps.log
//!
//! # JSON logs with debug output from the engine
//! LOG_FORMAT=json RUST_LOG=tapcoin_economy=debug ./tap_sim
//! ```

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tapcoin::economy::{
    replay_taps, seeded_rng, Clock, EngineConfig, JournalConfig, RegenTicker, SystemClock,
    TapEngine, TapJournal, TapSession, TapTier,
};
use tapcoin::{TapArea, TapPresenter};

const DEFAULT_CONFIG: &str = "data/config/tap_economy.toml";
const DEFAULT_TAPS: u64 = 500;
const DEFAULT_TAPS_PER_SECOND: u64 = 20;
const REGEN_TICK: Duration = Duration::from_millis(250);

struct SimArgs {
    config: String,
    taps: u64,
    taps_per_second: u64,
    journal: Option<String>,
}

impl SimArgs {
    fn from_env() -> Result<Self, String> {
        let mut args = std::env::args().skip(1);
        let config = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
        let taps = parse_or(args.next(), DEFAULT_TAPS, "taps")?;
        let taps_per_second = parse_or(args.next(), DEFAULT_TAPS_PER_SECOND, "taps_per_second")?.max(1);
        Ok(Self {
            config,
            taps,
            taps_per_second,
            journal: args.next(),
        })
    }
}

fn parse_or(arg: Option<String>, default: u64, name: &str) -> Result<u64, String> {
    arg.map_or(Ok(default), |raw| {
        raw.parse().map_err(|e| format!("invalid {name} '{raw}': {e}"))
    })
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

fn run(args: &SimArgs) -> Result<(), Box<dyn Error>> {
    let engine = Arc::new(TapEngine::new(EngineConfig::load(&args.config)?)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let seed = clock.now().as_millis();

    let journal = args
        .journal
        .as_deref()
        .map(|path| TapJournal::open(path, JournalConfig::default()).map(Arc::new))
        .transpose()?;

    let mut session = TapSession::new(Arc::clone(&engine), 1, engine.new_player()?, seeded_rng(seed));
    if let Some(journal) = &journal {
        session = session.with_journal(Arc::clone(journal));
    }
    let session = Arc::new(session);

    let ticker = RegenTicker::spawn(Arc::clone(&session), Arc::clone(&clock), REGEN_TICK)?;
    let presenter = TapPresenter::new(
        Arc::clone(&session),
        TapArea {
            width: 400.0,
            height: 400.0,
        },
    );

    tracing::info!(
        seed,
        taps = args.taps,
        taps_per_second = args.taps_per_second,
        energy = session.energy_limit(),
        "tap burst started"
    );

    let pause = Duration::from_millis(1_000 / args.taps_per_second);
    let mut counts = [0u64; 3];
    let mut failed = 0u64;

    for _ in 0..args.taps {
        let now = clock.now();
        let view = presenter.on_tap(now, None);
        presenter.expire_effects(now);

        if view.outcome.success {
            counts[view.outcome.tier as usize] += 1;
        } else {
            failed += 1;
        }
        if let Some(notification) = &view.notification {
            tracing::info!(title = %notification.title, description = %notification.description, "notification");
        }
        std::thread::sleep(pause);
    }

    let restored = ticker.total_restored();
    drop(ticker);

    let hud = presenter.hud();
    let badge = presenter.rank_badge();
    tracing::info!(
        balance = %hud.balance,
        energy = %hud.energy,
        combo = hud.combo,
        streak = hud.streak,
        rank = %badge.label,
        icon = %badge.icon,
        normal = counts[TapTier::Normal as usize],
        critical = counts[TapTier::Critical as usize],
        jackpot = counts[TapTier::Jackpot as usize],
        failed,
        restored,
        "tap burst finished"
    );

    if let (Some(journal), Some(path)) = (journal, args.journal.as_deref()) {
        journal.flush()?;
        let stats = journal.stats();
        drop(session);
        drop(presenter);
        drop(journal);
        let replayed = replay_taps(path)?;
        tracing::info!(
            records = replayed.len(),
            batches = stats.total_batches,
            avg_batch = stats.avg_batch_size(),
            dropped = stats.dropped_records,
            "journal replayed"
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let args = match SimArgs::from_env() {
        Ok(args) => args,
        Err(e) => {
            tracing::error!(error = %e, "usage: tap_sim [config] [taps] [taps_per_second] [journal]");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "tap_sim failed");
            ExitCode::FAILURE
        }
    }
}
