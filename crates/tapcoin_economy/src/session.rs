//! # Tap Session
//!
//! One player's live state, owned in one place.
//!
//! ```text
//!   input thread ──tap(now)──┐
//!                            ├──> Mutex<{ Player, RNG }> ──> TapJournal (fire-and-forget)
//!   RegenTicker ──tick(now)──┘
//! ```
//!
//! Taps and regeneration ticks both take the same lock, so a reader never sees
//! a half-applied tap and the two can never interleave inside one update.
//! Journal appends happen under the lock (record order equals tap order) but
//! never wait for the disk.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand::RngCore;

use crate::clock::{Clock, Timestamp};
use crate::engine::{TapEngine, TapOutcome};
use crate::error::EconomyResult;
use crate::journal::{TapJournal, TapRecord};
use crate::player::{Player, PlayerSnapshot};
use crate::rank::RankInfo;

struct SessionState {
    player: Player,
    rng: Box<dyn RngCore + Send>,
}

/// What a regeneration tick changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Energy units restored.
    pub restored: u32,
    /// True if the combo lapsed on this tick.
    pub combo_expired: bool,
}

/// A player bound to an engine, safe to share across threads.
pub struct TapSession {
    engine: Arc<TapEngine>,
    player_id: u64,
    state: Mutex<SessionState>,
    journal: Option<Arc<TapJournal>>,
}

impl TapSession {
    /// Wraps `player` with its own random source.
    pub fn new(engine: Arc<TapEngine>, player_id: u64, player: Player, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            engine,
            player_id,
            state: Mutex::new(SessionState {
                player,
                rng: Box::new(rng),
            }),
            journal: None,
        }
    }

    /// Rebuilds a session from a stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidPlayerState`](crate::error::EconomyError::InvalidPlayerState)
    /// if the snapshot is inconsistent.
    pub fn restore(
        engine: Arc<TapEngine>,
        player_id: u64,
        snapshot: &PlayerSnapshot,
        rng: impl RngCore + Send + 'static,
    ) -> EconomyResult<Self> {
        let player = Player::from_snapshot(snapshot)?;
        Ok(Self::new(engine, player_id, player, rng))
    }

    /// Journals every successful tap.
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<TapJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Taps at `now`. On success the streak is observed and the outcome is
    /// journaled. Journal failures are logged and never change the outcome.
    pub fn tap(&self, now: Timestamp) -> TapOutcome {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let outcome = self.engine.tap(&mut state.player, now, &mut *state.rng);
        if !outcome.success {
            return outcome;
        }

        self.engine.observe_streak(&mut state.player, now);

        if let Some(journal) = &self.journal {
            let record = TapRecord {
                player_id: self.player_id,
                at: now,
                tier: outcome.tier,
                earned: outcome.earned,
                taps_left: state.player.taps_left(),
                total_earned: state.player.total_earned(),
                combo: state.player.combo(),
            };
            if let Err(e) = journal.record_tap(&record) {
                tracing::warn!(player_id = self.player_id, error = %e, "tap not journaled");
            }
        }
        outcome
    }

    /// Advances regeneration and combo expiry to `now`.
    pub fn tick(&self, now: Timestamp) -> TickReport {
        let mut state = self.state.lock();
        let restored = self.engine.regenerate(&mut state.player, now);
        let combo_expired = self.engine.expire_combo(&mut state.player, now);
        if restored > 0 {
            tracing::debug!(
                player_id = self.player_id,
                restored,
                taps_left = state.player.taps_left(),
                "energy regenerated"
            );
        }
        TickReport { restored, combo_expired }
    }

    /// Changes the energy cap at `now`. Returns units settled before the change.
    ///
    /// # Errors
    ///
    /// See [`TapEngine::upgrade_energy_limit`].
    pub fn upgrade_energy_limit(&self, new_limit: u32, now: Timestamp) -> EconomyResult<u32> {
        self.engine.upgrade_energy_limit(&mut self.state.lock().player, new_limit, now)
    }

    /// Runs `f` with a consistent view of the player.
    pub fn with_player<T>(&self, f: impl FnOnce(&Player) -> T) -> T {
        f(&self.state.lock().player)
    }

    /// Serializable copy of the player.
    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.lock().player.snapshot()
    }

    /// Player id used in journal records.
    #[must_use]
    pub const fn player_id(&self) -> u64 {
        self.player_id
    }

    /// The engine this session runs on.
    #[must_use]
    pub fn engine(&self) -> &TapEngine {
        &self.engine
    }

    /// Remaining energy.
    #[must_use]
    pub fn taps_left(&self) -> u32 {
        self.state.lock().player.taps_left()
    }

    /// Energy cap.
    #[must_use]
    pub fn energy_limit(&self) -> u32 {
        self.state.lock().player.energy_limit()
    }

    /// Current combo.
    #[must_use]
    pub fn combo(&self) -> u32 {
        self.state.lock().player.combo()
    }

    /// Current streak.
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.state.lock().player.streak()
    }

    /// Lifetime earnings.
    #[must_use]
    pub fn total_earned(&self) -> u64 {
        self.state.lock().player.total_earned()
    }

    /// Rank for the current lifetime earnings.
    #[must_use]
    pub fn rank(&self) -> RankInfo<'_> {
        let total = self.total_earned();
        self.engine.calculate_rank(total)
    }
}

/// Wake-up signal for the ticker thread.
struct TickerSignal {
    stop: AtomicBool,
    restored: AtomicU64,
    mutex: Mutex<()>,
    condvar: Condvar,
}

/// Background thread calling [`TapSession::tick`] on a fixed interval.
///
/// Stops and joins on drop.
pub struct RegenTicker {
    signal: Arc<TickerSignal>,
    handle: Option<JoinHandle<()>>,
}

impl RegenTicker {
    /// Starts ticking `session` every `interval`, reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(session: Arc<TapSession>, clock: Arc<dyn Clock>, interval: Duration) -> std::io::Result<Self> {
        let signal = Arc::new(TickerSignal {
            stop: AtomicBool::new(false),
            restored: AtomicU64::new(0),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        });
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name(format!("regen-ticker-{}", session.player_id()))
            .spawn(move || loop {
                {
                    let mut guard = thread_signal.mutex.lock();
                    if thread_signal.stop.load(Ordering::Acquire) {
                        break;
                    }
                    thread_signal.condvar.wait_for(&mut guard, interval);
                    if thread_signal.stop.load(Ordering::Acquire) {
                        break;
                    }
                }
                let report = session.tick(clock.now());
                thread_signal
                    .restored
                    .fetch_add(u64::from(report.restored), Ordering::AcqRel);
            })?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Energy units restored by this ticker so far.
    #[must_use]
    pub fn total_restored(&self) -> u64 {
        self.signal.restored.load(Ordering::Acquire)
    }

    /// Stops the thread and waits for it.
    pub fn stop(&mut self) {
        {
            let _guard = self.signal.mutex.lock();
            self.signal.stop.store(true, Ordering::Release);
            self.signal.condvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RegenTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::tests::SAMPLE;
    use crate::config::EngineConfig;
    use crate::journal::{replay_taps, JournalConfig};
    use crate::rng::{seeded_rng, ScriptedRolls};
    use crate::tier::TapTier;
    use std::time::Instant;

    const NORMAL: u64 = 9_000;
    const DAY: u64 = 86_400_000;

    fn engine() -> Arc<TapEngine> {
        Arc::new(TapEngine::new(EngineConfig::from_toml_str(SAMPLE).unwrap()).unwrap())
    }

    fn session(rolls: &[u64]) -> TapSession {
        let engine = engine();
        let player = engine.new_player().unwrap();
        TapSession::new(engine, 1, player, ScriptedRolls::new(rolls.iter().copied()))
    }

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_tap_updates_state_and_streak() {
        let s = session(&[NORMAL]);
        let outcome = s.tap(at(0));
        assert!(outcome.success);
        assert_eq!(outcome.earned, 10);
        assert_eq!(s.taps_left(), 99);
        assert_eq!(s.total_earned(), 10);
        assert_eq!(s.combo(), 1);
        assert_eq!(s.streak(), 1);

        s.tap(at(DAY + 5));
        assert_eq!(s.streak(), 2);
    }

    #[test]
    fn test_failed_tap_leaves_streak_alone() {
        let engine = engine();
        let snapshot = PlayerSnapshot::with_counters(5, 0, 40, 0, 3);
        let s = TapSession::restore(engine, 9, &snapshot, ScriptedRolls::new([NORMAL])).unwrap();
        assert_eq!(s.tap(at(0)), TapOutcome::NO_ENERGY);
        assert_eq!(s.streak(), 3);
        assert_eq!(s.snapshot(), snapshot);
    }

    #[test]
    fn test_tick_expires_combo() {
        let s = session(&[NORMAL]);
        s.tap(at(0));
        s.tap(at(100));
        assert_eq!(s.combo(), 2);
        assert!(!s.tick(at(1_600)).combo_expired);
        assert!(s.tick(at(1_601)).combo_expired);
        assert_eq!(s.combo(), 0);
    }

    #[test]
    fn test_concurrent_taps_spend_each_unit_once() {
        let engine = engine();
        let player = engine.new_player().unwrap();
        let s = Arc::new(TapSession::new(engine, 1, player, seeded_rng(7)));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    let mut successes = 0u32;
                    let mut earned = 0u64;
                    for i in 0..50 {
                        let outcome = s.tap(at(i * 10));
                        if outcome.success {
                            successes += 1;
                            earned += outcome.earned;
                        }
                    }
                    (successes, earned)
                })
            })
            .collect();

        let (successes, earned) = workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .fold((0, 0), |acc, (n, e)| (acc.0 + n, acc.1 + e));

        assert_eq!(successes, 100);
        assert_eq!(s.taps_left(), 0);
        assert_eq!(s.total_earned(), earned);
    }

    #[test]
    fn test_ticker_regenerates_from_clock() {
        let s = Arc::new(session(&[NORMAL]));
        for _ in 0..10 {
            s.tap(at(0));
        }
        assert_eq!(s.taps_left(), 90);

        let clock = Arc::new(ManualClock::new(at(0)));
        let mut ticker = RegenTicker::spawn(Arc::clone(&s), clock.clone(), Duration::from_millis(2)).unwrap();
        clock.set(at(5_000));

        let deadline = Instant::now() + Duration::from_secs(5);
        while s.taps_left() < 95 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        ticker.stop();
        assert_eq!(s.taps_left(), 95);
    }

    #[test]
    fn test_ticks_racing_taps_neither_lose_nor_duplicate_energy() {
        let engine = engine();
        let player = engine.new_player().unwrap();
        let starting = u64::from(player.taps_left());
        let s = Arc::new(TapSession::new(engine, 1, player, seeded_rng(21)));
        let clock = Arc::new(ManualClock::new(at(0)));
        let mut ticker = RegenTicker::spawn(Arc::clone(&s), clock.clone(), Duration::from_millis(1)).unwrap();

        let tappers: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&s);
                let clock = Arc::clone(&clock);
                thread::spawn(move || {
                    let mut successes = 0u64;
                    for _ in 0..400 {
                        if s.tap(clock.now()).success {
                            successes += 1;
                        }
                        assert!(s.with_player(|p| p.taps_left() <= p.energy_limit()));
                        thread::yield_now();
                    }
                    successes
                })
            })
            .collect();

        // 1 unit per second of clock time while the tappers run.
        for _ in 0..200 {
            clock.advance(500);
            thread::sleep(Duration::from_micros(200));
        }

        let successes: u64 = tappers.into_iter().map(|t| t.join().unwrap()).sum();
        ticker.stop();

        let restored = ticker.total_restored();
        let left = u64::from(s.taps_left());
        assert!(left <= u64::from(s.energy_limit()));
        assert_eq!(successes, starting + restored - left);
    }

    #[test]
    fn test_ticker_drop_does_not_wait_for_interval() {
        let s = Arc::new(session(&[NORMAL]));
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(at(0)));
        let started = Instant::now();
        let ticker = RegenTicker::spawn(s, clock, Duration::from_secs(3_600)).unwrap();
        drop(ticker);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn test_successful_taps_are_journaled() {
        let path = std::env::temp_dir().join(format!(
            "test_session_journal_{}.log",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let journal = Arc::new(TapJournal::open(&path, JournalConfig::default()).unwrap());
        let engine = engine();
        let player = Player::from_snapshot(&PlayerSnapshot::with_counters(2, 2, 0, 0, 0)).unwrap();
        let s = TapSession::new(engine, 42, player, ScriptedRolls::new([100, NORMAL])).with_journal(Arc::clone(&journal));

        s.tap(at(0));
        s.tap(at(100));
        s.tap(at(200));
        journal.flush().unwrap();

        let taps = replay_taps(&path).unwrap();
        assert_eq!(taps.len(), 2);
        assert_eq!(taps[0].player_id, 42);
        assert_eq!(taps[0].tier, TapTier::Critical);
        assert_eq!(taps[0].earned, 30);
        assert_eq!(taps[1].taps_left, 0);
        assert_eq!(taps[1].total_earned, s.total_earned());

        drop(s);
        drop(journal);
        std::fs::remove_file(&path).ok();
    }
}
