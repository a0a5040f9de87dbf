//! End-to-end behavior of the tap economy through the public API.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tapcoin_economy::{
    format_number, seeded_rng, EconomyError, EngineConfig, Player, PlayerSnapshot, ScriptedRolls, TapEngine,
    TapOutcome, TapTier, Timestamp,
};

const CONFIG: &str = r#"
[reward]
base_reward_per_tap = 10

[tiers]
jackpot_chance_bp = 100
critical_chance_bp = 900
normal_chance_bp = 9000
normal_multiplier_bp = 10000
critical_multiplier_bp = 25000
jackpot_multiplier_bp = 1000000

[combo]
window_ms = 2000
step_bp = 1000
max_multiplier_bp = 20000

[energy]
starting_limit = 100
regen_milli_per_second = 500

[streak]
period_ms = 86400000

[[ranks]]
threshold = 500
rank = 1
icon = "🥉"

[[ranks]]
threshold = 5000
rank = 2
icon = "🥈"

[[ranks]]
threshold = 50000
rank = 3
icon = "🥇"
"#;

/// Rolls landing in each band of `CONFIG`.
const JACKPOT_ROLL: u64 = 50;
const CRITICAL_ROLL: u64 = 500;
const NORMAL_ROLL: u64 = 5_000;

fn engine() -> TapEngine {
    TapEngine::new(EngineConfig::from_toml_str(CONFIG).unwrap()).unwrap()
}

fn at(ms: u64) -> Timestamp {
    Timestamp::from_millis(ms)
}

#[test]
fn test_last_unit_of_energy_then_empty() {
    let engine = engine();
    let mut player = Player::from_snapshot(&PlayerSnapshot::with_counters(100, 1, 0, 0, 0)).unwrap();
    let mut rolls = ScriptedRolls::new([NORMAL_ROLL]);

    let first = engine.tap(&mut player, at(0), &mut rolls);
    assert_eq!(
        first,
        TapOutcome {
            success: true,
            earned: 10,
            tier: TapTier::Normal
        }
    );
    assert_eq!(player.taps_left(), 0);

    let second = engine.tap(&mut player, at(1), &mut rolls);
    assert!(!second.success);
    assert_eq!(second.earned, 0);
    assert_eq!(second.tier, TapTier::Normal);
    assert_eq!(player.total_earned(), 10);
}

#[test]
fn test_empty_bar_never_changes_state() {
    let engine = engine();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..200 {
        let snapshot = PlayerSnapshot::with_counters(
            rng.gen_range(1..1_000),
            0,
            rng.gen_range(0..1_000_000),
            rng.gen_range(0..50),
            rng.gen_range(0..30),
        );
        let mut player = Player::from_snapshot(&snapshot).unwrap();
        let outcome = engine.tap(&mut player, at(rng.gen_range(0..1_000_000)), &mut rng);
        assert_eq!(outcome, TapOutcome::NO_ENERGY);
        assert_eq!(player.snapshot(), snapshot);
    }
}

#[test]
fn test_successful_tap_accounting() {
    let engine = engine();
    let mut rng = seeded_rng(12);
    let mut player = engine.new_player().unwrap();
    let mut now = 0u64;

    for _ in 0..100 {
        now += rng.gen_range(0..3_000);
        let before_left = player.taps_left();
        let before_total = player.total_earned();

        let outcome = engine.tap(&mut player, at(now), &mut rng);

        assert!(outcome.success);
        assert_eq!(player.taps_left(), before_left - 1);
        assert_eq!(player.total_earned(), before_total + outcome.earned);
    }
    assert!(!engine.tap(&mut player, at(now), &mut rng).success);
}

#[test]
fn test_earned_matches_returned_tier() {
    let engine = engine();
    let cases = [
        (NORMAL_ROLL, TapTier::Normal, 10),
        (CRITICAL_ROLL, TapTier::Critical, 25),
        (JACKPOT_ROLL, TapTier::Jackpot, 1_000),
    ];
    for (roll, tier, earned) in cases {
        let mut player = engine.new_player().unwrap();
        let outcome = engine.tap(&mut player, at(0), &mut ScriptedRolls::new([roll]));
        assert_eq!(outcome.tier, tier);
        assert_eq!(outcome.earned, earned);
    }
}

#[test]
fn test_combo_grows_inside_window_and_resets_after() {
    let engine = engine();
    let mut player = engine.new_player().unwrap();
    let mut rolls = ScriptedRolls::new([NORMAL_ROLL]);

    // 1.0x, 1.1x, 1.2x ... capped at 2.0x
    let earned: Vec<u64> = (0..13)
        .map(|i| engine.tap(&mut player, at(i * 2_000), &mut rolls).earned)
        .collect();
    assert_eq!(earned, vec![10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 20, 20]);
    assert_eq!(player.combo(), 13);

    // One millisecond past the window: back to 1.0x and combo 1.
    let outcome = engine.tap(&mut player, at(12 * 2_000 + 2_001), &mut rolls);
    assert_eq!(outcome.earned, 10);
    assert_eq!(player.combo(), 1);
}

#[test]
fn test_tier_partition_law() {
    let engine = engine();
    let mut rng = seeded_rng(2024);
    let stats = engine.tiers().run_statistics(&mut rng, 1_000_000);

    assert_eq!(stats.total_rolls, 1_000_000);
    assert_eq!(TapTier::ALL.iter().map(|&t| stats.count(t)).sum::<u64>(), 1_000_000);
    for tier in TapTier::ALL {
        let expected = u64::from(engine.tiers().chance(tier).raw());
        let observed = stats.frequency_bp(tier);
        assert!(
            observed.abs_diff(expected) <= 30,
            "{} observed {observed} bp, expected {expected} bp",
            tier.as_str()
        );
    }
}

#[test]
fn test_regeneration_never_exceeds_cap() {
    let engine = engine();
    let mut rng = seeded_rng(5);
    let mut player = engine.new_player().unwrap();
    let mut now = 0u64;
    engine.regenerate(&mut player, at(now));

    for step in 0..5_000 {
        now += rng.gen_range(0..10_000);
        if step % 3 == 0 {
            engine.tap(&mut player, at(now), &mut rng);
        }
        engine.regenerate(&mut player, at(now));
        assert!(player.taps_left() <= player.energy_limit());
    }
}

#[test]
fn test_regeneration_is_exact_across_small_slices() {
    let engine = engine();
    let snapshot = PlayerSnapshot::with_counters(100, 0, 0, 0, 0);

    // 0.5 energy per second: 60 s is exactly 30 units however it is sliced.
    let mut coarse = Player::from_snapshot(&snapshot).unwrap();
    engine.regenerate(&mut coarse, at(0));
    engine.regenerate(&mut coarse, at(60_000));

    let mut fine = Player::from_snapshot(&snapshot).unwrap();
    engine.regenerate(&mut fine, at(0));
    for ms in (7..=60_000).step_by(7).chain([60_000]) {
        engine.regenerate(&mut fine, at(ms));
    }

    assert_eq!(coarse.taps_left(), 30);
    assert_eq!(fine.taps_left(), 30);
}

#[test]
fn test_rank_scenarios() {
    let engine = engine();
    let lowest = engine.calculate_rank(0);
    assert_eq!((lowest.rank, lowest.icon), (1, "🥉"));

    let second = engine.calculate_rank(5_000);
    assert_eq!((second.rank, second.icon), (2, "🥈"));
    assert_eq!(engine.calculate_rank(4_999).rank, 1);
}

#[test]
fn test_rank_monotonic_and_idempotent() {
    let engine = engine();
    let mut rng = seeded_rng(8);
    for _ in 0..10_000 {
        let a: u64 = rng.gen_range(0..100_000);
        let b: u64 = a + rng.gen_range(0..100_000);
        assert!(engine.calculate_rank(a).rank <= engine.calculate_rank(b).rank);
        assert_eq!(engine.calculate_rank(a), engine.calculate_rank(a));
    }
}

#[test]
fn test_format_number_is_stable() {
    assert_eq!(format_number(1_500), "1.5K");
    assert_eq!(format_number(1_500_000), "1.5M");
    for n in [1_500, 1_500_000, 0, u64::MAX] {
        assert_eq!(format_number(n), format_number(n));
    }
}

#[test]
fn test_reference_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/config/tap_economy.toml");
    let config = EngineConfig::load(path).unwrap();
    let engine = TapEngine::new(config).unwrap();
    assert_eq!(engine.new_player().unwrap().energy_limit(), 1_000);
    assert_eq!(engine.calculate_rank(1_000_000).icon, "👑");
}

#[test]
fn test_invalid_configuration_fails_before_any_tap() {
    let gap = CONFIG.replace("normal_chance_bp = 9000", "normal_chance_bp = 8999");
    assert!(matches!(
        EngineConfig::from_toml_str(&gap),
        Err(EconomyError::InvalidConfiguration(_))
    ));

    let negative = CONFIG.replace("starting_limit = 100", "starting_limit = -5");
    assert!(matches!(
        EngineConfig::from_toml_str(&negative),
        Err(EconomyError::InvalidConfiguration(_))
    ));

    let mut config = EngineConfig::from_toml_str(CONFIG).unwrap();
    config.tiers.jackpot_multiplier_bp = config.tiers.critical_multiplier_bp;
    assert!(matches!(TapEngine::new(config), Err(EconomyError::InvalidConfiguration(_))));
}
