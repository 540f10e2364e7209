//! Simulate command - run a battle with both sides under AI control
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_config(), play_battle(), report_summary()
//! - Level 3: build_battle(), tally_events()
//! - Level 4: rng and formatting utilities

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hextac_core::{
    Battle, BattleConfig, BattleEvent, Faction, GreedyActor, PlayerControl, Side,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SimulateArgs {
    /// Battle config JSON file (built-in skirmish when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective config to this file before running
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Maximum rounds before the battle is called a draw
    #[arg(long, default_value = "20")]
    pub max_rounds: u32,

    /// Simulation step in seconds
    #[arg(long, default_value = "0.05")]
    pub dt: f32,

    /// Random seed for AI tie-breaking
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Unit state at the end of a battle
#[derive(Clone, Debug, serde::Serialize)]
struct Survivor {
    name: String,
    faction: Faction,
    hp: u32,
    q: i32,
    r: i32,
}

/// Outcome of one simulated battle
#[derive(Clone, Debug, serde::Serialize)]
struct BattleSummary {
    name: String,
    winner: Option<Side>,
    rounds: u32,
    ticks: u64,
    moves: usize,
    abilities_used: usize,
    damage_dealt: u32,
    deaths: usize,
    rejected: usize,
    survivors: Vec<Survivor>,
}

/// Running event counts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct EventTally {
    moves: usize,
    abilities_used: usize,
    damage_dealt: u32,
    deaths: usize,
    rejected: usize,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulate command
///
/// 1. Load (or build) the battle config
/// 2. Play the battle to a result or the round limit
/// 3. Report the summary
pub fn run(args: SimulateArgs) -> Result<()> {
    let config = load_config(&args)?;

    tracing::info!(
        "Simulating `{}`: {} units, max {} rounds",
        config.name,
        config.units.len(),
        args.max_rounds
    );

    let summary = play_battle(&config, &args)?;

    report_summary(&summary, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_config(args: &SimulateArgs) -> Result<BattleConfig> {
    let config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };
    if let Some(path) = &args.save_config {
        config.save(path)?;
        tracing::info!("Saved config to {}", path.display());
    }
    Ok(config)
}

fn play_battle(config: &BattleConfig, args: &SimulateArgs) -> Result<BattleSummary> {
    let mut rng = create_rng(args.seed);
    let mut battle = build_battle(config, &mut rng)?;
    battle.start();

    let mut tally = EventTally::default();
    let mut ticks = 0u64;
    let dt = args.dt.max(0.001);

    while battle.is_contested() && battle.round() <= args.max_rounds {
        battle.tick(dt);
        ticks += 1;
        tally_events(&mut tally, battle.drain_events());

        if battle.is_poisoned() {
            anyhow::bail!("battle state became inconsistent after {} ticks", ticks);
        }
    }

    let winner = winner_of(&battle);
    tracing::info!(
        "Battle over after {} rounds: {}",
        battle.round(),
        format_winner(winner)
    );

    let survivors = battle
        .field()
        .units()
        .into_iter()
        .map(|u| Survivor {
            name: u.name.clone(),
            faction: u.faction,
            hp: u.health.current,
            q: u.coords.q,
            r: u.coords.r,
        })
        .collect();

    Ok(BattleSummary {
        name: config.name.clone(),
        winner,
        rounds: battle.round().min(args.max_rounds),
        ticks,
        moves: tally.moves,
        abilities_used: tally.abilities_used,
        damage_dealt: tally.damage_dealt,
        deaths: tally.deaths,
        rejected: tally.rejected,
        survivors,
    })
}

fn report_summary(summary: &BattleSummary, args: &SimulateArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print_text_summary(summary);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Both sides scripted by greedy actors seeded from `rng`
fn build_battle(config: &BattleConfig, rng: &mut ChaCha8Rng) -> Result<Battle> {
    let player = GreedyActor::with_seed(rng.gen());
    let enemy = GreedyActor::with_seed(rng.gen());
    Battle::from_config(
        config,
        PlayerControl::Scripted(Box::new(player)),
        Box::new(enemy),
    )
    .with_context(|| format!("Failed to set up battle `{}`", config.name))
}

fn tally_events(tally: &mut EventTally, events: Vec<BattleEvent>) {
    for event in events {
        match event {
            BattleEvent::MoveFinished { .. } => tally.moves += 1,
            BattleEvent::AbilityUsed { .. } => tally.abilities_used += 1,
            BattleEvent::UnitDamaged { amount, .. } => tally.damage_dealt += amount,
            BattleEvent::UnitDied { .. } => tally.deaths += 1,
            BattleEvent::CommandRejected { .. } => tally.rejected += 1,
            _ => {}
        }
    }
}

fn winner_of(battle: &Battle) -> Option<Side> {
    let field = battle.field();
    match (
        field.roster(Side::Player).is_empty(),
        field.roster(Side::Enemy).is_empty(),
    ) {
        (false, true) => Some(Side::Player),
        (true, false) => Some(Side::Enemy),
        _ => None,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn format_winner(winner: Option<Side>) -> String {
    match winner {
        Some(side) => format!("{:?} wins", side),
        None => "draw".to_string(),
    }
}

fn print_text_summary(summary: &BattleSummary) {
    println!("\n=== Battle: {} ===", summary.name);
    println!("Result:    {}", format_winner(summary.winner));
    println!("Rounds:    {} ({} ticks)", summary.rounds, summary.ticks);
    println!("Moves:     {}", summary.moves);
    println!("Abilities: {}", summary.abilities_used);
    println!("Damage:    {}", summary.damage_dealt);
    println!("Deaths:    {}", summary.deaths);
    if summary.rejected > 0 {
        println!("Rejected:  {}", summary.rejected);
    }
    println!("\nSurvivors:");
    for s in &summary.survivors {
        println!(
            "  {:<10} {:<8} hp {:>3}  at ({},{})",
            s.name,
            format!("{:?}", s.faction),
            s.hp,
            s.q,
            s.r
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
