//! Suitline command line: bot simulations, replay audits and the damage calculator.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use suitline_core::{
    calculate_damage, Bot, BotDifficulty, Card, CombatRules, DamageMode, GameConfig, GameOptions,
    PlayerInfo, RankScale, RuleVariant,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod hashing;
mod session;

use session::{MatchSession, SessionStatus};

#[derive(Debug, Parser)]
#[command(name = "suitline", version, about = "Suitline card battle engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play two bots against each other and optionally save the record
    Simulate {
        #[arg(long, default_value_t = 1)]
        seed: u32,
        /// Where to write the match record
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "medium")]
        difficulty: BotDifficulty,
        #[arg(long, value_enum, default_value_t = VariantArg::Intro)]
        variant: VariantArg,
        #[arg(long)]
        per_turn: bool,
        #[arg(long, default_value_t = 5000)]
        max_actions: usize,
    },
    /// Replay a saved match record and verify its hash chain
    Replay { file: PathBuf },
    /// Resolve one attack down a column and print every step
    Calc {
        attacker: Card,
        #[arg(long)]
        front: Option<Card>,
        #[arg(long)]
        back: Option<Card>,
        #[arg(long, default_value_t = 20)]
        lp: u32,
        #[arg(long, value_enum, default_value_t = VariantArg::Legacy)]
        variant: VariantArg,
        #[arg(long, value_enum, default_value_t = ScaleArg::Simplified)]
        scale: ScaleArg,
        #[arg(long)]
        ace_guard: bool,
        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Legacy,
    Intro,
}

impl From<VariantArg> for RuleVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Legacy => RuleVariant::LegacyReference,
            VariantArg::Intro => RuleVariant::IntroRules,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScaleArg {
    Simplified,
    Full,
}

impl From<ScaleArg> for RankScale {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Simplified => RankScale::Simplified,
            ScaleArg::Full => RankScale::Full,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Simulate {
            seed,
            out,
            difficulty,
            variant,
            per_turn,
            max_actions,
        } => {
            let options = GameOptions {
                rule_variant: variant.into(),
                damage_mode: if per_turn {
                    DamageMode::PerTurn
                } else {
                    DamageMode::Persistent
                },
                ..GameOptions::default()
            };
            simulate(seed, difficulty, options, max_actions, out)
        }
        Command::Replay { file } => replay(file),
        Command::Calc {
            attacker,
            front,
            back,
            lp,
            variant,
            scale,
            ace_guard,
            json,
        } => {
            let rules = CombatRules {
                variant: variant.into(),
                scale: scale.into(),
                ace_guard,
            };
            calc(attacker, front, back, lp, rules, json)
        }
    }
}

fn simulate(
    seed: u32,
    difficulty: BotDifficulty,
    options: GameOptions,
    max_actions: usize,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = GameConfig::new(
        [PlayerInfo::new("bot-0", "North"), PlayerInfo::new("bot-1", "South")],
        seed,
    )
    .with_options(options);

    let mut session = MatchSession::new(format!("sim-{seed}"), config);
    let mut bots = [
        Bot::with_seed(0, difficulty, u64::from(seed)),
        Bot::with_seed(1, difficulty, u64::from(seed) ^ 0xA5A5),
    ];

    while session.status == SessionStatus::InProgress && session.log().len() < max_actions {
        let active = session.state().active_player_index;
        let Some(action) = bots[active].choose_action(session.state()) else {
            bail!("bot {active} has no legal move in {}", session.state().phase);
        };
        session.apply(action, now_millis())?;
    }

    if session.status == SessionStatus::InProgress {
        info!(max_actions, "stopped before the match finished");
    }
    print_summary(&session)?;

    if let Some(path) = out {
        session
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn replay(file: PathBuf) -> anyhow::Result<()> {
    let session =
        MatchSession::load(&file).with_context(|| format!("replaying {}", file.display()))?;
    session.verify()?;
    info!(entries = session.log().len(), "hash chain verified");
    print_summary(&session)
}

fn calc(
    attacker: Card,
    front: Option<Card>,
    back: Option<Card>,
    lp: u32,
    rules: CombatRules,
    json: bool,
) -> anyhow::Result<()> {
    let result = calculate_damage(attacker, front, back, lp, &rules);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let describe = |card: Option<Card>| card.map_or_else(|| "-".to_string(), |c| c.to_string());
    println!(
        "{} -> front {} / back {} ({:?}, {:?})",
        attacker,
        describe(front),
        describe(back),
        rules.variant,
        rules.scale
    );
    for step in &result.steps {
        let mut line = format!("  {:?} [{:?}] damage {}", step.kind, step.target, step.damage);
        if let Some(card) = &step.card {
            line.push_str(&format!(" card {card}"));
        }
        if let Some(hp) = step.remaining_hp {
            line.push_str(&format!(" -> {hp}"));
        }
        if step.destroyed {
            line.push_str(" destroyed");
        }
        if let Some(bonus) = &step.bonus {
            line.push_str(&format!(" ({bonus})"));
        }
        println!("{line}");
    }
    println!("life points: {} (-{})", result.lifepoints, result.lp_damage);
    Ok(())
}

fn print_summary(session: &MatchSession) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&session.summary())?);
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
