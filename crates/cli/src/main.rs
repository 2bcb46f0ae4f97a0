use anyhow::{bail, Context};
use jester_agent::{
    legal_actions, write_json, write_text, DecisionRouter, DisabledChannel, SessionReport,
};
use jester_core::{BrainConfig, Card, EffectPipeline, Rank, ScoreRequest, Suit};
use jester_data::{builtin_config, load_brain_config, load_snapshot};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  jester decide <snapshot.json> [--config DIR] [--report PATH]
  jester score <snapshot.json> --play 0,1,2 [--config DIR] [--seed N]
  jester legal <snapshot.json>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Decide,
    Score,
    Legal,
}

#[derive(Debug, Clone)]
struct CliOptions {
    command: Command,
    snapshot: PathBuf,
    config: Option<PathBuf>,
    report: Option<PathBuf>,
    play: Vec<usize>,
    seed: Option<u64>,
}

fn parse_cli_options(args: &[String]) -> anyhow::Result<CliOptions> {
    let command = match args.first().map(String::as_str) {
        Some("decide") => Command::Decide,
        Some("score") => Command::Score,
        Some("legal") => Command::Legal,
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
        None => bail!("missing command\n{USAGE}"),
    };
    let mut snapshot = None;
    let mut config = None;
    let mut report = None;
    let mut play = Vec::new();
    let mut seed = None;
    let mut idx = 1usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "--config" | "--report" | "--play" | "--seed" => {
                let Some(value) = args.get(idx + 1) else {
                    bail!("{flag} needs a value");
                };
                match flag {
                    "--config" => config = Some(PathBuf::from(value)),
                    "--report" => report = Some(PathBuf::from(value)),
                    "--play" => play = parse_indices(value)?,
                    _ => {
                        seed = Some(
                            value
                                .parse::<u64>()
                                .with_context(|| format!("invalid seed '{value}'"))?,
                        )
                    }
                }
                idx += 1;
            }
            _ if flag.starts_with("--") => bail!("unknown option '{flag}'"),
            _ if snapshot.is_none() => snapshot = Some(PathBuf::from(flag)),
            _ => bail!("unexpected argument '{flag}'"),
        }
        idx += 1;
    }
    let Some(snapshot) = snapshot else {
        bail!("missing snapshot path\n{USAGE}");
    };
    if command == Command::Score && play.is_empty() {
        bail!("score needs --play");
    }
    Ok(CliOptions {
        command,
        snapshot,
        config,
        report,
        play,
        seed,
    })
}

/// Accepts comma separated indices and inclusive ranges such as `0,2-4`.
fn parse_indices(arg: &str) -> anyhow::Result<Vec<usize>> {
    let mut indices = Vec::new();
    for part in arg.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((start, end)) = part.split_once('-') {
            let start = start
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid range start in '{part}'"))?;
            let end = end
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid range end in '{part}'"))?;
            if start > end {
                bail!("range start larger than end in '{part}'");
            }
            indices.extend(start..=end);
        } else {
            indices.push(
                part.parse::<usize>()
                    .with_context(|| format!("invalid index '{part}'"))?,
            );
        }
    }
    if indices.is_empty() {
        bail!("missing indices");
    }
    Ok(indices)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let options = parse_cli_options(args)?;
    let config = load_config(options.config.as_deref())?;
    match options.command {
        Command::Decide => run_decide(&options, &config),
        Command::Score => run_score(&options, &config),
        Command::Legal => run_legal(&options),
    }
}

fn load_config(dir: Option<&Path>) -> anyhow::Result<BrainConfig> {
    match dir {
        Some(dir) => load_brain_config(dir),
        None => builtin_config(),
    }
}

fn run_decide(options: &CliOptions, config: &BrainConfig) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&options.snapshot)?;
    let mut router = DecisionRouter::new(config, Arc::new(DisabledChannel));
    router.start_run();
    let decision = router.decide(&snapshot.context);
    println!("{}", decision.summary());
    print_json(&decision)?;

    if let Some(path) = &options.report {
        let report = SessionReport::from_session(router.session());
        let is_text = path.extension().and_then(|ext| ext.to_str()) == Some("txt");
        let written = if is_text {
            write_text(path, &report)
        } else {
            write_json(path, &report)
        };
        written.with_context(|| format!("write report {}", path.display()))?;
    }
    Ok(())
}

fn run_score(options: &CliOptions, config: &BrainConfig) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&options.snapshot)?;
    let context = &snapshot.context;
    let pipeline = EffectPipeline::from_config(config);
    let (played, held) = context
        .split_hand(&options.play)
        .context("select played cards")?;
    let request = ScoreRequest::new(&played, &held, context);
    let evaluation = pipeline.evaluate(&request).context("score hand")?;

    let cards: Vec<String> = played.iter().map(format_card).collect();
    println!("played: {}", cards.join(" "));
    println!("{}", evaluation.summary());
    for warning in &evaluation.warnings {
        println!("warning: {warning}");
    }
    print_json(&evaluation)?;

    if let Some(seed) = options.seed.or(snapshot.seed) {
        let draw = pipeline.sample(&request, seed).context("sample hand")?;
        println!(
            "draw seed {}: {} x {:.2} = {} (money {})",
            draw.seed, draw.chips, draw.mult, draw.score, draw.money
        );
        print_json(&draw)?;
    }
    Ok(())
}

fn run_legal(options: &CliOptions) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&options.snapshot)?;
    let actions = legal_actions(&snapshot.context);
    println!(
        "{} legal actions in {}",
        actions.len(),
        snapshot.context.phase.label()
    );
    for action in &actions {
        println!("  {}", action.short_label());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("encode output")?;
    println!("{text}");
    Ok(())
}

fn format_card(card: &Card) -> String {
    let mut out = format!("{}{}", rank_short(card.rank), suit_short(card.suit));
    let mut tags = Vec::new();
    if let Some(enhancement) = card.enhancement {
        tags.push(format!("{enhancement:?}"));
    }
    if let Some(edition) = card.edition {
        tags.push(format!("{edition:?}"));
    }
    if let Some(seal) = card.seal {
        tags.push(format!("{seal:?} seal"));
    }
    if !tags.is_empty() {
        out.push_str(" [");
        out.push_str(&tags.join(","));
        out.push(']');
    }
    out
}

fn rank_short(rank: Rank) -> &'static str {
    match rank {
        Rank::Two => "2",
        Rank::Three => "3",
        Rank::Four => "4",
        Rank::Five => "5",
        Rank::Six => "6",
        Rank::Seven => "7",
        Rank::Eight => "8",
        Rank::Nine => "9",
        Rank::Ten => "T",
        Rank::Jack => "J",
        Rank::Queen => "Q",
        Rank::King => "K",
        Rank::Ace => "A",
    }
}

fn suit_short(suit: Suit) -> &'static str {
    match suit {
        Suit::Spades => "s",
        Suit::Hearts => "h",
        Suit::Clubs => "c",
        Suit::Diamonds => "d",
    }
}
