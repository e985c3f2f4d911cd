use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};

use crate::search::Minimizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpawnPolicy {
    /// 2 with probability 0.9, 4 with probability 0.1
    Weighted,
    /// every spawn equally likely
    Uniform,
}

#[derive(Debug, Parser)]
#[command(name = "slide2048", about = "Play 2048 in the terminal with a search-driven hint")]
pub struct Args {
    /// Let the search play every move
    #[arg(short, long)]
    pub auto: bool,

    /// Search deadline per move, in milliseconds
    #[arg(short = 't', long = "time", value_name = "MS", default_value_t = 300)]
    pub time_ms: u64,

    /// Seed for tile spawns (defaults to the clock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Score spawns by their expected value instead of the worst case
    #[arg(long)]
    pub expectimax: bool,

    /// How the random player picks its spawn
    #[arg(long, value_enum, default_value_t = SpawnPolicy::Weighted)]
    pub spawn: SpawnPolicy,

    /// Skip computing a hint on manual turns
    #[arg(long)]
    pub no_hint: bool,

    /// Write log output to this file
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auto: bool,
    pub deadline: Duration,
    pub seed: u64,
    pub minimizer: Minimizer,
    pub spawn: SpawnPolicy,
    pub hint: bool,
    pub log_file: Option<PathBuf>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let seed = args.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });
        let minimizer = if args.expectimax {
            Minimizer::Expectimax
        } else {
            Minimizer::AlphaBeta
        };
        Self {
            auto: args.auto,
            deadline: Duration::from_millis(args.time_ms),
            seed,
            minimizer,
            spawn: args.spawn,
            hint: args.auto || !args.no_hint,
            log_file: args.log,
        }
    }
}
