use std::fs::File;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;
use rand::{rngs::StdRng, SeedableRng};

use slide2048::config::{Args, Config};
use slide2048::error::GameError;
use slide2048::game::Game;
use slide2048::terminal::Terminal;

fn init_logging(config: &Config) -> Result<(), GameError> {
    match &config.log_file {
        Some(path) => {
            let file = File::create(path).map_err(|source| GameError::LogFile {
                path: path.display().to_string(),
                source,
            })?;
            env_logger::Builder::from_env(Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        None => env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = Config::from(Args::parse());
    init_logging(&config)?;
    info!("seed {}", config.seed);

    let rng = StdRng::seed_from_u64(config.seed);
    let mut game = Game::new(config, rng);

    let summary = {
        let mut terminal = Terminal::enter().context("could not set up the terminal")?;
        game.run(&mut terminal).context("game aborted")?
    };

    if !summary.is_quit() {
        println!("{}\nGame Over!\nFinal Score: {}", summary.board, summary.score);
    }
    Ok(())
}
