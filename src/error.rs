use std::io;

#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error("log file {path}: {source}")]
    LogFile { path: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, GameError>;
