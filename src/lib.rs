//! 2048 on a bit-packed board with an anytime adversarial search.
//!
//! - [`board`]: the packed 4x4 grid and the slide/merge rules
//! - [`node`]: game-tree vertices with lazily built successors and the heuristic
//! - [`search`]: alpha-beta (or expectimax) with iterative deepening under a deadline
//! - [`game`]: the turn loop, driven through a [`game::Frontend`]
//! - [`terminal`]: the crossterm frontend
pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod node;
pub mod search;
pub mod terminal;
