use log::{info, trace, warn};
use rand::Rng;

use crate::board::{Board, Direction};
use crate::config::{Config, SpawnPolicy};
use crate::error::Result;
use crate::node::{Node, Player};
use crate::search::{Search, SearchResult};

/// A player request read from the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    AcceptHint,
    Quit,
}

/// Everything the controller needs from a user interface.
pub trait Frontend {
    fn draw(&mut self, node: &Node, hint: Option<&SearchResult>) -> Result<()>;

    /// Called after every completed search depth while a hint is computed.
    fn search_progress(&mut self, depth: u32, result: &SearchResult);

    /// Next player request. Blocks when `wait` is set, otherwise returns
    /// `None` if nothing is pending.
    fn next_action(&mut self, wait: bool) -> Result<Option<Action>>;

    fn game_over(&mut self, node: &Node) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub outcome: Outcome,
    pub board: Board,
    pub score: u32,
    pub largest_tile: u32,
    pub moves: u32,
}

pub struct Game<R> {
    config: Config,
    search: Search,
    rng: R,
}

impl<R: Rng> Game<R> {
    pub fn new(config: Config, rng: R) -> Self {
        let search = Search::new(config.minimizer);
        Self { config, search, rng }
    }

    pub fn run<F: Frontend>(&mut self, frontend: &mut F) -> Result<Summary> {
        let node = Node::new(&mut self.rng);
        self.run_from(node, frontend)
    }

    /// Alternate human and random turns from `node` until the game ends or
    /// the player quits.
    pub fn run_from<F: Frontend>(&mut self, mut node: Node, frontend: &mut F) -> Result<Summary> {
        info!(
            "game start: auto={} deadline={:?} minimizer={:?} spawn={:?}",
            self.config.auto, self.config.deadline, self.search.minimizer(), self.config.spawn
        );
        let mut moves = 0;
        let mut hint: Option<SearchResult> = None;

        while !node.is_game_over() {
            if node.player() == Player::Random {
                match self.spawn(node) {
                    Ok(next) => {
                        trace!("spawned: {:?}", next.board());
                        node = next;
                    }
                    Err(stuck) => {
                        warn!("random player has no spawn on {:?}", stuck.board());
                        node = stuck;
                        break;
                    }
                }
                continue;
            }

            if hint.is_none() && self.config.hint {
                frontend.draw(&node, None)?;
                let result = self.search.suggest_with_deadline(&mut node, self.config.deadline, |depth, partial| {
                    frontend.search_progress(depth, partial)
                });
                hint = Some(result);
            }
            frontend.draw(&node, hint.as_ref())?;

            let chosen = if self.config.auto {
                if frontend.next_action(false)? == Some(Action::Quit) {
                    return Ok(self.finish(&node, Outcome::Quit, moves));
                }
                match hint.filter(SearchResult::has_suggestion) {
                    Some(result) => result.mv,
                    None => {
                        warn!("no suggestion available in auto play");
                        break;
                    }
                }
            } else {
                match frontend.next_action(true)? {
                    Some(Action::Move(direction)) => direction.into(),
                    Some(Action::AcceptHint) => match hint.filter(SearchResult::has_suggestion) {
                        Some(result) => result.mv,
                        None => continue,
                    },
                    Some(Action::Quit) => return Ok(self.finish(&node, Outcome::Quit, moves)),
                    None => continue,
                }
            };

            node = match node.into_successor(chosen) {
                Ok(next) => {
                    moves += 1;
                    hint = None;
                    trace!("move {} {:?}: score {}", moves, chosen, next.score());
                    next
                }
                Err(same) => same,
            };
        }

        frontend.game_over(&node)?;
        Ok(self.finish(&node, Outcome::Finished, moves))
    }

    fn spawn(&mut self, node: Node) -> std::result::Result<Node, Node> {
        match self.config.spawn {
            SpawnPolicy::Weighted => node.weighted_random_successor(&mut self.rng),
            SpawnPolicy::Uniform => node.random_successor(&mut self.rng),
        }
    }

    fn finish(&self, node: &Node, outcome: Outcome, moves: u32) -> Summary {
        let largest_tile = match node.board().largest_exponent() {
            0 => 0,
            exponent => 1 << exponent,
        };
        info!(
            "game {:?}: score={} largest={} moves={} won={}",
            outcome,
            node.score(),
            largest_tile,
            moves,
            node.has_2048()
        );
        Summary {
            outcome,
            board: *node.board(),
            score: node.score(),
            largest_tile,
            moves,
        }
    }
}

impl Summary {
    pub fn is_quit(&self) -> bool {
        self.outcome == Outcome::Quit
    }
}
