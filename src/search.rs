use std::time::{Duration, Instant};

use log::debug;

use crate::node::{MoveType, Node, Player, TWO_SPAWN_PROBABILITY};

/// Iterative deepening always completes this depth, deadline or not.
pub const MIN_DEPTH: u32 = 2;

/// What the search should do at a node, as decided by the caller's predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Continue,
    End,
    Abort,
}

/// How the random player's turns are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Minimizer {
    /// Assume the worst spawn.
    #[default]
    AlphaBeta,
    /// Average over spawns, a 2 weighted 0.9 and a 4 weighted 0.1.
    Expectimax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub value: i64,
    pub mv: MoveType,
    pub termination: Termination,
    pub pruned_nodes: u64,
}

impl SearchResult {
    pub fn no_suggestion() -> Self {
        Self {
            value: -1,
            mv: MoveType::Start,
            termination: Termination::End,
            pruned_nodes: 0,
        }
    }

    pub fn has_suggestion(&self) -> bool {
        self.mv.direction().is_some()
    }

    fn leaf(node: &Node) -> Self {
        Self {
            value: node.heuristic(),
            mv: MoveType::GameOver,
            termination: Termination::End,
            pruned_nodes: 0,
        }
    }
}

/// Adversarial search over the game tree. Carries no state between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Search {
    minimizer: Minimizer,
}

impl Search {
    pub fn new(minimizer: Minimizer) -> Self {
        Self { minimizer }
    }

    pub fn minimizer(&self) -> Minimizer {
        self.minimizer
    }

    /// Alpha-beta search of `node` with `terminate` consulted on entry to
    /// every node. Depth only grows below random nodes, so a human move and
    /// the spawn answering it count as one level.
    pub fn alpha_beta<F>(
        &self,
        node: &mut Node,
        terminate: &mut F,
        depth: u32,
        alpha: i64,
        beta: i64,
    ) -> SearchResult
    where
        F: FnMut(&Node, u32) -> Termination,
    {
        match terminate(node, depth) {
            Termination::Abort => {
                let value = match node.player() {
                    Player::Human => alpha,
                    Player::Random => beta,
                };
                return SearchResult {
                    value,
                    mv: MoveType::GameOver,
                    termination: Termination::Abort,
                    pruned_nodes: 0,
                };
            }
            Termination::End => return SearchResult::leaf(node),
            Termination::Continue => {}
        }
        if node.is_game_over() {
            return SearchResult::leaf(node);
        }

        match node.player() {
            Player::Human => self.maximize(node, terminate, depth, alpha, beta),
            Player::Random => match self.minimizer {
                Minimizer::AlphaBeta => self.minimize(node, terminate, depth, alpha, beta),
                Minimizer::Expectimax => self.expect(node, terminate, depth, beta),
            },
        }
    }

    fn maximize<F>(
        &self,
        node: &mut Node,
        terminate: &mut F,
        depth: u32,
        mut alpha: i64,
        beta: i64,
    ) -> SearchResult
    where
        F: FnMut(&Node, u32) -> Termination,
    {
        let successors = node.successors_mut();
        let total = successors.len();
        let mut explored = 0;
        let mut pruned_nodes = 0;
        let mut best: Option<(i64, MoveType)> = None;

        for i in 0..total {
            let result = self.alpha_beta(&mut successors[i], terminate, depth, alpha, beta);
            explored += 1;
            pruned_nodes += result.pruned_nodes;

            if result.termination == Termination::Abort {
                return SearchResult {
                    value: alpha,
                    mv: best.map_or(MoveType::GameOver, |(_, mv)| mv),
                    termination: Termination::Abort,
                    pruned_nodes,
                };
            }
            if best.map_or(true, |(value, _)| result.value > value) {
                best = Some((result.value, successors[i].mv()));
            }
            alpha = alpha.max(result.value);
            if beta <= alpha {
                successors[i + 1..].iter_mut().for_each(Node::release_successors);
                break;
            }
        }

        SearchResult {
            value: alpha,
            mv: best.map_or(MoveType::GameOver, |(_, mv)| mv),
            termination: Termination::Continue,
            pruned_nodes: pruned_nodes + (total - explored) as u64,
        }
    }

    fn minimize<F>(
        &self,
        node: &mut Node,
        terminate: &mut F,
        depth: u32,
        alpha: i64,
        mut beta: i64,
    ) -> SearchResult
    where
        F: FnMut(&Node, u32) -> Termination,
    {
        let successors = node.successors_mut();
        let total = successors.len();
        let mut explored = 0;
        let mut pruned_nodes = 0;

        for i in 0..total {
            let result = self.alpha_beta(&mut successors[i], terminate, depth + 1, alpha, beta);
            explored += 1;
            pruned_nodes += result.pruned_nodes;

            if result.termination == Termination::Abort {
                return SearchResult {
                    value: beta,
                    mv: MoveType::Rand,
                    termination: Termination::Abort,
                    pruned_nodes,
                };
            }
            beta = beta.min(result.value);
            if beta <= alpha {
                successors[i + 1..].iter_mut().for_each(Node::release_successors);
                break;
            }
        }

        SearchResult {
            value: beta,
            mv: MoveType::Rand,
            termination: Termination::Continue,
            pruned_nodes: pruned_nodes + (total - explored) as u64,
        }
    }

    /// Spawn-weighted average of every child, clamped to `beta`. Children are
    /// searched with an open window since an average admits no cutoffs.
    fn expect<F>(&self, node: &mut Node, terminate: &mut F, depth: u32, beta: i64) -> SearchResult
    where
        F: FnMut(&Node, u32) -> Termination,
    {
        let mut pruned_nodes = 0;
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for (i, child) in node.successors_mut().iter_mut().enumerate() {
            let result = self.alpha_beta(child, terminate, depth + 1, i64::MIN, i64::MAX);
            pruned_nodes += result.pruned_nodes;
            if result.termination == Termination::Abort {
                return SearchResult {
                    value: beta,
                    mv: MoveType::Rand,
                    termination: Termination::Abort,
                    pruned_nodes,
                };
            }
            let weight = spawn_weight(i);
            weighted += weight * result.value as f64;
            total_weight += weight;
        }

        let average = if total_weight > 0.0 {
            (weighted / total_weight).round() as i64
        } else {
            beta
        };

        SearchResult {
            value: beta.min(average),
            mv: MoveType::Rand,
            termination: Termination::Continue,
            pruned_nodes,
        }
    }

    /// Best move for the human at `node`, looking `max_depth` levels ahead.
    pub fn suggest(&self, node: &mut Node, max_depth: u32) -> SearchResult {
        if node.is_game_over() {
            return SearchResult::no_suggestion();
        }
        let mut terminate = |_: &Node, depth: u32| {
            if depth >= max_depth {
                Termination::End
            } else {
                Termination::Continue
            }
        };
        self.alpha_beta(node, &mut terminate, 0, i64::MIN, i64::MAX)
    }

    /// Deepen from [`MIN_DEPTH`] until `deadline` passes, returning the result
    /// of the deepest search that ran to completion. `on_depth` sees each
    /// completed depth and its result.
    pub fn suggest_with_deadline<C>(
        &self,
        node: &mut Node,
        deadline: Duration,
        mut on_depth: C,
    ) -> SearchResult
    where
        C: FnMut(u32, &SearchResult),
    {
        if node.is_game_over() {
            return SearchResult::no_suggestion();
        }

        let started = Instant::now();
        let mut best = SearchResult::no_suggestion();
        let mut max_depth = MIN_DEPTH;

        loop {
            let mut terminate = |_: &Node, depth: u32| {
                if max_depth > MIN_DEPTH && started.elapsed() >= deadline {
                    Termination::Abort
                } else if depth >= max_depth {
                    Termination::End
                } else {
                    Termination::Continue
                }
            };
            let result = self.alpha_beta(node, &mut terminate, 0, i64::MIN, i64::MAX);
            if result.termination == Termination::Abort {
                break;
            }

            debug!(
                "depth {} complete: value={} move={:?} pruned={} elapsed={:?}",
                max_depth,
                result.value,
                result.mv,
                result.pruned_nodes,
                started.elapsed()
            );
            best = result;
            on_depth(max_depth, &best);
            max_depth += 1;
        }

        best
    }
}

/// Weight of the `index`th random-node successor: even slots spawn a 2.
fn spawn_weight(index: usize) -> f64 {
    if index % 2 == 0 {
        TWO_SPAWN_PROBABILITY
    } else {
        1.0 - TWO_SPAWN_PROBABILITY
    }
}
