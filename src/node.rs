use std::cell::OnceCell;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::{grid_monotonicity, grid_smoothness, Board, Direction, SIZE, WINNING_EXPONENT};

/// Winning terminals are lifted above every reachable non-terminal value.
pub const WIN_SHIFT: u32 = 47;

const SMOOTHNESS_CEILING: i64 = 240;
const MONOTONICITY_CEILING: i64 = 240;
const SMOOTHNESS_WEIGHT: i64 = 10;
const MONOTONICITY_WEIGHT: i64 = 100;
const EMPTY_WEIGHT: i64 = 270;
const LARGEST_WEIGHT: i64 = 100;

/// Chance that a spawned tile is a 2 rather than a 4.
pub const TWO_SPAWN_PROBABILITY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    Human,
    Random,
}

impl Player {
    pub fn other(&self) -> Self {
        match self {
            Player::Human => Player::Random,
            Player::Random => Player::Human,
        }
    }
}

/// Label of the edge a node was reached by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    Start,
    Up,
    Down,
    Left,
    Right,
    Rand,
    GameOver,
}

impl MoveType {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            MoveType::Up => Some(Direction::Up),
            MoveType::Down => Some(Direction::Down),
            MoveType::Left => Some(Direction::Left),
            MoveType::Right => Some(Direction::Right),
            _ => None,
        }
    }
}

impl From<Direction> for MoveType {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => MoveType::Up,
            Direction::Down => MoveType::Down,
            Direction::Left => MoveType::Left,
            Direction::Right => MoveType::Right,
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            MoveType::Up => "^",
            MoveType::Down => "V",
            MoveType::Left => "<",
            MoveType::Right => ">",
            _ => "",
        };
        write!(f, "{}", s)
    }
}

/// A game-tree vertex.
///
/// Everything but the successor list is fixed at construction. The list is
/// built on first access, kept for the node's lifetime, and can be dropped
/// with [`Node::release_successors`] once the subtree is no longer wanted.
#[derive(Debug, Clone)]
pub struct Node {
    mv: MoveType,
    board: Board,
    player: Player,
    score: u32,
    successors: OnceCell<Vec<Node>>,
}

impl Node {
    /// Starting position: two tiles of 2 or 4 on distinct cells.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut board = Board::EMPTY;
        let (row, col) = (rng.gen_range(0..SIZE), rng.gen_range(0..SIZE));
        board.set_exponent(row, col, rng.gen_range(1..=2));
        loop {
            let (r, c) = (rng.gen_range(0..SIZE), rng.gen_range(0..SIZE));
            if (r, c) != (row, col) {
                board.set_exponent(r, c, rng.gen_range(1..=2));
                break;
            }
        }
        Node::derived(MoveType::Start, board, Player::Human, 0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Node::new(&mut StdRng::seed_from_u64(seed))
    }

    pub fn derived(mv: MoveType, board: Board, player: Player, score: u32) -> Self {
        Self {
            mv,
            board,
            player,
            score,
            successors: OnceCell::new(),
        }
    }

    pub fn mv(&self) -> MoveType {
        self.mv
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn has_2048(&self) -> bool {
        self.board.contains_exponent(WINNING_EXPONENT)
    }

    /// True when the node has no successors. Answered from the cache when it
    /// exists, otherwise without building one.
    pub fn is_game_over(&self) -> bool {
        if let Some(successors) = self.successors.get() {
            return successors.is_empty();
        }
        if self.has_2048() {
            return true;
        }
        match self.player {
            Player::Human => !Direction::ALL.iter().any(|&d| self.board.can_slide(d)),
            Player::Random => self.board.empty_spaces() == 0,
        }
    }

    pub fn successors(&self) -> &[Node] {
        self.successors.get_or_init(|| self.expand())
    }

    pub fn successors_mut(&mut self) -> &mut [Node] {
        self.successors.get_or_init(|| self.expand());
        self.successors
            .get_mut()
            .map(Vec::as_mut_slice)
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn has_cached_successors(&self) -> bool {
        self.successors.get().is_some()
    }

    pub fn release_successors(&mut self) {
        self.successors.take();
    }

    /// Consume the node, keeping only the successor reached by `mv`. Hands
    /// the node back untouched when no successor carries that move.
    pub fn into_successor(self, mv: MoveType) -> Result<Node, Node> {
        let index = self.successors().iter().position(|s| s.mv == mv);
        match index {
            Some(index) => self.into_successor_at(index),
            None => Err(self),
        }
    }

    fn into_successor_at(mut self, index: usize) -> Result<Node, Node> {
        if index >= self.successors().len() {
            return Err(self);
        }
        match self.successors.take() {
            Some(mut all) => Ok(all.swap_remove(index)),
            None => Err(self),
        }
    }

    /// Successors in their fixed order. A human node yields one child per
    /// valid slide in Up, Down, Left, Right order; a random node yields, for
    /// every empty cell in row-major order, a 2-spawn followed by a 4-spawn.
    fn expand(&self) -> Vec<Node> {
        if self.has_2048() {
            return Vec::new();
        }

        match self.player {
            Player::Human => Direction::ALL
                .iter()
                .filter_map(|&direction| {
                    let mut board = self.board;
                    let gained = board.slide(direction)?;
                    Some(Node::derived(
                        direction.into(),
                        board,
                        self.player.other(),
                        self.score.saturating_add(gained),
                    ))
                })
                .collect(),
            Player::Random => {
                let mut successors = Vec::with_capacity(2 * self.board.empty_spaces());
                for row in 0..SIZE {
                    for col in 0..SIZE {
                        if self.board.exponent(row, col) != 0 {
                            continue;
                        }
                        for exponent in [1, 2] {
                            let mut board = self.board;
                            board.set_exponent(row, col, exponent);
                            successors.push(Node::derived(
                                MoveType::Rand,
                                board,
                                self.player.other(),
                                self.score,
                            ));
                        }
                    }
                }
                successors
            }
        }
    }

    /// Pick any successor with equal probability.
    pub fn random_successor<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Node, Node> {
        let count = self.successors().len();
        if count == 0 {
            return Err(self);
        }
        let index = rng.gen_range(0..count);
        self.into_successor_at(index)
    }

    /// Pick a spawn the way the real game does: a uniformly chosen empty cell
    /// receiving a 2 nine times in ten and a 4 otherwise. Relies on the
    /// 2-then-4 pairing of random-node successors.
    pub fn weighted_random_successor<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Node, Node> {
        if self.player != Player::Random {
            return self.random_successor(rng);
        }
        let cells = self.successors().len() / 2;
        if cells == 0 {
            return Err(self);
        }
        let cell = rng.gen_range(0..cells);
        let four = !rng.gen_bool(TWO_SPAWN_PROBABILITY);
        self.into_successor_at(2 * cell + usize::from(four))
    }

    /// Position value for the search: larger is better for the human.
    ///
    /// A lost terminal is 0. A won terminal carries the game score above bit
    /// 47. Everything else is a weighted mix of smoothness, monotonicity,
    /// free cells and the largest tile, kept strictly positive.
    pub fn heuristic(&self) -> i64 {
        let terminal = self.is_game_over();
        let won = self.has_2048();
        if terminal && !won {
            return 0;
        }

        let grid = self.board.exponents();
        let smoothness = SMOOTHNESS_CEILING - i64::from(grid_smoothness(&grid));
        let monotonicity = MONOTONICITY_CEILING - i64::from(grid_monotonicity(&grid));
        let empty = grid.iter().flatten().filter(|&&e| e == 0).count() as i64;
        let large = i64::from(grid.iter().flatten().copied().max().unwrap_or(0));

        let positional = (SMOOTHNESS_WEIGHT * smoothness
            + MONOTONICITY_WEIGHT * monotonicity
            + EMPTY_WEIGHT * empty
            + LARGEST_WEIGHT * large)
            .max(1);

        if terminal {
            let win = (i64::from(self.score) + 1).saturating_mul(1 << WIN_SHIFT);
            win.saturating_add(positional)
        } else {
            positional
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.mv)?;
        write!(f, "{}", self.board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::board_of;

    #[test]
    fn seeded_start_has_two_small_tiles() {
        for seed in 0..50 {
            let node = Node::with_seed(seed);
            assert_eq!(node.mv(), MoveType::Start);
            assert_eq!(node.player(), Player::Human);
            assert_eq!(node.score(), 0);
            assert_eq!(node.board().filled_spaces(), 2);
            assert!(node.board().largest_exponent() <= 2);
        }
        assert_eq!(Node::with_seed(7).board(), Node::with_seed(7).board());
    }

    #[test]
    fn human_successors_follow_direction_order() {
        let board = board_of([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let node = Node::derived(MoveType::Start, board, Player::Human, 0);
        let moves: Vec<MoveType> = node.successors().iter().map(Node::mv).collect();
        assert_eq!(moves, vec![MoveType::Down, MoveType::Right]);
        assert!(node.successors().iter().all(|s| s.player() == Player::Random));
    }

    #[test]
    fn random_successors_pair_twos_and_fours() {
        let board = board_of([[2, 4, 8, 16], [32, 0, 64, 128], [2, 4, 8, 0], [4, 8, 16, 32]]);
        let node = Node::derived(MoveType::Right, board, Player::Random, 12);
        let successors = node.successors();
        assert_eq!(successors.len(), 2 * board.empty_spaces());
        let placed: Vec<(usize, usize, u32)> = successors
            .iter()
            .map(|s| {
                let changed = (0..16)
                    .map(|i| (i / 4, i % 4))
                    .find(|&(r, c)| board.value(r, c) != s.board().value(r, c))
                    .unwrap();
                (changed.0, changed.1, s.board().value(changed.0, changed.1))
            })
            .collect();
        assert_eq!(placed, vec![(1, 1, 2), (1, 1, 4), (2, 3, 2), (2, 3, 4)]);
        for s in successors {
            assert_eq!(s.mv(), MoveType::Rand);
            assert_eq!(s.player(), Player::Human);
            assert_eq!(s.score(), 12);
        }
    }

    #[test]
    fn reaching_2048_ends_the_game() {
        let board = board_of([[1024, 1024, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let node = Node::derived(MoveType::Rand, board, Player::Human, 100);
        let won = node.into_successor(MoveType::Left).unwrap();
        assert_eq!(won.score(), 2148);
        assert!(won.has_2048());
        assert!(won.is_game_over());
        assert!(won.successors().is_empty());
        assert!(won.heuristic() >= 1 << WIN_SHIFT);
    }

    #[test]
    fn lost_terminal_scores_zero() {
        let board = board_of([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let node = Node::derived(MoveType::Rand, board, Player::Human, 40);
        assert!(node.is_game_over());
        assert_eq!(node.heuristic(), 0);
    }

    #[test]
    fn heuristic_weights_follow_board_shape() {
        let board = board_of([[4, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let node = Node::derived(MoveType::Rand, board, Player::Human, 0);
        // smoothness 1, monotonicity 0, 14 empty, largest exponent 2
        assert_eq!(node.heuristic(), 10 * 239 + 100 * 240 + 270 * 14 + 100 * 2);
    }

    #[test]
    fn score_only_grows_on_human_moves() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut node = Node::new(&mut rng);
        for _ in 0..200 {
            if node.is_game_over() {
                break;
            }
            let before = node.score();
            let player = node.player();
            let h = node.heuristic();
            assert!(h > 0 && h < 1 << WIN_SHIFT);
            node = node.random_successor(&mut rng).unwrap();
            match player {
                Player::Human => assert!(node.score() >= before),
                Player::Random => assert_eq!(node.score(), before),
            }
            assert_eq!(node.player(), player.other());
            assert_eq!(node.board().empty_spaces() + node.board().filled_spaces(), 16);
        }
    }

    #[test]
    fn weighted_sampler_prefers_twos() {
        let mut rng = StdRng::seed_from_u64(5);
        let board = board_of([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut fours = 0;
        for _ in 0..1000 {
            let node = Node::derived(MoveType::Left, board, Player::Random, 0);
            let next = node.weighted_random_successor(&mut rng).unwrap();
            assert_eq!(next.board().filled_spaces(), 2);
            assert_eq!(next.mv(), MoveType::Rand);
            if next.board().largest_exponent() == 2 {
                fours += 1;
            }
        }
        assert!(fours > 50 && fours < 160, "{} fours", fours);
    }

    #[test]
    fn released_cache_is_rebuilt_identically() {
        let mut node = Node::with_seed(3);
        let first: Vec<Board> = node.successors().iter().map(|s| *s.board()).collect();
        assert!(node.has_cached_successors());
        node.release_successors();
        assert!(!node.has_cached_successors());
        let second: Vec<Board> = node.successors_mut().iter().map(|s| *s.board()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_move_has_no_successor() {
        let board = board_of([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
        let node = Node::derived(MoveType::Rand, board, Player::Human, 0);
        let node = node.into_successor(MoveType::Up).unwrap_err();
        assert_eq!(node.mv(), MoveType::Rand);
        assert!(node.into_successor(MoveType::Down).is_ok());
    }
}
