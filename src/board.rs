use std::fmt;

pub const SIZE: usize = 4;

/// Largest exponent a nibble can hold. Two such tiles never merge.
pub const MAX_EXPONENT: u8 = 0xf;

/// Exponent of the winning tile (2^11 = 2048).
pub const WINNING_EXPONENT: u8 = 11;

pub type Grid = [[u8; SIZE]; SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step pointing towards the wall the tiles slide against.
    pub fn as_offset(&self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Row and column visiting order, nearest the destination wall first.
    fn traversal(&self) -> ([usize; SIZE], [usize; SIZE]) {
        const FORWARD: [usize; SIZE] = [0, 1, 2, 3];
        const BACKWARD: [usize; SIZE] = [3, 2, 1, 0];
        match self {
            Direction::Up | Direction::Left => (FORWARD, FORWARD),
            Direction::Down => (BACKWARD, FORWARD),
            Direction::Right => (FORWARD, BACKWARD),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        };
        write!(f, "{}", s)
    }
}

/// A 4x4 grid of tile exponents packed into one `u64`.
///
/// Cell `(row, col)` lives in bits `row * 16 + col * 4 .. +4`. An exponent of
/// zero is an empty cell, otherwise the tile shows `2^exponent`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(u64);

impl Board {
    pub const EMPTY: Board = Board(0);

    pub fn from_raw(raw: u64) -> Self {
        Board(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Pack a full exponent grid. Every entry must be at most 15.
    pub fn from_exponents(grid: &Grid) -> Self {
        let mut board = Board::EMPTY;
        for (row, cells) in grid.iter().enumerate() {
            for (col, &exponent) in cells.iter().enumerate() {
                board.set_exponent(row, col, exponent);
            }
        }
        board
    }

    #[inline]
    fn shift(row: usize, col: usize) -> u32 {
        debug_assert!(row < SIZE && col < SIZE);
        (row * 16 + col * 4) as u32
    }

    #[inline]
    pub fn exponent(&self, row: usize, col: usize) -> u8 {
        ((self.0 >> Self::shift(row, col)) & 0xf) as u8
    }

    /// The visible tile value: 0 for an empty cell, otherwise `2^exponent`.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> u32 {
        match self.exponent(row, col) {
            0 => 0,
            exponent => 1 << exponent,
        }
    }

    #[inline]
    pub fn set_exponent(&mut self, row: usize, col: usize, exponent: u8) {
        debug_assert!(exponent <= MAX_EXPONENT, "exponent {} does not fit a nibble", exponent);
        let shift = Self::shift(row, col);
        self.0 = (self.0 & !(0xf << shift)) | (u64::from(exponent & 0xf) << shift);
    }

    fn cells(&self) -> impl Iterator<Item = u8> + '_ {
        (0..SIZE * SIZE).map(move |i| ((self.0 >> (i * 4)) & 0xf) as u8)
    }

    pub fn empty_spaces(&self) -> usize {
        self.cells().filter(|&e| e == 0).count()
    }

    pub fn filled_spaces(&self) -> usize {
        SIZE * SIZE - self.empty_spaces()
    }

    pub fn largest_exponent(&self) -> u8 {
        self.cells().max().unwrap_or(0)
    }

    pub fn contains_exponent(&self, exponent: u8) -> bool {
        self.cells().any(|e| e == exponent)
    }

    /// Copy the exponents into `out`, which the caller hands over zeroed.
    pub fn fill_exponents(&self, out: &mut Grid) {
        for (row, cells) in out.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                let exponent = self.exponent(row, col);
                if exponent != 0 {
                    *cell = exponent;
                }
            }
        }
    }

    pub fn exponents(&self) -> Grid {
        let mut grid = [[0; SIZE]; SIZE];
        self.fill_exponents(&mut grid);
        grid
    }

    /// Slide every tile towards `direction`, merging equal neighbours once.
    ///
    /// Returns the score gained (the sum of the merged tile values, possibly 0)
    /// or `None` when nothing moved, in which case the board is untouched.
    pub fn slide(&mut self, direction: Direction) -> Option<u32> {
        let values = self.exponents();
        let mut merged = [[false; SIZE]; SIZE];
        let (rows, cols) = direction.traversal();
        let mut gained: Option<u32> = None;

        for &row in &rows {
            for &col in &cols {
                let exponent = values[row][col];
                if exponent == 0 {
                    continue;
                }
                let (to_row, to_col) = self.final_location(exponent, &merged, row, col, direction);
                if (to_row, to_col) == (row, col) {
                    continue;
                }

                let target = self.exponent(to_row, to_col);
                let mut points = 0;
                if target == 0 {
                    self.set_exponent(to_row, to_col, exponent);
                } else {
                    self.set_exponent(to_row, to_col, target + 1);
                    merged[to_row][to_col] = true;
                    points = 1 << (target + 1);
                }
                self.set_exponent(row, col, 0);
                *gained.get_or_insert(0) += points;
            }
        }

        gained
    }

    pub fn can_slide(&self, direction: Direction) -> bool {
        let mut copy = *self;
        copy.slide(direction).is_some()
    }

    fn final_location(
        &self,
        exponent: u8,
        merged: &[[bool; SIZE]; SIZE],
        row: usize,
        col: usize,
        direction: Direction,
    ) -> (usize, usize) {
        let (dr, dc) = direction.as_offset();
        let (mut r, mut c) = (row as isize, col as isize);

        loop {
            let (next_r, next_c) = (r + dr, c + dc);
            if !(0..SIZE as isize).contains(&next_r) || !(0..SIZE as isize).contains(&next_c) {
                break;
            }
            let (nr, nc) = (next_r as usize, next_c as usize);
            match self.exponent(nr, nc) {
                0 => {
                    r = next_r;
                    c = next_c;
                }
                next if next == exponent && exponent < MAX_EXPONENT && !merged[nr][nc] => {
                    return (nr, nc)
                }
                _ => break,
            }
        }

        (r as usize, c as usize)
    }

    pub fn smoothness(&self) -> u32 {
        grid_smoothness(&self.exponents())
    }

    pub fn monotonicity(&self) -> u32 {
        grid_monotonicity(&self.exponents())
    }
}

/// Sum of exponent gaps between each tile and the nearest tile to its right
/// and below, skipping empty cells. Lower is smoother.
pub fn grid_smoothness(grid: &Grid) -> u32 {
    let mut total = 0;
    for row in 0..SIZE {
        for col in 0..SIZE {
            let here = grid[row][col];
            if here == 0 {
                continue;
            }
            if let Some(&right) = grid[row][col + 1..].iter().find(|&&e| e != 0) {
                total += u32::from(here.abs_diff(right));
            }
            if let Some(below) = (row + 1..SIZE).map(|r| grid[r][col]).find(|&e| e != 0) {
                total += u32::from(here.abs_diff(below));
            }
        }
    }
    total
}

/// For every row and column, the smaller of the total rise and total fall
/// between consecutive tiles. Lower is more monotone.
pub fn grid_monotonicity(grid: &Grid) -> u32 {
    let rows = (0..SIZE).map(|row| line_monotonicity((0..SIZE).map(|col| grid[row][col])));
    let cols = (0..SIZE).map(|col| line_monotonicity((0..SIZE).map(|row| grid[row][col])));
    rows.chain(cols).sum()
}

fn line_monotonicity(line: impl Iterator<Item = u8>) -> u32 {
    let (mut rise, mut fall) = (0u32, 0u32);
    let mut previous: Option<u8> = None;
    for exponent in line.filter(|&e| e != 0) {
        if let Some(prev) = previous {
            if exponent > prev {
                rise += u32::from(exponent - prev);
            } else {
                fall += u32::from(prev - exponent);
            }
        }
        previous = Some(exponent);
    }
    rise.min(fall)
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "+----".repeat(SIZE) + "+";
        for row in 0..SIZE {
            writeln!(f, "{}", border)?;
            for col in 0..SIZE {
                let text = match self.value(row, col) {
                    0 => String::new(),
                    value => value.to_string(),
                };
                // 4-wide slot, centred with the extra space on the left
                let (left, right) = match text.len() {
                    0 => (2, 2),
                    1 => (2, 1),
                    2 => (1, 1),
                    3 => (1, 0),
                    _ => (0, 0),
                };
                write!(f, "|{}{}{}", " ".repeat(left), text, " ".repeat(right))?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "{}", border)
    }
}

#[cfg(test)]
pub(crate) fn board_of(values: [[u32; SIZE]; SIZE]) -> Board {
    let mut grid = [[0; SIZE]; SIZE];
    for (row, cells) in values.iter().enumerate() {
        for (col, &value) in cells.iter().enumerate() {
            if value != 0 {
                grid[row][col] = value.trailing_zeros() as u8;
            }
        }
    }
    Board::from_exponents(&grid)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn values(board: &Board) -> [[u32; SIZE]; SIZE] {
        let mut out = [[0; SIZE]; SIZE];
        for (row, cells) in out.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = board.value(row, col);
            }
        }
        out
    }

    #[test]
    fn nibble_layout_is_row_major() {
        let mut board = Board::EMPTY;
        board.set_exponent(0, 0, 1);
        board.set_exponent(0, 3, 2);
        board.set_exponent(3, 3, 15);
        assert_eq!(board.raw(), 0xf000_0000_0000_2001);
        assert_eq!(board.value(0, 0), 2);
        assert_eq!(board.value(0, 3), 4);
        assert_eq!(board.value(3, 3), 32768);
        assert_eq!(board.value(1, 1), 0);

        board.set_exponent(0, 3, 0);
        assert_eq!(board.raw(), 0xf000_0000_0000_0001);
    }

    #[test]
    fn counts_add_up_to_sixteen() {
        let board = board_of([[2, 0, 4, 0], [0, 0, 0, 8], [0, 16, 0, 0], [0, 0, 0, 2048]]);
        assert_eq!(board.empty_spaces(), 11);
        assert_eq!(board.filled_spaces(), 5);
        assert_eq!(board.empty_spaces() + board.filled_spaces(), 16);
        assert_eq!(board.largest_exponent(), 11);
        assert!(board.contains_exponent(WINNING_EXPONENT));
        assert_eq!(Board::EMPTY.largest_exponent(), 0);
    }

    #[test]
    fn exponents_repack_to_same_word() {
        let board = Board::from_raw(0x1234_0000_2002_0f01);
        let mut grid = [[0; SIZE]; SIZE];
        board.fill_exponents(&mut grid);
        assert_eq!(grid[0], [1, 0, 15, 0]);
        assert_eq!(Board::from_exponents(&grid), board);
    }

    #[test]
    fn left_slide_merges_a_pair() {
        let mut board = board_of([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(board.slide(Direction::Left), Some(4));
        assert_eq!(values(&board), [[4, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
    }

    #[test]
    fn tiles_merge_once_per_slide() {
        let mut board = board_of([[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(board.slide(Direction::Left), Some(8));
        assert_eq!(values(&board), [[4, 4, 0, 0], [0; 4], [0; 4], [0; 4]]);
    }

    #[test]
    fn blocked_slide_is_rejected() {
        let start = board_of([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
        let mut board = start;
        assert_eq!(board.slide(Direction::Right), None);
        assert_eq!(board, start);
        assert!(!start.can_slide(Direction::Left));
        assert!(start.can_slide(Direction::Down));
    }

    #[test]
    fn empty_board_cannot_slide() {
        for direction in Direction::ALL {
            let mut board = Board::EMPTY;
            assert_eq!(board.slide(direction), None);
            assert_eq!(board, Board::EMPTY);
        }
    }

    #[test]
    fn right_slide_does_not_merge_into_fresh_tile() {
        let mut board = board_of([[4, 2, 2, 4], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(board.slide(Direction::Right), Some(4));
        assert_eq!(values(&board), [[0, 4, 4, 4], [0; 4], [0; 4], [0; 4]]);
    }

    #[test]
    fn movement_without_merge_scores_zero() {
        let mut board = board_of([[0, 0, 0, 2], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(board.slide(Direction::Left), Some(0));
        assert_eq!(values(&board), [[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
    }

    #[test]
    fn vertical_slides() {
        let start = board_of([[2, 0, 0, 4], [2, 8, 0, 0], [4, 0, 0, 4], [4, 8, 2, 0]]);

        let mut up = start;
        assert_eq!(up.slide(Direction::Up), Some(4 + 8 + 16 + 8));
        assert_eq!(values(&up), [[4, 16, 2, 8], [8, 0, 0, 0], [0; 4], [0; 4]]);

        let mut down = start;
        assert_eq!(down.slide(Direction::Down), Some(4 + 8 + 16 + 8));
        assert_eq!(values(&down), [[0; 4], [0; 4], [4, 0, 0, 0], [8, 16, 2, 8]]);
    }

    #[test]
    fn slide_then_opposite_is_not_identity() {
        let start = board_of([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut board = start;
        board.slide(Direction::Left);
        board.slide(Direction::Right);
        assert_ne!(board, start);
    }

    #[test]
    fn top_exponent_tiles_do_not_merge() {
        let mut grid = [[0; SIZE]; SIZE];
        grid[0][0] = MAX_EXPONENT;
        grid[0][1] = MAX_EXPONENT;
        let start = Board::from_exponents(&grid);
        let mut board = start;
        assert_eq!(board.slide(Direction::Left), None);
        assert_eq!(board, start);

        let mut down = start;
        assert_eq!(down.slide(Direction::Down), Some(0));
        assert_eq!(down.exponent(3, 0), MAX_EXPONENT);
        assert_eq!(down.exponent(3, 1), MAX_EXPONENT);
        assert_eq!(down.filled_spaces(), 2);
    }

    #[test]
    fn slides_never_lose_the_largest_tile() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..2000 {
            let mut grid = [[0; SIZE]; SIZE];
            for cell in grid.iter_mut().flatten() {
                if rng.gen_bool(0.6) {
                    *cell = rng.gen_range(12..=MAX_EXPONENT);
                }
            }
            let start = Board::from_exponents(&grid);
            for direction in Direction::ALL {
                let mut board = start;
                let gained = board.slide(direction);
                assert!(board.largest_exponent() >= start.largest_exponent(), "{:?} {}", start, direction);
                assert!(board.filled_spaces() <= start.filled_spaces());
                if start.filled_spaces() > 0 {
                    assert!(board.filled_spaces() > 0);
                }
                match gained {
                    None => assert_eq!(board, start),
                    Some(_) => assert_ne!(board, start),
                }
                let merges = (start.filled_spaces() - board.filled_spaces()) as u32;
                let total: u64 = (0..SIZE * SIZE).map(|i| 1u64 << board.exponent(i / 4, i % 4)).sum();
                let before: u64 = (0..SIZE * SIZE).map(|i| 1u64 << start.exponent(i / 4, i % 4)).sum();
                // empty cells count as 2^0 each, so the tile mass is conserved up to the freed cells
                assert_eq!(total, before + u64::from(merges));
            }
        }
    }

    #[test]
    fn smoothness_skips_empty_cells() {
        let grid = [[1, 2, 0, 3], [2, 0, 0, 1], [0; 4], [0; 4]];
        assert_eq!(grid_smoothness(&grid), 6);
        assert_eq!(grid_monotonicity(&grid), 0);
        assert_eq!(Board::from_exponents(&grid).smoothness(), 6);
    }

    #[test]
    fn monotonicity_takes_cheaper_direction() {
        let grid = [[3, 1, 0, 2], [0; 4], [0; 4], [0; 4]];
        assert_eq!(grid_monotonicity(&grid), 1);
        assert_eq!(grid_smoothness(&grid), 3);
        assert_eq!(Board::from_exponents(&grid).monotonicity(), 1);
    }

    #[test]
    fn renders_padded_cells() {
        let board = board_of([[2, 16, 128, 2048], [0; 4], [0; 4], [0; 4]]);
        let rendered = board.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "+----+----+----+----+");
        assert_eq!(lines[1], "|  2 | 16 | 128|2048|");
        assert_eq!(lines[3], "|    |    |    |    |");
        assert_eq!(lines[8], "+----+----+----+----+");
    }
}
