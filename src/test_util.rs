// Test utilities that cannot be moved to the "tests" folder, because stress_test uses them.

use itertools::Itertools;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::board::Board;
use crate::color::Color;
use crate::coord::{Col, Coord, NUM_COLS, NUM_ROWS, Row};
use crate::grid::Grid;
use crate::piece::{Piece, piece_from_ascii};


// In theory random tests verify statistical properties that should always hold, but let's fix
// the seed to avoid sporadic failures.
pub fn deterministic_rng() -> impl Rng { rand::rngs::StdRng::from_seed([0; 32]) }

// Parses a board in the same format `Grid` is displayed in: one line per row, cells separated
// by whitespace, "." for an empty cell. Leading and trailing blank lines are ignored.
pub fn parse_ascii_board(s: &str) -> Result<Board, String> {
    let lines = s.lines().map(str::trim).filter(|line| !line.is_empty()).collect_vec();
    if lines.len() != NUM_ROWS as usize {
        return Err(format!("Expected {} rows, got {}", NUM_ROWS, lines.len()));
    }
    let mut grid = Grid::new();
    for (row, line) in Row::all().zip(lines) {
        let cells = line.split_whitespace().collect_vec();
        if cells.len() != NUM_COLS as usize {
            return Err(format!("Expected {} cells, got {:?}", NUM_COLS, line));
        }
        for (col, cell) in Col::all().zip(cells) {
            let mut chars = cell.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                return Err(format!("Invalid cell {:?}", cell));
            };
            if ch == '.' {
                continue;
            }
            let (kind, color) =
                piece_from_ascii(ch).ok_or_else(|| format!("Invalid piece {:?}", ch))?;
            grid[Coord::new(row, col)] = Some(Piece::new(kind, color));
        }
    }
    Ok(Board::new_from_grid(grid))
}

// Every legal (from, to) pair for the side, in board order.
pub fn legal_moves(board: &Board, color: Color) -> Vec<(Coord, Coord)> {
    board
        .grid()
        .pieces()
        .filter(|(_, piece)| piece.color == color)
        .flat_map(|(from, _)| {
            let destinations = board.legal_destinations(from);
            destinations.captures.into_iter().chain(destinations.moves).map(move |to| (from, to))
        })
        .collect_vec()
}

pub fn random_legal_move(
    board: &Board, color: Color, rng: &mut impl Rng,
) -> Option<(Coord, Coord)> {
    legal_moves(board, color).choose(rng).copied()
}
