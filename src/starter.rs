use strum::IntoEnumIterator;

use crate::color::Color;
use crate::coord::{Col, Coord, Row};
use crate::grid::Grid;
use crate::piece::{Piece, PieceKind};


// Starting position: every side fills its home file, three persons and a circle in the last row.
//
//   P . . . . p
//   P . . . . p
//   P . . . . p
//   C . . . . c
//
// Listed per row, the same for both colors. The column is `Col::home_file(color)`.
pub const STARTING_LAYOUT: [PieceKind; 4] =
    [PieceKind::Person, PieceKind::Person, PieceKind::Person, PieceKind::Circle];

// The seat order: the first participant seated in a session plays this color.
pub const FIRST_SEAT: Color = Color::Red;
pub const FIRST_TO_MOVE: Color = Color::Red;

pub fn starting_grid() -> Grid {
    let mut grid = Grid::new();
    for color in Color::iter() {
        let col = Col::home_file(color);
        for (row, kind) in Row::all().zip(STARTING_LAYOUT) {
            grid[Coord::new(row, col)] = Some(Piece::new(kind, color));
        }
    }
    grid
}
