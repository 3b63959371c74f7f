use std::{fmt, ops};

use enum_map::EnumMap;
use itertools::Itertools;
use ndarray::{Array, Array2};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::color::Color;
use crate::coord::{Coord, NUM_COLS, NUM_ROWS};
use crate::piece::{Piece, piece_to_ascii};


// Fixed 4x6 array of cells. The shape never changes, only cell contents do.
//
// On the wire a grid is a list of rows, each a list of optional pieces: `board[row][col]`.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    data: Array2<Option<Piece>>,
}

impl Grid {
    pub fn new() -> Self {
        Grid {
            data: Array::from_elem((NUM_ROWS as usize, NUM_COLS as usize), None),
        }
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        Coord::all().filter_map(|coord| self[coord].map(|piece| (coord, piece)))
    }

    pub fn count_pieces(&self, color: Color) -> usize {
        self.pieces().filter(|(_, piece)| piece.color == color).count()
    }

    pub fn piece_counts(&self) -> EnumMap<Color, usize> {
        let mut counts = EnumMap::default();
        for (_, piece) in self.pieces() {
            counts[piece.color] += 1;
        }
        counts
    }

    pub fn to_rows(&self) -> Vec<Vec<Option<Piece>>> {
        self.data.rows().into_iter().map(|row| row.to_vec()).collect()
    }

    pub fn from_rows(rows: Vec<Vec<Option<Piece>>>) -> Result<Self, String> {
        if rows.len() != NUM_ROWS as usize {
            return Err(format!("expected {} rows, got {}", NUM_ROWS, rows.len()));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != NUM_COLS as usize) {
            return Err(format!("expected {} columns, got {}", NUM_COLS, row.len()));
        }
        let cells = rows.into_iter().flatten().collect();
        let data = Array::from_shape_vec((NUM_ROWS as usize, NUM_COLS as usize), cells)
            .map_err(|err| err.to_string())?;
        Ok(Grid { data })
    }
}

impl ops::Index<Coord> for Grid {
    type Output = Option<Piece>;
    fn index(&self, pos: Coord) -> &Self::Output { &self.data[coord_to_index(pos)] }
}

impl ops::IndexMut<Coord> for Grid {
    fn index_mut(&mut self, pos: Coord) -> &mut Self::Output {
        &mut self.data[coord_to_index(pos)]
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Grid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<Option<Piece>>>::deserialize(deserializer)?;
        Grid::from_rows(rows).map_err(de::Error::custom)
    }
}

// Coord is always in bounds, so indexing never panics.
fn coord_to_index(pos: Coord) -> [usize; 2] {
    [pos.row.to_zero_based() as usize, pos.col.to_zero_based() as usize]
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.data.rows() {
            let line = row
                .iter()
                .map(|cell| match cell {
                    None => '.',
                    Some(piece) => piece_to_ascii(piece.kind, piece.color),
                })
                .join(" ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Grid ")?;
        f.debug_map().entries(self.pieces()).finish()
    }
}
