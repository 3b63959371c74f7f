use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::color::Color;


pub const NUM_ROWS: u8 = 4;
pub const NUM_COLS: u8 = 6;

// (d_row, d_col) steps.
pub const ORTHOGONAL_STEPS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
pub const DIAGONAL_STEPS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
pub const ALL_STEPS: [(i8, i8); 8] =
    [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (-1, 1), (1, -1), (1, 1)];


#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Row {
    idx: u8, // 0-based
}

impl Row {
    pub const fn from_zero_based(idx: u8) -> Self {
        assert!(idx < NUM_ROWS);
        Self { idx }
    }
    pub const fn checked_from_zero_based(idx: u8) -> Option<Self> {
        if idx < NUM_ROWS { Some(Self { idx }) } else { None }
    }
    pub const fn to_zero_based(self) -> u8 { self.idx }
    pub fn all() -> impl Iterator<Item = Self> + Clone { (0..NUM_ROWS).map(Self::from_zero_based) }
    pub fn checked_add(self, delta: i8) -> Option<Self> {
        let idx = u8::try_from(self.idx as i8 + delta).ok()?;
        Self::checked_from_zero_based(idx)
    }
}

impl TryFrom<u8> for Row {
    type Error = String;
    fn try_from(idx: u8) -> Result<Self, Self::Error> {
        Self::checked_from_zero_based(idx)
            .ok_or_else(|| format!("row {idx} is out of range 0..{NUM_ROWS}"))
    }
}

impl From<Row> for u8 {
    fn from(row: Row) -> u8 { row.idx }
}


// Columns are "files" in the game's terms: each side starts on its own home file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Col {
    idx: u8, // 0-based
}

impl Col {
    pub const fn from_zero_based(idx: u8) -> Self {
        assert!(idx < NUM_COLS);
        Self { idx }
    }
    pub const fn checked_from_zero_based(idx: u8) -> Option<Self> {
        if idx < NUM_COLS { Some(Self { idx }) } else { None }
    }
    pub const fn to_zero_based(self) -> u8 { self.idx }
    pub fn all() -> impl Iterator<Item = Self> + Clone { (0..NUM_COLS).map(Self::from_zero_based) }
    pub fn checked_add(self, delta: i8) -> Option<Self> {
        let idx = u8::try_from(self.idx as i8 + delta).ok()?;
        Self::checked_from_zero_based(idx)
    }

    pub const fn home_file(color: Color) -> Self {
        match color {
            Color::Red => Self::from_zero_based(0),
            Color::Blue => Self::from_zero_based(NUM_COLS - 1),
        }
    }
    // The file a color must reach to win: the opponent's home file.
    pub const fn goal_file(color: Color) -> Self {
        match color {
            Color::Red => Self::home_file(Color::Blue),
            Color::Blue => Self::home_file(Color::Red),
        }
    }
}

impl TryFrom<u8> for Col {
    type Error = String;
    fn try_from(idx: u8) -> Result<Self, Self::Error> {
        Self::checked_from_zero_based(idx)
            .ok_or_else(|| format!("col {idx} is out of range 0..{NUM_COLS}"))
    }
}

impl From<Col> for u8 {
    fn from(col: Col) -> u8 { col.idx }
}


#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: Row,
    pub col: Col,
}

impl Coord {
    pub const fn new(row: Row, col: Col) -> Self { Self { row, col } }

    // Panics if out of bounds. Meant for constants and tests.
    pub const fn at(row: u8, col: u8) -> Self {
        Self::new(Row::from_zero_based(row), Col::from_zero_based(col))
    }

    pub fn all() -> impl Iterator<Item = Coord> {
        Row::all().cartesian_product(Col::all()).map(|(row, col)| Coord { row, col })
    }

    // Returns `None` if the step leaves the board.
    pub fn offset(self, (d_row, d_col): (i8, i8)) -> Option<Coord> {
        Some(Coord {
            row: self.row.checked_add(d_row)?,
            col: self.col.checked_add(d_col)?,
        })
    }

    pub fn neighbours(self, steps: &[(i8, i8)]) -> impl Iterator<Item = Coord> + '_ {
        steps.iter().filter_map(move |&step| self.offset(step))
    }
}

impl fmt::Debug for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row.to_zero_based(), self.col.to_zero_based())
    }
}
