use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::color::Color;
use crate::coord::{Col, Coord};
use crate::grid::Grid;
use crate::piece::{Piece, PieceKind};
use crate::starter::starting_grid;


#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VictoryReason {
    // The opponent has no pieces left.
    Annihilation,
    // A piece stands on the opponent's home file.
    ReachedGoal,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Outcome {
    pub winner: Color,
    pub reason: VictoryReason,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnError {
    NoPieceAtSource,
    ForeignPiece,
    IllegalDestination,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Destinations {
    pub moves: BTreeSet<Coord>,
    pub captures: BTreeSet<Coord>,
}

impl Destinations {
    pub fn contains(&self, to: Coord) -> bool {
        self.moves.contains(&to) || self.captures.contains(&to)
    }
    pub fn is_empty(&self) -> bool { self.moves.is_empty() && self.captures.is_empty() }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveReport {
    pub piece: Piece,
    pub captured: Option<Piece>,
}


#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    grid: Grid,
}

impl Board {
    pub fn new() -> Self { Self::new_from_grid(starting_grid()) }
    pub fn new_from_grid(grid: Grid) -> Self { Board { grid } }

    pub fn grid(&self) -> &Grid { &self.grid }

    // Persons step orthogonally into empty cells and capture diagonally. Circles do both in
    // all eight directions. Captures take priority: if any capture exists, plain moves are
    // not offered. A circle that made `MAX_CAPTURES` captures only moves.
    pub fn legal_destinations(&self, from: Coord) -> Destinations {
        let Some(piece) = self.grid[from] else {
            return Destinations::default();
        };
        let mut destinations = Destinations::default();
        if piece.can_capture() {
            destinations.captures = from
                .neighbours(piece.kind.capture_steps())
                .filter(|&to| self.grid[to].is_some_and(|target| target.color != piece.color))
                .collect();
        }
        if destinations.captures.is_empty() {
            destinations.moves = from
                .neighbours(piece.kind.move_steps())
                .filter(|&to| self.grid[to].is_none())
                .collect();
        }
        destinations
    }

    // Relocates the piece. An opposing piece at `to` is removed; a capturing circle counts it.
    // Does not check legality: use `try_move` for that.
    pub fn apply_move(&mut self, from: Coord, to: Coord) -> Result<MoveReport, TurnError> {
        let mut piece = self.grid[from].take().ok_or(TurnError::NoPieceAtSource)?;
        let captured = self.grid[to].take();
        if captured.is_some() && piece.kind == PieceKind::Circle {
            piece.captures_made += 1;
        }
        self.grid[to] = Some(piece);
        Ok(MoveReport { piece, captured })
    }

    pub fn try_move(
        &mut self, color: Color, from: Coord, to: Coord,
    ) -> Result<MoveReport, TurnError> {
        let piece = self.grid[from].ok_or(TurnError::NoPieceAtSource)?;
        if piece.color != color {
            return Err(TurnError::ForeignPiece);
        }
        if !self.legal_destinations(from).contains(to) {
            return Err(TurnError::IllegalDestination);
        }
        self.apply_move(from, to)
    }

    // Annihilation is checked before reaching the goal; colors are tested in declaration order.
    pub fn winner(&self) -> Option<Outcome> {
        let counts = self.grid.piece_counts();
        let annihilation = Color::iter()
            .find(|&color| counts[color.opponent()] == 0)
            .map(|winner| Outcome { winner, reason: VictoryReason::Annihilation });
        annihilation.or_else(|| {
            Color::iter()
                .find(|&color| {
                    let goal = Col::goal_file(color);
                    self.grid
                        .pieces()
                        .any(|(coord, piece)| piece.color == color && coord.col == goal)
                })
                .map(|winner| Outcome { winner, reason: VictoryReason::ReachedGoal })
        })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Display::fmt(&self.grid, f) }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Board\n{}", self.grid)
    }
}
