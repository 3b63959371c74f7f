use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::coord::{ALL_STEPS, DIAGONAL_STEPS, ORTHOGONAL_STEPS};


// A circle stops capturing after this many captures. It may still move.
pub const MAX_CAPTURES: u8 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Person,
    Circle,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, new, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    #[new(value = "0")]
    #[serde(default)]
    pub captures_made: u8,
}

impl PieceKind {
    pub fn move_steps(self) -> &'static [(i8, i8)] {
        match self {
            PieceKind::Person => &ORTHOGONAL_STEPS,
            PieceKind::Circle => &ALL_STEPS,
        }
    }

    pub fn capture_steps(self) -> &'static [(i8, i8)] {
        match self {
            PieceKind::Person => &DIAGONAL_STEPS,
            PieceKind::Circle => &ALL_STEPS,
        }
    }

    pub fn to_ascii(self) -> char {
        match self {
            PieceKind::Person => 'P',
            PieceKind::Circle => 'C',
        }
    }
}

impl Piece {
    // Only circles count captures, so persons are never exhausted.
    pub fn can_capture(&self) -> bool {
        match self.kind {
            PieceKind::Person => true,
            PieceKind::Circle => self.captures_made < MAX_CAPTURES,
        }
    }
}

// Uppercase for Red, lowercase for Blue.
pub fn piece_to_ascii(kind: PieceKind, color: Color) -> char {
    let ch = kind.to_ascii();
    match color {
        Color::Red => ch,
        Color::Blue => ch.to_ascii_lowercase(),
    }
}

pub fn piece_from_ascii(ch: char) -> Option<(PieceKind, Color)> {
    let color = if ch.is_ascii_uppercase() { Color::Red } else { Color::Blue };
    let kind = match ch.to_ascii_uppercase() {
        'P' => PieceKind::Person,
        'C' => PieceKind::Circle,
        _ => return None,
    };
    Some((kind, color))
}
