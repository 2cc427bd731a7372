use std::fmt;

use serde::{Deserialize, Serialize};

use crate::square::Square;

/// A bare `from -> to` pair. Promotion, en passant and check are never encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// A move together with the notation it was played or announced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotatedMove {
    pub from: Square,
    pub to: Square,
    pub notation: String, // short algebraic, e.g. "Nf3"
}

impl NotatedMove {
    pub fn new(mv: Move, notation: impl Into<String>) -> Self {
        Self {
            from: mv.from,
            to: mv.to,
            notation: notation.into(),
        }
    }

    pub fn mv(&self) -> Move {
        Move::new(self.from, self.to)
    }
}
