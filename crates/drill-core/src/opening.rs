//! Opening lines and the catalog they are drilled from.
//!
//! Lines are static reference data: loaded once, shared behind `Arc`, never
//! mutated.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::moves::Move;
use crate::piece::Color;
use crate::square::Square;

/// One ply of a line, with the comment shown after it is played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningMove {
    pub from: Square,
    pub to: Square,
    pub notation: String,
    pub comment: String,
}

impl OpeningMove {
    pub fn mv(&self) -> Move {
        Move::new(self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub id: String,
    pub name: String,
    pub description: String,
    /// The side the learner plays in this line.
    pub color: Color,
    pub moves: Vec<OpeningMove>,
}

impl Opening {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn ply(&self, index: usize) -> Option<&OpeningMove> {
        self.moves.get(index)
    }

    pub fn line(&self) -> Vec<Move> {
        self.moves.iter().map(OpeningMove::mv).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    openings: Vec<Arc<Opening>>,
}

impl Catalog {
    /// The eight lines shipped with the trainer.
    pub fn builtin() -> Self {
        Self {
            openings: builtin_openings().into_iter().map(Arc::new).collect(),
        }
    }

    /// Parse a JSON array of openings. Ids must be unique and every line
    /// must have at least one ply.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let openings: Vec<Opening> = serde_json::from_str(json)?;
        Self::from_openings(openings)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_openings(openings: Vec<Opening>) -> Result<Self, CoreError> {
        if openings.is_empty() {
            return Err(CoreError::InvalidCatalog("catalog has no openings".into()));
        }
        let mut seen = HashSet::new();
        for opening in &openings {
            if !seen.insert(opening.id.as_str()) {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate opening id {:?}",
                    opening.id
                )));
            }
            if opening.moves.is_empty() {
                return Err(CoreError::InvalidCatalog(format!(
                    "opening {:?} has no moves",
                    opening.id
                )));
            }
        }
        Ok(Self {
            openings: openings.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn get(&self, id: &str) -> Result<Arc<Opening>, CoreError> {
        self.openings
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownOpening(id.to_string()))
    }

    /// The default selection. A catalog is never empty.
    pub fn first(&self) -> Arc<Opening> {
        Arc::clone(&self.openings[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Opening>> {
        self.openings.iter()
    }

    pub fn len(&self) -> usize {
        self.openings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        let openings: Vec<&Opening> = self.openings.iter().map(|o| o.as_ref()).collect();
        Ok(serde_json::to_string_pretty(&openings)?)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn ply(from: &str, to: &str, notation: &str, comment: &str) -> Option<OpeningMove> {
    Some(OpeningMove {
        from: Square::parse(from)?,
        to: Square::parse(to)?,
        notation: notation.to_string(),
        comment: comment.to_string(),
    })
}

fn opening(
    id: &str,
    name: &str,
    description: &str,
    color: Color,
    moves: [Option<OpeningMove>; 5],
) -> Opening {
    Opening {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        color,
        moves: moves.into_iter().flatten().collect(),
    }
}

fn builtin_openings() -> Vec<Opening> {
    vec![
        opening(
            "italian-game",
            "Italian Game",
            "One of the oldest openings: quick development and control of the centre.",
            Color::White,
            [
                ply("e2", "e4", "e4", "King's pawn opening, claiming the centre."),
                ply("e7", "e5", "e5", "Black answers symmetrically."),
                ply("g1", "f3", "Nf3", "The knight develops and attacks e5."),
                ply("b8", "c6", "Nc6", "The knight defends e5."),
                ply("f1", "c4", "Bc4", "The bishop eyes f7. This is the Italian Game!"),
            ],
        ),
        opening(
            "sicilian-defense",
            "Sicilian Defense",
            "Black's most popular reply to e4: an unbalanced position with winning chances.",
            Color::Black,
            [
                ply("e2", "e4", "e4", "King's pawn opening."),
                ply("c7", "c5", "c5", "The Sicilian! Black fights for d4."),
                ply("g1", "f3", "Nf3", "The knight develops."),
                ply("d7", "d6", "d6", "Black firms up the pawn structure."),
                ply("d2", "d4", "d4", "White expands in the centre."),
            ],
        ),
        opening(
            "french-defense",
            "French Defense",
            "A defensive opening built on a solid pawn chain.",
            Color::Black,
            [
                ply("e2", "e4", "e4", "King's pawn opening."),
                ply("e7", "e6", "e6", "The French! Preparing d5."),
                ply("d2", "d4", "d4", "White advances a second centre pawn."),
                ply("d7", "d5", "d5", "Black challenges the centre."),
                ply("b1", "c3", "Nc3", "The knight puts pressure on d5."),
            ],
        ),
        opening(
            "queens-gambit",
            "Queen's Gambit",
            "The flagship d4 opening: a pawn is offered for central control.",
            Color::White,
            [
                ply("d2", "d4", "d4", "Queen's pawn opening."),
                ply("d7", "d5", "d5", "Black answers symmetrically."),
                ply("c2", "c4", "c4", "The Queen's Gambit! Pressure on d5."),
                ply("e7", "e6", "e6", "Queen's Gambit Declined."),
                ply("b1", "c3", "Nc3", "The knight develops."),
            ],
        ),
        opening(
            "london-system",
            "London System",
            "A stable system opening that is easy to learn and played at every level.",
            Color::White,
            [
                ply("d2", "d4", "d4", "Queen's pawn opening."),
                ply("d7", "d5", "d5", "Black answers symmetrically."),
                ply("c1", "f4", "Bf4", "The key move of the London System!"),
                ply("g8", "f6", "Nf6", "The knight develops."),
                ply("e2", "e3", "e3", "White stabilises the pawn structure."),
            ],
        ),
        opening(
            "ruy-lopez",
            "Ruy Lopez",
            "The classical Spanish Opening, putting pressure on the c6 knight.",
            Color::White,
            [
                ply("e2", "e4", "e4", "King's pawn opening."),
                ply("e7", "e5", "e5", "Black answers symmetrically."),
                ply("g1", "f3", "Nf3", "The knight develops."),
                ply("b8", "c6", "Nc6", "The knight defends."),
                ply("f1", "b5", "Bb5", "The Ruy Lopez! The bishop presses the knight."),
            ],
        ),
        opening(
            "caro-kann",
            "Caro-Kann Defense",
            "Like the French, but d5 is supported by the c-pawn.",
            Color::Black,
            [
                ply("e2", "e4", "e4", "King's pawn opening."),
                ply("c7", "c6", "c6", "The Caro-Kann! Preparing d5."),
                ply("d2", "d4", "d4", "White expands in the centre."),
                ply("d7", "d5", "d5", "Black challenges the centre."),
                ply("b1", "c3", "Nc3", "The knight develops."),
            ],
        ),
        opening(
            "kings-indian",
            "King's Indian Defense",
            "A hypermodern opening: concede the centre now, strike back later.",
            Color::Black,
            [
                ply("d2", "d4", "d4", "Queen's pawn opening."),
                ply("g8", "f6", "Nf6", "The knight develops."),
                ply("c2", "c4", "c4", "White expands in the centre."),
                ply("g7", "g6", "g6", "Preparing the kingside fianchetto."),
                ply("b1", "c3", "Nc3", "The knight develops."),
            ],
        ),
    ]
}
