//! Board coordinates: files `a`-`h`, ranks `1`-`8`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

pub const FILES: &str = "abcdefgh";
pub const RANKS: &str = "12345678";

/// A square on the board, stored as `file + rank * 8` (a1 = 0, h8 = 63).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub const COUNT: usize = 64;

    /// Build a square from zero-based file and rank.
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self(rank * 8 + file))
        } else {
            None
        }
    }

    /// Parse the `<file><rank>` form, e.g. `e4`. Anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let file = chars.next().and_then(file_index)?;
        let rank = chars.next().and_then(rank_index)?;
        if chars.next().is_some() {
            return None;
        }
        Self::new(file, rank)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    pub fn file_char(self) -> char {
        (b'a' + self.file()) as char
    }

    pub fn rank_char(self) -> char {
        (b'1' + self.rank()) as char
    }

    /// Shift by a file/rank delta, `None` when it leaves the board.
    pub fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Self> {
        let file = self.file() as i8 + file_delta;
        let rank = self.rank() as i8 + rank_delta;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Self::new(file as u8, rank as u8)
        } else {
            None
        }
    }

    /// All 64 squares, a1, b1, ... h1, a2, ... h8.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..Self::COUNT as u8).map(Square)
    }
}

/// Zero-based file index of a file letter.
pub fn file_index(c: char) -> Option<u8> {
    FILES.find(c).map(|i| i as u8)
}

/// Zero-based rank index of a rank digit.
pub fn rank_index(c: char) -> Option<u8> {
    RANKS.find(c).map(|i| i as u8)
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Square {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Square::parse(s.trim()).ok_or_else(|| CoreError::InvalidSquare(s.to_string()))
    }
}

impl Serialize for Square {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let sq: Square = "e4".parse().unwrap();
        assert_eq!(sq.file(), 4);
        assert_eq!(sq.rank(), 3);
        assert_eq!(sq.to_string(), "e4");
        assert_eq!(Square::parse("a1").map(Square::index), Some(0));
        assert_eq!(Square::parse("h8").map(Square::index), Some(63));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Square::parse("i4").is_none());
        assert!(Square::parse("e9").is_none());
        assert!(Square::parse("e").is_none());
        assert!(Square::parse("e44").is_none());
        assert!(Square::parse("E4").is_none());
        assert!("zz".parse::<Square>().is_err());
    }

    #[test]
    fn test_offset_stays_on_board() {
        let a1 = Square::parse("a1").unwrap();
        assert_eq!(a1.offset(1, 2), Square::parse("b3"));
        assert_eq!(a1.offset(-1, 0), None);
        assert_eq!(a1.offset(0, 8), None);
    }

    #[test]
    fn test_serde_as_text() {
        let sq = Square::parse("g1").unwrap();
        assert_eq!(serde_json::to_string(&sq).unwrap(), "\"g1\"");
        let back: Square = serde_json::from_str("\"g1\"").unwrap();
        assert_eq!(back, sq);
        assert!(serde_json::from_str::<Square>("\"x9\"").is_err());
    }
}
