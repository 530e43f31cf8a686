// Copyright 2026 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

//! Board strings
//!
//! Ranks are written from row 9 down to row 0 and separated by `/`.
//! Pieces use `K A B N R C P` (red upper case, black lower case) and runs
//! of empty seats collapse to a digit. Only the first whitespace separated
//! field of a full FEN record is read.

use once_cell::sync::Lazy;
use thiserror::Error;

use super::coord::{Coord, Transform, COL_COUNT, ROW_COUNT};
use super::material::Material;
use super::{Board, BoardError};

pub const START_FEN: &str = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR";

pub(crate) static START_LAYOUT: Lazy<Vec<(Coord, Material)>> =
    Lazy::new(|| parse_layout(START_FEN).unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("Expected 10 ranks, found {0}")]
    RowCount(usize),
    #[error("Rank for row {0} does not describe 9 seats")]
    RowWidth(usize),
    #[error("Invalid character '{0}'")]
    InvalidChar(char),
    #[error(transparent)]
    Board(#[from] BoardError),
}

fn board_field(fen: &str) -> &str {
    fen.split_whitespace().next().unwrap_or("")
}

fn parse_layout(fen: &str) -> Result<Vec<(Coord, Material)>, FenError> {
    let ranks: Vec<&str> = board_field(fen).split('/').collect();
    if ranks.len() != ROW_COUNT {
        return Err(FenError::RowCount(ranks.len()));
    }
    let mut layout = Vec::new();
    for (index, rank) in ranks.iter().enumerate() {
        let row = ROW_COUNT - 1 - index;
        let mut col = 0;
        for c in rank.chars() {
            if col >= COL_COUNT {
                return Err(FenError::RowWidth(row));
            }
            match c {
                '1'..='9' => col += c as usize - '0' as usize,
                '_' => col += 1,
                _ => {
                    let material = Material::from_fen_char(c).ok_or(FenError::InvalidChar(c))?;
                    layout.push((Coord::new(row, col), material));
                    col += 1;
                }
            }
        }
        if col != COL_COUNT {
            return Err(FenError::RowWidth(row));
        }
    }
    Ok(layout)
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut board = Self::empty();
        board.set_fen(fen)?;
        Ok(board)
    }

    pub fn fen(&self) -> String {
        let mut ranks = Vec::with_capacity(ROW_COUNT);
        for row in (0..ROW_COUNT).rev() {
            let mut rank = String::new();
            let mut empty = 0;
            for col in 0..COL_COUNT {
                match self.contents(Coord::new(row, col)) {
                    Some(material) => {
                        if empty > 0 {
                            rank.push_str(&empty.to_string());
                            empty = 0;
                        }
                        rank.push(material.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                rank.push_str(&empty.to_string());
            }
            ranks.push(rank);
        }
        ranks.join("/")
    }

    /// Replace the contents of the board. The board is left in an
    /// unspecified state when an error is returned.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), FenError> {
        let layout = parse_layout(fen)?;
        self.reset();
        for (coord, material) in layout {
            self.place(coord, material)?;
        }
        self.update_bottom_color();
        Ok(())
    }

    /// Rewrite the board through `transform`.
    pub fn change_layout(&mut self, transform: Transform) -> Result<(), FenError> {
        let fen = transform_fen(&self.fen(), transform)?;
        self.set_fen(&fen)
    }
}

/// Apply a color exchange or mirror to a board string.
pub fn transform_fen(fen: &str, transform: Transform) -> Result<String, FenError> {
    let field = board_field(fen);
    if transform == Transform::Identity {
        return Ok(field.to_string());
    }
    if transform == Transform::Exchange {
        return Ok(field
            .chars()
            .map(|c| {
                if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                }
            })
            .collect());
    }
    let mut ranks: Vec<String> = field.split('/').map(str::to_string).collect();
    if ranks.len() != ROW_COUNT {
        return Err(FenError::RowCount(ranks.len()));
    }
    if matches!(transform, Transform::SymmetryH | Transform::Rotate) {
        for rank in ranks.iter_mut() {
            *rank = rank.chars().rev().collect();
        }
    }
    if matches!(transform, Transform::SymmetryV | Transform::Rotate) {
        ranks.reverse();
    }
    Ok(ranks.join("/"))
}

#[cfg(test)]
mod tests {
    use crate::*;
    use strum::IntoEnumIterator;

    const MIDGAME: &str = "2bakab2/9/2n1c1n2/p1p1C1p1p/9/2P3P2/P3p3P/1C2B1N2/9/RN1AKA1R1";

    #[test]
    fn test_start_fen_round_trip() {
        let board = Board::default();
        assert_eq!(board.fen(), START_FEN);
        let board = Board::from_fen(START_FEN).unwrap();
        assert_eq!(board, Board::default());
    }

    #[test]
    fn test_round_trip() {
        let board = Board::from_fen(MIDGAME).unwrap();
        assert_eq!(board.fen(), MIDGAME);
        let mut other = Board::default();
        other.set_fen(&board.fen()).unwrap();
        assert_eq!(other.fen(), MIDGAME);
    }

    #[test]
    fn test_full_record_accepted() {
        let board = Board::from_fen(&format!("{} r - - 0 1", START_FEN)).unwrap();
        assert_eq!(board.fen(), START_FEN);
    }

    #[test]
    fn test_underscore_is_empty() {
        let fen = START_FEN.replace("/9/9/", "/_________/9/");
        let board = Board::from_fen(&fen).unwrap();
        assert_eq!(board.fen(), START_FEN);
    }

    #[test]
    fn test_errors() {
        assert_eq!(Board::from_fen("9/9/9"), Err(FenError::RowCount(3)));
        let wide = START_FEN.replacen("9", "91", 1);
        assert_eq!(Board::from_fen(&wide), Err(FenError::RowWidth(8)));
        let narrow = START_FEN.replacen("9", "8", 1);
        assert_eq!(Board::from_fen(&narrow), Err(FenError::RowWidth(8)));
        let bad = START_FEN.replacen('n', "x", 1);
        assert_eq!(Board::from_fen(&bad), Err(FenError::InvalidChar('x')));
        let crowded = START_FEN.replacen("9", "KKK6", 1);
        assert_eq!(
            Board::from_fen(&crowded),
            Err(FenError::Board(BoardError::PoolExhausted(Material::RK)))
        );
    }

    #[test]
    fn test_transforms() {
        let exchanged = transform_fen(START_FEN, Transform::Exchange).unwrap();
        assert_eq!(
            exchanged,
            "RNBAKABNR/9/1C5C1/P1P1P1P1P/9/9/p1p1p1p1p/1c5c1/9/rnbakabnr"
        );
        let flipped = transform_fen(START_FEN, Transform::SymmetryV).unwrap();
        assert_eq!(
            flipped,
            "RNBAKABNR/9/1C5C1/P1P1P1P1P/9/9/p1p1p1p1p/1c5c1/9/rnbakabnr"
        );
        let board = Board::from_fen(&flipped).unwrap();
        assert_eq!(board.bottom_color(), Color::Black);
        let mirrored = transform_fen(MIDGAME, Transform::SymmetryH).unwrap();
        assert_eq!(
            mirrored,
            "2bakab2/9/2n1c1n2/p1p1C1p1p/9/2P3P2/P3p3P/2N1B2C1/9/1R1AKA1NR"
        );
        assert_eq!(transform_fen(START_FEN, Transform::Identity).unwrap(), START_FEN);
        assert_eq!(
            transform_fen("9/9", Transform::Rotate),
            Err(FenError::RowCount(2))
        );
    }

    #[test]
    fn test_transforms_are_involutions() {
        for transform in Transform::iter() {
            for fen in [START_FEN, MIDGAME] {
                let once = transform_fen(fen, transform).unwrap();
                assert_eq!(transform_fen(&once, transform).unwrap(), fen);
            }
        }
    }

    #[test]
    fn test_change_layout() {
        let mut board = Board::from_fen(MIDGAME).unwrap();
        board.change_layout(Transform::Rotate).unwrap();
        assert_eq!(board.bottom_color(), Color::Black);
        assert_eq!(board.contents(Coord::new(9, 8)), Some(Material::RR));
        board.change_layout(Transform::Rotate).unwrap();
        assert_eq!(board.fen(), MIDGAME);
    }
}
