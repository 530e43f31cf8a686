// Copyright 2023 Tobin Edwards
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

use anyhow::Result;
use once_cell::sync::Lazy;
use thiserror::Error;

use super::coord::{Coord, CoordPair, Mask, Offset, COL_COUNT, SEAT_COUNT};
use super::material::{Color, Kind, Material};
use super::{Board, BoardResult};

use Kind::*;

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Not a legal move")]
    InvalidMove,
}
use MoveError::*;

pub trait LegalMoves: AsRef<Board> {
    fn validate_move(&self, pair: CoordPair) -> Result<()> {
        if !self.legal_moves(pair.from()).contains(pair.to()) {
            return Err(InvalidMove.into());
        }
        Ok(())
    }

    /// Destinations the rules of movement allow, ignoring whether the
    /// mover's own king ends up in check.
    fn pseudo_moves(&self, from: Coord) -> Mask {
        let board: &Board = self.as_ref();
        let Some(material) = board.contents(from) else {
            return Mask::empty();
        };
        let destinations = match material.kind() {
            King => KING_MOVES[from],
            Advisor => ADVISOR_MOVES[from],
            Bishop => stepped_moves(board, &BISHOP_STEPS[from.to_index()]),
            Knight => stepped_moves(board, &KNIGHT_STEPS[from.to_index()]),
            Rook => rook_moves(board, from),
            Cannon => cannon_moves(board, from),
            Pawn => pawn_moves(board, from, material.color()),
        };
        destinations - board.ours(material.color())
    }

    /// Pseudo moves that do not leave the mover in check. Taking the
    /// opposing king is always kept.
    fn legal_moves(&self, from: Coord) -> Mask {
        let board: &Board = self.as_ref();
        let Some(material) = board.contents(from) else {
            return Mask::empty();
        };
        let color = material.color();
        let mut scratch = board.clone();
        let mut result = Mask::empty();
        for dest in self.pseudo_moves(from).iter() {
            if matches!(board.contents(dest), Some(m) if m.kind().is_king()) {
                result |= dest;
                continue;
            }
            let pair = CoordPair::new(from, dest);
            let captured = scratch.do_move(pair);
            if !scratch.is_in_check(color) {
                result |= dest;
            }
            scratch.undo_move(pair, captured);
        }
        result
    }

    /// Every piece of `color` that has at least one legal move.
    fn all_legal_moves(&self, color: Color) -> Vec<(Coord, Mask)> {
        let board: &Board = self.as_ref();
        board
            .live_pieces(color)
            .map(|(_, from)| (from, self.legal_moves(from)))
            .filter(|(_, moves)| !moves.is_empty())
            .collect()
    }

    /// Kings facing each other on an open file, or any opposing piece
    /// attacking the king. A side without a king is never in check.
    fn is_in_check(&self, color: Color) -> bool {
        let board: &Board = self.as_ref();
        let Some(king) = board.king(color) else {
            return false;
        };
        if let Some(other) = board.king(!color) {
            if kings_face(board, king, other) {
                return true;
            }
        }
        board
            .live_pieces(!color)
            .any(|(_, coord)| self.pseudo_moves(coord).contains(king))
    }

    /// No piece of `color` can move. Covers stalemate, which also loses.
    fn is_checkmated(&self, color: Color) -> bool {
        let board: &Board = self.as_ref();
        board
            .live_pieces(color)
            .all(|(_, from)| self.legal_moves(from).is_empty())
    }

    fn board_result(&self, color: Color) -> Option<BoardResult> {
        if !self.is_checkmated(color) {
            return None;
        }
        if self.is_in_check(color) {
            Some(BoardResult::CheckMate(color))
        } else {
            Some(BoardResult::StaleMate(color))
        }
    }
}

fn kings_face(board: &Board, king: Coord, other: Coord) -> bool {
    if king.col() != other.col() {
        return false;
    }
    let (low, high) = if king.row() < other.row() {
        (king.row(), other.row())
    } else {
        (other.row(), king.row())
    };
    (low + 1..high).all(|row| board.is_empty(Coord::new(row, king.col())))
}

/// A destination reachable only while `block` is empty: the knight's leg
/// or the bishop's eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    dest: Coord,
    block: Coord,
}

fn stepped_moves(board: &Board, steps: &[Step]) -> Mask {
    steps
        .iter()
        .filter(|step| board.is_empty(step.block))
        .map(|step| step.dest)
        .collect()
}

const ORTHOGONALS: [Offset; 4] = [
    Offset::new(1, 0),
    Offset::new(-1, 0),
    Offset::new(0, 1),
    Offset::new(0, -1),
];

const DIAGONALS: [Offset; 4] = [
    Offset::new(1, 1),
    Offset::new(1, -1),
    Offset::new(-1, 1),
    Offset::new(-1, -1),
];

fn ray(from: Coord, offset: Offset) -> impl Iterator<Item = Coord> {
    std::iter::successors(from + offset, move |coord| *coord + offset)
}

fn rook_moves(board: &Board, from: Coord) -> Mask {
    let mut result = Mask::empty();
    for offset in ORTHOGONALS {
        for coord in ray(from, offset) {
            result |= coord;
            if !board.is_empty(coord) {
                break;
            }
        }
    }
    result
}

fn cannon_moves(board: &Board, from: Coord) -> Mask {
    let mut result = Mask::empty();
    for offset in ORTHOGONALS {
        let mut screened = false;
        for coord in ray(from, offset) {
            let empty = board.is_empty(coord);
            if !screened {
                if empty {
                    result |= coord;
                } else {
                    screened = true;
                }
            } else if !empty {
                result |= coord;
                break;
            }
        }
    }
    result
}

fn pawn_moves(board: &Board, from: Coord, color: Color) -> Mask {
    let is_bottom_color = board.is_bottom_color(color);
    let forward = if is_bottom_color { 1 } else { -1 };
    let mut result = Mask::empty();
    if let Some(coord) = from + Offset::new(forward, 0) {
        result |= coord;
    }
    // across the river
    if is_bottom_color != from.is_bottom() {
        for side in [-1, 1] {
            if let Some(coord) = from + Offset::new(0, side) {
                result |= coord;
            }
        }
    }
    result
}

pub(crate) static PALACE: Lazy<Mask> = Lazy::new(|| {
    Coord::iter()
        .filter(|c| (3..=5).contains(&c.col()) && (c.row() <= 2 || c.row() >= 7))
        .collect()
});

pub(crate) static ADVISOR_POINTS: Lazy<Mask> = Lazy::new(|| {
    Coord::iter()
        .filter(|c| {
            let center = if c.is_bottom() { 1 } else { 8 };
            PALACE.contains(*c) && c.row().abs_diff(center) == c.col().abs_diff(4)
        })
        .collect()
});

pub(crate) static BISHOP_POINTS: Lazy<Mask> = Lazy::new(|| {
    Coord::iter()
        .filter(|c| {
            let row = c.row() % 5;
            let col = c.col();
            ((row == 0 || row == 4) && (col == 2 || col == 6)) || (row == 2 && col % 4 == 0)
        })
        .collect()
});

/// Neighbors of `from` that are still in the same palace.
fn palace_steps(from: Coord, offsets: &[Offset]) -> Mask {
    if !PALACE.contains(from) {
        return Mask::empty();
    }
    offsets
        .iter()
        .filter_map(|offset| from + offset)
        .filter(|coord| PALACE.contains(*coord) && coord.is_bottom() == from.is_bottom())
        .collect()
}

static KING_MOVES: Lazy<[Mask; SEAT_COUNT]> = Lazy::new(|| {
    let mut array = [Mask::default(); SEAT_COUNT];
    for coord in Coord::iter() {
        array[coord] = palace_steps(coord, &ORTHOGONALS);
    }
    array
});

static ADVISOR_MOVES: Lazy<[Mask; SEAT_COUNT]> = Lazy::new(|| {
    let mut array = [Mask::default(); SEAT_COUNT];
    for coord in Coord::iter() {
        array[coord] = palace_steps(coord, &DIAGONALS);
    }
    array
});

static BISHOP_STEPS: Lazy<Vec<Vec<Step>>> = Lazy::new(|| {
    Coord::iter()
        .map(|from| {
            DIAGONALS
                .iter()
                .filter_map(|unit| {
                    let offset = Offset::new(unit.row * 2, unit.col * 2);
                    let dest = (from + offset)?;
                    let block = (from + unit)?;
                    // bishops never cross the river
                    (dest.is_bottom() == from.is_bottom()).then_some(Step { dest, block })
                })
                .collect()
        })
        .collect()
});

static KNIGHT_STEPS: Lazy<Vec<Vec<Step>>> = Lazy::new(|| {
    const OFFSETS: [Offset; 8] = [
        Offset::new(-2, -1),
        Offset::new(-2, 1),
        Offset::new(2, -1),
        Offset::new(2, 1),
        Offset::new(-1, -2),
        Offset::new(1, -2),
        Offset::new(-1, 2),
        Offset::new(1, 2),
    ];
    Coord::iter()
        .map(|from| {
            OFFSETS
                .iter()
                .filter_map(|offset| {
                    let dest = (from + offset)?;
                    // the leg is the orthogonal neighbor in the long direction
                    let leg = if offset.row.abs() == 2 {
                        Offset::new(offset.row / 2, 0)
                    } else {
                        Offset::new(0, offset.col / 2)
                    };
                    let block = (from + leg)?;
                    Some(Step { dest, block })
                })
                .collect()
        })
        .collect()
});

impl Board {
    /// Number of pieces strictly between two seats on the same row or column.
    pub fn pieces_between(&self, a: Coord, b: Coord) -> Option<usize> {
        let offset = b - a;
        if offset.row != 0 && offset.col != 0 {
            return None;
        }
        let unit = Offset::new(offset.row.signum(), offset.col.signum());
        let count = ray(a, unit)
            .take_while(|coord| *coord != b)
            .filter(|coord| !self.is_empty(*coord))
            .count();
        Some(count)
    }

    /// Columns holding two or more pawns of `color`, with those pawns.
    pub(crate) fn stacked_pawns(&self, color: Color) -> Vec<Coord> {
        let pawns: Vec<Coord> = self.live_material(Material::new(color, Pawn)).collect();
        let mut per_col = [0usize; COL_COUNT];
        for coord in &pawns {
            per_col[coord.col()] += 1;
        }
        pawns
            .into_iter()
            .filter(|coord| per_col[coord.col()] > 1)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn c(row: usize, col: usize) -> Coord {
        Coord::new(row, col)
    }

    fn kings() -> Board {
        Board::empty()
            .set_contents(c(0, 4), Some(Material::RK))
            .set_contents(c(9, 3), Some(Material::BK))
    }

    #[test]
    fn test_start_position_cannon() {
        let board = Board::default();
        let moves = board.legal_moves(c(2, 1));
        // quiet moves along row 2 and up column 1, plus the capture of the knight
        assert!(moves.contains(c(2, 0)));
        assert!(moves.contains(c(2, 6)));
        assert!(!moves.contains(c(2, 7)));
        assert!(moves.contains(c(6, 1)));
        assert!(!moves.contains(c(7, 1)));
        assert!(!moves.contains(c(8, 1)));
        assert!(moves.contains(c(9, 1)));
        assert!(moves.contains(c(1, 1)));
        assert!(!moves.contains(c(0, 1)));
    }

    #[test]
    fn test_cannon_screen() {
        // cannon at row 0 col 0, screen at row 3, target at row 5
        let board = kings()
            .set_contents(c(0, 0), Some(Material::RC))
            .set_contents(c(3, 0), Some(Material::RP))
            .set_contents(c(5, 0), Some(Material::BR));
        let moves = board.pseudo_moves(c(0, 0));
        assert!(moves.contains(c(1, 0)));
        assert!(moves.contains(c(2, 0)));
        assert!(!moves.contains(c(3, 0)));
        assert!(!moves.contains(c(4, 0)));
        assert!(moves.contains(c(5, 0)));
        assert!(!moves.contains(c(6, 0)));
    }

    #[test]
    fn test_cannon_cannot_take_without_screen() {
        let board = kings()
            .set_contents(c(0, 0), Some(Material::RC))
            .set_contents(c(5, 0), Some(Material::BR));
        let moves = board.pseudo_moves(c(0, 0));
        assert!(moves.contains(c(4, 0)));
        assert!(!moves.contains(c(5, 0)));
    }

    #[test]
    fn test_rook_rays() {
        let board = kings()
            .set_contents(c(4, 4), Some(Material::RR))
            .set_contents(c(4, 6), Some(Material::BP))
            .set_contents(c(2, 4), Some(Material::RP));
        let moves = board.pseudo_moves(c(4, 4));
        assert!(moves.contains(c(4, 5)));
        assert!(moves.contains(c(4, 6)));
        assert!(!moves.contains(c(4, 7)));
        assert!(moves.contains(c(3, 4)));
        assert!(!moves.contains(c(2, 4)));
        assert!(moves.contains(c(4, 0)));
        assert!(moves.contains(c(9, 4)));
    }

    #[test]
    fn test_knight_leg() {
        let board = Board::default();
        let moves = board.legal_moves(c(0, 1));
        assert_eq!(moves, Mask::from_coords([c(2, 0), c(2, 2)]));
        // a piece on the leg blocks the jump
        let board = kings()
            .set_contents(c(4, 4), Some(Material::RN))
            .set_contents(c(5, 4), Some(Material::BP));
        let moves = board.pseudo_moves(c(4, 4));
        assert!(!moves.contains(c(6, 3)));
        assert!(!moves.contains(c(6, 5)));
        assert!(moves.contains(c(2, 3)));
        assert!(moves.contains(c(3, 6)));
        assert_eq!(moves.len(), 6);
    }

    #[test]
    fn test_bishop_eye_and_river() {
        let board = kings().set_contents(c(4, 2), Some(Material::RB));
        let moves = board.pseudo_moves(c(4, 2));
        assert_eq!(moves, Mask::from_coords([c(2, 0), c(2, 4)]));
        let board = board.set_contents(c(3, 3), Some(Material::BP));
        let moves = board.pseudo_moves(c(4, 2));
        assert_eq!(moves, Mask::from_coords([c(2, 0)]));
        // top side bishops stay on their side too
        let board = kings().set_contents(c(5, 2), Some(Material::BB));
        let moves = board.pseudo_moves(c(5, 2));
        assert_eq!(moves, Mask::from_coords([c(7, 0), c(7, 4)]));
    }

    #[test]
    fn test_advisor_and_king_stay_in_palace() {
        let board = kings().set_contents(c(0, 3), Some(Material::RA));
        assert_eq!(board.pseudo_moves(c(0, 3)), Mask::from_coords([c(1, 4)]));
        let board = kings().set_contents(c(1, 4), Some(Material::RA));
        assert_eq!(board.pseudo_moves(c(1, 4)).len(), 4);
        let moves = board.pseudo_moves(c(0, 4));
        assert_eq!(moves, Mask::from_coords([c(0, 3), c(0, 5)]));
        let moves = board.pseudo_moves(c(9, 3));
        assert_eq!(moves, Mask::from_coords([c(8, 3), c(9, 4)]));
    }

    #[test]
    fn test_pawn_moves() {
        let board = Board::default();
        assert_eq!(board.legal_moves(c(3, 0)), Mask::from_coords([c(4, 0)]));
        assert_eq!(board.legal_moves(c(6, 4)), Mask::from_coords([c(5, 4)]));
        let board = kings().set_contents(c(5, 4), Some(Material::RP));
        assert_eq!(
            board.pseudo_moves(c(5, 4)),
            Mask::from_coords([c(6, 4), c(5, 3), c(5, 5)])
        );
        // a pawn on the last row can only move sideways
        let board = kings().set_contents(c(9, 0), Some(Material::RP));
        assert_eq!(board.pseudo_moves(c(9, 0)), Mask::from_coords([c(9, 1)]));
    }

    #[test]
    fn test_pawn_direction_follows_bottom_color() {
        let board = Board::empty()
            .set_contents(c(0, 4), Some(Material::BK))
            .set_contents(c(9, 4), Some(Material::RK))
            .set_contents(c(6, 0), Some(Material::RP));
        assert_eq!(board.bottom_color(), Color::Black);
        assert_eq!(board.pseudo_moves(c(6, 0)), Mask::from_coords([c(5, 0)]));
    }

    #[test]
    fn test_empty_seat_has_no_moves() {
        let board = Board::default();
        assert!(board.pseudo_moves(c(4, 4)).is_empty());
        assert!(board.legal_moves(c(4, 4)).is_empty());
    }

    #[test]
    fn test_facing_kings() {
        let board = Board::empty()
            .set_contents(c(0, 4), Some(Material::RK))
            .set_contents(c(9, 4), Some(Material::BK));
        assert!(board.is_in_check(Color::Red));
        assert!(board.is_in_check(Color::Black));
        let board = board.set_contents(c(5, 4), Some(Material::RP));
        assert!(!board.is_in_check(Color::Red));
        // the pawn may not step aside and expose the kings
        assert!(board.legal_moves(c(5, 4)).contains(c(6, 4)));
        assert!(!board.legal_moves(c(5, 4)).contains(c(5, 3)));
    }

    #[test]
    fn test_pinned_piece() {
        let board = kings()
            .set_contents(c(1, 4), Some(Material::RN))
            .set_contents(c(8, 4), Some(Material::BR));
        assert!(board.legal_moves(c(1, 4)).is_empty());
        assert!(!board.pseudo_moves(c(1, 4)).is_empty());
    }

    #[test]
    fn test_no_king_no_check() {
        let board = Board::empty().set_contents(c(4, 4), Some(Material::BR));
        assert!(!board.is_in_check(Color::Red));
    }

    #[test]
    fn test_checkmate() {
        // two rooks against a bare king
        let board = Board::empty()
            .set_contents(c(0, 4), Some(Material::RK))
            .set_contents(c(9, 3), Some(Material::BK))
            .set_contents(c(9, 0), Some(Material::RR))
            .set_contents(c(8, 8), Some(Material::RR));
        assert!(board.is_in_check(Color::Black));
        assert!(board.is_checkmated(Color::Black));
        assert_eq!(
            board.board_result(Color::Black),
            Some(BoardResult::CheckMate(Color::Black))
        );
        assert!(!board.is_checkmated(Color::Red));
        assert_eq!(board.board_result(Color::Red), None);
    }

    #[test]
    fn test_checkmate_needs_the_checker() {
        // the rook is guarded by the pawn and the knights hem the king in
        let board = Board::from_fen("3nkn3/4R4/4P4/9/9/9/9/9/9/3K5").unwrap();
        assert!(board.is_in_check(Color::Black));
        assert!(board.is_checkmated(Color::Black));

        let board = board.set_contents(c(8, 4), None);
        assert!(!board.is_in_check(Color::Black));
        assert!(!board.is_checkmated(Color::Black));
        assert_eq!(board.board_result(Color::Black), None);
    }

    #[test]
    fn test_stalemate() {
        // black king on (9,3) cannot move: (8,3) covered by the rook on
        // row 8 and (9,4) faces the red king
        let board = Board::empty()
            .set_contents(c(0, 4), Some(Material::RK))
            .set_contents(c(9, 3), Some(Material::BK))
            .set_contents(c(8, 0), Some(Material::RR));
        assert!(!board.is_in_check(Color::Black));
        assert_eq!(
            board.board_result(Color::Black),
            Some(BoardResult::StaleMate(Color::Black))
        );
    }

    #[test]
    fn test_taking_the_king_is_kept() {
        let board = Board::empty()
            .set_contents(c(0, 3), Some(Material::RK))
            .set_contents(c(9, 4), Some(Material::BK))
            .set_contents(c(5, 4), Some(Material::RR))
            .set_contents(c(5, 3), Some(Material::BR));
        // the rook takes the king even though red is in check on column 3
        assert!(board.is_in_check(Color::Red));
        assert!(board.legal_moves(c(5, 4)).contains(c(9, 4)));
    }

    #[test]
    fn test_validate_move() {
        let board = Board::default();
        assert!(board
            .validate_move(CoordPair::new(c(0, 1), c(2, 2)))
            .is_ok());
        assert!(board
            .validate_move(CoordPair::new(c(0, 1), c(1, 1)))
            .is_err());
    }

    #[test]
    fn test_start_position_move_count() {
        let board = Board::default();
        let count: usize = board
            .all_legal_moves(Color::Red)
            .iter()
            .map(|(_, moves)| moves.len())
            .sum();
        assert_eq!(count, 44);
    }

    #[test]
    fn test_pieces_between() {
        let board = Board::default();
        assert_eq!(board.pieces_between(c(0, 4), c(2, 4)), Some(0));
        assert_eq!(board.pieces_between(c(0, 4), c(9, 4)), Some(2));
        assert_eq!(board.pieces_between(c(0, 1), c(9, 1)), Some(2));
        assert_eq!(board.pieces_between(c(0, 1), c(9, 2)), None);
    }
}
