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

//! Xiangqi board
//!
//! A _board_ represents the contents of the 90 seats of a Xiangqi board
//! and provides the mechanisms needed to replay or to review a recorded
//! game. The following features are supported:
//!
//! [x] Movement rules for all seven kinds of pieces
//! [x] Check, including the "facing kings" rule
//! [x] Checkmate and stalemate (both lose in Xiangqi)
//! [x] Board strings (FEN) with color exchange and mirror transforms
//! [x] Side-relative Chinese move notation, both ways
//! [x] Setup placement sets for each kind of piece
//! [ ] Perpetual check and chase rules
//! [ ] Time Controls
//!
//! Some of the key abstractions include:
//!
//! * A `Coord` names one of the 90 seats by row (0..=9, row 0 on the
//!   bottom side) and column (0..=8). It has a packed one byte form
//!   (`row << 4 | col`) and an ICCS-like text form (`a0` .. `i9`). A
//!   `CoordPair` names a move by its two seats and packs into a `u16`.
//!
//! * A `Mask` is a 90-bit value in which each bit maps to a seat.
//!   Move generation returns masks of destinations. Masks can be
//!   combined using `|`, `|=`, `&`, `&=` and `!`; `iter()` walks the
//!   seats in row-major order starting from row 0.
//!
//! * `Material` is a piece `Kind` of a specific `Color`. A board owns a
//!   fixed pool of 32 pieces addressed by `PieceId`; each seat holds at
//!   most one `PieceId` and each placed piece knows its seat. Only the
//!   board changes either side of that link.
//!
//! * `Board::do_move` and `Board::undo_move` are the only primitives
//!   used to apply moves. A move is undone with the piece it captured,
//!   so any sequence of moves can be unwound exactly.
//!
//! * The `LegalMoves` trait provides move generation, check and
//!   checkmate detection for anything that can be viewed as a board.
//!

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use thiserror::Error;

mod coord;
mod fen;
mod material;
mod moves;
mod notation;

pub use coord::*;
pub use fen::*;
pub use material::*;
pub use moves::*;
pub use notation::*;

use fen::START_LAYOUT;
use moves::{ADVISOR_POINTS, BISHOP_POINTS, PALACE};
use Color::*;
use Kind::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("All pieces of {0:?} are already on the board")]
    PoolExhausted(Material),
}

/// How a position ended, from the point of view of the side to move.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardResult {
    /// The side in check has no legal move.
    CheckMate(Color),
    /// The side has no legal move but is not in check. Also a loss.
    StaleMate(Color),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Seats([Option<PieceId>; SEAT_COUNT]);

impl Index<Coord> for Seats {
    type Output = Option<PieceId>;
    fn index(&self, index: Coord) -> &Self::Output {
        &self.0[index.to_index()]
    }
}

impl Seats {
    fn set(&mut self, coord: Coord, value: Option<PieceId>) {
        self.0[coord.to_index()] = value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    seats: Seats,
    pieces: [Option<Coord>; PieceId::COUNT],
    bottom_color: Color,
}

impl Default for Board {
    /// The standard starting position, red at the bottom.
    fn default() -> Self {
        let mut board = Self::empty();
        for (coord, material) in START_LAYOUT.iter() {
            board
                .place(*coord, *material)
                .expect("start layout uses each pooled piece once");
        }
        board.update_bottom_color();
        board
    }
}

impl AsRef<Board> for Board {
    fn as_ref(&self) -> &Board {
        self
    }
}

impl LegalMoves for Board {}

impl Board {
    pub fn empty() -> Self {
        Self {
            seats: Seats([None; SEAT_COUNT]),
            pieces: [None; PieceId::COUNT],
            bottom_color: Red,
        }
    }

    #[inline]
    pub fn piece_at(&self, coord: Coord) -> Option<PieceId> {
        self.seats[coord]
    }

    #[inline]
    pub fn contents(&self, coord: Coord) -> Option<Material> {
        self.seats[coord].map(|id| id.material())
    }

    #[inline]
    pub fn is_empty(&self, coord: Coord) -> bool {
        self.seats[coord].is_none()
    }

    /// The seat of a piece, `None` while it is off the board.
    #[inline]
    pub fn seat_of(&self, id: PieceId) -> Option<Coord> {
        self.pieces[id.value()]
    }

    #[inline]
    pub fn bottom_color(&self) -> Color {
        self.bottom_color
    }

    #[inline]
    pub fn is_bottom_color(&self, color: Color) -> bool {
        self.bottom_color == color
    }

    /// Pieces of `color` currently on the board, in pool order.
    pub fn live_pieces(&self, color: Color) -> impl Iterator<Item = (PieceId, Coord)> + '_ {
        let start = color.to_index() * PieceId::PER_COLOR;
        (start..start + PieceId::PER_COLOR)
            .map(PieceId::new)
            .filter_map(|id| self.seat_of(id).map(|coord| (id, coord)))
    }

    pub fn live_material(&self, material: Material) -> impl Iterator<Item = Coord> + '_ {
        material.pool().filter_map(|index| self.pieces[index])
    }

    pub fn king(&self, color: Color) -> Option<Coord> {
        self.live_material(Material::new(color, King)).next()
    }

    pub fn occupied(&self) -> Mask {
        self.pieces.iter().flatten().copied().collect()
    }

    pub fn ours(&self, color: Color) -> Mask {
        self.live_pieces(color).map(|(_, coord)| coord).collect()
    }

    /// Put a free piece of `material` on `coord`, replacing whatever was there.
    pub fn place(&mut self, coord: Coord, material: Material) -> Result<PieceId, BoardError> {
        if let Some(current) = self.seats[coord] {
            if current.material() == material {
                return Ok(current);
            }
        }
        let id = material
            .pool()
            .map(PieceId::new)
            .find(|id| self.seat_of(*id).is_none())
            .ok_or(BoardError::PoolExhausted(material))?;
        self.clear(coord);
        self.seats.set(coord, Some(id));
        self.pieces[id.value()] = Some(coord);
        Ok(id)
    }

    pub fn clear(&mut self, coord: Coord) -> Option<PieceId> {
        let id = self.seats[coord]?;
        self.seats.set(coord, None);
        self.pieces[id.value()] = None;
        Some(id)
    }

    pub fn reset(&mut self) {
        self.seats = Seats([None; SEAT_COUNT]);
        self.pieces = [None; PieceId::COUNT];
    }

    /// Move the contents of `pair.from()` onto `pair.to()` and return what
    /// was captured. No legality check is made.
    pub fn do_move(&mut self, pair: CoordPair) -> Option<PieceId> {
        let (from, to) = (pair.from(), pair.to());
        if from == to {
            return None;
        }
        let captured = self.clear(to);
        if let Some(moving) = self.clear(from) {
            self.seats.set(to, Some(moving));
            self.pieces[moving.value()] = Some(to);
        }
        captured
    }

    /// Exact inverse of `do_move` given the piece it returned.
    pub fn undo_move(&mut self, pair: CoordPair, captured: Option<PieceId>) {
        let (from, to) = (pair.from(), pair.to());
        if from == to {
            return;
        }
        if let Some(moving) = self.clear(to) {
            self.seats.set(from, Some(moving));
            self.pieces[moving.value()] = Some(from);
        }
        if let Some(id) = captured {
            self.seats.set(to, Some(id));
            self.pieces[id.value()] = Some(to);
        }
    }

    /// Red is the bottom color unless the black king stands in rows 0..=4
    /// or the red king stands in rows 5..=9.
    pub fn update_bottom_color(&mut self) {
        self.bottom_color = match (self.king(Red), self.king(Black)) {
            (Some(coord), _) => {
                if coord.is_bottom() {
                    Red
                } else {
                    Black
                }
            }
            (None, Some(coord)) if coord.is_bottom() => Black,
            _ => Red,
        };
    }

    /// Seats where a piece of `material` may be set up.
    pub fn placements(&self, material: Material) -> Mask {
        let is_bottom = self.is_bottom_color(material.color());
        let (low, high) = if is_bottom { (0, 4) } else { (5, 9) };
        let own_half = move |row: usize| row >= low && row <= high;
        match material.kind() {
            King => Coord::iter()
                .filter(|c| own_half(c.row()) && PALACE.contains(*c))
                .collect(),
            Advisor => Coord::iter()
                .filter(|c| own_half(c.row()) && ADVISOR_POINTS.contains(*c))
                .collect(),
            Bishop => Coord::iter()
                .filter(|c| own_half(c.row()) && BISHOP_POINTS.contains(*c))
                .collect(),
            Pawn => {
                let (start_low, start_high) = if is_bottom { (3, 4) } else { (5, 6) };
                Coord::iter()
                    .filter(|c| {
                        let start = c.row() >= start_low && c.row() <= start_high && c.col() % 2 == 0;
                        start || !own_half(c.row())
                    })
                    .collect()
            }
            Knight | Rook | Cannon => Mask::all(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen())
    }
}

#[cfg(test)]
impl Board {
    /// Builder used by tests: place (or clear) a seat and refresh the
    /// bottom color.
    pub fn set_contents(mut self, coord: Coord, value: Option<Material>) -> Self {
        match value {
            Some(material) => {
                self.place(coord, material).expect("pool exhausted");
            }
            None => {
                self.clear(coord);
            }
        }
        self.update_bottom_color();
        self
    }
}
