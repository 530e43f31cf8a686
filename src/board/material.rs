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

use serde::{Deserialize, Serialize};
use std::ops::{Not, Range};
use strum_macros::Display;
use strum_macros::EnumIter;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Material {
    color: Color,
    kind: Kind,
}

impl Material {
    pub const RK: Self = Self::red(King);
    pub const RA: Self = Self::red(Advisor);
    pub const RB: Self = Self::red(Bishop);
    pub const RN: Self = Self::red(Knight);
    pub const RR: Self = Self::red(Rook);
    pub const RC: Self = Self::red(Cannon);
    pub const RP: Self = Self::red(Pawn);

    pub const BK: Self = Self::black(King);
    pub const BA: Self = Self::black(Advisor);
    pub const BB: Self = Self::black(Bishop);
    pub const BN: Self = Self::black(Knight);
    pub const BR: Self = Self::black(Rook);
    pub const BC: Self = Self::black(Cannon);
    pub const BP: Self = Self::black(Pawn);

    #[inline]
    pub const fn new(color: Color, kind: Kind) -> Self {
        Self { color, kind }
    }

    #[inline]
    pub const fn red(kind: Kind) -> Self {
        Self::new(Red, kind)
    }

    #[inline]
    pub const fn black(kind: Kind) -> Self {
        Self::new(Black, kind)
    }

    /// Upper case letters are red, lower case are black.
    pub const fn from_fen_char(c: char) -> Option<Self> {
        let color = if c.is_ascii_uppercase() { Red } else { Black };
        let kind = match c.to_ascii_uppercase() {
            'K' => King,
            'A' => Advisor,
            'B' => Bishop,
            'N' => Knight,
            'R' => Rook,
            'C' => Cannon,
            'P' => Pawn,
            _ => return None,
        };
        Some(Self::new(color, kind))
    }

    #[inline]
    pub const fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    pub const fn to_index(&self) -> usize {
        self.color.to_index() * Kind::COUNT + self.kind.to_index()
    }

    pub const fn fen_char(&self) -> char {
        let c = self.kind.fen_char();
        match self.color {
            Red => c,
            Black => c.to_ascii_lowercase(),
        }
    }

    pub const fn name(&self) -> char {
        const RED_NAMES: [char; Kind::COUNT] = ['帅', '仕', '相', '马', '车', '炮', '兵'];
        const BLACK_NAMES: [char; Kind::COUNT] = ['将', '士', '象', '马', '车', '炮', '卒'];
        match self.color {
            Red => RED_NAMES[self.kind.to_index()],
            Black => BLACK_NAMES[self.kind.to_index()],
        }
    }

    /// Pool slots holding this material.
    pub const fn pool(&self) -> Range<usize> {
        let start = self.color.to_index() * PieceId::PER_COLOR + self.kind.pool_offset();
        start..start + self.kind.count()
    }
}

use Color::{Black, Red};

#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub const fn to_index(&self) -> usize {
        *self as usize
    }
}

impl Not for Color {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        match self {
            Red => Black,
            Black => Red,
        }
    }
}

#[derive(
    Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter,
)]
pub enum Kind {
    King,
    Advisor,
    Bishop,
    Knight,
    Rook,
    Cannon,
    Pawn,
}
use Kind::{Advisor, Bishop, Cannon, King, Knight, Pawn, Rook};

impl Kind {
    pub const COUNT: usize = 7;

    pub const fn from_index(index: usize) -> Self {
        debug_assert!(index < Self::COUNT);
        const KIND_MAP: [Kind; Kind::COUNT] = [King, Advisor, Bishop, Knight, Rook, Cannon, Pawn];
        KIND_MAP[index]
    }

    pub const fn to_index(&self) -> usize {
        *self as usize
    }

    /// Pieces of this kind each side starts with.
    pub const fn count(&self) -> usize {
        match self {
            King => 1,
            Pawn => 5,
            _ => 2,
        }
    }

    const fn pool_offset(&self) -> usize {
        match self {
            King => 0,
            _ => 1 + (self.to_index() - 1) * 2,
        }
    }

    pub const fn fen_char(&self) -> char {
        const CHARS: [char; Kind::COUNT] = ['K', 'A', 'B', 'N', 'R', 'C', 'P'];
        CHARS[self.to_index()]
    }

    /// Kings, rooks, cannons and pawns move along files and ranks, so their
    /// vertical moves are written as a step count.
    pub const fn is_line_piece(&self) -> bool {
        matches!(self, King | Rook | Cannon | Pawn)
    }
    pub const fn is_king(&self) -> bool {
        matches!(self, King)
    }
    pub const fn is_pawn(&self) -> bool {
        matches!(self, Pawn)
    }
}

/// Stable handle into the 32 piece pool of a board.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceId(u8);

impl PieceId {
    pub const PER_COLOR: usize = 16;
    pub const COUNT: usize = Self::PER_COLOR * 2;

    #[inline]
    pub const fn new(index: usize) -> Self {
        debug_assert!(index < Self::COUNT);
        Self(index as u8)
    }

    #[inline]
    pub const fn value(&self) -> usize {
        self.0 as usize
    }

    pub fn iter() -> impl Iterator<Item = PieceId> {
        (0..Self::COUNT).map(PieceId::new)
    }

    /// The material a pool slot always holds.
    pub const fn material(&self) -> Material {
        let color = if self.value() < Self::PER_COLOR { Red } else { Black };
        let offset = self.value() % Self::PER_COLOR;
        let kind = match offset {
            0 => King,
            1..=10 => Kind::from_index(1 + (offset - 1) / 2),
            _ => Pawn,
        };
        Material::new(color, kind)
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_fen_chars() {
        assert_eq!(Material::from_fen_char('C'), Some(Material::RC));
        assert_eq!(Material::from_fen_char('n'), Some(Material::BN));
        assert_eq!(Material::from_fen_char('x'), None);
        assert_eq!(Material::BK.fen_char(), 'k');
        assert_eq!(Material::RA.fen_char(), 'A');
    }

    #[test]
    fn test_names() {
        assert_eq!(Material::RK.name(), '帅');
        assert_eq!(Material::BK.name(), '将');
        assert_eq!(Material::RP.name(), '兵');
        assert_eq!(Material::BP.name(), '卒');
        assert_eq!(Material::BB.name(), '象');
    }

    #[test]
    fn test_pool_layout() {
        let mut total = 0;
        for color in Color::iter() {
            for kind in Kind::iter() {
                let material = Material::new(color, kind);
                let pool = material.pool();
                assert_eq!(pool.len(), kind.count());
                for index in pool {
                    assert_eq!(PieceId::new(index).material(), material);
                    total += 1;
                }
            }
        }
        assert_eq!(total, PieceId::COUNT);
    }

    #[test]
    fn test_color_not() {
        assert_eq!(!Color::Red, Color::Black);
        assert_eq!(!Color::Black, Color::Red);
    }
}
