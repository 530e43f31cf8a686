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

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, BitAnd, BitAndAssign, BitOr, BitOrAssign, Index, IndexMut, Not, Sub};
use strum_macros::EnumIter;

pub const ROW_COUNT: usize = 10;
pub const COL_COUNT: usize = 9;
pub const SEAT_COUNT: usize = ROW_COUNT * COL_COUNT;

const FILE_CHARS: [char; COL_COUNT] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i'];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    row: u8,
    col: u8,
}

impl Coord {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        debug_assert!(row < ROW_COUNT && col < COL_COUNT);
        Self {
            row: row as u8,
            col: col as u8,
        }
    }

    #[inline]
    pub const fn try_new(row: isize, col: isize) -> Option<Self> {
        if row < 0 || col < 0 || row >= ROW_COUNT as isize || col >= COL_COUNT as isize {
            return None;
        }
        Some(Self::new(row as usize, col as usize))
    }

    #[inline]
    pub const fn from_index(index: usize) -> Self {
        debug_assert!(index < SEAT_COUNT);
        Self::new(index / COL_COUNT, index % COL_COUNT)
    }

    /// Decode the packed `row << 4 | col` form.
    #[inline]
    pub const fn from_data(data: u8) -> Option<Self> {
        Self::try_new((data >> 4) as isize, (data & 0x0f) as isize)
    }

    /// Parse the ICCS-like form, e.g. `a0` or `e9`.
    pub fn from_iccs(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let f = chars.next()?;
        let r = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::from_chars(f, r)
    }

    #[inline]
    pub fn from_chars(f: char, r: char) -> Option<Self> {
        let col = FILE_CHARS.iter().position(|c| *c == f.to_ascii_lowercase())?;
        let row = r.to_digit(10)? as usize;
        Some(Self::new(row, col))
    }

    pub fn iter() -> impl DoubleEndedIterator<Item = Coord> {
        (0..SEAT_COUNT).map(Coord::from_index)
    }

    #[inline]
    pub const fn row(&self) -> usize {
        self.row as usize
    }
    #[inline]
    pub const fn col(&self) -> usize {
        self.col as usize
    }
    #[inline]
    pub const fn to_index(&self) -> usize {
        self.row() * COL_COUNT + self.col()
    }
    #[inline]
    pub const fn to_data(&self) -> u8 {
        self.row << 4 | self.col
    }
    #[inline]
    pub const fn to_mask(&self) -> Mask {
        Mask::new(1 << self.to_index())
    }
    /// True for rows 0 through 4.
    #[inline]
    pub const fn is_bottom(&self) -> bool {
        self.row * 2 < ROW_COUNT as u8
    }
    pub fn to_iccs(&self) -> String {
        format!("{}{}", FILE_CHARS[self.col()], self.row)
    }

    pub const fn transform(&self, transform: Transform) -> Self {
        let (row, col) = (self.row(), self.col());
        match transform {
            Transform::SymmetryH => Self::new(row, COL_COUNT - 1 - col),
            Transform::SymmetryV => Self::new(ROW_COUNT - 1 - row, col),
            Transform::Rotate => Self::new(ROW_COUNT - 1 - row, COL_COUNT - 1 - col),
            Transform::Exchange | Transform::Identity => *self,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

impl From<Coord> for usize {
    fn from(value: Coord) -> Self {
        value.to_index()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Offset {
    pub row: isize,
    pub col: isize,
}

impl Offset {
    pub const fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }
}

impl Add<Offset> for Coord {
    type Output = Option<Coord>;
    fn add(self, rhs: Offset) -> Self::Output {
        Coord::try_new(self.row() as isize + rhs.row, self.col() as isize + rhs.col)
    }
}

impl Add<&Offset> for Coord {
    type Output = Option<Coord>;
    fn add(self, rhs: &Offset) -> Self::Output {
        self + *rhs
    }
}

impl Sub for Coord {
    type Output = Offset;
    fn sub(self, rhs: Self) -> Self::Output {
        Offset::new(
            self.row() as isize - rhs.row() as isize,
            self.col() as isize - rhs.col() as isize,
        )
    }
}

impl Index<Coord> for [Mask; SEAT_COUNT] {
    type Output = Mask;
    fn index(&self, coord: Coord) -> &Self::Output {
        &self[coord.to_index()]
    }
}

impl IndexMut<Coord> for [Mask; SEAT_COUNT] {
    fn index_mut(&mut self, coord: Coord) -> &mut Self::Output {
        &mut self[coord.to_index()]
    }
}

/// Board layout changes. `Exchange` swaps the colors of every piece and
/// leaves the seats alone, the others mirror seats.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Transform {
    Identity,
    Exchange,
    Rotate,
    SymmetryH,
    SymmetryV,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CoordPair {
    from: Coord,
    to: Coord,
}

impl CoordPair {
    #[inline]
    pub const fn new(from: Coord, to: Coord) -> Self {
        Self { from, to }
    }

    /// Decode the packed `from << 8 | to` form.
    pub const fn from_data(data: u16) -> Option<Self> {
        let from = match Coord::from_data((data >> 8) as u8) {
            Some(coord) => coord,
            None => return None,
        };
        let to = match Coord::from_data((data & 0xff) as u8) {
            Some(coord) => coord,
            None => return None,
        };
        Some(Self::new(from, to))
    }

    pub fn from_iccs(text: &str) -> Option<Self> {
        if !text.is_ascii() || text.len() != 4 {
            return None;
        }
        let from = Coord::from_iccs(&text[..2])?;
        let to = Coord::from_iccs(&text[2..])?;
        Some(Self::new(from, to))
    }

    #[inline]
    pub const fn from(&self) -> Coord {
        self.from
    }
    #[inline]
    pub const fn to(&self) -> Coord {
        self.to
    }
    #[inline]
    pub const fn to_data(&self) -> u16 {
        (self.from.to_data() as u16) << 8 | self.to.to_data() as u16
    }
    pub fn to_iccs(&self) -> String {
        format!("{}{}", self.from.to_iccs(), self.to.to_iccs())
    }
    pub fn data_text(&self) -> String {
        format!("{:04X}", self.to_data())
    }
    pub const fn transform(&self, transform: Transform) -> Self {
        Self::new(self.from.transform(transform), self.to.transform(transform))
    }
}

impl fmt::Display for CoordPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// A set of seats. Bit `n` stands for the seat with index `n`.
#[derive(Clone, Serialize, Deserialize, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mask(u128);

impl Mask {
    const ALL_BITS: u128 = (1 << SEAT_COUNT) - 1;

    #[inline]
    pub const fn new(val: u128) -> Self {
        Self(val & Self::ALL_BITS)
    }

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    pub fn from_coords<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = Coord>,
    {
        coords
            .into_iter()
            .map(|coord| coord.to_mask())
            .reduce(|m1, m2| m1 | m2)
            .unwrap_or_default()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn contains(&self, coord: Coord) -> bool {
        (self.0 & coord.to_mask().0) != 0
    }

    pub fn iter(&self) -> MaskIter {
        MaskIter(self.0)
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..ROW_COUNT).rev() {
            for col in 0..COL_COUNT {
                let coord = Coord::new(row, col);
                write!(f, "{}", if self.contains(coord) { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Sub<Coord> for Mask {
    type Output = Self;
    fn sub(self, rhs: Coord) -> Self::Output {
        Self(self.0 & !rhs.to_mask().0)
    }
}

impl Sub for Mask {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 & !rhs.0)
    }
}

impl Not for Mask {
    type Output = Self;
    fn not(self) -> Self::Output {
        Self(!self.0 & Self::ALL_BITS)
    }
}

impl BitOr for Mask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitOr<Coord> for Mask {
    type Output = Self;
    fn bitor(self, rhs: Coord) -> Self {
        Self(self.0 | rhs.to_mask().0)
    }
}

impl BitOrAssign<Coord> for Mask {
    fn bitor_assign(&mut self, rhs: Coord) {
        self.0 |= rhs.to_mask().0;
    }
}

impl BitAnd for Mask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Mask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl FromIterator<Coord> for Mask {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        Self::from_coords(iter)
    }
}

impl IntoIterator for Mask {
    type Item = Coord;
    type IntoIter = MaskIter;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Yields seats in ascending index order (row 0 first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskIter(u128);

impl Iterator for MaskIter {
    type Item = Coord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 != 0 {
            let coord = Coord::from_index(self.0.trailing_zeros() as usize);
            self.0 &= !coord.to_mask().0;
            return Some(coord);
        }
        None
    }
}

impl DoubleEndedIterator for MaskIter {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.0 != 0 {
            let coord = Coord::from_index(127 - self.0.leading_zeros() as usize);
            self.0 &= !coord.to_mask().0;
            return Some(coord);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_packed_coord() {
        let coord = Coord::new(9, 8);
        assert_eq!(coord.to_data(), 0x98);
        assert_eq!(Coord::from_data(0x98), Some(coord));
        assert_eq!(Coord::from_data(0xa0), None);
        assert_eq!(Coord::from_data(0x09), None);
    }

    #[test]
    fn test_iccs() {
        assert_eq!(Coord::new(0, 0).to_iccs(), "a0");
        assert_eq!(Coord::new(9, 4).to_iccs(), "e9");
        assert_eq!(Coord::from_iccs("i9"), Some(Coord::new(9, 8)));
        assert_eq!(Coord::from_iccs("j0"), None);
        assert_eq!(Coord::from_iccs("a10"), None);
    }

    #[test]
    fn test_pair_forms() {
        let pair = CoordPair::new(Coord::new(0, 1), Coord::new(2, 2));
        assert_eq!(pair.to_data(), 0x0122);
        assert_eq!(pair.data_text(), "0122");
        assert_eq!(pair.to_iccs(), "b0c2");
        assert_eq!(CoordPair::from_data(0x0122), Some(pair));
        assert_eq!(CoordPair::from_iccs("b0c2"), Some(pair));
    }

    #[test]
    fn test_is_bottom() {
        assert!(Coord::new(4, 0).is_bottom());
        assert!(!Coord::new(5, 0).is_bottom());
    }

    #[test]
    fn test_transforms_are_involutions() {
        for transform in Transform::iter() {
            for coord in Coord::iter() {
                assert_eq!(coord.transform(transform).transform(transform), coord);
            }
        }
        let coord = Coord::new(2, 1);
        assert_eq!(coord.transform(Transform::SymmetryH), Coord::new(2, 7));
        assert_eq!(coord.transform(Transform::SymmetryV), Coord::new(7, 1));
        assert_eq!(coord.transform(Transform::Rotate), Coord::new(7, 7));
        assert_eq!(coord.transform(Transform::Exchange), coord);
    }

    #[test]
    fn test_mask_iter_order() {
        let mask = Mask::from_coords([Coord::new(9, 8), Coord::new(0, 3), Coord::new(4, 4)]);
        assert_eq!(mask.len(), 3);
        let coords: Vec<Coord> = mask.iter().collect();
        assert_eq!(coords, vec![Coord::new(0, 3), Coord::new(4, 4), Coord::new(9, 8)]);
        assert_eq!(mask.iter().next_back(), Some(Coord::new(9, 8)));
    }

    #[test]
    fn test_mask_not_stays_on_board() {
        assert_eq!((!Mask::empty()).len(), SEAT_COUNT);
        assert!((!Mask::all()).is_empty());
    }

    #[test]
    fn test_offsets() {
        let coord = Coord::new(0, 0);
        assert_eq!(coord + Offset::new(-1, 0), None);
        assert_eq!(coord + Offset::new(2, 1), Some(Coord::new(2, 1)));
        assert_eq!(Coord::new(2, 1) - coord, Offset::new(2, 1));
    }
}
