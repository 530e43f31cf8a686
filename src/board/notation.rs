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

//! Chinese move notation
//!
//! Every move is written with four glyphs. The first two name the piece,
//! either as name plus file (`马八`) or, when several pieces of a kind
//! share a file, as position plus name (`前车`). The third is the
//! direction: 进 towards the opponent, 退 back, 平 along the rank. The last
//! is a step count for vertical moves of kings, rooks, cannons and pawns,
//! and the destination file otherwise. Files count from each side's right
//! hand, so they depend on which color sits at the bottom of the board.

use thiserror::Error;

use super::coord::{Coord, CoordPair, COL_COUNT};
use super::material::{Color, Kind, Material};
use super::moves::LegalMoves;
use super::Board;

use Kind::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("Notation must have four characters: {0}")]
    Length(String),
    #[error("Unexpected character '{0}'")]
    UnknownGlyph(char),
    #[error("No piece matches the notation")]
    NoPiece,
    #[error("Position prefix does not match the pieces on the board")]
    Ambiguous,
    #[error("Destination is off the board")]
    OffBoard,
}
use NotationError::*;

const RED_NUMS: [char; COL_COUNT] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];
const BLACK_NUMS: [char; COL_COUNT] = ['１', '２', '３', '４', '５', '６', '７', '８', '９'];
const NAME_CHARS: [char; 14] = [
    '帅', '仕', '相', '马', '车', '炮', '兵', '将', '士', '象', '马', '车', '炮', '卒',
];
const MOVE_CHARS: [char; 3] = ['退', '平', '进'];

fn numerals(color: Color) -> &'static [char; COL_COUNT] {
    match color {
        Color::Red => &RED_NUMS,
        Color::Black => &BLACK_NUMS,
    }
}

fn prefix_chars(count: usize) -> &'static [char] {
    match count {
        2 => &['前', '后'],
        3 => &['前', '中', '后'],
        _ => &['一', '二', '三', '四', '五'],
    }
}

/// Files are numbered from the right hand side of the player.
fn file_index(col: usize, is_bottom: bool) -> usize {
    if is_bottom {
        COL_COUNT - 1 - col
    } else {
        col
    }
}

fn kind_of(name: char) -> Option<Kind> {
    NAME_CHARS
        .iter()
        .position(|c| *c == name)
        .map(|index| Kind::from_index(index % Kind::COUNT))
}

fn index_of(chars: &[char], c: char) -> Result<usize, NotationError> {
    chars.iter().position(|x| *x == c).ok_or(UnknownGlyph(c))
}

/// Pieces that compete for a position prefix, ordered by column then row.
fn ranked_pieces(board: &Board, material: Material, col: Option<usize>) -> Vec<Coord> {
    let mut pieces: Vec<Coord> = if material.kind().is_pawn() && col.is_none() {
        board.stacked_pawns(material.color())
    } else {
        board
            .live_material(material)
            .filter(|coord| col.map_or(true, |col| coord.col() == col))
            .collect()
    };
    pieces.sort_by_key(|coord| (coord.col(), coord.row()));
    pieces
}

/// Write the notation of a move of the piece standing on `pair.from()`.
pub fn to_notation(board: &Board, pair: CoordPair) -> Result<String, NotationError> {
    let (from, to) = (pair.from(), pair.to());
    let material = board.contents(from).ok_or(NoPiece)?;
    let color = material.color();
    let kind = material.kind();
    let is_bottom = board.is_bottom_color(color);
    let nums = numerals(color);

    let mut s = String::new();
    let same_file = ranked_pieces(board, material, Some(from.col()));
    if same_file.len() > 1 && kind > Bishop {
        let pieces = if kind.is_pawn() {
            ranked_pieces(board, material, None)
        } else {
            same_file
        };
        let mut index = pieces.iter().position(|c| *c == from).ok_or(NoPiece)?;
        if is_bottom {
            index = pieces.len() - 1 - index;
        }
        s.push(prefix_chars(pieces.len())[index]);
        s.push(material.name());
    } else {
        s.push(material.name());
        s.push(nums[file_index(from.col(), is_bottom)]);
    }

    let same_row = from.row() == to.row();
    let move_char = if same_row {
        MOVE_CHARS[1]
    } else if is_bottom == (to.row() > from.row()) {
        MOVE_CHARS[2]
    } else {
        MOVE_CHARS[0]
    };
    s.push(move_char);
    if !same_row && kind.is_line_piece() {
        s.push(nums[from.row().abs_diff(to.row()) - 1]);
    } else {
        s.push(nums[file_index(to.col(), is_bottom)]);
    }
    debug_assert!(
        !board.legal_moves(from).contains(to) || from_notation(board, &s) == Ok(pair),
        "{} does not read back as {}",
        s,
        pair
    );
    Ok(s)
}

/// Parse notation back into the move it describes on `board`. The color
/// of the mover is taken from the last glyph.
pub fn from_notation(board: &Board, text: &str) -> Result<CoordPair, NotationError> {
    let glyphs: Vec<char> = text.trim().chars().collect();
    if glyphs.len() != 4 {
        return Err(Length(text.to_string()));
    }
    let color = if RED_NUMS.contains(&glyphs[3]) {
        Color::Red
    } else if BLACK_NUMS.contains(&glyphs[3]) {
        Color::Black
    } else {
        return Err(UnknownGlyph(glyphs[3]));
    };
    let is_bottom = board.is_bottom_color(color);
    let nums = numerals(color);
    let step = index_of(&MOVE_CHARS, glyphs[2])? as isize - 1;
    let direction = if is_bottom { step } else { -step };

    let (kind, pieces, index) = match kind_of(glyphs[0]) {
        Some(kind) => {
            let col = file_index(index_of(nums, glyphs[1])?, is_bottom);
            let pieces = ranked_pieces(board, Material::new(color, kind), Some(col));
            if pieces.is_empty() {
                return Err(NoPiece);
            }
            // advisors and bishops sharing a file: only the upper one retreats
            let index = if pieces.len() == 2 && direction == -1 { 1 } else { 0 };
            (kind, pieces, index)
        }
        None => {
            let kind = kind_of(glyphs[1]).ok_or(UnknownGlyph(glyphs[1]))?;
            let pieces = ranked_pieces(board, Material::new(color, kind), None);
            if pieces.len() <= 1 {
                return Err(NoPiece);
            }
            if !kind.is_pawn() && pieces.iter().any(|coord| coord.col() != pieces[0].col()) {
                return Err(Ambiguous);
            }
            let mut index = index_of(prefix_chars(pieces.len()), glyphs[0])?;
            if index >= pieces.len() {
                return Err(Ambiguous);
            }
            if is_bottom {
                index = pieces.len() - 1 - index;
            }
            (kind, pieces, index)
        }
    };

    let from = pieces[index];
    let number = index_of(nums, glyphs[3])? + 1;
    let mut to_row = from.row() as isize;
    let mut to_col = file_index(number - 1, is_bottom) as isize;
    if kind.is_line_piece() {
        if direction != 0 {
            to_row += direction * number as isize;
            to_col = from.col() as isize;
        }
    } else {
        let col_away = (to_col - from.col() as isize).abs();
        let row_inc = match kind {
            Advisor | Bishop => col_away,
            _ if col_away == 1 => 2,
            _ => 1,
        };
        to_row += direction * row_inc;
    }
    let to = Coord::try_new(to_row, to_col).ok_or(OffBoard)?;
    Ok(CoordPair::new(from, to))
}
