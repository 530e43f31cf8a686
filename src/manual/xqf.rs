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

//! XQF records
//!
//! XQF is the format written by XQStudio. A file is a 1024 byte header
//! followed by the moves in depth-first order, one record per move. From
//! version 11 on, the piece layout, move coordinates and the body bytes
//! are obfuscated with keys derived from four header bytes.

use bytes::Buf;
use encoding_rs::GB18030;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

use crate::board::{Board, BoardError, Coord, CoordPair, FenError, Material};
use crate::game::{GameKind, GameResult};

use super::review::{Review, ReviewMut};
use super::tree::{MoveId, MoveTree};

pub const HEADER_LEN: usize = 1024;

const SIGNATURE: u16 = 0x5158;
const MAX_VERSION: u8 = 18;
const COPYRIGHT: &[u8; 32] = b"[(C) Copyright Mr. Dong Shiwei.]";
const PIECE_ORDER: &[u8; 32] = b"RNBAKABNRCCPPPPPrnbakabnrccppppp";
const HAS_NEXT: u8 = 0x80;
const HAS_OTHER: u8 = 0x40;
const HAS_REMARK: u8 = 0x20;

const TEXT_FIELDS: [(&str, Range<usize>); 9] = [
    ("TITLE", 80..144),
    ("EVENT", 208..272),
    ("DATE", 272..288),
    ("SITE", 288..304),
    ("RED", 304..320),
    ("BLACK", 320..336),
    ("OPENING", 336..400),
    ("WRITER", 464..480),
    ("AUTHOR", 480..496),
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Detach moves the rules do not allow once the tree is built.
    pub prune_illegal: bool,
    /// Drop a record that repeats the move just read.
    pub skip_repeated: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            prune_illegal: true,
            skip_repeated: true,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XqfError {
    #[error("File is {0} bytes, shorter than the header")]
    TooShort(usize),
    #[error("Not an XQF file")]
    Signature,
    #[error("Header key checksum is not zero")]
    Checksum,
    #[error("Version {0} is not supported")]
    UnsupportedVersion(u8),
    #[error("Unexpected end of data")]
    Truncated,
    #[error("Seat {0} is off the board")]
    Coord(u8),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Fen(#[from] FenError),
}

fn calkey(b: u8, c: u8) -> u8 {
    let b = b as u32;
    (((((b * b) * 3 + 9) * 3 + 8) * 2 + 1) * 3 + 8).wrapping_mul(c as u32) as u8
}

/// Decryption keys. All zero before version 11.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Keys {
    xy: u8,
    xyf: u8,
    xyt: u8,
    remark_size: u32,
    stream: Option<[u8; 32]>,
}

#[derive(Debug, Clone)]
struct Header {
    version: u8,
    mask: u8,
    key_or: [u8; 4],
    sum: u8,
    xy: u8,
    xyf: u8,
    xyt: u8,
    pieces: [u8; 32],
    result: u8,
    kind: u8,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Self, XqfError> {
        if data.len() < HEADER_LEN {
            return Err(XqfError::TooShort(data.len()));
        }
        let mut buf = &data[..HEADER_LEN];
        if buf.get_u16_le() != SIGNATURE {
            return Err(XqfError::Signature);
        }
        let version = buf.get_u8();
        let mask = buf.get_u8();
        buf.advance(4); // product id
        let mut key_or = [0; 4];
        buf.copy_to_slice(&mut key_or);
        let (sum, xy, xyf, xyt) = (buf.get_u8(), buf.get_u8(), buf.get_u8(), buf.get_u8());
        let mut pieces = [0; 32];
        buf.copy_to_slice(&mut pieces);
        buf.advance(3); // step number, side to move
        let result = buf.get_u8();
        buf.advance(12); // node count, tree position, reserved
        let kind = buf.get_u8();

        if (sum as u32 + xy as u32 + xyf as u32 + xyt as u32) % 256 != 0 {
            return Err(XqfError::Checksum);
        }
        if version > MAX_VERSION {
            return Err(XqfError::UnsupportedVersion(version));
        }
        Ok(Self {
            version,
            mask,
            key_or,
            sum,
            xy,
            xyf,
            xyt,
            pieces,
            result,
            kind,
        })
    }

    fn is_encrypted(&self) -> bool {
        self.version > 10
    }

    fn keys(&self) -> Keys {
        if !self.is_encrypted() {
            return Keys::default();
        }
        let xy = calkey(self.xy, self.xy);
        let xyf = calkey(self.xyf, xy);
        let xyt = calkey(self.xyt, xyf);
        let remark_size = ((self.sum as u32 * 256 + self.xy as u32) % 32000) + 767;
        let masks = [
            (self.sum & self.mask) | self.key_or[0],
            (self.xy & self.mask) | self.key_or[1],
            (self.xyf & self.mask) | self.key_or[2],
            (self.xyt & self.mask) | self.key_or[3],
        ];
        let mut stream = [0; 32];
        for (i, byte) in stream.iter_mut().enumerate() {
            *byte = COPYRIGHT[i] & masks[i % 4];
        }
        Keys {
            xy,
            xyf,
            xyt,
            remark_size,
            stream: Some(stream),
        }
    }

    /// Seat bytes in `PIECE_ORDER`, `col * 10 + row`, anything above 89
    /// being off the board.
    fn seats(&self, keys: &Keys) -> [u8; 32] {
        if !self.is_encrypted() {
            return self.pieces;
        }
        let mut seats = self.pieces;
        if self.version >= 12 {
            for (i, byte) in self.pieces.iter().enumerate() {
                seats[(i + keys.xy as usize + 1) % 32] = *byte;
            }
        }
        for byte in seats.iter_mut() {
            *byte = byte.wrapping_sub(keys.xy);
        }
        seats
    }

    fn board(&self, keys: &Keys) -> Result<Board, XqfError> {
        let mut board = Board::empty();
        for (seat, c) in self.seats(keys).iter().zip(PIECE_ORDER.iter()) {
            if *seat > 89 {
                continue;
            }
            let coord = Coord::new((*seat % 10) as usize, (*seat / 10) as usize);
            if let Some(material) = Material::from_fen_char(*c as char) {
                board.place(coord, material)?;
            }
        }
        board.update_bottom_color();
        Ok(board)
    }
}

fn decode_text(bytes: &[u8]) -> String {
    let (text, _) = GB18030.decode_without_bom_handling(bytes);
    text.replace('\0', " ").trim().to_string()
}

struct Record {
    from: u8,
    to: u8,
    tag: u8,
    remark: Option<String>,
}

/// Sequential reader over the move records.
struct Body<'a> {
    data: &'a [u8],
    pos: usize,
    version: u8,
    keys: Keys,
}

impl<'a> Body<'a> {
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, XqfError> {
        let end = self.pos.checked_add(len).ok_or(XqfError::Truncated)?;
        let raw = self.data.get(self.pos..end).ok_or(XqfError::Truncated)?;
        let bytes = match &self.keys.stream {
            Some(stream) => raw
                .iter()
                .enumerate()
                .map(|(i, b)| b.wrapping_sub(stream[(self.pos + i) % 32]))
                .collect(),
            None => raw.to_vec(),
        };
        self.pos = end;
        Ok(bytes)
    }

    fn read_remark_size(&mut self) -> Result<u32, XqfError> {
        let bytes = self.read_bytes(4)?;
        let mut raw = &bytes[..];
        let size = raw.get_u32_le();
        Ok(size.wrapping_sub(self.keys.remark_size))
    }

    fn read_record(&mut self) -> Result<Record, XqfError> {
        let bytes = self.read_bytes(4)?;
        let (from, to, mut tag) = (bytes[0], bytes[1], bytes[2]);
        let remark_size = if self.version <= 10 {
            tag = if tag & 0xf0 != 0 { HAS_NEXT } else { 0 }
                | if tag & 0x0f != 0 { HAS_OTHER } else { 0 };
            self.read_remark_size()?
        } else {
            tag &= 0xe0;
            if tag & HAS_REMARK != 0 {
                self.read_remark_size()?
            } else {
                0
            }
        };
        let remark = if remark_size > 0 {
            Some(decode_text(&self.read_bytes(remark_size as usize)?))
        } else {
            None
        };
        Ok(Record {
            from,
            to,
            tag,
            remark,
        })
    }

    fn read_pair(&self, record: &Record) -> Result<CoordPair, XqfError> {
        let seat = |byte: u8, offset: u8| {
            let xy = byte.wrapping_sub(offset);
            if xy > 89 {
                return Err(XqfError::Coord(xy));
            }
            Ok(Coord::new((xy % 10) as usize, (xy / 10) as usize))
        };
        let from = seat(record.from, 0x18u8.wrapping_add(self.keys.xyf))?;
        let to = seat(record.to, 0x20u8.wrapping_add(self.keys.xyt))?;
        Ok(CoordPair::new(from, to))
    }
}

/// Decode the header metadata and the move tree of an XQF file.
pub fn read_xqf(
    data: &[u8],
    options: &DecodeOptions,
) -> Result<(BTreeMap<String, String>, MoveTree), XqfError> {
    let header = Header::parse(data)?;
    let keys = header.keys();
    debug!(
        version = header.version,
        key_xy = keys.xy,
        key_xyf = keys.xyf,
        key_xyt = keys.xyt,
        "Read XQF header"
    );

    let board = header.board(&keys)?;
    let mut info = BTreeMap::new();
    info.insert("VERSION".to_string(), header.version.to_string());
    info.insert(
        "RESULT".to_string(),
        GameResult::from_code(header.result).label().to_string(),
    );
    info.insert(
        "TYPE".to_string(),
        GameKind::from_code(header.kind).label().to_string(),
    );
    for (key, range) in TEXT_FIELDS.iter() {
        info.insert(key.to_string(), decode_text(&data[range.clone()]));
    }
    info.insert("FEN".to_string(), format!("{} r - - 0 1", board.fen()));

    let mut tree = MoveTree::with_board(board);
    let mut body = Body {
        data,
        pos: HEADER_LEN,
        version: header.version,
        keys,
    };
    let first = body.read_record()?;
    tree.set_remark(MoveId::ROOT, first.remark);
    if first.tag & HAS_NEXT == 0 {
        debug!("XQF record has no moves");
        return Ok((info, tree));
    }

    let mut records = 1;
    let mut branches = vec![MoveId::ROOT];
    let mut is_other = false;
    while !(tree.at_start() && !tree.is_empty()) {
        let record = body.read_record()?;
        records += 1;
        let pair = body.read_pair(&record)?;
        let has_next = record.tag & HAS_NEXT != 0;
        let has_other = record.tag & HAS_OTHER != 0;

        if options.skip_repeated && pair == tree.current().pair() {
            warn!(pair = %pair.to_iccs(), offset = body.pos, "Skipping repeated XQF record");
            continue;
        }
        if is_other {
            tree.retreat();
        }
        tree.add_move(pair, record.remark, true);
        if has_next && has_other {
            branches.push(tree.cursor());
        }
        is_other = !has_next;
        if is_other && !has_other {
            if let Some(branch) = branches.pop() {
                while tree.cursor() != branch {
                    if !tree.retreat() {
                        break;
                    }
                }
            }
        }
    }
    debug!(records, moves = tree.len(), "Read XQF moves");

    if options.prune_illegal {
        tree.prune_illegal();
    }
    Ok((info, tree))
}
