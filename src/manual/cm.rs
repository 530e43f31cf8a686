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

//! CM records
//!
//! A compact little-endian layout laid down by a .NET `BinaryWriter`:
//!
//! ```text
//! i32                 number of metadata entries
//! (string, string)*   key, value
//! bool [string] u8    root: has remark, remark, child count
//! (bool u16 bool [string] u8)*
//!                     each move breadth first: visible, packed move,
//!                     has remark, remark, child count
//! ```
//!
//! Strings are UTF-8 behind a 7-bit variable length prefix. Child counts
//! include hidden moves.

use bytes::{Buf, BufMut, BytesMut};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::debug;

use crate::board::{CoordPair, FenError};

use super::tree::{MoveId, MoveTree};

pub const FEN_KEY: &str = "FEN";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CmError {
    #[error("Unexpected end of data")]
    Truncated,
    #[error("String is not valid UTF-8")]
    InvalidUtf8,
    #[error("A move has {0} continuations, at most 255 can be stored")]
    TooManyChildren(usize),
    #[error("Invalid length")]
    BadLength,
    #[error("Invalid move data {0:04X}")]
    BadMove(u16),
    #[error(transparent)]
    Fen(#[from] FenError),
}

fn ensure(buf: &impl Buf, len: usize) -> Result<(), CmError> {
    if buf.remaining() < len {
        return Err(CmError::Truncated);
    }
    Ok(())
}

fn read_u8(buf: &mut impl Buf) -> Result<u8, CmError> {
    ensure(&*buf, 1)?;
    Ok(buf.get_u8())
}

fn read_bool(buf: &mut impl Buf) -> Result<bool, CmError> {
    Ok(read_u8(buf)? != 0)
}

fn read_string(buf: &mut impl Buf) -> Result<String, CmError> {
    let mut len: usize = 0;
    let mut shift = 0;
    loop {
        if shift > 28 {
            return Err(CmError::BadLength);
        }
        let byte = read_u8(buf)?;
        len |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    ensure(&*buf, len)?;
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| CmError::InvalidUtf8)
}

fn read_remark(buf: &mut impl Buf) -> Result<Option<String>, CmError> {
    if read_bool(buf)? {
        Ok(Some(read_string(buf)?))
    } else {
        Ok(None)
    }
}

fn write_string(buf: &mut BytesMut, text: &str) {
    let mut len = text.len();
    while len >= 0x80 {
        buf.put_u8((len as u8 & 0x7f) | 0x80);
        len >>= 7;
    }
    buf.put_u8(len as u8);
    buf.put_slice(text.as_bytes());
}

fn write_remark(buf: &mut BytesMut, remark: Option<&str>) {
    match remark {
        Some(text) => {
            buf.put_u8(1);
            write_string(buf, text);
        }
        None => buf.put_u8(0),
    }
}

fn child_count(children: &[MoveId]) -> Result<u8, CmError> {
    u8::try_from(children.len()).map_err(|_| CmError::TooManyChildren(children.len()))
}

/// Decode metadata and moves. The board comes from the `FEN` entry, or
/// the standard start when there is none. Moves are not checked.
pub fn read_cm(data: &[u8]) -> Result<(BTreeMap<String, String>, MoveTree), CmError> {
    let mut buf = data;
    ensure(&buf, 4)?;
    let count = buf.get_i32_le();
    let count = usize::try_from(count).map_err(|_| CmError::BadLength)?;
    let mut info = BTreeMap::new();
    for _ in 0..count {
        let key = read_string(&mut buf)?;
        let value = read_string(&mut buf)?;
        info.insert(key, value);
    }

    let mut tree = match info.get(FEN_KEY) {
        Some(fen) => MoveTree::with_fen(fen)?,
        None => MoveTree::new(),
    };
    let remark = read_remark(&mut buf)?;
    tree.set_remark(MoveId::ROOT, remark);

    let mut queue = VecDeque::new();
    let root_children = read_u8(&mut buf)?;
    if root_children > 0 {
        queue.push_back((MoveId::ROOT, root_children));
    }
    while let Some((parent, count)) = queue.pop_front() {
        for _ in 0..count {
            let visible = read_bool(&mut buf)?;
            ensure(&buf, 2)?;
            let data = buf.get_u16_le();
            let pair = CoordPair::from_data(data).ok_or(CmError::BadMove(data))?;
            let remark = read_remark(&mut buf)?;
            let children = read_u8(&mut buf)?;
            let id = tree.insert_child(parent, pair, remark, visible);
            if children > 0 {
                queue.push_back((id, children));
            }
        }
    }
    debug!(entries = info.len(), moves = tree.len(), "Read CM record");
    Ok((info, tree))
}

pub fn write_cm(info: &BTreeMap<String, String>, tree: &MoveTree) -> Result<Vec<u8>, CmError> {
    let mut buf = BytesMut::new();
    buf.put_i32_le(info.len() as i32);
    for (key, value) in info {
        write_string(&mut buf, key);
        write_string(&mut buf, value);
    }

    let root = tree.root();
    write_remark(&mut buf, root.remark());
    buf.put_u8(child_count(root.children())?);
    for id in tree.iter() {
        let node = &tree[id];
        buf.put_u8(node.visible() as u8);
        buf.put_u16_le(node.pair().to_data());
        write_remark(&mut buf, node.remark());
        buf.put_u8(child_count(node.children())?);
    }
    debug!(bytes = buf.len(), "Wrote CM record");
    Ok(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;

    fn pair(text: &str) -> CoordPair {
        CoordPair::from_iccs(text).unwrap()
    }

    fn shape(tree: &MoveTree) -> Vec<(u16, Option<String>, bool, usize)> {
        tree.iter()
            .map(|id| {
                let node = &tree[id];
                (
                    node.pair().to_data(),
                    node.remark().map(str::to_string),
                    node.visible(),
                    node.children().len(),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_layout() {
        let data = write_cm(&BTreeMap::new(), &MoveTree::new()).unwrap();
        assert_eq!(data, vec![0, 0, 0, 0, 0, 0]);
        let (info, tree) = read_cm(&data).unwrap();
        assert!(info.is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_move_layout() {
        let mut tree = MoveTree::new();
        tree.set_remark(MoveId::ROOT, Some("开局".to_string()));
        tree.add_move(pair("h2e2"), None, false);
        let data = write_cm(&BTreeMap::new(), &tree).unwrap();
        let mut expected = vec![0, 0, 0, 0, 1, 6];
        expected.extend("开局".as_bytes());
        expected.push(1);
        expected.push(0);
        expected.extend(pair("h2e2").to_data().to_le_bytes());
        expected.extend([0, 0]);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_round_trip() {
        let mut info = BTreeMap::new();
        info.insert(FEN_KEY.to_string(), format!("{} r - - 0 1", START_FEN));
        info.insert("TITLE".to_string(), "中炮对屏风马".to_string());
        info.insert("LONG".to_string(), "x".repeat(300));

        let mut tree = MoveTree::new();
        let a = tree.add_move(pair("h2e2"), Some("中炮".to_string()), true);
        tree.add_move(pair("h9g7"), None, true);
        tree.add_move(pair("h0g2"), Some("".to_string()), true);
        tree.jump_to(a);
        tree.add_move(pair("b9c7"), None, false);
        tree.skip_to_start();
        tree.add_move(pair("b0c2"), None, true);

        let data = write_cm(&info, &tree).unwrap();
        let (read_info, read_tree) = read_cm(&data).unwrap();
        assert_eq!(read_info, info);
        assert_eq!(shape(&read_tree), shape(&tree));
        assert!(read_tree.at_start());
        assert_eq!(read_tree.board(), &Board::default());
    }

    #[test]
    fn test_board_from_fen_entry() {
        let mut info = BTreeMap::new();
        info.insert(FEN_KEY.to_string(), "4k4/9/9/9/9/9/9/9/9/4K4 r - - 0 1".to_string());
        let data = write_cm(&info, &MoveTree::new()).unwrap();
        let (_, tree) = read_cm(&data).unwrap();
        assert_eq!(tree.board().fen(), "4k4/9/9/9/9/9/9/9/9/4K4");

        info.insert(FEN_KEY.to_string(), "bad".to_string());
        let data = write_cm(&info, &MoveTree::new()).unwrap();
        assert_eq!(read_cm(&data).unwrap_err(), CmError::Fen(FenError::RowCount(1)));
    }

    #[test]
    fn test_errors() {
        assert_eq!(read_cm(&[1, 0]).unwrap_err(), CmError::Truncated);
        assert_eq!(read_cm(&[0xff, 0xff, 0xff, 0xff]).unwrap_err(), CmError::BadLength);
        assert_eq!(
            read_cm(&[1, 0, 0, 0, 2, 0xc3, 0x28]).unwrap_err(),
            CmError::InvalidUtf8
        );
        assert_eq!(
            read_cm(&[1, 0, 0, 0, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01]).unwrap_err(),
            CmError::BadLength
        );
        // root claims a child that is not there
        assert_eq!(read_cm(&[0, 0, 0, 0, 0, 1]).unwrap_err(), CmError::Truncated);
        assert_eq!(
            read_cm(&[0, 0, 0, 0, 0, 1, 1, 0xff, 0xff, 0, 0]).unwrap_err(),
            CmError::BadMove(0xffff)
        );

        let mut tree = MoveTree::new();
        for _ in 0..256 {
            tree.insert_child(MoveId::ROOT, pair("h2e2"), None, true);
        }
        assert_eq!(
            write_cm(&BTreeMap::new(), &tree).unwrap_err(),
            CmError::TooManyChildren(256)
        );
    }
}
