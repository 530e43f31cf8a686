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

//! Game records
//!
//! A _manual_ is a recorded game: a set of named metadata entries and a
//! tree of moves with remarks and variations. The following features are
//! supported:
//!
//! [x] Variations, remarks and hidden moves
//! [x] Navigation with the board kept in step with the cursor
//! [x] Reading XQF files, including the obfuscated versions 11 to 18
//! [x] Reading and writing the CM format
//! [x] Removing illegal moves found in imported records
//! [ ] Writing XQF
//! [ ] PGN
//!
//! Some of the key abstractions include:
//!
//! * `MoveTree` stores moves in an arena addressed by `MoveId`. The root
//!   stands for the starting position. A tree owns a board which always
//!   shows the position after the move under the cursor.
//!
//! * `Review` and `ReviewMut` provide navigation (advance, retreat, jump,
//!   switch variation) over anything that can report a cursor and look up
//!   nodes. `ReviewMut::jump_to` is the only primitive a type must
//!   provide to move the cursor.
//!
//! * `Manual` pairs the metadata with a tree and reads and writes files,
//!   picking the format from the file extension.
//!

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::board::{to_notation, FenError, NotationError, START_FEN};

mod cm;
mod review;
mod tree;
mod xqf;

pub use cm::*;
pub use review::*;
pub use tree::*;
pub use xqf::*;

#[derive(Error, Debug)]
pub enum ManualError {
    #[error("Unsupported file extension '{0}'")]
    UnsupportedExtension(String),
    #[error(transparent)]
    Xqf(#[from] XqfError),
    #[error(transparent)]
    Cm(#[from] CmError),
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Xqf,
    Cm,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ManualError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "xqf" => Ok(Format::Xqf),
            "cm" => Ok(Format::Cm),
            _ => Err(ManualError::UnsupportedExtension(extension)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Manual {
    info: BTreeMap<String, String>,
    tree: MoveTree,
}

impl Default for Manual {
    fn default() -> Self {
        Self::new()
    }
}

impl Manual {
    /// An empty record from the standard start.
    pub fn new() -> Self {
        let mut info = BTreeMap::new();
        info.insert(FEN_KEY.to_string(), format!("{} r - - 0 1", START_FEN));
        Self {
            info,
            tree: MoveTree::new(),
        }
    }

    pub fn with_fen(fen: &str) -> Result<Self, ManualError> {
        let tree = MoveTree::with_fen(fen)?;
        let mut info = BTreeMap::new();
        info.insert(FEN_KEY.to_string(), format!("{} r - - 0 1", tree.board().fen()));
        Ok(Self { info, tree })
    }

    pub fn from_xqf(data: &[u8], options: &DecodeOptions) -> Result<Self, ManualError> {
        let (info, tree) = read_xqf(data, options)?;
        Ok(Self { info, tree })
    }

    pub fn from_cm(data: &[u8]) -> Result<Self, ManualError> {
        let (info, tree) = read_cm(data)?;
        Ok(Self { info, tree })
    }

    pub fn to_cm(&self) -> Result<Vec<u8>, ManualError> {
        Ok(write_cm(&self.info, &self.tree)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_with(path, &DecodeOptions::default())
    }

    pub fn read_with(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let data = fs::read(path)?;
        let manual = match format {
            Format::Xqf => Self::from_xqf(&data, options)?,
            Format::Cm => Self::from_cm(&data)?,
        };
        info!(path = %path.display(), moves = manual.tree.len(), "Read manual");
        Ok(manual)
    }

    /// Only CM can be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match Format::of(path)? {
            Format::Cm => fs::write(path, self.to_cm()?)?,
            Format::Xqf => {
                return Err(ManualError::UnsupportedExtension("xqf".to_string()).into());
            }
        }
        info!(path = %path.display(), "Wrote manual");
        Ok(())
    }

    pub fn info(&self) -> &BTreeMap<String, String> {
        &self.info
    }

    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    pub fn set_info(&mut self, key: &str, value: &str) {
        self.info.insert(key.to_string(), value.trim().to_string());
    }

    /// Metadata as `[KEY "value"]` lines.
    pub fn info_string(&self) -> String {
        self.info
            .iter()
            .map(|(key, value)| format!("[{} \"{}\"]\n", key, value))
            .collect()
    }

    pub fn tree(&self) -> &MoveTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut MoveTree {
        &mut self.tree
    }

    /// The main line in Chinese notation. The cursor is restored.
    pub fn main_line_notation(&mut self) -> Result<Vec<String>, NotationError> {
        let cursor = self.tree.cursor();
        self.tree.skip_to_start();
        let mut result = Ok(Vec::new());
        for id in self.tree.main_line() {
            match to_notation(self.tree.board(), self.tree[id].pair()) {
                Ok(text) => {
                    if let Ok(line) = result.as_mut() {
                        line.push(text);
                    }
                }
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
            self.tree.jump_to(id);
        }
        self.tree.jump_to(cursor);
        result
    }
}

impl fmt::Display for Manual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info_string())?;
        let line: Vec<String> = self
            .tree
            .main_line()
            .iter()
            .map(|id| self.tree[*id].pair().to_iccs())
            .collect();
        write!(f, "{}", line.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn pair(text: &str) -> CoordPair {
        CoordPair::from_iccs(text).unwrap()
    }

    fn sample() -> Manual {
        let mut manual = Manual::new();
        manual.set_info("TITLE", "  中炮对屏风马 ");
        manual.set_info("RED", "许银川");
        let tree = manual.tree_mut();
        let a = tree.add_move(pair("h2e2"), Some("中炮".to_string()), true);
        tree.add_move(pair("h9g7"), None, true);
        tree.add_move(pair("h0g2"), None, true);
        tree.jump_to(a);
        tree.add_move(pair("b9c7"), None, true);
        tree.skip_to_start();
        manual
    }

    #[test]
    fn test_info() {
        let manual = sample();
        assert_eq!(manual.info_value("TITLE"), Some("中炮对屏风马"));
        assert_eq!(manual.info_value("EVENT"), None);
        assert_eq!(
            manual.info_string(),
            format!(
                "[FEN \"{} r - - 0 1\"]\n[RED \"许银川\"]\n[TITLE \"中炮对屏风马\"]\n",
                START_FEN
            )
        );
        assert!(manual.to_string().ends_with("h2e2 h9g7 h0g2"));
    }

    #[test]
    fn test_with_fen() {
        let manual = Manual::with_fen("4k4/9/9/9/9/9/9/9/9/3K5").unwrap();
        assert_eq!(
            manual.info_value("FEN"),
            Some("4k4/9/9/9/9/9/9/9/9/3K5 r - - 0 1")
        );
        assert!(matches!(
            Manual::with_fen("9/9"),
            Err(ManualError::Fen(FenError::RowCount(2)))
        ));
    }

    #[test]
    fn test_cm_round_trip() {
        let manual = sample();
        let data = manual.to_cm().unwrap();
        let read = Manual::from_cm(&data).unwrap();
        assert_eq!(read.info(), manual.info());
        assert_eq!(read.tree().len(), 4);
        assert_eq!(read.to_cm().unwrap(), data);
    }

    #[test]
    fn test_main_line_notation() {
        let mut manual = sample();
        let end = manual.tree().main_line()[1];
        manual.tree_mut().jump_to(end);
        assert_eq!(
            manual.main_line_notation().unwrap(),
            vec!["炮二平五", "马８进７", "马二进三"]
        );
        assert_eq!(manual.tree().cursor(), end);
    }

    #[test]
    fn test_from_xqf() {
        let mut data = vec![0u8; HEADER_LEN];
        data[0..2].copy_from_slice(b"XQ");
        data[2] = 10;
        data[16..48].fill(0xff);
        data.extend([0x18, 0x20, 0, 0, 0, 0, 0, 0]);
        let manual = Manual::from_xqf(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(manual.info_value("VERSION"), Some("10"));
        assert_eq!(manual.info_value("FEN"), Some("9/9/9/9/9/9/9/9/9/9 r - - 0 1"));
        assert!(manual.tree().is_empty());

        assert!(matches!(
            Manual::from_xqf(&data[..10], &DecodeOptions::default()),
            Err(ManualError::Xqf(XqfError::TooShort(10)))
        ));
    }

    #[test]
    fn test_files() {
        let dir = std::env::temp_dir().join(format!("xiangqi-manual-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let manual = sample();

        let path = dir.join("sample.cm");
        manual.write(&path).unwrap();
        let read = Manual::read(&path).unwrap();
        assert_eq!(read.info(), manual.info());
        assert_eq!(read.tree().len(), manual.tree().len());

        let error = Manual::read(dir.join("sample.pgn")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ManualError>(),
            Some(ManualError::UnsupportedExtension(ext)) if ext == "pgn"
        ));
        let error = manual.write(dir.join("sample.xqf")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ManualError>(),
            Some(ManualError::UnsupportedExtension(_))
        ));
        let error = Manual::read(dir.join("missing.cm")).unwrap_err();
        assert!(error.downcast_ref::<std::io::Error>().is_some());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
