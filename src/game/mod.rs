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
use strum_macros::EnumIter;

use crate::{BoardResult, Color};

/// Outcome stored in a game record.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter)]
pub enum GameResult {
    #[default]
    Unknown,
    RedWin,
    BlackWin,
    Draw,
}

impl GameResult {
    /// Codes used by XQF headers. Out of range codes read as `Unknown`.
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::RedWin,
            2 => Self::BlackWin,
            3 => Self::Draw,
            _ => Self::Unknown,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "未知",
            Self::RedWin => "红胜",
            Self::BlackWin => "黑胜",
            Self::Draw => "和棋",
        }
    }

    pub const fn winner(color: Color) -> Self {
        match color {
            Color::Red => Self::RedWin,
            Color::Black => Self::BlackWin,
        }
    }
}

impl From<BoardResult> for GameResult {
    /// Being mated and running out of moves both lose.
    fn from(value: BoardResult) -> Self {
        match value {
            BoardResult::CheckMate(loser) | BoardResult::StaleMate(loser) => Self::winner(!loser),
        }
    }
}

/// Which part of a game a record covers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter)]
pub enum GameKind {
    #[default]
    Full,
    Opening,
    Middle,
    Ending,
}

impl GameKind {
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Opening,
            2 => Self::Middle,
            3 => Self::Ending,
            _ => Self::Full,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Full => "全局",
            Self::Opening => "开局",
            Self::Middle => "中局",
            Self::Ending => "残局",
        }
    }
}
