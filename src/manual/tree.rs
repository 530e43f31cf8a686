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
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::ops::Index;
use tracing::{info, trace};

use crate::board::{transform_fen, Board, Color, CoordPair, FenError, LegalMoves, PieceId, Transform};

use super::review::{Review, ReviewMut};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MoveId(u32);

impl MoveId {
    pub const ROOT: MoveId = MoveId(0);

    #[inline]
    pub fn value(&self) -> usize {
        self.0 as usize
    }
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}

impl Default for MoveId {
    #[inline]
    fn default() -> Self {
        MoveId::ROOT
    }
}

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One move of a record. The root node carries the zero pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveNode {
    parent: Option<MoveId>,
    pair: CoordPair,
    remark: Option<String>,
    visible: bool,
    children: Vec<MoveId>,
    captured: Option<PieceId>,
}

impl MoveNode {
    fn new(parent: Option<MoveId>, pair: CoordPair, remark: Option<String>, visible: bool) -> Self {
        Self {
            parent,
            pair,
            remark,
            visible,
            children: Vec::new(),
            captured: None,
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<MoveId> {
        self.parent
    }
    #[inline]
    pub fn pair(&self) -> CoordPair {
        self.pair
    }
    #[inline]
    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }
    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }
    #[inline]
    pub fn children(&self) -> &[MoveId] {
        &self.children
    }
    /// The piece taken the last time this move was applied.
    #[inline]
    pub fn captured(&self) -> Option<PieceId> {
        self.captured
    }
}

/// A board together with the move whose position it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayContext {
    board: Board,
    cursor: MoveId,
}

impl ReplayContext {
    pub fn board(&self) -> &Board {
        &self.board
    }
    pub fn cursor(&self) -> MoveId {
        self.cursor
    }
}

impl AsRef<Board> for ReplayContext {
    fn as_ref(&self) -> &Board {
        &self.board
    }
}

impl LegalMoves for ReplayContext {}

/// A game record: the moves of a game and all of its variations.
///
/// Nodes live in an arena and are addressed by `MoveId`; `MoveId::ROOT`
/// stands for the starting position. The tree owns a board that always
/// shows the position after the move under the cursor.
#[derive(Debug, Clone)]
pub struct MoveTree {
    nodes: Vec<MoveNode>,
    replay: ReplayContext,
}

impl Default for MoveTree {
    fn default() -> Self {
        Self::with_board(Board::default())
    }
}

impl MoveTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_board(board: Board) -> Self {
        Self {
            nodes: vec![MoveNode::new(None, CoordPair::default(), None, true)],
            replay: ReplayContext {
                board,
                cursor: MoveId::ROOT,
            },
        }
    }

    pub fn with_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self::with_board(Board::from_fen(fen)?))
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.replay.board
    }

    pub fn replay(&self) -> &ReplayContext {
        &self.replay
    }

    pub fn into_replay(self) -> ReplayContext {
        self.replay
    }

    pub fn get(&self, id: MoveId) -> Option<&MoveNode> {
        self.nodes.get(id.value())
    }

    pub fn root(&self) -> &MoveNode {
        &self.nodes[0]
    }

    pub fn children(&self, id: MoveId) -> &[MoveId] {
        self.get(id).map(|node| node.children()).unwrap_or(&[])
    }

    pub fn parent(&self, id: MoveId) -> Option<MoveId> {
        self.get(id)?.parent
    }

    pub fn set_remark(&mut self, id: MoveId, remark: Option<String>) -> bool {
        match self.nodes.get_mut(id.value()) {
            Some(node) => {
                node.remark = remark.map(|r| r.trim().to_string());
                true
            }
            None => false,
        }
    }

    /// Append a child to `parent` without touching the board or cursor.
    pub fn insert_child(
        &mut self,
        parent: MoveId,
        pair: CoordPair,
        remark: Option<String>,
        visible: bool,
    ) -> MoveId {
        debug_assert!(parent.value() < self.nodes.len());
        let id = MoveId(self.nodes.len() as u32);
        self.nodes.push(MoveNode::new(Some(parent), pair, remark, visible));
        self.nodes[parent.value()].children.push(id);
        id
    }

    /// Append a child to the cursor, play it and move the cursor onto it.
    /// Legality is not checked.
    pub fn add_move(&mut self, pair: CoordPair, remark: Option<String>, visible: bool) -> MoveId {
        let id = self.insert_child(self.replay.cursor, pair, remark, visible);
        self.apply(id);
        id
    }

    fn apply(&mut self, id: MoveId) {
        debug_assert_eq!(self.nodes[id.value()].parent, Some(self.replay.cursor));
        let node = &mut self.nodes[id.value()];
        node.captured = self.replay.board.do_move(node.pair);
        self.replay.cursor = id;
    }

    fn unapply(&mut self) -> bool {
        let cursor = self.replay.cursor;
        let node = &self.nodes[cursor.value()];
        let Some(parent) = node.parent else {
            return false;
        };
        self.replay.board.undo_move(node.pair, node.captured);
        self.replay.cursor = parent;
        true
    }

    /// Moves from the first move down to `id`, or `None` when `id` is not
    /// part of the tree (unknown or pruned).
    pub fn path(&self, id: MoveId) -> Option<Vec<MoveId>> {
        let mut path = Vec::new();
        let mut current = id;
        while !current.is_root() {
            let node = self.get(current)?;
            path.push(current);
            current = node.parent?;
        }
        path.reverse();
        Some(path)
    }

    pub fn depth(&self, id: MoveId) -> Option<usize> {
        self.path(id).map(|path| path.len())
    }

    /// Live moves of the tree, root excluded.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    /// First visible child of every move, starting at the root.
    pub fn main_line(&self) -> Vec<MoveId> {
        let mut line = Vec::new();
        let mut current = MoveId::ROOT;
        while let Some(next) = self.visible_children(current).first().copied() {
            line.push(next);
            current = next;
        }
        line
    }

    /// Breadth first over all moves, root excluded. The board is not used.
    pub fn iter(&self) -> Moves<'_> {
        Moves {
            tree: self,
            queue: self.root().children.iter().copied().collect(),
        }
    }

    /// Breadth first over all moves, root excluded. With `sync` the board is
    /// set to the position each move is played from before it is yielded,
    /// and back to the start once the walk is over.
    pub fn walk(&mut self, sync: bool) -> Walk<'_> {
        let queue = self.root().children.iter().copied().collect();
        Walk {
            tree: self,
            queue,
            sync,
        }
    }

    /// Detach every move the rules do not allow, together with everything
    /// after it. Returns how many subtrees were removed. The cursor ends at
    /// the root.
    pub fn prune_illegal(&mut self) -> usize {
        self.skip_to_start();
        let mut removed = 0;
        let mut queue = VecDeque::from([MoveId::ROOT]);
        while let Some(id) = queue.pop_front() {
            self.jump_to(id);
            let children = self.nodes[id.value()].children.clone();
            let mut kept = Vec::with_capacity(children.len());
            for child in children {
                let pair = self.nodes[child.value()].pair;
                if self.replay.legal_moves(pair.from()).contains(pair.to()) {
                    kept.push(child);
                    queue.push_back(child);
                } else {
                    trace!(%child, pair = %pair.to_iccs(), "Detaching illegal move");
                    self.nodes[child.value()].parent = None;
                    removed += 1;
                }
            }
            self.nodes[id.value()].children = kept;
        }
        self.skip_to_start();
        if removed > 0 {
            info!(removed, "Pruned illegal moves");
        }
        removed
    }

    /// Position and move of every move in the tree, as used to build an
    /// opening book. Positions are color exchanged when red is at the top.
    pub fn aspects(&mut self) -> Vec<(String, u16)> {
        let mut result = Vec::new();
        let mut walk = self.walk(true);
        while let Some(id) = walk.next() {
            let board = walk.board();
            let mut fen = board.fen();
            if !board.is_bottom_color(Color::Red) {
                fen = transform_fen(&fen, Transform::Exchange).unwrap_or(fen);
            }
            let data = walk.tree.nodes[id.value()].pair.to_data();
            result.push((fen, data));
        }
        result
    }
}

impl AsRef<Board> for MoveTree {
    fn as_ref(&self) -> &Board {
        &self.replay.board
    }
}

impl LegalMoves for MoveTree {}

impl Index<MoveId> for MoveTree {
    type Output = MoveNode;
    fn index(&self, index: MoveId) -> &Self::Output {
        &self.nodes[index.value()]
    }
}

impl Review for MoveTree {
    #[inline]
    fn cursor(&self) -> MoveId {
        self.replay.cursor
    }
    #[inline]
    fn node(&self, id: MoveId) -> Option<&MoveNode> {
        self.get(id)
    }
}

impl ReviewMut for MoveTree {
    /// Retreat until the cursor is on the path to `id`, then play forward.
    fn jump_to(&mut self, id: MoveId) -> bool {
        let Some(path) = self.path(id) else {
            return false;
        };
        let on_path: HashSet<MoveId> = path.iter().copied().collect();
        while !self.replay.cursor.is_root() && !on_path.contains(&self.replay.cursor) {
            self.unapply();
        }
        let start = match path.iter().position(|m| *m == self.replay.cursor) {
            Some(index) => index + 1,
            None => 0,
        };
        for step in &path[start..] {
            self.apply(*step);
        }
        trace!(cursor = %self.replay.cursor, "Jumped");
        true
    }

    fn retreat(&mut self) -> bool {
        self.unapply()
    }
}

/// Breadth first iterator over the moves of a tree.
pub struct Moves<'a> {
    tree: &'a MoveTree,
    queue: VecDeque<MoveId>,
}

impl<'a> Iterator for Moves<'a> {
    type Item = MoveId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.tree.nodes[id.value()].children.iter().copied());
        Some(id)
    }
}

/// Breadth first walk that can keep the tree's board in step with the
/// moves it yields.
pub struct Walk<'a> {
    tree: &'a mut MoveTree,
    queue: VecDeque<MoveId>,
    sync: bool,
}

impl<'a> Walk<'a> {
    pub fn board(&self) -> &Board {
        self.tree.board()
    }

    /// Start over from the first move.
    pub fn reset(&mut self) {
        self.queue = self.tree.root().children.iter().copied().collect();
        if self.sync {
            self.tree.skip_to_start();
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = MoveId;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(id) = self.queue.pop_front() else {
            if self.sync {
                self.tree.skip_to_start();
            }
            return None;
        };
        let node = &self.tree.nodes[id.value()];
        self.queue.extend(node.children.iter().copied());
        if self.sync {
            let parent = node.parent.unwrap_or(MoveId::ROOT);
            self.tree.jump_to(parent);
        }
        Some(id)
    }
}
