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

use super::tree::{MoveId, MoveNode};

/// Read-only navigation over a move tree. Hidden moves are never
/// chosen by the navigation helpers, but remain reachable by id.
pub trait Review {
    fn cursor(&self) -> MoveId;
    fn node(&self, id: MoveId) -> Option<&MoveNode>;

    #[inline]
    fn at_start(&self) -> bool {
        self.cursor().is_root()
    }
    #[inline]
    fn at_end(&self) -> bool {
        self.visible_children(self.cursor()).is_empty()
    }
    #[inline]
    fn current(&self) -> &MoveNode {
        self.node(self.cursor())
            .expect("Review::current - cursor out of bounds")
    }

    fn visible_children(&self, id: MoveId) -> Vec<MoveId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        node.children()
            .iter()
            .copied()
            .filter(|child| self.node(*child).map_or(false, |n| n.visible()))
            .collect()
    }

    /// The visible moves sharing a parent with `id`, `id` included.
    fn variations(&self, id: MoveId) -> Vec<MoveId> {
        match self.node(id).and_then(|node| node.parent()) {
            Some(parent) => self.visible_children(parent),
            None => vec![id],
        }
    }
}

pub trait ReviewMut: Review {
    /// Move the cursor to `id`, keeping the board in step. Returns false
    /// when `id` is not part of the tree.
    fn jump_to(&mut self, id: MoveId) -> bool;

    #[inline]
    fn advance(&mut self) -> bool {
        self.advance_variation(0)
    }

    /// Play the `index`th visible child of the cursor.
    fn advance_variation(&mut self, index: usize) -> bool {
        match self.visible_children(self.cursor()).get(index) {
            Some(child) => self.jump_to(*child),
            None => false,
        }
    }

    fn retreat(&mut self) -> bool {
        match self.current().parent() {
            Some(parent) => self.jump_to(parent),
            None => false,
        }
    }

    #[inline]
    fn skip_to_start(&mut self) {
        while self.retreat() {}
    }
    #[inline]
    fn skip_to_end(&mut self) {
        while self.advance() {}
    }

    /// Swap the cursor for its left or right visible sibling.
    fn switch_variation(&mut self, left: bool) -> bool {
        let cursor = self.cursor();
        let siblings = self.variations(cursor);
        let Some(index) = siblings.iter().position(|id| *id == cursor) else {
            return false;
        };
        let target = if left {
            index.checked_sub(1)
        } else {
            Some(index + 1)
        };
        match target.and_then(|i| siblings.get(i)) {
            Some(sibling) if !cursor.is_root() => {
                let sibling = *sibling;
                self.retreat() && self.jump_to(sibling)
            }
            _ => false,
        }
    }
}
