//! Deduplicating byte trie over canonical value encodings.
//!
//! Each idea stores only its own slice of the byte path; the full path is
//! recovered by walking up the first parent. Siblings never share a first
//! byte, so at every level at most one child can match and both build and
//! seek are simple descending loops.
//!
//! When a new pattern diverges in the middle of an existing node, the node is
//! split: a fresh ancestor takes the matched head (and the node's parents),
//! while the node keeps its identity, its associations and the unmatched
//! tail. The full byte path of the split node is unchanged.

use crate::error::{OntologyError, OntologyResult};
use crate::idea::{IdeaId, Rating};
use crate::value::Value;

use super::Ontology;

/// Position inside the trie: a node and how many of its bytes were consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    node: Option<IdeaId>,
    offset: usize,
}

/// Length of the longest common prefix of two byte strings.
fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl Ontology {
    /// Candidate nodes at one trie level.
    fn level(&self, parent: Option<IdeaId>) -> Vec<IdeaId> {
        match parent {
            None => self.roots.iter().copied().collect(),
            Some(p) => self.idea(p).children.iter().copied().collect(),
        }
    }

    /// The single node at this level sharing a first byte with `rest`,
    /// and the number of bytes it matches.
    fn matching(&self, parent: Option<IdeaId>, rest: &[u8]) -> Option<(IdeaId, usize)> {
        self.level(parent).into_iter().find_map(|candidate| {
            let matched = common_prefix(rest, &self.idea(candidate).data);
            (matched > 0).then_some((candidate, matched))
        })
    }

    /// Insert a byte pattern, returning the idea for it and whether it is new.
    ///
    /// An existing full match gains one rating point.
    pub fn build_bytes(&mut self, pattern: &[u8]) -> OntologyResult<(IdeaId, bool)> {
        if pattern.is_empty() {
            return Err(OntologyError::EmptyPattern);
        }
        self.invalidate();

        let mut progress = 0;
        let mut parent = None;
        loop {
            let Some((node, matched)) = self.matching(parent, &pattern[progress..]) else {
                let branch = self.attach(parent, pattern[progress..].to_vec());
                return Ok((branch, true));
            };

            let size = self.idea(node).data.len();
            progress += matched;

            if matched < size {
                let ancestor = self.split(node, matched);
                if progress == pattern.len() {
                    return Ok((ancestor, true));
                }
                let branch = self.attach(Some(ancestor), pattern[progress..].to_vec());
                return Ok((branch, true));
            }

            if progress == pattern.len() {
                self.idea_mut(node).rating += 1.0;
                return Ok((node, false));
            }
            parent = Some(node);
        }
    }

    /// Find the idea for an exact byte pattern.
    ///
    /// Every node visited on the way accrues rating proportional to how much
    /// of it matched, even when the seek ultimately fails.
    pub fn seek(&mut self, pattern: &[u8]) -> Option<IdeaId> {
        if pattern.is_empty() {
            return None;
        }
        let mut progress = 0;
        let mut parent = None;
        loop {
            let (node, matched) = self.matching(parent, &pattern[progress..])?;
            let size = self.idea(node).data.len();
            self.idea_mut(node).rating += matched as Rating / size as Rating;
            if matched < size {
                return None;
            }
            progress += matched;
            if progress == pattern.len() {
                return Some(node);
            }
            parent = Some(node);
        }
    }

    /// Read-only variant of [`Ontology::seek`].
    pub fn find(&self, pattern: &[u8]) -> Option<IdeaId> {
        if pattern.is_empty() {
            return None;
        }
        let mut progress = 0;
        let mut parent = None;
        loop {
            let (node, matched) = self.matching(parent, &pattern[progress..])?;
            if matched < self.idea(node).data.len() {
                return None;
            }
            progress += matched;
            if progress == pattern.len() {
                return Some(node);
            }
            parent = Some(node);
        }
    }

    /// Find the idea for a flat value without touching ratings.
    pub fn find_value(&self, value: &Value) -> Option<IdeaId> {
        if value.is_empty() {
            return None;
        }
        self.find(&value.encode())
    }

    /// A cursor positioned before the first byte of every path.
    pub(crate) fn cursor(&self) -> Cursor {
        Cursor { node: None, offset: 0 }
    }

    /// Move the cursor over one byte. Returns false, leaving the cursor
    /// untouched, when no stored path continues with `byte`.
    pub(crate) fn advance(&self, cursor: &mut Cursor, byte: u8) -> bool {
        if let Some(node) = cursor.node {
            let data = &self.idea(node).data;
            if cursor.offset < data.len() {
                if data[cursor.offset] != byte {
                    return false;
                }
                cursor.offset += 1;
                return true;
            }
        }
        let next = match cursor.node {
            None => self.roots.iter().find(|r| self.idea(**r).data.first() == Some(&byte)),
            Some(node) => self
                .idea(node)
                .children
                .iter()
                .find(|c| self.idea(**c).data.first() == Some(&byte)),
        };
        match next {
            Some(&child) => {
                *cursor = Cursor {
                    node: Some(child),
                    offset: 1,
                };
                true
            }
            None => false,
        }
    }

    /// The idea whose full path ends exactly at the cursor.
    pub(crate) fn landed(&self, cursor: &Cursor) -> Option<IdeaId> {
        cursor
            .node
            .filter(|node| cursor.offset == self.idea(*node).data.len())
    }

    /// Full byte path of an idea, root first.
    pub fn path(&self, id: IdeaId) -> Vec<u8> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let idea = self.idea(node);
            segments.push(idea.data.as_slice());
            current = idea.parents.first().copied();
        }
        segments.into_iter().rev().flatten().copied().collect()
    }

    /// Decode the value an idea represents.
    pub fn deserialize(&self, id: IdeaId) -> Value {
        if !self.contains(id) {
            return Value::empty();
        }
        Value::decode(&self.path(id), self.id)
    }

    fn attach(&mut self, parent: Option<IdeaId>, data: Vec<u8>) -> IdeaId {
        let id = self.allocate(data);
        self.idea_mut(id).rating = 1.0;
        match parent {
            Some(p) => {
                self.idea_mut(p).children.insert(id);
                self.idea_mut(id).parents.insert(p);
            }
            None => {
                self.roots.insert(id);
            }
        }
        id
    }

    /// Split `node` after `at` bytes, returning the new ancestor.
    fn split(&mut self, node: IdeaId, at: usize) -> IdeaId {
        let (head, parents, rating, ratio) = {
            let idea = self.idea_mut(node);
            let total = idea.data.len();
            let tail = idea.data.split_off(at);
            let head = std::mem::replace(&mut idea.data, tail);
            let parents = std::mem::take(&mut idea.parents);
            let ratio = at as Rating / total as Rating;
            let rating = idea.rating;
            idea.rating += ratio;
            (head, parents, rating, ratio)
        };

        let ancestor = self.allocate(head);
        for &p in &parents {
            let parent = self.idea_mut(p);
            parent.children.remove(&node);
            parent.children.insert(ancestor);
        }
        if parents.is_empty() {
            self.roots.remove(&node);
            self.roots.insert(ancestor);
        }
        {
            let a = self.idea_mut(ancestor);
            a.rating = rating * (1.0 - ratio);
            a.parents = parents;
            a.children.insert(node);
        }
        self.idea_mut(node).parents.insert(ancestor);

        tracing::debug!(node = %node, ancestor = %ancestor, at, "split trie node");
        ancestor
    }
}
