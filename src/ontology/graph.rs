//! Association graph: symmetric synonym and antonym edges between ideas.
//!
//! Associations and disassociations are always mutual. Equality of two ideas
//! is a first-order association, or mutual reachability through associations
//! that never crosses a disassociation. Walks carry a visited set, so
//! arbitrary cycles in the synonym mesh terminate.

use std::collections::BTreeSet;

use crate::error::{OntologyError, OntologyResult};
use crate::idea::{Idea, IdeaId};
use crate::value::{Shape, Value};

use super::Ontology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Association,
    Disassociation,
}

impl Edge {
    fn set(self, idea: &mut Idea) -> &mut BTreeSet<IdeaId> {
        match self {
            Edge::Association => &mut idea.associations,
            Edge::Disassociation => &mut idea.disassociations,
        }
    }
}

impl Ontology {
    /// Link two ideas as synonyms. Returns whether a new edge was added.
    ///
    /// Linking an idea to itself is a no-op. Both ideas must belong to this
    /// ontology.
    pub fn associate(&mut self, left: IdeaId, right: IdeaId) -> OntologyResult<bool> {
        self.link(left, right, Edge::Association)
    }

    /// Link two ideas as antonyms. Returns whether a new edge was added.
    pub fn disassociate(&mut self, left: IdeaId, right: IdeaId) -> OntologyResult<bool> {
        self.link(left, right, Edge::Disassociation)
    }

    fn link(&mut self, left: IdeaId, right: IdeaId, edge: Edge) -> OntologyResult<bool> {
        if left.ontology() != self.id || right.ontology() != self.id {
            tracing::warn!(
                ontology = %self.id,
                left = %left,
                right = %right,
                "rejected link across ontologies"
            );
            return Err(OntologyError::CrossOntologyLink {
                left: left.to_string(),
                right: right.to_string(),
            });
        }
        self.check(left)?;
        self.check(right)?;
        if left == right {
            return Ok(false);
        }

        let added = edge.set(self.idea_mut(left)).insert(right);
        edge.set(self.idea_mut(right)).insert(left);
        if added {
            tracing::debug!(left = %left, right = %right, ?edge, "linked ideas");
        }
        Ok(added)
    }

    /// Whether two ideas mean the same thing.
    pub fn equal(&self, left: IdeaId, right: IdeaId) -> bool {
        if left == right {
            return true;
        }
        let (Some(l), Some(_)) = (self.get(left), self.get(right)) else {
            return false;
        };
        if l.has_association(right) && !l.has_disassociation(right) {
            return true;
        }
        self.advanced_compare(left, right, &mut BTreeSet::new()).is_some()
            && self.advanced_compare(right, left, &mut BTreeSet::new()).is_some()
    }

    /// Search `from`'s associations for an idea that reaches `target` and is
    /// reachable back from it.
    ///
    /// Disassociations veto in both directions: if `from` and `target`
    /// disassociate, or `target` disassociates `from`, nothing is found. The
    /// same veto prunes every idea walked through. Returns the association
    /// through which the match was made.
    ///
    /// Forward walks share `visited`, so ideas already walked from an earlier
    /// association are not walked again. The walk back from `target` ignores
    /// what the matching forward walk entered.
    pub fn advanced_compare(
        &self,
        from: IdeaId,
        target: IdeaId,
        visited: &mut BTreeSet<IdeaId>,
    ) -> Option<IdeaId> {
        if !visited.insert(from) {
            return None;
        }
        let idea = self.get(from)?;
        let goal = self.get(target)?;
        if idea.has_disassociation(target) || goal.has_disassociation(from) {
            return None;
        }

        for &next in &idea.associations {
            if next == target {
                return Some(next);
            }
            let mut entered = Vec::new();
            if !self.reach(next, target, visited, &mut entered) {
                continue;
            }
            for id in &entered {
                visited.remove(id);
            }
            let mut back = Vec::new();
            let met = self.reach(target, next, visited, &mut back);
            for id in &back {
                visited.remove(id);
            }
            visited.extend(entered);
            if met {
                tracing::trace!(from = %from, target = %target, via = %next, "ideas meet");
                return Some(next);
            }
        }
        None
    }

    /// Depth-first walk from `start` until an idea associated with `goal` is
    /// found. Ideas in `visited` are not entered, and ideas at odds with
    /// `goal` are entered but not walked through. Every idea entered is added
    /// to `visited` and to `entered`.
    fn reach(
        &self,
        start: IdeaId,
        goal: IdeaId,
        visited: &mut BTreeSet<IdeaId>,
        entered: &mut Vec<IdeaId>,
    ) -> bool {
        let Some(goal_idea) = self.get(goal) else {
            return false;
        };
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            entered.push(node);
            let Some(idea) = self.get(node) else {
                continue;
            };
            if idea.has_disassociation(goal) || goal_idea.has_disassociation(node) {
                continue;
            }
            if idea.has_association(goal) {
                return true;
            }
            stack.extend(
                idea.associations
                    .iter()
                    .rev()
                    .filter(|next| !visited.contains(*next))
                    .copied(),
            );
        }
        false
    }

    /// Collect the literal data of the given shape reachable from an idea.
    ///
    /// Walks the idea and its associations, never descending into ideas
    /// disassociated from anything already walked. Group structure of the
    /// literal data is preserved.
    pub fn extract(&self, id: IdeaId, shape: Shape) -> Value {
        let mut mask = BTreeSet::new();
        let mut found = Vec::new();
        self.extract_into(id, shape, &mut mask, &mut found);
        match found.len() {
            0 => Value::empty(),
            1 => found.remove(0),
            _ => Value::all(found),
        }
    }

    fn extract_into(
        &self,
        id: IdeaId,
        shape: Shape,
        mask: &mut BTreeSet<IdeaId>,
        found: &mut Vec<Value>,
    ) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(idea) = self.get(current) else {
                continue;
            };
            if !mask.insert(current) {
                continue;
            }
            mask.extend(idea.disassociations.iter().copied());

            if let Some(literal) = self.filter_shape(&self.deserialize(current), shape, mask) {
                found.push(literal);
            }
            stack.extend(idea.associations.iter().rev().copied());
        }
    }

    /// Keep only data of `shape`, preserving the group hierarchy.
    fn filter_shape(&self, value: &Value, shape: Shape, mask: &BTreeSet<IdeaId>) -> Option<Value> {
        match value {
            Value::Group { kind, items } => {
                let kept: Vec<Value> = items
                    .iter()
                    .filter_map(|item| self.filter_shape(item, shape, mask))
                    .collect();
                match (kind, kept.len()) {
                    (_, 0) => None,
                    (_, 1) => kept.into_iter().next(),
                    (kind, _) => Some(Value::Group { kind: *kind, items: kept }),
                }
            }
            Value::Ideas { kind, ids } if shape != Shape::Ideas => {
                let mut kept = Vec::new();
                for &id in ids {
                    if mask.contains(&id) {
                        continue;
                    }
                    if let Some(inner) = self.filter_shape(&self.deserialize(id), shape, mask) {
                        kept.push(inner);
                    }
                }
                match kept.len() {
                    0 => None,
                    1 => kept.into_iter().next(),
                    _ => Some(Value::Group { kind: *kind, items: kept }),
                }
            }
            flat => flat.matches(shape).then(|| flat.clone()),
        }
    }
}
