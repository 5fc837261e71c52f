//! Ontology: the per-mind store of ideas.
//!
//! The ontology owns every [`Idea`] in an arena indexed by [`IdeaId`]. On top
//! of the arena it maintains:
//!
//! - **Trie** ([`trie`]): deduplicating prefix tree over canonical byte
//!   encodings, split incrementally as new data arrives
//! - **Association graph** ([`graph`]): symmetric synonym/antonym edges and
//!   the cycle-safe comparison walk
//! - **Interpretation** ([`interpret`]): ambiguous segmentation of raw text
//!   into a memoized forest of idea/text sequences
//!
//! All operations take the ontology explicitly; nothing is global, so any
//! number of independent ontologies may coexist.

pub mod graph;
pub mod interpret;
pub mod trie;

use std::collections::{BTreeSet, HashMap};

use unicode_normalization::UnicodeNormalization;

use crate::code;
use crate::config::OntologyConfig;
use crate::error::{OntologyError, OntologyResult};
use crate::idea::{Idea, IdeaId, OntologyId};
use crate::pattern::Pattern;
use crate::value::Value;

/// The owning store of ideas, trie roots and the interpretation cache.
pub struct Ontology {
    id: OntologyId,
    /// Label of the owning identity, used for diagnostics only.
    owner: String,
    config: OntologyConfig,
    ideas: Vec<Idea>,
    roots: BTreeSet<IdeaId>,
    /// Exact input text → interpretation forest.
    cache: HashMap<String, Value>,
    /// Length in characters of the longest text ever built.
    longest_text: usize,
}

impl Ontology {
    /// Create an empty ontology for the given owner.
    pub fn new(owner: impl Into<String>, config: OntologyConfig) -> Self {
        let id = OntologyId::allocate();
        let owner = owner.into();
        tracing::info!(ontology = %id, owner = %owner, "creating ontology");
        Self {
            id,
            owner,
            config,
            ideas: Vec::new(),
            roots: BTreeSet::new(),
            cache: HashMap::new(),
            longest_text: 0,
        }
    }

    pub fn id(&self) -> OntologyId {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn config(&self) -> &OntologyConfig {
        &self.config
    }

    /// Look up an idea owned by this ontology.
    pub fn get(&self, id: IdeaId) -> Option<&Idea> {
        if id.ontology() != self.id {
            return None;
        }
        self.ideas.get(id.index())
    }

    /// Whether the handle refers to an idea of this ontology.
    pub fn contains(&self, id: IdeaId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn check(&self, id: IdeaId) -> OntologyResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(OntologyError::UnknownIdea { id: id.to_string() })
        }
    }

    /// Mutable access; callers must have validated the handle.
    pub(crate) fn idea_mut(&mut self, id: IdeaId) -> &mut Idea {
        &mut self.ideas[id.index()]
    }

    pub(crate) fn idea(&self, id: IdeaId) -> &Idea {
        &self.ideas[id.index()]
    }

    /// Number of ideas.
    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }

    /// Trie roots (ideas without a parent).
    pub fn roots(&self) -> impl Iterator<Item = IdeaId> + '_ {
        self.roots.iter().copied()
    }

    /// All ideas, most relevant first.
    pub fn ideas_by_rating(&self) -> Vec<IdeaId> {
        let mut ranked: Vec<&Idea> = self.ideas.iter().collect();
        ranked.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id)));
        ranked.into_iter().map(|i| i.id).collect()
    }

    fn allocate(&mut self, data: Vec<u8>) -> IdeaId {
        let id = IdeaId::new(self.id, self.ideas.len() as u32);
        self.ideas.push(Idea::new(id, data));
        id
    }

    /// Drop every memoized interpretation.
    pub(crate) fn invalidate(&mut self) {
        if !self.cache.is_empty() {
            tracing::trace!(entries = self.cache.len(), "invalidating interpretation cache");
            self.cache.clear();
        }
    }

    /// Canonical Unicode form of a text, according to configuration.
    pub fn normalize(&self, text: &str) -> String {
        if self.config.normalize_unicode {
            text.nfc().collect()
        } else {
            text.to_string()
        }
    }

    /// Normalize every text inside a value.
    pub fn normalize_value(&self, value: &Value) -> Value {
        match value {
            Value::Text(t) => Value::Text(self.normalize(t)),
            Value::Group { kind, items } => Value::Group {
                kind: *kind,
                items: items.iter().map(|i| self.normalize_value(i)).collect(),
            },
            other => other.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Build an idea representing a value hierarchy.
    ///
    /// Groups are built member by member, code is parsed first, text goes
    /// through [`Ontology::build_text`], idea handles are forwarded. When more
    /// than one idea results they are folded into a single metapattern idea.
    /// With `find_metapatterns`, folding runs through the pattern builder so
    /// previously known sub-sequences get associated with the new idea.
    ///
    /// Groups nested deeper than `max_reduce_depth` are built as one flat
    /// idea. Returns `None` for empty data.
    pub fn build(&mut self, data: &Value, find_metapatterns: bool) -> Option<IdeaId> {
        self.invalidate();
        self.build_nested(data, find_metapatterns, 0)
    }

    fn build_nested(&mut self, data: &Value, find_metapatterns: bool, depth: usize) -> Option<IdeaId> {
        let mut coalesced = Vec::new();
        match data {
            Value::Group { .. } if depth >= self.config.max_reduce_depth => {
                tracing::debug!(depth, "group nested too deep, building it flat");
                return self.build_flat(data);
            }
            Value::Group { items, .. } => {
                for item in items {
                    if let Some(idea) = self.build_nested(item, find_metapatterns, depth + 1) {
                        coalesced.push(idea);
                    }
                }
            }
            Value::Ideas { ids, .. } => {
                for &id in ids {
                    if self.contains(id) {
                        coalesced.push(id);
                    } else {
                        tracing::warn!(
                            ontology = %self.id,
                            idea = %id,
                            "ignoring idea handle from a different ontology"
                        );
                    }
                }
            }
            Value::Code(source) => {
                let parsed = code::parse(source);
                if let Some(idea) = self.build_nested(&parsed, find_metapatterns, depth) {
                    coalesced.push(idea);
                }
            }
            Value::Text(text) => {
                if let Some(idea) = self.build_text(text) {
                    coalesced.push(idea);
                }
            }
            Value::Bytes(_) | Value::Number(_) => {
                return if find_metapatterns {
                    self.build_pattern(data.clone())
                } else {
                    self.build_flat(data)
                };
            }
        }

        match coalesced.len() {
            0 => None,
            1 => Some(coalesced[0]),
            _ => {
                let sequence = Value::ideas(data.kind(), coalesced);
                if find_metapatterns {
                    self.build_pattern(sequence)
                } else {
                    self.build_flat(&sequence)
                }
            }
        }
    }

    /// Build a text idea.
    ///
    /// Text that differs from its lowercase form produces two ideas, the
    /// literal and the lowercase one, associated with each other. The literal
    /// one is returned.
    pub fn build_text(&mut self, text: &str) -> Option<IdeaId> {
        if text.is_empty() {
            return None;
        }
        let text = self.normalize(text);
        let lower = text.to_lowercase();
        if lower != text {
            let literal = self.build_flat(&Value::Text(text))?;
            let sanitized = self.build_flat(&Value::Text(lower))?;
            if let Err(e) = self.associate(literal, sanitized) {
                tracing::warn!(error = %e, "failed to link text with its lowercase form");
            }
            return Some(literal);
        }
        self.build_flat(&Value::Text(text))
    }

    /// Build one trie idea from a flat value, without segmentation.
    pub fn build_flat(&mut self, value: &Value) -> Option<IdeaId> {
        if value.is_empty() {
            return None;
        }
        if let Some(id) = value.as_idea() {
            return self.contains(id).then_some(id);
        }
        if let Value::Text(t) = value {
            self.longest_text = self.longest_text.max(t.chars().count());
        }
        match self.build_bytes(&value.encode()) {
            Ok((id, fresh)) => {
                if fresh {
                    tracing::debug!(idea = %id, value = %value, "built idea");
                }
                Some(id)
            }
            Err(e) => {
                tracing::debug!(error = %e, "nothing to build");
                None
            }
        }
    }

    /// Segment and reduce a value into one idea, creating ideas for gaps.
    fn build_pattern(&mut self, value: Value) -> Option<IdeaId> {
        let mut pattern = Pattern::new(value, true);
        pattern.collect_all(self);
        pattern.reduce(self)
    }

    /// Find an idea for a value without creating anything.
    pub fn recall(&mut self, value: &Value) -> Option<IdeaId> {
        if let Some(stranger) = value.idea_handles().into_iter().find(|id| !self.contains(*id)) {
            tracing::warn!(
                ontology = %self.id,
                idea = %stranger,
                "cannot recall a value holding a handle from a different ontology"
            );
            return None;
        }
        let value = self.normalize_value(value);
        let mut pattern = Pattern::new(value, false);
        pattern.collect_all(self);
        pattern.reduce(self)
    }

    /// Length in characters of the longest text built so far.
    pub fn longest_text(&self) -> usize {
        self.longest_text
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Human-readable rendering of an idea: `##token` for plain words,
    /// ``##`token` `` for text with other symbols, the handle otherwise.
    pub fn describe(&self, id: IdeaId) -> String {
        match self.deserialize(id) {
            Value::Text(token) if !token.is_empty() => {
                if token.chars().all(char::is_alphabetic) {
                    format!("##{token}")
                } else {
                    format!("##`{token}`")
                }
            }
            _ => id.to_string(),
        }
    }

    /// Summary counts.
    pub fn stats(&self) -> OntologyStats {
        let count = |f: fn(&Idea) -> usize| self.ideas.iter().map(f).sum::<usize>() / 2;
        OntologyStats {
            ideas: self.ideas.len(),
            roots: self.roots.len(),
            associations: count(|i| i.associations.len()),
            disassociations: count(|i| i.disassociations.len()),
            cached_interpretations: self.cache.len(),
            longest_text: self.longest_text,
        }
    }

    /// Sever all edges, then drop every idea.
    pub fn teardown(&mut self) {
        if self.ideas.is_empty() {
            return;
        }
        tracing::debug!(ontology = %self.id, ideas = self.ideas.len(), "tearing down ontology");
        self.cache.clear();
        for idea in &mut self.ideas {
            idea.sever();
        }
        self.roots.clear();
        self.ideas.clear();
        self.longest_text = 0;
    }
}

impl Drop for Ontology {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Ontology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ontology")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("ideas", &self.ideas.len())
            .field("roots", &self.roots.len())
            .finish()
    }
}

/// Summary information about an ontology.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OntologyStats {
    pub ideas: usize,
    pub roots: usize,
    pub associations: usize,
    pub disassociations: usize,
    pub cached_interpretations: usize,
    pub longest_text: usize,
}

impl std::fmt::Display for OntologyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ontology stats")?;
        writeln!(f, "  ideas:            {}", self.ideas)?;
        writeln!(f, "  trie roots:       {}", self.roots)?;
        writeln!(f, "  associations:     {}", self.associations)?;
        writeln!(f, "  disassociations:  {}", self.disassociations)?;
        writeln!(f, "  cached forests:   {}", self.cached_interpretations)?;
        writeln!(f, "  longest text:     {}", self.longest_text)?;
        Ok(())
    }
}
