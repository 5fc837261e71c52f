//! Core idea types for the akh-mind engine.
//!
//! An [`Idea`] is one deduplicated fragment of meaning. Every idea is at the
//! same time a node of its ontology's byte trie (`data`, `parents`, `children`)
//! and a node of the association graph (`associations`, `disassociations`).
//!
//! Ideas live in an arena owned by the ontology and refer to each other by
//! [`IdeaId`] handles only, so the cyclic synonym mesh never owns anything.

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of an ontology instance.
///
/// Allocated from a process-wide counter so handles produced by two
/// ontologies can never be confused with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct OntologyId(NonZeroU32);

static NEXT_ONTOLOGY: AtomicU32 = AtomicU32::new(1);

impl OntologyId {
    /// Allocate a fresh, process-unique ontology id.
    pub(crate) fn allocate() -> Self {
        let raw = NEXT_ONTOLOGY.fetch_add(1, Ordering::Relaxed);
        // Wrapping past u32::MAX restarts from 1; four billion live
        // ontologies in one process is not a supported configuration.
        OntologyId(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MIN))
    }

    /// Get the underlying `u32` value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for OntologyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "onto:{}", self.0)
    }
}

/// Stable handle to an idea inside its owning ontology's arena.
///
/// Ordering is by ontology, then by creation order, which keeps every
/// graph walk deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdeaId {
    ontology: OntologyId,
    index: u32,
}

impl IdeaId {
    pub(crate) fn new(ontology: OntologyId, index: u32) -> Self {
        Self { ontology, index }
    }

    /// The ontology that owns this idea.
    pub fn ontology(self) -> OntologyId {
        self.ontology
    }

    /// Position of the idea in its ontology's arena.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl std::fmt::Display for IdeaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idea:{}.{}", self.ontology.get(), self.index)
    }
}

/// Usage and relevance weight of an idea.
pub type Rating = f64;

/// A fragment of meaning: trie node plus graph node.
#[derive(Debug, Clone)]
pub struct Idea {
    pub(crate) id: IdeaId,
    /// Accumulated usage weight, increased on every (partial) match.
    pub(crate) rating: Rating,
    /// This node's own slice of the byte path.
    pub(crate) data: Vec<u8>,
    pub(crate) parents: BTreeSet<IdeaId>,
    pub(crate) children: BTreeSet<IdeaId>,
    pub(crate) associations: BTreeSet<IdeaId>,
    pub(crate) disassociations: BTreeSet<IdeaId>,
}

impl Idea {
    pub(crate) fn new(id: IdeaId, data: Vec<u8>) -> Self {
        Self {
            id,
            rating: 0.0,
            data,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            associations: BTreeSet::new(),
            disassociations: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> IdeaId {
        self.id
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    /// The node's own payload, not the full reconstructed path.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn parents(&self) -> &BTreeSet<IdeaId> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<IdeaId> {
        &self.children
    }

    pub fn associations(&self) -> &BTreeSet<IdeaId> {
        &self.associations
    }

    pub fn disassociations(&self) -> &BTreeSet<IdeaId> {
        &self.disassociations
    }

    pub fn has_association(&self, other: IdeaId) -> bool {
        self.associations.contains(&other)
    }

    pub fn has_disassociation(&self, other: IdeaId) -> bool {
        self.disassociations.contains(&other)
    }

    /// Whether this idea is linked to `other` as both synonym and antonym.
    pub fn is_paradox_with(&self, other: IdeaId) -> bool {
        self.has_association(other) && self.has_disassociation(other)
    }

    /// Trie roots have no parent.
    pub fn is_orphan(&self) -> bool {
        self.parents.is_empty()
    }

    /// Whether this idea is more relevant than `other`.
    pub fn outranks(&self, other: &Idea) -> bool {
        self.rating > other.rating
    }

    /// Sever every edge. Used on ontology teardown.
    pub(crate) fn sever(&mut self) {
        self.parents.clear();
        self.children.clear();
        self.associations.clear();
        self.disassociations.clear();
    }
}
