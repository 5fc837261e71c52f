// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # akh-mind
//!
//! A self-organizing ontology engine. Arbitrary data is broken into
//! deduplicated fragments of meaning ("ideas") stored in a byte trie, and
//! ideas are linked by symmetric synonym/antonym edges.
//!
//! ## Architecture
//!
//! - **Ideas** (`idea`): arena handles and trie/graph nodes
//! - **Values** (`value`, `code`): composite data model, canonical encoding, code parsing
//! - **Ontology** (`ontology`): trie build/seek, association graph, ambiguous text interpretation
//! - **Patterns** (`pattern`): segmentation (Collect/Reduce) and graph walks (Resolve/Gather)
//! - **Mind** (`mind`): an identity owning one ontology, driven by commands
//!
//! ## Library usage
//!
//! ```no_run
//! use akh_mind::mind::{Command, Mind};
//! use akh_mind::value::Value;
//!
//! let mut mind = Mind::named("dimo").unwrap();
//! mind.execute(Command::Associate {
//!     left: Value::text("one"),
//!     right: Value::Number(1.0),
//!     intensity: 1.0,
//! })
//! .unwrap();
//! let forest = mind.interpret_text("one1");
//! println!("{forest}");
//! ```

pub mod code;
pub mod config;
pub mod error;
pub mod idea;
pub mod mind;
pub mod ontology;
pub mod pattern;
pub mod value;
