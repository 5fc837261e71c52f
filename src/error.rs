//! Rich diagnostic error types for the akh-mind engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Most "failures" of the ontology are not
//! errors at all: a failed seek, an unresolved token or an exhausted walk depth
//! are represented as absent or partial results. Only operations that would
//! corrupt state are rejected here.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the akh-mind engine.
#[derive(Debug, Error, Diagnostic)]
pub enum MindError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("cannot link {left} with {right}: ideas belong to different ontologies")]
    #[diagnostic(
        code(akh::ontology::cross_link),
        help(
            "Every idea is owned by exactly one ontology and edges may not cross \
             ontology boundaries. Rebuild the foreign idea's data inside this \
             ontology with `Ontology::build` and link the result instead."
        )
    )]
    CrossOntologyLink { left: String, right: String },

    #[error("unknown idea {id}")]
    #[diagnostic(
        code(akh::ontology::unknown_idea),
        help(
            "The handle does not refer to an idea of this ontology. \
             Handles are only valid within the ontology that produced them."
        )
    )]
    UnknownIdea { id: String },

    #[error("cannot build an idea from an empty pattern")]
    #[diagnostic(
        code(akh::ontology::empty_pattern),
        help("Provide at least one byte of data to build an idea from.")
    )]
    EmptyPattern,
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(akh::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(akh::config::parse),
        help("Check the TOML syntax. Unknown keys are ignored, missing keys use defaults.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(akh::config::invalid), help("Check the configuration fields. {message}"))]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CommandError {
    #[error("association intensity must be a number, got {intensity}")]
    #[diagnostic(
        code(akh::command::intensity),
        help(
            "Use a positive intensity to associate, a negative one to \
             disassociate, or zero for no change."
        )
    )]
    InvalidIntensity { intensity: f64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),
}

/// Convenience alias for functions returning akh-mind results.
pub type MindResult<T> = std::result::Result<T, MindError>;

/// Result type for ontology operations.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
