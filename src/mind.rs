//! Mind facade: an identity owning one ontology.
//!
//! The `Mind` accepts a closed set of [`Command`]s and answers each with an
//! [`Answer`]. Creation and association build missing ideas; comparison and
//! interpretation only look things up.

use serde::{Deserialize, Serialize};

use crate::config::{MindConfig, MAX_DEPTH_LIMIT};
use crate::error::{CommandError, MindResult, OntologyError};
use crate::idea::IdeaId;
use crate::ontology::{Ontology, OntologyStats};
use crate::pattern::Pattern;
use crate::value::{Shape, Value};

/// A request to a mind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Build an idea for the value.
    Create { value: Value },
    /// Link two values: positive intensity associates, negative
    /// disassociates, zero does nothing.
    Associate {
        left: Value,
        right: Value,
        #[serde(default = "default_intensity")]
        intensity: f64,
    },
    /// Whether two values mean the same thing.
    Compare { left: Value, right: Value },
    /// Gather data of a shape associated with a value.
    Interpret {
        value: Value,
        #[serde(default)]
        shape: Option<Shape>,
        #[serde(default)]
        depth: Option<usize>,
    },
}

fn default_intensity() -> f64 {
    1.0
}

/// The reply to a [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "answer", rename_all = "snake_case")]
pub enum Answer {
    Created { idea: Option<IdeaId> },
    Associated { linked: bool },
    Compared { equal: bool, matched: Option<IdeaId> },
    Interpreted { data: Vec<Value>, depth: Option<usize> },
}

/// An identity with its own ontology.
pub struct Mind {
    name: String,
    ontology: Ontology,
    config: MindConfig,
}

impl Mind {
    /// Create a mind from a validated configuration.
    pub fn new(config: MindConfig) -> MindResult<Self> {
        config.validate()?;
        tracing::info!(name = %config.name, "creating mind");
        Ok(Self {
            name: config.name.clone(),
            ontology: Ontology::new(config.name.clone(), config.ontology.clone()),
            config,
        })
    }

    /// Create a mind with default settings.
    pub fn named(name: &str) -> MindResult<Self> {
        Self::new(MindConfig::with_name(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MindConfig {
        &self.config
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn ontology_mut(&mut self) -> &mut Ontology {
        &mut self.ontology
    }

    pub fn stats(&self) -> OntologyStats {
        self.ontology.stats()
    }

    /// Execute one command.
    pub fn execute(&mut self, command: Command) -> Result<Answer, CommandError> {
        match command {
            Command::Create { value } => {
                let idea = self.ontology.build(&value, true);
                tracing::debug!(mind = %self.name, idea = ?idea, "create");
                Ok(Answer::Created { idea })
            }
            Command::Associate {
                left,
                right,
                intensity,
            } => self.associate(&left, &right, intensity),
            Command::Compare { left, right } => {
                let l = self.ontology.recall(&left);
                let r = self.ontology.recall(&right);
                let equal = match (l, r) {
                    (Some(l), Some(r)) => self.ontology.equal(l, r),
                    _ => false,
                };
                tracing::debug!(mind = %self.name, %left, %right, equal, "compare");
                Ok(Answer::Compared {
                    equal,
                    matched: if equal { l } else { None },
                })
            }
            Command::Interpret {
                value,
                shape,
                depth,
            } => {
                let value = self.ontology.normalize_value(&value);
                let limit = depth
                    .unwrap_or(self.config.ontology.depth_limit)
                    .min(MAX_DEPTH_LIMIT);
                let mut data = Vec::new();
                let mut pattern = Pattern::new(value, false);
                let depth = pattern.interpret(&mut self.ontology, shape, limit, &mut data);
                Ok(Answer::Interpreted { data, depth })
            }
        }
    }

    /// Execute a batch, stopping at the first failing command.
    pub fn run(&mut self, commands: impl IntoIterator<Item = Command>) -> Result<Vec<Answer>, CommandError> {
        commands.into_iter().map(|c| self.execute(c)).collect()
    }

    fn associate(&mut self, left: &Value, right: &Value, intensity: f64) -> Result<Answer, CommandError> {
        if intensity.is_nan() {
            return Err(CommandError::InvalidIntensity { intensity });
        }
        let (Some(l), Some(r)) = (self.ontology.build(left, true), self.ontology.build(right, true)) else {
            return Ok(Answer::Associated { linked: false });
        };

        let result = if intensity > 0.0 {
            self.ontology.associate(l, r)
        } else if intensity < 0.0 {
            self.ontology.disassociate(l, r)
        } else {
            Ok(false)
        };

        match result {
            Ok(linked) => Ok(Answer::Associated { linked }),
            Err(OntologyError::CrossOntologyLink { .. }) => Ok(Answer::Associated { linked: false }),
            Err(e) => Err(e.into()),
        }
    }

    /// Tokenize text into its interpretation forest.
    pub fn interpret_text(&mut self, text: &str) -> Value {
        self.ontology.interpret(text)
    }
}

impl std::fmt::Debug for Mind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mind")
            .field("name", &self.name)
            .field("ontology", &self.ontology)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mind() -> Mind {
        Mind::named("test").unwrap()
    }

    #[test]
    fn create_then_compare() {
        let mut m = mind();
        let Answer::Created { idea: Some(id) } = m
            .execute(Command::Create {
                value: Value::text("swan"),
            })
            .unwrap()
        else {
            panic!("expected an idea");
        };
        let answer = m
            .execute(Command::Compare {
                left: Value::text("swan"),
                right: Value::text("swan"),
            })
            .unwrap();
        assert_eq!(
            answer,
            Answer::Compared {
                equal: true,
                matched: Some(id)
            }
        );
    }

    #[test]
    fn compare_unknown_is_false() {
        let mut m = mind();
        let answer = m
            .execute(Command::Compare {
                left: Value::text("ghost"),
                right: Value::text("spirit"),
            })
            .unwrap();
        assert_eq!(
            answer,
            Answer::Compared {
                equal: false,
                matched: None
            }
        );
        assert!(m.ontology().is_empty());
    }

    #[test]
    fn zero_intensity_links_nothing() {
        let mut m = mind();
        let answer = m
            .execute(Command::Associate {
                left: Value::text("a"),
                right: Value::text("b"),
                intensity: 0.0,
            })
            .unwrap();
        assert_eq!(answer, Answer::Associated { linked: false });
        assert_eq!(m.stats().associations, 0);
    }

    #[test]
    fn nan_intensity_is_rejected() {
        let mut m = mind();
        let err = m
            .execute(Command::Associate {
                left: Value::text("a"),
                right: Value::text("b"),
                intensity: f64::NAN,
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidIntensity { .. }));
    }

    #[test]
    fn commands_deserialize_from_json() {
        let json = r#"{"command":"associate","left":{"text":"one"},"right":{"number":1.0}}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::Associate {
                left: Value::text("one"),
                right: Value::Number(1.0),
                intensity: 1.0,
            }
        );
    }

    #[test]
    fn interpret_text_exposes_forest() {
        let mut m = mind();
        m.execute(Command::Create {
            value: Value::text("hi"),
        })
        .unwrap();
        assert!(matches!(m.interpret_text("hi"), Value::Ideas { .. }));
    }
}
