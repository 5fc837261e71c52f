//! Ambiguous tokenization of raw text into an interpretation forest.
//!
//! Every segmentation of the input into known ideas is kept: the result is an
//! alternatives group of sequences, each sequence covering the whole input.
//! Prefixes are tried longest first. A prefix that matches nothing is skipped
//! unless it is a single character, which always falls back to literal text,
//! so every input has at least one complete segmentation.
//!
//! Suffix interpretations are memoized by exact text and computed from the
//! end of the input backwards, so long inputs never recurse.

use crate::idea::IdeaId;
use crate::value::{GroupKind, Value};

use super::Ontology;

impl Ontology {
    /// Interpret text as a forest of alternative idea/text sequences.
    pub fn interpret(&mut self, text: &str) -> Value {
        if text.is_empty() {
            return Value::empty();
        }
        if !self.config.persist_cache {
            self.cache.clear();
        }
        let text = self.normalize(text);
        if let Some(hit) = self.cache.get(&text) {
            tracing::trace!(text = %text, "interpretation cache hit");
            return hit.clone();
        }

        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let count = bounds.len() - 1;

        for start in (0..count).rev() {
            let suffix = &text[bounds[start]..];
            if self.cache.contains_key(suffix) {
                continue;
            }
            let forest = self.interpret_suffix(&text, &bounds, start);
            self.cache.insert(suffix.to_string(), forest);
        }

        let forest = self
            .cache
            .get(&text)
            .cloned()
            .unwrap_or_else(|| Value::text(text.clone()));
        tracing::debug!(text = %text, forest = %forest, "interpreted text");
        forest
    }

    /// Interpret `text[bounds[start]..]`, assuming every shorter suffix is
    /// already cached.
    fn interpret_suffix(&self, text: &str, bounds: &[usize], start: usize) -> Value {
        let count = bounds.len() - 1;
        let mut branches: Vec<Value> = Vec::new();

        for end in (start + 1..=count).rev() {
            let width = end - start;
            if width > 1 && width > self.longest_text {
                continue;
            }
            let token = &text[bounds[start]..bounds[end]];
            let heads = match self.lookup(token) {
                Some(Value::Group {
                    kind: GroupKind::Any,
                    items,
                }) => items,
                Some(found) => vec![found],
                None if width == 1 => vec![Value::text(token)],
                None => continue,
            };

            for head in heads {
                let branch = if end < count {
                    let rest = &text[bounds[end]..];
                    let tail = self
                        .cache
                        .get(rest)
                        .cloned()
                        .unwrap_or_else(|| Value::text(rest));
                    self.optimize(head, tail)
                } else {
                    head
                };

                if branches.contains(&branch) {
                    tracing::trace!(token, "discarding duplicate branch");
                    continue;
                }
                branches.push(branch);
            }
        }

        match branches.len() {
            0 => Value::empty(),
            1 => branches.remove(0),
            _ => Value::any(branches),
        }
    }

    /// Ideas for a token: exact case and lowercase form.
    ///
    /// When only the lowercase form is known, the token itself stays a
    /// literal alternative next to it.
    fn lookup(&self, token: &str) -> Option<Value> {
        let lower = token.to_lowercase();
        if lower == token {
            return self.find_text(token).map(Value::idea);
        }
        match (self.find_text(token), self.find_text(&lower)) {
            (Some(literal), Some(sanitized)) if literal != sanitized => {
                Some(Value::ideas(GroupKind::Any, vec![literal, sanitized]))
            }
            (Some(literal), _) => Some(Value::idea(literal)),
            (None, Some(sanitized)) => Some(Value::any(vec![
                Value::text(token),
                Value::idea(sanitized),
            ])),
            (None, None) => None,
        }
    }

    fn find_text(&self, text: &str) -> Option<IdeaId> {
        self.find_value(&Value::text(text))
    }

    /// Join a head with a tail interpretation into one flat sequence.
    ///
    /// Nested sequences are flattened, adjacent text runs merged (and
    /// replaced by their idea when the merged text is known), adjacent idea
    /// runs merged.
    fn optimize(&self, head: Value, tail: Value) -> Value {
        let mut flat = Vec::new();
        flatten(head, &mut flat);
        flatten(tail, &mut flat);

        let mut texts: Vec<Value> = Vec::with_capacity(flat.len());
        for item in flat {
            if let (Some(Value::Text(prev)), Value::Text(next)) = (texts.last_mut(), &item) {
                prev.push_str(next);
                continue;
            }
            texts.push(item);
        }

        let mut merged: Vec<Value> = Vec::with_capacity(texts.len());
        for item in texts {
            let item = match item {
                Value::Text(t) => match self.find_text(&t) {
                    Some(id) => Value::idea(id),
                    None => Value::Text(t),
                },
                other => other,
            };
            if let (
                Some(Value::Ideas {
                    kind: GroupKind::All,
                    ids: prev,
                }),
                Value::Ideas {
                    kind: GroupKind::All,
                    ids,
                },
            ) = (merged.last_mut(), &item)
            {
                prev.extend_from_slice(ids);
                continue;
            }
            merged.push(item);
        }

        match merged.len() {
            1 => merged.remove(0),
            _ => Value::all(merged),
        }
    }
}

/// Splice nested sequences into `out`.
fn flatten(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Group {
            kind: GroupKind::All,
            items,
        } => {
            for item in items {
                flatten(item, out);
            }
        }
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::OntologyConfig;

    use super::*;

    fn onto() -> Ontology {
        Ontology::new("interpret", OntologyConfig::default())
    }

    fn plain(value: &Value) -> String {
        match value {
            Value::Text(t) => t.clone(),
            other => other.to_string(),
        }
    }

    /// Expand a forest into every complete sequence it encodes, as text.
    fn spellings(o: &Ontology, forest: &Value) -> Vec<String> {
        match forest {
            Value::Group {
                kind: GroupKind::Any,
                items,
            } => items.iter().flat_map(|i| spellings(o, i)).collect(),
            Value::Group { items, .. } => {
                let mut acc = vec![String::new()];
                for item in items {
                    let parts = spellings(o, item);
                    acc = acc
                        .iter()
                        .flat_map(|a| parts.iter().map(move |p| format!("{a}{p}")))
                        .collect();
                }
                acc
            }
            Value::Ideas {
                kind: GroupKind::Any,
                ids,
            } => ids.iter().map(|id| plain(&o.deserialize(*id))).collect(),
            Value::Ideas { ids, .. } => vec![
                ids.iter()
                    .map(|id| plain(&o.deserialize(*id)))
                    .collect::<String>(),
            ],
            other => vec![plain(other)],
        }
    }

    #[test]
    fn empty_ontology_spells_input_back() {
        let mut o = onto();
        let forest = o.interpret("hello");
        assert_eq!(forest, Value::text("hello"));
    }

    #[test]
    fn both_segmentations_are_kept() {
        let mut o = onto();
        let hi = o.build_text("hi").unwrap();
        let h = o.build_text("h").unwrap();
        let i = o.build_text("i").unwrap();
        let forest = o.interpret("hi");
        assert_eq!(
            forest,
            Value::any(vec![
                Value::idea(hi),
                Value::ideas(GroupKind::All, vec![h, i]),
            ])
        );
    }

    #[test]
    fn every_branch_covers_the_input() {
        let mut o = onto();
        for w in ["the", "there", "here", "he", "re"] {
            o.build_text(w).unwrap();
        }
        let text = "there we are";
        let forest = o.interpret(text);
        let all = spellings(&o, &forest);
        assert!(!all.is_empty());
        for spelled in all {
            assert_eq!(spelled.to_lowercase(), text);
        }
    }

    #[test]
    fn case_variants_become_alternatives() {
        let mut o = onto();
        let literal = o.build_text("Dimo").unwrap();
        let lower = o.build_text("dimo").unwrap();
        let forest = o.interpret("Dimo");
        let Value::Group {
            kind: GroupKind::Any,
            items,
        } = &forest
        else {
            panic!("expected alternatives, got {forest}");
        };
        assert_eq!(items[0], Value::ideas(GroupKind::Any, vec![literal, lower]));
        // The character-by-character spelling collapses back onto the literal idea.
        assert!(items.contains(&Value::idea(literal)));
    }

    #[test]
    fn only_lowercase_known_still_matches() {
        let mut o = onto();
        let lower = o.build_text("swan").unwrap();
        let forest = o.interpret("Swan");
        assert_eq!(
            forest,
            Value::any(vec![Value::text("Swan"), Value::idea(lower)])
        );
    }

    #[test]
    fn lowercase_match_inside_text_keeps_both_spellings() {
        let mut o = onto();
        let swan = o.build_text("swan").unwrap();
        let forest = o.interpret("a Swan");
        let all = spellings(&o, &forest);
        assert!(all.contains(&"a Swan".to_string()));
        assert!(all.contains(&"a swan".to_string()));
        assert_eq!(
            forest,
            Value::all(vec![
                Value::text("a "),
                Value::any(vec![Value::text("Swan"), Value::idea(swan)]),
            ])
        );
    }

    #[test]
    fn unknown_text_stays_text_next_to_ideas() {
        let mut o = onto();
        let cat = o.build_text("cat").unwrap();
        let forest = o.interpret("xycat");
        assert_eq!(
            forest,
            Value::all(vec![Value::text("xy"), Value::idea(cat)])
        );
    }

    #[test]
    fn cache_is_reused_and_invalidated() {
        let mut o = onto();
        o.build_text("cat").unwrap();
        let first = o.interpret("cat");
        assert!(o.stats().cached_interpretations > 0);
        assert_eq!(o.interpret("cat"), first);

        o.build_text("c").unwrap();
        assert_eq!(o.stats().cached_interpretations, 0);
        assert_ne!(o.interpret("cat"), first);
    }

    #[test]
    fn cache_can_be_disabled() {
        let config = OntologyConfig {
            persist_cache: false,
            ..OntologyConfig::default()
        };
        let mut o = Ontology::new("nocache", config);
        o.build_text("cat").unwrap();
        let a = o.interpret("cat");
        let b = o.interpret("cat");
        assert_eq!(a, b);

        o.interpret("x");
        assert!(!o.cache.contains_key("cat"));
        assert!(!o.cache.contains_key("at"));
        assert_eq!(o.stats().cached_interpretations, 1);
    }

    #[test]
    fn long_input_does_not_recurse() {
        let mut o = onto();
        o.build_text("ab").unwrap();
        let text = "ab".repeat(1_000);
        let forest = o.interpret(&text);
        assert!(!forest.is_empty());
    }
}
