//! Composite values: the data model ideas are built from.
//!
//! A [`Value`] is either a flat literal payload (text, bytes, a number, code,
//! or a flat run of idea handles) or a nested [`Value::Group`]. Every level of
//! nesting carries a [`GroupKind`]: `All` means "all of these, in order",
//! `Any` means "exactly one of these".
//!
//! Flat values have a canonical byte encoding used as the trie key. The
//! encoding is prefix-preserving: the encoding of the first `n` elements of a
//! flat value is a byte prefix of the encoding of the whole value, which is
//! what lets the trie share storage between `"h"`, `"hi"` and `"hint"`.

use serde::{Deserialize, Serialize};

use crate::idea::{IdeaId, OntologyId};

const TAG_TEXT: u8 = 0x01;
const TAG_BYTES: u8 = 0x02;
const TAG_NUMBER: u8 = 0x03;
const TAG_CODE: u8 = 0x04;
const TAG_IDEAS_ALL: u8 = 0x05;
const TAG_IDEAS_ANY: u8 = 0x06;
const TAG_GROUP_ALL: u8 = 0x07;
const TAG_GROUP_ANY: u8 = 0x08;

/// How the members of one nesting level relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// All members, in order.
    #[default]
    All,
    /// Exactly one of the members.
    Any,
}

/// Shape filter used when gathering or extracting data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Accept any data without filtering.
    Anything,
    Text,
    Bytes,
    Number,
    Code,
    Ideas,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Shape::Anything => "anything",
            Shape::Text => "text",
            Shape::Bytes => "bytes",
            Shape::Number => "number",
            Shape::Code => "code",
            Shape::Ideas => "ideas",
        };
        f.write_str(name)
    }
}

/// A composite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Literal text; elements are Unicode scalar values.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// A single number.
    Number(f64),
    /// Code-like payload that is parsed before it is built.
    Code(String),
    /// A flat run of idea handles.
    Ideas { kind: GroupKind, ids: Vec<IdeaId> },
    /// A nested group of values.
    Group { kind: GroupKind, items: Vec<Value> },
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn code(code: impl Into<String>) -> Self {
        Value::Code(code.into())
    }

    /// A single idea handle.
    pub fn idea(id: IdeaId) -> Self {
        Value::Ideas {
            kind: GroupKind::All,
            ids: vec![id],
        }
    }

    pub fn ideas(kind: GroupKind, ids: Vec<IdeaId>) -> Self {
        Value::Ideas { kind, ids }
    }

    /// An ordered sequence.
    pub fn all(items: Vec<Value>) -> Self {
        Value::Group {
            kind: GroupKind::All,
            items,
        }
    }

    /// A set of alternatives.
    pub fn any(items: Vec<Value>) -> Self {
        Value::Group {
            kind: GroupKind::Any,
            items,
        }
    }

    /// The empty sequence.
    pub fn empty() -> Self {
        Value::all(Vec::new())
    }

    /// Whether this value nests other values.
    pub fn is_deep(&self) -> bool {
        matches!(self, Value::Group { .. })
    }

    /// Whether this level is an alternatives (`Any`) level.
    pub fn is_alternatives(&self) -> bool {
        matches!(
            self,
            Value::Group {
                kind: GroupKind::Any,
                ..
            } | Value::Ideas {
                kind: GroupKind::Any,
                ..
            }
        )
    }

    pub fn kind(&self) -> GroupKind {
        match self {
            Value::Group { kind, .. } | Value::Ideas { kind, .. } => *kind,
            _ => GroupKind::All,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(t) | Value::Code(t) => t.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Number(_) => false,
            Value::Ideas { ids, .. } => ids.is_empty(),
            Value::Group { items, .. } => items.is_empty(),
        }
    }

    /// Number of elements at this level.
    pub fn len(&self) -> usize {
        match self {
            Value::Text(t) | Value::Code(t) => t.chars().count(),
            Value::Bytes(b) => b.len(),
            Value::Number(_) => 1,
            Value::Ideas { ids, .. } => ids.len(),
            Value::Group { items, .. } => items.len(),
        }
    }

    /// Elements `[start, end)` of this level, keeping the level's kind.
    pub fn slice(&self, start: usize, end: usize) -> Value {
        let end = end.min(self.len());
        let start = start.min(end);
        match self {
            Value::Text(t) => Value::Text(char_slice(t, start, end).to_string()),
            Value::Code(t) => Value::Code(char_slice(t, start, end).to_string()),
            Value::Bytes(b) => Value::Bytes(b[start..end].to_vec()),
            Value::Number(n) => {
                if start == 0 && end == 1 {
                    Value::Number(*n)
                } else {
                    Value::Bytes(Vec::new())
                }
            }
            Value::Ideas { kind, ids } => Value::Ideas {
                kind: *kind,
                ids: ids[start..end].to_vec(),
            },
            Value::Group { kind, items } => Value::Group {
                kind: *kind,
                items: items[start..end].to_vec(),
            },
        }
    }

    pub fn shape(&self) -> Option<Shape> {
        match self {
            Value::Text(_) => Some(Shape::Text),
            Value::Bytes(_) => Some(Shape::Bytes),
            Value::Number(_) => Some(Shape::Number),
            Value::Code(_) => Some(Shape::Code),
            Value::Ideas { .. } => Some(Shape::Ideas),
            Value::Group { .. } => None,
        }
    }

    /// Whether this flat value passes the given filter.
    pub fn matches(&self, filter: Shape) -> bool {
        match filter {
            Shape::Anything => true,
            shape => self.shape() == Some(shape),
        }
    }

    /// The idea handle, if this is exactly one idea.
    pub fn as_idea(&self) -> Option<IdeaId> {
        match self {
            Value::Ideas { ids, .. } if ids.len() == 1 => Some(ids[0]),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Alternate structural decompositions of a flat value.
    ///
    /// A number is also its canonical decimal text; bytes that happen to be
    /// valid UTF-8 are also text.
    pub fn bases(&self) -> Vec<Value> {
        match self {
            Value::Number(n) => vec![Value::Text(format_number(*n))],
            Value::Bytes(b) if !b.is_empty() => match std::str::from_utf8(b) {
                Ok(text) => vec![Value::Text(text.to_string())],
                Err(_) => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Canonical, prefix-preserving byte encoding.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Tag byte and per-element encodings of a text or idea sequence.
    ///
    /// `slice(a, b).encode()` is the tag followed by elements `a..b`.
    pub(crate) fn element_bytes(&self) -> Option<(u8, Vec<Vec<u8>>)> {
        match self {
            Value::Text(t) => Some((
                TAG_TEXT,
                t.chars().map(|c| c.to_string().into_bytes()).collect(),
            )),
            Value::Ideas { kind, ids } => Some((
                match kind {
                    GroupKind::All => TAG_IDEAS_ALL,
                    GroupKind::Any => TAG_IDEAS_ANY,
                },
                ids.iter()
                    .map(|id| (id.index() as u32).to_be_bytes().to_vec())
                    .collect(),
            )),
            _ => None,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Value::Text(t) => {
                out.push(TAG_TEXT);
                out.extend_from_slice(t.as_bytes());
            }
            Value::Bytes(b) => {
                out.push(TAG_BYTES);
                out.extend_from_slice(b);
            }
            Value::Number(n) => {
                out.push(TAG_NUMBER);
                out.extend_from_slice(&canonical_number(*n).to_be_bytes());
            }
            Value::Code(c) => {
                out.push(TAG_CODE);
                out.extend_from_slice(c.as_bytes());
            }
            Value::Ideas { kind, ids } => {
                out.push(match kind {
                    GroupKind::All => TAG_IDEAS_ALL,
                    GroupKind::Any => TAG_IDEAS_ANY,
                });
                for id in ids {
                    out.extend_from_slice(&(id.index() as u32).to_be_bytes());
                }
            }
            Value::Group { kind, items } => {
                out.push(match kind {
                    GroupKind::All => TAG_GROUP_ALL,
                    GroupKind::Any => TAG_GROUP_ANY,
                });
                for item in items {
                    let encoded = item.encode();
                    out.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
                    out.extend_from_slice(&encoded);
                }
            }
        }
    }

    /// Decode a byte path produced by [`Value::encode`].
    ///
    /// Idea handles are re-attached to `ontology`. Paths that end inside an
    /// element (intermediate trie nodes) decode as far as possible; anything
    /// unrecognizable decodes as raw bytes.
    pub fn decode(bytes: &[u8], ontology: OntologyId) -> Value {
        let Some((&tag, payload)) = bytes.split_first() else {
            return Value::Bytes(Vec::new());
        };
        match tag {
            TAG_TEXT => match std::str::from_utf8(payload) {
                Ok(t) => Value::Text(t.to_string()),
                Err(_) => Value::Bytes(payload.to_vec()),
            },
            TAG_CODE => match std::str::from_utf8(payload) {
                Ok(t) => Value::Code(t.to_string()),
                Err(_) => Value::Bytes(payload.to_vec()),
            },
            TAG_BYTES => Value::Bytes(payload.to_vec()),
            TAG_NUMBER => match <[u8; 8]>::try_from(payload) {
                Ok(raw) => Value::Number(f64::from_be_bytes(raw)),
                Err(_) => Value::Bytes(payload.to_vec()),
            },
            TAG_IDEAS_ALL | TAG_IDEAS_ANY => {
                let kind = if tag == TAG_IDEAS_ALL {
                    GroupKind::All
                } else {
                    GroupKind::Any
                };
                let ids = payload
                    .chunks_exact(4)
                    .map(|c| IdeaId::new(ontology, u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                    .collect();
                Value::Ideas { kind, ids }
            }
            TAG_GROUP_ALL | TAG_GROUP_ANY => {
                let kind = if tag == TAG_GROUP_ALL {
                    GroupKind::All
                } else {
                    GroupKind::Any
                };
                let mut items = Vec::new();
                let mut rest = payload;
                while rest.len() >= 4 {
                    let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
                    let body = &rest[4..];
                    let take = len.min(body.len());
                    items.push(Value::decode(&body[..take], ontology));
                    rest = &body[take..];
                }
                Value::Group { kind, items }
            }
            _ => Value::Bytes(bytes.to_vec()),
        }
    }

    /// Collect every idea handle referenced anywhere in this value.
    pub fn idea_handles(&self) -> Vec<IdeaId> {
        let mut out = Vec::new();
        self.visit_ideas(&mut |id| out.push(id));
        out
    }

    fn visit_ideas(&self, f: &mut impl FnMut(IdeaId)) {
        match self {
            Value::Ideas { ids, .. } => ids.iter().copied().for_each(&mut *f),
            Value::Group { items, .. } => items.iter().for_each(|i| i.visit_ideas(f)),
            _ => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<IdeaId> for Value {
    fn from(id: IdeaId) -> Self {
        Value::idea(id)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(t) => write!(f, "{t:?}"),
            Value::Code(c) => write!(f, "`{c}`"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bytes(b) => {
                write!(f, "0x")?;
                b.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
            }
            Value::Ideas { kind, ids } => {
                let sep = separator(*kind);
                let joined: Vec<String> = ids.iter().map(|id| format!("##{id}")).collect();
                if ids.len() == 1 {
                    write!(f, "{}", joined[0])
                } else {
                    write!(f, "[{}]", joined.join(sep))
                }
            }
            Value::Group { kind, items } => {
                let sep = separator(*kind);
                let joined: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "({})", joined.join(sep))
            }
        }
    }
}

fn separator(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::All => ", ",
        GroupKind::Any => " | ",
    }
}

fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
    let from = indices.nth(start).unwrap_or(text.len());
    let to = if end > start {
        indices.nth(end - start - 1).unwrap_or(text.len())
    } else {
        from
    };
    &text[from..to]
}

fn canonical_number(n: f64) -> f64 {
    if n.is_nan() {
        f64::NAN
    } else if n == 0.0 {
        0.0
    } else {
        n
    }
}

/// Decimal text of a number, without a trailing `.0` for integers.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
