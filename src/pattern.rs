//! Pattern builder and graph walker.
//!
//! A [`Pattern`] takes a value apart against an ontology:
//!
//! 1. **Collect** segments the data into subpatterns, each either a known
//!    idea or a still-unknown gap. At every position the biggest known span
//!    is taken; positions where nothing is known are merged into one gap.
//!    Flat data is segmented in a single loop, so the segments of a level
//!    are siblings no matter how long the input is.
//! 2. **Reduce** folds the subpattern tree back into a single idea. Sequences
//!    of reduced ideas become metapatterns, which are segmented again, level
//!    after level, so known sub-sequences are discovered at every level. With
//!    write permission missing ideas are built; without it, reduce only finds.
//! 3. **Resolve** assembles, for each idea in the tree, the hierarchy of its
//!    literal data plus the data of its associations, up to a depth limit.
//! 4. **Gather** walks the resolved hierarchy and keeps the values of a
//!    requested shape found at the shallowest depth.
//!
//! Groups nested deeper than `max_reduce_depth` are handled as one flat value.

use std::collections::BTreeSet;

use crate::code;
use crate::idea::IdeaId;
use crate::ontology::Ontology;
use crate::value::{GroupKind, Shape, Value};

/// One node of a segmentation tree.
#[derive(Debug, Clone)]
pub struct Pattern {
    data: Value,
    depth: usize,
    writable: bool,
    /// Members of a group, or the known and unknown segments of flat data.
    subpatterns: Vec<Pattern>,
    /// Whether subpatterns are a sequence or alternatives.
    sub_kind: GroupKind,
    idea: Option<IdeaId>,
    resolved: Option<Value>,
    /// Segmentation of this level was already attempted.
    scanned: bool,
}

impl Pattern {
    /// A top-level pattern. Writable patterns create ideas while reducing.
    pub fn new(data: Value, writable: bool) -> Self {
        Self {
            data,
            depth: 0,
            writable,
            subpatterns: Vec::new(),
            sub_kind: GroupKind::All,
            idea: None,
            resolved: None,
            scanned: false,
        }
    }

    /// A nested pattern one level below this one.
    fn focus(&self, data: Value) -> Self {
        Self {
            depth: self.depth + 1,
            ..Self::new(data, self.writable)
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn idea(&self) -> Option<IdeaId> {
        self.idea
    }

    pub fn subpatterns(&self) -> &[Pattern] {
        &self.subpatterns
    }

    pub fn sub_kind(&self) -> GroupKind {
        self.sub_kind
    }

    pub fn resolved(&self) -> Option<&Value> {
        self.resolved.as_ref()
    }

    /// Whether anything is known about this pattern.
    pub fn is_valid(&self) -> bool {
        self.idea.is_some() || !self.subpatterns.is_empty()
    }

    // -----------------------------------------------------------------------
    // Collect
    // -----------------------------------------------------------------------

    /// Run one segmentation step and return the largest remaining gap.
    pub fn collect(&mut self, onto: &mut Ontology) -> usize {
        if self.idea.is_some() {
            return 0;
        }
        if let Value::Code(source) = &self.data {
            let parsed = code::parse(source);
            self.data = parsed;
        }

        if !self.subpatterns.is_empty() {
            let mut gap = 0;
            for sub in &mut self.subpatterns {
                gap = gap.max(sub.collect(onto));
            }
            return gap;
        }
        if self.scanned || self.data.is_empty() {
            return 0;
        }
        self.scanned = true;

        if let Some(stranger) = self.data.idea_handles().into_iter().find(|id| !onto.contains(*id)) {
            tracing::warn!(
                ontology = %onto.id(),
                idea = %stranger,
                "cannot resolve idea handle from a different ontology"
            );
            return 0;
        }

        if self.data.is_deep() && self.depth >= onto.config().max_reduce_depth {
            tracing::debug!(depth = self.depth, "group nested too deep, seeking it whole");
            self.inner_seek(onto);
            return 0;
        }
        if let Value::Group { kind, items } = &self.data {
            let kind = *kind;
            let items = items.clone();
            let mut gap = 0;
            for item in items {
                let mut sub = self.focus(item);
                gap = gap.max(sub.collect(onto));
                self.subpatterns.push(sub);
            }
            self.sub_kind = kind;
            tracing::trace!(depth = self.depth, members = self.subpatterns.len(), gap, "collected group");
            return gap;
        }

        if let Some(id) = self.data.as_idea() {
            self.idea = Some(id);
            return 0;
        }
        self.segment(onto)
    }

    /// Collect until no gap remains.
    pub fn collect_all(&mut self, onto: &mut Ontology) {
        let mut gap = self.data.len();
        while gap > 0 {
            gap = self.collect(onto);
        }
    }

    /// Split flat data into its biggest known spans and the unknown runs
    /// between them.
    fn segment(&mut self, onto: &mut Ontology) -> usize {
        let full = self.data.len();
        let elements = self.data.element_bytes();
        let mut segments = Vec::new();
        let mut unknown_from: Option<usize> = None;
        let mut gap = 0;
        let mut start = 0;

        while start < full {
            let Some(found) = self.biggest_at(onto, start, elements.as_ref()) else {
                unknown_from.get_or_insert(start);
                start += 1;
                continue;
            };
            if let Some(from) = unknown_from.take() {
                gap = gap.max(start - from);
                segments.push(self.unknown(from, start));
            }
            start += found.data.len();
            segments.push(found);
        }

        if segments.is_empty() {
            tracing::trace!(depth = self.depth, data = %self.data, "no known part");
            return full;
        }
        if let Some(from) = unknown_from {
            gap = gap.max(full - from);
            segments.push(self.unknown(from, full));
        }
        if let [whole] = segments.as_mut_slice() {
            if whole.data.len() == full {
                self.idea = whole.idea;
                self.subpatterns = std::mem::take(&mut whole.subpatterns);
                return 0;
            }
        }
        tracing::trace!(depth = self.depth, segments = segments.len(), gap, "segmented");
        self.subpatterns = segments;
        self.sub_kind = self.data.kind();
        gap
    }

    /// A run of elements where nothing is known.
    fn unknown(&self, from: usize, to: usize) -> Pattern {
        let mut gap = self.focus(self.data.slice(from, to));
        gap.scanned = true;
        gap
    }

    /// The biggest known span starting at `start`.
    fn biggest_at(
        &self,
        onto: &mut Ontology,
        start: usize,
        elements: Option<&(u8, Vec<Vec<u8>>)>,
    ) -> Option<Pattern> {
        let sizes = match elements {
            Some((tag, elements)) => self.candidate_sizes(onto, *tag, &elements[start..]),
            None => (1..=self.data.len() - start).collect(),
        };

        let mut biggest = None;
        for size in sizes {
            let mut sub = self.focus(self.data.slice(start, start + size));
            sub.scanned = true;
            if sub.inner_seek(onto).is_some() {
                biggest = Some(sub);
                continue;
            }
            if let Some(alternate) = sub.alternate(onto) {
                sub.subpatterns.push(alternate);
                biggest = Some(sub);
            }
        }
        biggest
    }

    /// Span sizes after which a stored trie path ends, found by walking the
    /// trie once along the remaining elements.
    fn candidate_sizes(&self, onto: &Ontology, tag: u8, elements: &[Vec<u8>]) -> Vec<usize> {
        let mut sizes = BTreeSet::new();
        if matches!(self.data, Value::Ideas { .. }) {
            sizes.insert(1);
        }
        walk(onto, tag, b"", elements, false, &mut sizes);
        if onto.config().isolate_text && matches!(self.data, Value::Text(_)) {
            let lead: &[u8] = match elements.first() {
                Some(first) if first.as_slice() == b" " => b"",
                _ => b" ",
            };
            walk(onto, tag, lead, elements, true, &mut sizes);
        }
        sizes.into_iter().collect()
    }

    /// The first alternate decomposition of this data that is known.
    fn alternate(&self, onto: &mut Ontology) -> Option<Pattern> {
        self.data.bases().into_iter().find_map(|base| {
            let mut candidate = self.focus(base);
            candidate.collect(onto);
            candidate.is_valid().then_some(candidate)
        })
    }

    /// Seek this pattern's data as a whole.
    fn inner_seek(&mut self, onto: &mut Ontology) -> Option<IdeaId> {
        if let Some(id) = self.data.as_idea() {
            if onto.contains(id) {
                self.idea = Some(id);
                return self.idea;
            }
        }
        if self.data.is_empty() || self.data.idea_handles().iter().any(|id| !onto.contains(*id)) {
            return None;
        }

        self.idea = onto.seek(&self.data.encode());
        if self.idea.is_none() && onto.config().isolate_text {
            if let Value::Text(text) = &self.data {
                let isolated = isolate(text);
                if isolated != *text {
                    self.idea = onto.seek(&Value::Text(isolated).encode());
                }
            }
        }
        if let Some(id) = self.idea {
            tracing::trace!(depth = self.depth, idea = %id, data = %self.data, "found");
        }
        self.idea
    }

    // -----------------------------------------------------------------------
    // Build / Reduce
    // -----------------------------------------------------------------------

    /// Build this pattern's data as one idea, plus its alternate
    /// decompositions, associated with it.
    pub fn build(&mut self, onto: &mut Ontology) -> Option<IdeaId> {
        let idea = self.inner_build(onto)?;
        for base in self.data.bases() {
            let mut alternate = self.focus(base);
            alternate.collect_all(onto);
            if let Some(found) = alternate.reduce(onto) {
                link(onto, idea, found);
            }
        }
        Some(idea)
    }

    fn inner_build(&mut self, onto: &mut Ontology) -> Option<IdeaId> {
        self.idea = match self.data.as_idea() {
            Some(id) if onto.contains(id) => Some(id),
            _ => onto.build_flat(&self.data),
        };
        self.idea
    }

    /// Fold the collected tree into a single idea.
    pub fn reduce(&mut self, onto: &mut Ontology) -> Option<IdeaId> {
        if self.idea.is_some() {
            return self.idea;
        }
        let flat = !self.data.is_deep() || self.depth >= onto.config().max_reduce_depth;
        let built = self.writable && flat;
        if built {
            self.build(onto);
        }

        let reduced = match self.subpatterns.len() {
            0 => return self.idea,
            1 => self.subpatterns[0].reduce(onto),
            _ => self.reduce_sequence(onto),
        };

        if built {
            if let (Some(own), Some(found)) = (self.idea, reduced) {
                link(onto, own, found);
            }
        } else {
            self.idea = reduced;
        }
        tracing::trace!(depth = self.depth, idea = ?self.idea, "reduced");
        self.idea
    }

    /// Reduce every subpattern, then fold the sequence of their ideas.
    ///
    /// The sequence is segmented again as a metapattern, and the segments of
    /// that are folded the same way, until the sequence stops shrinking. In
    /// write mode every metapattern level is built and linked to the next.
    fn reduce_sequence(&mut self, onto: &mut Ontology) -> Option<IdeaId> {
        let limit = onto.config().max_reduce_depth;
        let mut ids = reduce_members(&mut self.subpatterns, self.writable, onto)?;
        let mut data = self.data.clone();
        let mut depth = self.depth;
        let mut outer: Option<IdeaId> = None;
        let mut latest: Option<IdeaId> = None;

        let reduced = loop {
            if ids.len() == 1 {
                break Some(ids[0]);
            }
            let sequence = Value::ideas(self.sub_kind, ids);
            if sequence == data || depth >= limit {
                break if self.writable {
                    onto.build_flat(&sequence)
                } else {
                    onto.find_value(&sequence)
                };
            }

            depth += 1;
            let mut meta = Pattern {
                depth,
                ..Pattern::new(sequence.clone(), self.writable)
            };
            meta.collect_all(onto);
            if self.writable {
                let own = meta.build(onto);
                if let (Some(previous), Some(own)) = (latest, own) {
                    link(onto, previous, own);
                }
                outer = outer.or(own);
                latest = own.or(latest);
            }
            if meta.subpatterns.is_empty() {
                break meta.idea;
            }
            ids = reduce_members(&mut meta.subpatterns, self.writable, onto)?;
            data = sequence;
        };

        if let (Some(previous), Some(found)) = (latest, reduced) {
            link(onto, previous, found);
        }
        outer.or(reduced)
    }

    // -----------------------------------------------------------------------
    // Resolve / Gather
    // -----------------------------------------------------------------------

    /// Assemble the data reachable from every idea of the tree.
    pub fn resolve(&mut self, onto: &Ontology, limit: usize) {
        if self.resolved.is_some() {
            return;
        }
        let mut bag = vec![self.data.clone()];
        if self.subpatterns.is_empty() {
            if let Some(id) = self.idea {
                let mut visited = BTreeSet::new();
                if let Some(assembled) = assemble_data(onto, 0, limit, &Value::idea(id), &mut visited) {
                    bag.push(Value::all(vec![assembled]));
                }
            }
        } else {
            for sub in &mut self.subpatterns {
                sub.resolve(onto, limit);
            }
        }
        self.resolved = Some(Value::all(bag));
    }

    /// Gather data of a shape from this pattern, returning the depth at which
    /// it was found. Without a filter everything is returned at depth zero.
    pub fn gather(&self, filter: Option<Shape>, output: &mut Vec<Value>) -> Option<usize> {
        let filter = match filter {
            None | Some(Shape::Anything) => {
                output.push(self.data.clone());
                if let Some(resolved) = &self.resolved {
                    output.push(resolved.clone());
                }
                return Some(0);
            }
            Some(shape) => shape,
        };
        if !self.data.is_empty() && self.data.matches(filter) {
            output.push(self.data.clone());
            return Some(0);
        }

        let resolved = self.resolved.as_ref()?;
        let mut limit = None;
        let mut local = Vec::new();
        let depth = inner_gather(resolved, 0, &mut limit, filter, &mut local);
        output.extend(local);
        depth
    }

    fn inner_interpret(&self, filter: Option<Shape>, output: &mut Vec<Value>) -> Option<usize> {
        let mut depth = self.gather(filter, output);
        if self.subpatterns.is_empty() {
            return depth;
        }

        if self.sub_kind == GroupKind::Any {
            let mut branches = Vec::new();
            for sub in &self.subpatterns {
                let mut local = Vec::new();
                if let Some(found) = sub.gather(filter, &mut local) {
                    if !local.is_empty() {
                        branches.push(pack(local));
                        depth = shallower(depth, Some(found));
                    }
                }
            }
            if !branches.is_empty() {
                output.push(Value::any(branches));
            }
        } else {
            for sub in &self.subpatterns {
                depth = shallower(depth, sub.inner_interpret(filter, output));
            }
        }
        depth
    }

    /// Collect, resolve to `limit`, then gather data of the requested shape
    /// for every part of the pattern.
    pub fn interpret(
        &mut self,
        onto: &mut Ontology,
        filter: Option<Shape>,
        limit: usize,
        output: &mut Vec<Value>,
    ) -> Option<usize> {
        self.collect_all(onto);
        self.resolve(onto, limit);
        self.inner_interpret(filter, output)
    }

    /// Collect, then flatten into the most reduced value: known ideas as
    /// handles, alternatives grouped, raw data for unknown spans.
    pub fn compile(&mut self, onto: &mut Ontology) -> Value {
        self.collect_all(onto);
        self.inner_compile()
    }

    fn inner_compile(&self) -> Value {
        if let Some(id) = self.idea {
            return Value::idea(id);
        }
        if self.subpatterns.is_empty() {
            return self.data.clone();
        }
        let items: Vec<Value> = self.subpatterns.iter().map(Pattern::inner_compile).collect();
        if self.sub_kind == GroupKind::Any {
            return Value::any(items);
        }
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Group {
                    kind: GroupKind::All,
                    items,
                } => flat.extend(items),
                other => flat.push(other),
            }
        }
        pack(flat)
    }
}

/// Assemble the literal data of ideas, together with the data of their
/// associations one level deeper, down to `limit`.
///
/// Each idea contributes `[literal, [associations...]]`. Ideas already in
/// `visited` are skipped, so cyclic association meshes terminate.
pub fn assemble_data(
    onto: &Ontology,
    depth: usize,
    limit: usize,
    input: &Value,
    visited: &mut BTreeSet<IdeaId>,
) -> Option<Value> {
    if depth > limit {
        return None;
    }
    match input {
        Value::Group { kind, items } => {
            let local: Vec<Value> = items
                .iter()
                .filter_map(|item| assemble_data(onto, depth, limit, item, visited))
                .collect();
            (!local.is_empty()).then(|| Value::Group { kind: *kind, items: local })
        }
        Value::Ideas { kind, ids } => {
            let mut entries = Vec::new();
            for &id in ids {
                let Some(idea) = onto.get(id) else {
                    continue;
                };
                if !visited.insert(id) {
                    continue;
                }
                tracing::trace!(depth, idea = %id, "assembling");

                let mut parts = Vec::new();
                if let Some(literal) = assemble_data(onto, depth, limit, &onto.deserialize(id), visited) {
                    parts.push(literal);
                }
                if !idea.associations().is_empty() {
                    let links = Value::ideas(GroupKind::All, idea.associations().iter().copied().collect());
                    if let Some(linked) = assemble_data(onto, depth + 1, limit, &links, visited) {
                        parts.push(Value::all(vec![linked]));
                    }
                }
                if !parts.is_empty() {
                    entries.push(pack(parts));
                }
            }
            match (kind, entries.len()) {
                (_, 0) => None,
                (GroupKind::All, 1) => entries.pop(),
                (kind, _) => Some(Value::Group { kind: *kind, items: entries }),
            }
        }
        flat => (!flat.is_empty()).then(|| flat.clone()),
    }
}

/// Gather values matching `filter`, keeping only the shallowest matches.
///
/// Sequences go one level deeper; alternatives stay at the same depth and are
/// gathered per branch. Returns the depth of the kept matches.
pub fn inner_gather(
    input: &Value,
    depth: usize,
    limit: &mut Option<usize>,
    filter: Shape,
    output: &mut Vec<Value>,
) -> Option<usize> {
    if limit.is_some_and(|l| depth > l) {
        return None;
    }
    match input {
        Value::Group {
            kind: GroupKind::Any,
            items,
        } => {
            let before = *limit;
            let mut branches: Vec<(usize, Value)> = Vec::new();
            for item in items {
                let mut local = Vec::new();
                if let Some(found) = inner_gather(item, depth, limit, filter, &mut local) {
                    if !local.is_empty() {
                        branches.push((found, pack(local)));
                    }
                }
            }
            let best = branches.iter().map(|(d, _)| *d).min()?;
            if before.is_none_or(|b| best < b) {
                output.clear();
            }
            let mut kept: Vec<Value> = branches
                .into_iter()
                .filter(|(d, _)| *d == best)
                .map(|(_, v)| v)
                .collect();
            if kept.len() == 1 {
                // Alternatives where only one branch matched: "this, or nothing".
                kept.push(Value::empty());
            }
            output.push(Value::any(kept));
            Some(best)
        }
        Value::Group { items, .. } => {
            let mut best = None;
            for item in items {
                best = shallower(best, inner_gather(item, depth + 1, limit, filter, output));
            }
            best
        }
        flat => {
            if flat.is_empty() || !flat.matches(filter) {
                return None;
            }
            if limit.is_none_or(|l| depth < l) {
                output.clear();
                *limit = Some(depth);
            }
            output.push(flat.clone());
            Some(depth)
        }
    }
}

fn shallower(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// A single value as-is, several as a sequence.
fn pack(mut items: Vec<Value>) -> Value {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Value::all(items)
    }
}

fn isolate(text: &str) -> String {
    let mut isolated = String::with_capacity(text.len() + 2);
    if !text.starts_with(' ') {
        isolated.push(' ');
    }
    isolated.push_str(text);
    if !text.ends_with(' ') {
        isolated.push(' ');
    }
    isolated
}

/// Reduce each member to its idea. A read-only sequence with any unknown
/// member is unknown as a whole.
fn reduce_members(
    members: &mut [Pattern],
    writable: bool,
    onto: &mut Ontology,
) -> Option<Vec<IdeaId>> {
    let mut ids = Vec::with_capacity(members.len());
    for member in members.iter_mut() {
        match member.reduce(onto) {
            Some(id) => ids.push(id),
            None if writable => {}
            None => return None,
        }
    }
    (!ids.is_empty()).then_some(ids)
}

/// Walk the trie along `tag`, `lead` and then `elements`, recording every
/// element count after which a stored path ends. With `closing`, a path
/// that ends after one more space counts too.
fn walk(
    onto: &Ontology,
    tag: u8,
    lead: &[u8],
    elements: &[Vec<u8>],
    closing: bool,
    sizes: &mut BTreeSet<usize>,
) {
    let mut cursor = onto.cursor();
    if !std::iter::once(&tag)
        .chain(lead)
        .all(|b| onto.advance(&mut cursor, *b))
    {
        return;
    }
    for (i, element) in elements.iter().enumerate() {
        if !element.iter().all(|b| onto.advance(&mut cursor, *b)) {
            return;
        }
        let ends = if closing && element.as_slice() != b" " {
            let mut spaced = cursor;
            onto.advance(&mut spaced, b' ') && onto.landed(&spaced).is_some()
        } else {
            onto.landed(&cursor).is_some()
        };
        if ends {
            sizes.insert(i + 1);
        }
    }
}

fn link(onto: &mut Ontology, a: IdeaId, b: IdeaId) {
    if a == b {
        return;
    }
    if let Err(e) = onto.associate(a, b) {
        tracing::warn!(error = %e, "could not associate reduced ideas");
    }
}

#[cfg(test)]
mod tests {
    use crate::config::OntologyConfig;

    use super::*;

    fn onto() -> Ontology {
        Ontology::new("pattern", OntologyConfig::default())
    }

    fn word(o: &mut Ontology, w: &str) -> IdeaId {
        o.build_text(w).unwrap()
    }

    fn texts(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Text(t) => out.push(t.clone()),
            Value::Group { items, .. } => items.iter().for_each(|i| texts(i, out)),
            _ => {}
        }
    }

    #[test]
    fn collect_finds_biggest_known_prefix() {
        let mut o = onto();
        let a = word(&mut o, "a");
        let b = word(&mut o, "b");
        let c = word(&mut o, "c");
        let ab = o
            .build(&Value::all(vec![Value::text("a"), Value::text("b")]), false)
            .unwrap();

        let mut p = Pattern::new(Value::ideas(GroupKind::All, vec![a, b, c]), false);
        p.collect_all(&mut o);
        assert_eq!(p.subpatterns().len(), 2);
        assert_eq!(p.subpatterns()[0].idea(), Some(ab));
        assert_eq!(p.subpatterns()[1].idea(), Some(c));
    }

    #[test]
    fn read_only_reduce_of_unknown_sequence_is_none() {
        let mut o = onto();
        let a = word(&mut o, "a");
        let c = word(&mut o, "c");
        let before = o.len();
        let mut p = Pattern::new(Value::ideas(GroupKind::All, vec![a, c]), false);
        p.collect_all(&mut o);
        assert!(p.reduce(&mut o).is_none());
        assert_eq!(o.len(), before);
    }

    #[test]
    fn writable_reduce_links_known_subsequences() {
        let mut o = onto();
        o.build(&Value::all(vec![Value::text("a"), Value::text("b")]), false)
            .unwrap();
        let whole = o
            .build(
                &Value::all(vec![Value::text("a"), Value::text("b"), Value::text("c")]),
                true,
            )
            .unwrap();
        let ab = o.recall(&Value::all(vec![Value::text("a"), Value::text("b")])).unwrap();
        let c = o.recall(&Value::text("c")).unwrap();
        let meta = o
            .find_value(&Value::ideas(GroupKind::All, vec![ab, c]))
            .unwrap();
        assert!(o.equal(whole, meta));
    }

    #[test]
    fn isolated_words_are_found() {
        let mut o = onto();
        let cat = word(&mut o, " cat ");
        assert_eq!(o.recall(&Value::text("cat")), Some(cat));

        let strict = OntologyConfig {
            isolate_text: false,
            ..OntologyConfig::default()
        };
        let mut o = Ontology::new("strict", strict);
        word(&mut o, " cat ");
        assert_eq!(o.recall(&Value::text("cat")), None);
    }

    #[test]
    fn unknown_prefix_becomes_a_gap() {
        let mut o = onto();
        let cat = word(&mut o, "cat");
        let mut p = Pattern::new(Value::text("xxcat"), false);
        let compiled = p.compile(&mut o);
        assert_eq!(compiled, Value::all(vec![Value::text("xx"), Value::idea(cat)]));
        assert!(p.reduce(&mut o).is_none());
    }

    #[test]
    fn long_text_is_segmented_flat() {
        let mut o = onto();
        word(&mut o, "a");
        word(&mut o, "b");
        let before = o.len();
        let mut p = Pattern::new(Value::text("ab".repeat(1500)), false);
        p.collect_all(&mut o);
        assert_eq!(p.subpatterns().len(), 3000);
        assert!(p.subpatterns().iter().all(|s| s.idea().is_some() && s.depth() == 1));
        assert!(p.reduce(&mut o).is_none());
        assert_eq!(o.len(), before);
    }

    #[test]
    fn unknown_runs_merge_into_one_gap() {
        let mut o = onto();
        let cat = word(&mut o, "cat");
        let mut p = Pattern::new(Value::text("xycatzz"), false);
        let compiled = p.compile(&mut o);
        assert_eq!(
            compiled,
            Value::all(vec![Value::text("xy"), Value::idea(cat), Value::text("zz")])
        );
    }

    #[test]
    fn wide_group_builds_and_recalls() {
        let mut o = onto();
        let group = Value::all((0..2000).map(|n| Value::text(format!("w{n}"))).collect());
        let built = o.build(&group, true).unwrap();
        assert_eq!(o.recall(&group), Some(built));
    }

    #[test]
    fn foreign_handles_are_not_collected() {
        let mut home = onto();
        let big = word(&mut home, "big");
        let dog = word(&mut home, "dog");
        home.build(&Value::ideas(GroupKind::All, vec![big, dog]), true)
            .unwrap();

        let mut away = Ontology::new("away", OntologyConfig::default());
        let far_big = word(&mut away, "big");
        let far_dog = word(&mut away, "dog");

        let mut p = Pattern::new(Value::ideas(GroupKind::All, vec![far_big, far_dog]), false);
        p.collect_all(&mut home);
        assert!(!p.is_valid());
        assert!(p.reduce(&mut home).is_none());

        let mut out = Vec::new();
        let mut p = Pattern::new(Value::idea(far_big), false);
        p.interpret(&mut home, Some(Shape::Text), 4, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn numbers_fall_back_to_their_text() {
        let mut o = onto();
        let one = word(&mut o, "1");
        assert_eq!(o.recall(&Value::Number(1.0)), Some(one));
    }

    #[test]
    fn code_is_parsed_before_collect() {
        let mut o = onto();
        let built = o.build(&Value::code("(big dog)"), true).unwrap();
        let found = o.recall(&Value::code("Big   Dog")).unwrap();
        assert_eq!(built, found);
    }

    #[test]
    fn interpret_gathers_shallowest_shape() {
        let mut o = onto();
        let cat = word(&mut o, "cat");
        let feline = word(&mut o, "feline");
        let four = o.build_flat(&Value::Number(4.0)).unwrap();
        let nine = o.build_flat(&Value::Number(9.0)).unwrap();
        o.associate(cat, feline).unwrap();
        o.associate(cat, four).unwrap();
        o.associate(feline, nine).unwrap();

        let mut p = Pattern::new(Value::text("cat"), false);
        let mut out = Vec::new();
        let depth = p.interpret(&mut o, Some(Shape::Number), 8, &mut out);
        assert!(depth.is_some());
        assert_eq!(out, vec![Value::Number(4.0)]);
    }

    #[test]
    fn gather_without_filter_returns_everything() {
        let mut o = onto();
        word(&mut o, "cat");
        let mut p = Pattern::new(Value::text("cat"), false);
        p.collect_all(&mut o);
        p.resolve(&o, 4);
        let mut out = Vec::new();
        assert_eq!(p.gather(None, &mut out), Some(0));
        assert_eq!(out[0], Value::text("cat"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn gather_prefers_matching_data() {
        let p = Pattern::new(Value::text("here"), false);
        let mut out = Vec::new();
        assert_eq!(p.gather(Some(Shape::Text), &mut out), Some(0));
        assert_eq!(out, vec![Value::text("here")]);
    }

    #[test]
    fn shallower_matches_replace_deeper_ones() {
        let input = Value::all(vec![
            Value::Number(1.0),
            Value::all(vec![Value::all(vec![Value::text("deep")])]),
            Value::text("shallow"),
        ]);
        let mut limit = None;
        let mut out = Vec::new();
        let depth = inner_gather(&input, 0, &mut limit, Shape::Text, &mut out);
        assert_eq!(depth, Some(1));
        assert_eq!(out, vec![Value::text("shallow")]);
    }

    #[test]
    fn single_matching_alternative_is_padded() {
        let input = Value::any(vec![Value::text("a"), Value::Number(1.0)]);
        let mut limit = None;
        let mut out = Vec::new();
        inner_gather(&input, 0, &mut limit, Shape::Text, &mut out);
        assert_eq!(out, vec![Value::any(vec![Value::text("a"), Value::empty()])]);
    }

    #[test]
    fn assemble_respects_depth_limit() {
        let mut o = onto();
        let ids: Vec<IdeaId> = ["alpha", "beta", "gamma", "delta"]
            .iter()
            .map(|w| word(&mut o, w))
            .collect();
        for pair in ids.windows(2) {
            o.associate(pair[0], pair[1]).unwrap();
        }
        let mut visited = BTreeSet::new();
        let assembled = assemble_data(&o, 0, 1, &Value::idea(ids[0]), &mut visited).unwrap();
        let mut found = Vec::new();
        texts(&assembled, &mut found);
        assert_eq!(found, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn assemble_terminates_on_cycles() {
        let mut o = onto();
        let a = word(&mut o, "rock");
        let b = word(&mut o, "stone");
        let c = word(&mut o, "pebble");
        o.associate(a, b).unwrap();
        o.associate(b, c).unwrap();
        o.associate(c, a).unwrap();
        let mut visited = BTreeSet::new();
        let assembled = assemble_data(&o, 0, usize::MAX - 1, &Value::idea(a), &mut visited).unwrap();
        let mut found = Vec::new();
        texts(&assembled, &mut found);
        found.sort();
        assert_eq!(found, vec!["pebble", "rock", "stone"]);
    }
}
