//! Order-insensitive structural diff

use crate::node::Node;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// One step of a [`DiffPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a difference inside a body
///
/// Renders as `$` for the root, `$.key` for map entries and `$[2]` for list
/// items. List indices refer to the baseline list, except for
/// [`DiffCategory::ItemAdded`] where they refer to the candidate list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiffPath(Vec<PathSegment>);

impl DiffPath {
    /// The root of a body
    pub fn root() -> Self {
        Self::default()
    }

    /// Child path for a map key
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    /// Child path for a list index
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for DiffPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) if is_plain_key(key) => write!(f, ".{}", key)?,
                PathSegment::Key(key) => write!(f, "[{}]", Value::String(key.clone()))?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffCategory {
    /// Same type, different scalar value
    ValueChanged,
    /// Different node kinds at the same path
    TypeChanged,
    /// Key present only in the candidate
    KeyAdded,
    /// Key present only in the baseline
    KeyRemoved,
    /// List item present only in the candidate
    ItemAdded,
    /// List item present only in the baseline
    ItemRemoved,
}

impl fmt::Display for DiffCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffCategory::ValueChanged => write!(f, "VALUE"),
            DiffCategory::TypeChanged => write!(f, "TYPE"),
            DiffCategory::KeyAdded => write!(f, "EXTRA"),
            DiffCategory::KeyRemoved => write!(f, "MISSING"),
            DiffCategory::ItemAdded => write!(f, "ADDED"),
            DiffCategory::ItemRemoved => write!(f, "REMOVED"),
        }
    }
}

/// A specific difference between two bodies
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub category: DiffCategory,
    pub path: DiffPath,
    /// Value on the baseline side, absent for additions
    pub baseline: Option<Node>,
    /// Value on the candidate side, absent for removals
    pub candidate: Option<Node>,
}

impl Difference {
    fn changed(category: DiffCategory, path: DiffPath, baseline: &Node, candidate: &Node) -> Self {
        Self {
            category,
            path,
            baseline: Some(baseline.clone()),
            candidate: Some(candidate.clone()),
        }
    }

    fn removed(category: DiffCategory, path: DiffPath, baseline: &Node) -> Self {
        Self {
            category,
            path,
            baseline: Some(baseline.clone()),
            candidate: None,
        }
    }

    fn added(category: DiffCategory, path: DiffPath, candidate: &Node) -> Self {
        Self {
            category,
            path,
            baseline: None,
            candidate: Some(candidate.clone()),
        }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |side: &Option<Node>| match side {
            Some(node) => node.to_string(),
            None => "(missing)".to_string(),
        };
        write!(
            f,
            "[{:>7}] {} : baseline={} candidate={}",
            self.category,
            self.path,
            show(&self.baseline),
            show(&self.candidate)
        )
    }
}

/// Every difference found between two bodies
///
/// Empty exactly when the bodies are equivalent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffSet {
    differences: Vec<Difference>,
}

impl DiffSet {
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Difference> {
        self.differences.iter()
    }

    /// Paths of all differences, in report order
    pub fn paths(&self) -> Vec<&DiffPath> {
        self.differences.iter().map(|d| &d.path).collect()
    }
}

impl fmt::Display for DiffSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, difference) in self.differences.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", difference)?;
        }
        Ok(())
    }
}

impl IntoIterator for DiffSet {
    type Item = Difference;
    type IntoIter = std::vec::IntoIter<Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.differences.into_iter()
    }
}

impl<'a> IntoIterator for &'a DiffSet {
    type Item = &'a Difference;
    type IntoIter = std::slice::Iter<'a, Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.differences.iter()
    }
}

/// Compare two bodies, ignoring the order of list elements
pub fn diff(baseline: &Node, candidate: &Node) -> DiffSet {
    let mut differences = Vec::new();
    diff_node(&DiffPath::root(), baseline, candidate, &mut differences);
    DiffSet { differences }
}

/// Compare two `serde_json` values, ignoring the order of list elements
pub fn diff_values(baseline: &Value, candidate: &Value) -> DiffSet {
    diff(&Node::from(baseline), &Node::from(candidate))
}

fn diff_node(path: &DiffPath, baseline: &Node, candidate: &Node, out: &mut Vec<Difference>) {
    match (baseline, candidate) {
        (Node::Map(base_entries), Node::Map(cand_entries)) => {
            for (key, base_value) in base_entries {
                match cand_entries.get(key) {
                    Some(cand_value) => diff_node(&path.key(key), base_value, cand_value, out),
                    None => out.push(Difference::removed(
                        DiffCategory::KeyRemoved,
                        path.key(key),
                        base_value,
                    )),
                }
            }
            for (key, cand_value) in cand_entries {
                if !base_entries.contains_key(key) {
                    out.push(Difference::added(
                        DiffCategory::KeyAdded,
                        path.key(key),
                        cand_value,
                    ));
                }
            }
        }
        (Node::List(base_items), Node::List(cand_items)) => {
            diff_list(path, base_items, cand_items, out);
        }
        _ if baseline.kind() != candidate.kind() => {
            out.push(Difference::changed(
                DiffCategory::TypeChanged,
                path.clone(),
                baseline,
                candidate,
            ));
        }
        _ if baseline != candidate => {
            out.push(Difference::changed(
                DiffCategory::ValueChanged,
                path.clone(),
                baseline,
                candidate,
            ));
        }
        _ => {}
    }
}

/// Candidates fully diffed against each unmatched baseline item
const PAIRING_CANDIDATES: usize = 8;

/// Leaf values shared by more leftover items than this do not rank candidates
const MAX_FEATURE_HOLDERS: usize = 64;

/// Multiset comparison of two lists
///
/// Equivalent items are cancelled first. Each leftover baseline item is then
/// diffed against at most [`PAIRING_CANDIDATES`] leftovers of the same kind,
/// ranked by how many leaf values they share, and paired with the one giving
/// the fewest nested differences. Whatever cannot be paired is reported as
/// removed or added.
fn diff_list(path: &DiffPath, base_items: &[Node], cand_items: &[Node], out: &mut Vec<Difference>) {
    let mut cand_by_print: HashMap<String, Vec<usize>> = HashMap::new();
    for (j, item) in cand_items.iter().enumerate().rev() {
        cand_by_print.entry(item.fingerprint()).or_default().push(j);
    }

    let mut base_left = Vec::new();
    for (i, item) in base_items.iter().enumerate() {
        let matched = cand_by_print
            .get_mut(&item.fingerprint())
            .and_then(|indices| indices.pop());
        if matched.is_none() {
            base_left.push(i);
        }
    }

    let mut cand_left: Vec<usize> = cand_by_print.into_values().flatten().collect();
    cand_left.sort_unstable();
    let mut pairing = Pairing::new(cand_items, cand_left);

    for i in base_left {
        let base_item = &base_items[i];
        let item_path = path.index(i);

        let mut best: Option<(usize, Vec<Difference>)> = None;
        for j in pairing.candidates(base_item) {
            let cand_item = &cand_items[j];
            let mut nested = Vec::new();
            diff_node(&item_path, base_item, cand_item, &mut nested);
            if base_item.is_container()
                && nested.len() > base_item.leaf_count().max(cand_item.leaf_count())
            {
                continue;
            }
            if best.as_ref().map_or(true, |(_, b)| nested.len() < b.len()) {
                best = Some((j, nested));
            }
        }

        match best {
            Some((j, nested)) => {
                pairing.take(j);
                out.extend(nested);
            }
            None => out.push(Difference::removed(
                DiffCategory::ItemRemoved,
                item_path,
                base_item,
            )),
        }
    }

    for j in pairing.remaining() {
        out.push(Difference::added(
            DiffCategory::ItemAdded,
            path.index(j),
            &cand_items[j],
        ));
    }
}

/// Unmatched candidate items, indexed by their leaf values
struct Pairing<'a> {
    items: &'a [Node],
    /// Leftover indices in list order
    open: Vec<usize>,
    taken: Vec<bool>,
    /// First position in `open` that may still be untaken
    cursor: usize,
    holders: HashMap<String, Vec<usize>>,
}

impl<'a> Pairing<'a> {
    fn new(items: &'a [Node], open: Vec<usize>) -> Self {
        let mut holders: HashMap<String, Vec<usize>> = HashMap::new();
        for &j in &open {
            for feature in leaf_features(&items[j]) {
                holders.entry(feature).or_default().push(j);
            }
        }
        Self {
            items,
            open,
            taken: vec![false; items.len()],
            cursor: 0,
            holders,
        }
    }

    /// Untaken items of the same kind, most shared leaf values first
    ///
    /// Falls back to the earliest untaken items in list order when no
    /// candidate shares a distinctive leaf value.
    fn candidates(&mut self, item: &Node) -> Vec<usize> {
        let kind = item.kind();
        let mut votes: HashMap<usize, usize> = HashMap::new();
        for feature in leaf_features(item) {
            let Some(holders) = self.holders.get(&feature) else {
                continue;
            };
            if holders.len() > MAX_FEATURE_HOLDERS {
                continue;
            }
            for &j in holders {
                if !self.taken[j] && self.items[j].kind() == kind {
                    *votes.entry(j).or_default() += 1;
                }
            }
        }

        if !votes.is_empty() {
            let mut ranked: Vec<(usize, usize)> = votes.into_iter().collect();
            ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            return ranked
                .into_iter()
                .take(PAIRING_CANDIDATES)
                .map(|(j, _)| j)
                .collect();
        }

        while self.cursor < self.open.len() && self.taken[self.open[self.cursor]] {
            self.cursor += 1;
        }
        self.open[self.cursor..]
            .iter()
            .copied()
            .filter(|&j| !self.taken[j] && self.items[j].kind() == kind)
            .take(PAIRING_CANDIDATES)
            .collect()
    }

    fn take(&mut self, j: usize) {
        self.taken[j] = true;
    }

    fn remaining(&self) -> impl Iterator<Item = usize> + '_ {
        self.open.iter().copied().filter(|&j| !self.taken[j])
    }
}

/// Every scalar leaf of a node, keyed by its relative location
///
/// List positions are dropped from the location, so the features of an item
/// do not depend on list order.
fn leaf_features(node: &Node) -> Vec<String> {
    let mut features = Vec::new();
    collect_features(node, &mut String::new(), &mut features);
    features.sort_unstable();
    features.dedup();
    features
}

fn collect_features(node: &Node, location: &mut String, out: &mut Vec<String>) {
    let len = location.len();
    match node {
        Node::Map(entries) => {
            for (key, value) in entries {
                location.push('.');
                location.push_str(&Value::String(key.clone()).to_string());
                collect_features(value, location, out);
                location.truncate(len);
            }
        }
        Node::List(items) => {
            location.push_str("[]");
            for item in items {
                collect_features(item, location, out);
            }
            location.truncate(len);
        }
        leaf => out.push(format!("{}={}", location, leaf.fingerprint())),
    }
}
