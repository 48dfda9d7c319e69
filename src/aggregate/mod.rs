//! Hierarchical aggregation of allele observations.
//!
//! An [`AggregateTree`] groups the alleles of one entry by a list of
//! attribute selectors (allele sequence, sample, strand, ...). Rather than
//! nesting maps, the tree is stored flat: each leaf is keyed by the tuple of
//! selector values on its path, in selector order. [`divide`] and [`zip`]
//! combine a deep tree with a shallower one by projecting every deep key onto
//! the shallow tree's selectors.

use std::collections::{BTreeMap, BTreeSet};

use crate::track::{Allele, TrackEntry};

/// Allele attribute used as a grouping level.
///
/// Index `0` is the allele sequence, index `i` is tag `i - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute(pub usize);

impl Attribute {
    /// The allele sequence.
    pub const ALLELE: Self = Self(0);
    /// The sample label (first tag).
    pub const SAMPLE: Self = Self(1);
    /// The strand label (second tag).
    pub const STRAND: Self = Self(2);

    /// Tag at zero-based position `index`.
    pub const fn tag(index: usize) -> Self {
        Self(index + 1)
    }

    /// Value of this attribute on `allele`.
    pub fn of<'a>(&self, allele: &'a Allele) -> Option<&'a str> {
        allele.attribute(self.0)
    }
}

/// Counter field addressed by filters, [`divide`] and [`zip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Field {
    /// Number of alleles.
    Count,
    /// Summed depth.
    Depth,
    /// Summed quality.
    Quality,
}

/// Leaf of an aggregation: totals over the alleles reaching it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Counter {
    /// Number of alleles.
    pub count: u64,
    /// Summed depth.
    pub depth: u64,
    /// Summed quality.
    pub quality: u64,
}

impl Counter {
    /// Add one allele to the totals.
    pub fn observe(&mut self, allele: &Allele) {
        self.count = self.count.saturating_add(1);
        self.depth = self.depth.saturating_add(allele.depth);
        self.quality = self.quality.saturating_add(allele.quality);
    }

    /// Value of `field`.
    pub fn get(&self, field: Field) -> u64 {
        match field {
            Field::Count => self.count,
            Field::Depth => self.depth,
            Field::Quality => self.quality,
        }
    }
}

/// Leaves keyed by their path of selector values.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTree<L = Counter> {
    selectors: Vec<Attribute>,
    leaves: BTreeMap<Vec<String>, L>,
}

impl<L> AggregateTree<L> {
    fn empty(selectors: &[Attribute]) -> Self {
        Self {
            selectors: selectors.to_vec(),
            leaves: BTreeMap::new(),
        }
    }

    /// Grouping levels, outermost first.
    pub fn selectors(&self) -> &[Attribute] {
        &self.selectors
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Leaf at `path`; the path must be as long as the selector list.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&L> {
        let key: Vec<String> = path.iter().map(|part| part.as_ref().to_string()).collect();
        self.leaves.get(&key)
    }

    /// Leaves in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[String], &L)> {
        self.leaves.iter().map(|(key, leaf)| (key.as_slice(), leaf))
    }

    /// Leaves whose path starts with `prefix`, paired with the rest of the
    /// path.
    pub fn descendants<'a, S: AsRef<str>>(
        &'a self,
        prefix: &'a [S],
    ) -> impl Iterator<Item = (&'a [String], &'a L)> + 'a {
        self.leaves
            .iter()
            .filter(move |(key, _)| has_prefix(key, prefix))
            .map(move |(key, leaf)| (&key[prefix.len()..], leaf))
    }

    /// Distinct values one level below `prefix`.
    pub fn children<S: AsRef<str>>(&self, prefix: &[S]) -> BTreeSet<&str> {
        self.leaves
            .keys()
            .filter(|key| has_prefix(key, prefix))
            .filter_map(|key| key.get(prefix.len()).map(String::as_str))
            .collect()
    }
}

fn has_prefix<S: AsRef<str>>(key: &[String], prefix: &[S]) -> bool {
    key.len() >= prefix.len()
        && key
            .iter()
            .zip(prefix)
            .all(|(part, wanted)| part.as_str() == wanted.as_ref())
}

/// Group the alleles of `entry` by `selectors` and total each group.
///
/// Alleles lacking one of the selected attributes are left out.
pub fn aggregate(entry: &TrackEntry, selectors: &[Attribute]) -> AggregateTree<Counter> {
    let mut tree: AggregateTree<Counter> = AggregateTree::empty(selectors);
    for allele in entry.alleles() {
        let key: Option<Vec<String>> = selectors
            .iter()
            .map(|selector| selector.of(allele).map(str::to_string))
            .collect();
        if let Some(key) = key {
            tree.leaves.entry(key).or_default().observe(allele);
        }
    }
    tree
}

/// Positions of `denominator`'s selectors within `numerator`'s selectors.
fn projection(numerator: &[Attribute], denominator: &[Attribute]) -> Option<Vec<usize>> {
    denominator
        .iter()
        .map(|selector| numerator.iter().position(|s| s == selector))
        .collect()
}

fn combine<T>(
    numerator: &AggregateTree<Counter>,
    denominator: &AggregateTree<Counter>,
    mut leaf: impl FnMut(&Counter, Option<&Counter>) -> T,
) -> AggregateTree<T> {
    let mut tree: AggregateTree<T> = AggregateTree::empty(&numerator.selectors);
    let positions = projection(&numerator.selectors, &denominator.selectors);
    for (key, counter) in &numerator.leaves {
        let matched = positions.as_ref().and_then(|positions| {
            let projected: Vec<String> = positions.iter().map(|&p| key[p].clone()).collect();
            denominator.leaves.get(&projected)
        });
        tree.leaves.insert(key.clone(), leaf(counter, matched));
    }
    tree
}

/// Ratio of every `numerator` leaf to its matching `denominator` leaf.
///
/// A leaf is `None` when the denominator has no matching leaf, when one of
/// its selectors does not occur in the numerator, or when the denominator
/// value is zero.
pub fn divide(
    numerator: &AggregateTree<Counter>,
    denominator: &AggregateTree<Counter>,
    field: Field,
) -> AggregateTree<Option<f64>> {
    combine(numerator, denominator, |num, den| {
        let den = den?.get(field);
        (den != 0).then(|| num.get(field) as f64 / den as f64)
    })
}

/// Pair every `a` leaf value with its matching `b` leaf value.
pub fn zip(
    a: &AggregateTree<Counter>,
    b: &AggregateTree<Counter>,
    field: Field,
) -> AggregateTree<Option<(u64, u64)>> {
    combine(a, b, |x, y| y.map(|y| (x.get(field), y.get(field))))
}
