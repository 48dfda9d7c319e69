use std::collections::HashMap;
use std::io::BufRead;

use crate::track::TrackError;

/// Append-only interner mapping chromosome names to dense indices.
///
/// Indices are handed out in order of first appearance, so the index order
/// is the chromosome order the merge engine walks. Seed the list with
/// [`ChromosomeList::from_names`] when sources do not all start on the same
/// chromosome.
#[derive(Debug, Clone, Default)]
pub struct ChromosomeList {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl ChromosomeList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list pre-seeded with a known chromosome order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            list.intern(name.as_ref());
        }
        list
    }

    /// Read a chromosome order from a listing with one chromosome per line.
    ///
    /// Only the first tab-separated column is used, so a FASTA index
    /// (`.fai`) works as is. Blank lines and `#` lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, TrackError> {
        let mut list = Self::new();
        for line in reader.lines() {
            let line = line?;
            let name = line.split('\t').next().unwrap_or("").trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            list.intern(name);
        }
        Ok(list)
    }

    /// Index of `name`, registering it first if it was never seen.
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.lookup.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), index);
        index
    }

    /// Index of an already registered chromosome.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Name registered under `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of registered chromosomes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no chromosome was registered yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Registered names in index order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_assigns_next_index() {
        let mut list = ChromosomeList::new();
        assert_eq!(list.intern("chr2"), 0);
        assert_eq!(list.intern("chr1"), 1);
        assert_eq!(list.intern("chr2"), 0);
        assert_eq!(list.len(), 2);
        assert_eq!(list.name(1), Some("chr1"));
        assert_eq!(list.name(2), None);
    }

    #[test]
    fn seeded_order_is_kept() {
        let mut list = ChromosomeList::from_names(["chr1", "chr2", "chrX"]);
        assert_eq!(list.intern("chrX"), 2);
        assert_eq!(list.intern("chrM"), 3);
        assert_eq!(list.index_of("chr2"), Some(1));
        assert_eq!(list.names().collect::<Vec<_>>(), ["chr1", "chr2", "chrX", "chrM"]);
    }

    #[test]
    fn order_is_read_from_an_index_listing() {
        let fai = "chr1\t248956422\t112\t70\t71\n\n# comment\nchr2\t242193529\t252513167\t70\t71\nchrM\n";
        let list = ChromosomeList::from_reader(fai.as_bytes()).unwrap();
        assert_eq!(list.names().collect::<Vec<_>>(), ["chr1", "chr2", "chrM"]);
    }
}
