use std::cmp::Ordering;
use std::fmt;

use crate::track::ChromosomeList;

/// Symbol marking an unknown base in allele sequences.
pub const UNKNOWN_BASE: char = 'N';

/// Genome position keyed by an interned chromosome index.
///
/// Equality and ordering look at `(chromosome, coordinate)` only; the
/// reference sequence is carried along but never compared.
#[derive(Debug, Clone)]
pub struct Position {
    /// Index into the run's [`ChromosomeList`].
    pub chromosome: usize,
    /// Coordinate on the chromosome.
    pub coordinate: u64,
    /// Reference sequence at this position, uppercased.
    pub sequence: String,
}

impl Position {
    /// Construct a position from an already interned chromosome index.
    pub fn new(chromosome: usize, coordinate: u64, sequence: impl AsRef<str>) -> Self {
        Self {
            chromosome,
            coordinate,
            sequence: sequence.as_ref().to_ascii_uppercase(),
        }
    }

    /// Construct a position, interning `chromosome` into `chromosomes`.
    pub fn interned(
        chromosomes: &mut ChromosomeList,
        chromosome: &str,
        coordinate: u64,
        sequence: impl AsRef<str>,
    ) -> Self {
        Self::new(chromosomes.intern(chromosome), coordinate, sequence)
    }

    /// Parse `chrom:coord:seq` or the first three tab-separated fields of a
    /// record header.
    pub fn parse(text: &str, chromosomes: &mut ChromosomeList) -> Option<Self> {
        let fields: Vec<&str> = if text.split(':').count() >= 3 {
            text.split(':').collect()
        } else {
            text.split('\t').collect()
        };
        if fields.len() < 3 {
            return None;
        }
        let coordinate = fields[1].trim().parse().ok()?;
        Some(Self::interned(chromosomes, fields[0], coordinate, fields[2]))
    }

    /// Chromosome name as registered in `chromosomes`.
    pub fn chromosome_name<'a>(&self, chromosomes: &'a ChromosomeList) -> Option<&'a str> {
        chromosomes.name(self.chromosome)
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Position {}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chromosome
            .cmp(&other.chromosome)
            .then(self.coordinate.cmp(&other.coordinate))
    }
}

/// One observed allele with its cumulative depth and quality.
///
/// By convention `tags[0]` names the sample and `tags[1]` the strand.
/// Equality and ordering consider the sequence and the tags, never the
/// counts.
#[derive(Debug, Clone)]
pub struct Allele {
    /// Observed sequence, uppercased.
    pub sequence: String,
    /// Number of supporting reads.
    pub depth: u64,
    /// Cumulative quality of the supporting reads.
    pub quality: u64,
    /// Free-form labels.
    pub tags: Vec<String>,
}

impl Allele {
    /// Construct an allele; the sequence is uppercased.
    pub fn new<I, S>(sequence: impl AsRef<str>, depth: u64, quality: u64, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sequence: sequence.as_ref().to_ascii_uppercase(),
            depth,
            quality,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Attribute `0` is the sequence, attribute `i` is `tags[i - 1]`.
    pub fn attribute(&self, index: usize) -> Option<&str> {
        match index {
            0 => Some(self.sequence.as_str()),
            i => self.tags.get(i - 1).map(String::as_str),
        }
    }

    /// Sample label (`tags[0]`).
    pub fn sample(&self) -> Option<&str> {
        self.attribute(1)
    }

    /// Strand label (`tags[1]`).
    pub fn strand(&self) -> Option<&str> {
        self.attribute(2)
    }

    /// Append a label.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    /// Whether the sequence contains the unknown-base symbol.
    pub fn has_unknown_base(&self) -> bool {
        self.sequence.contains(UNKNOWN_BASE)
    }
}

impl PartialEq for Allele {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Allele {}

impl PartialOrd for Allele {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Allele {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then(self.tags.len().cmp(&other.tags.len()))
            .then_with(|| self.tags.cmp(&other.tags))
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\t{}\t{}\t{}\t{}",
            self.sequence,
            self.depth,
            self.quality,
            self.tags.join(", ")
        )
    }
}

/// Summary counts over the alleles of an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Number of alleles.
    pub number_of_alleles: usize,
    /// Summed depth.
    pub depth: u64,
    /// Summed quality.
    pub quality: u64,
}

impl Statistics {
    /// Account for one more allele.
    pub fn add_allele(&mut self, allele: &Allele) {
        self.number_of_alleles += 1;
        self.depth = self.depth.saturating_add(allele.depth);
        self.quality = self.quality.saturating_add(allele.quality);
    }

    /// Statistics of a set of alleles.
    pub fn from_alleles<'a>(alleles: impl IntoIterator<Item = &'a Allele>) -> Self {
        let mut statistics = Self::default();
        for allele in alleles {
            statistics.add_allele(allele);
        }
        statistics
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.number_of_alleles, self.depth, self.quality)
    }
}

/// The allele observations recorded at one position.
///
/// Alleles are only mutated through methods that keep [`Statistics`] in
/// step with them.
#[derive(Debug, Clone)]
pub struct TrackEntry {
    /// Position of the observations.
    pub position: Position,
    alleles: Vec<Allele>,
    statistics: Statistics,
}

impl TrackEntry {
    /// Empty entry at `position`.
    pub fn new(position: Position) -> Self {
        Self {
            position,
            alleles: Vec::new(),
            statistics: Statistics::default(),
        }
    }

    /// Entry holding `alleles`.
    pub fn with_alleles(position: Position, alleles: Vec<Allele>) -> Self {
        let statistics = Statistics::from_alleles(&alleles);
        Self {
            position,
            alleles,
            statistics,
        }
    }

    /// Observed alleles in insertion order.
    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }

    /// Counts summed over [`TrackEntry::alleles`].
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Consume the entry, returning its alleles.
    pub fn into_alleles(self) -> Vec<Allele> {
        self.alleles
    }

    /// Add an allele, updating the statistics incrementally.
    pub fn add_allele(&mut self, allele: Allele) {
        self.statistics.add_allele(&allele);
        self.alleles.push(allele);
    }

    /// Take over the alleles of an entry at the same position.
    pub fn merge(&mut self, other: TrackEntry) {
        debug_assert_eq!(self.position, other.position);
        self.alleles.extend(other.alleles);
        self.recalculate_statistics();
    }

    /// Recompute the statistics from the held alleles.
    pub fn recalculate_statistics(&mut self) {
        self.statistics = Statistics::from_alleles(&self.alleles);
    }

    /// Keep the alleles whose mask entry is `true`.
    ///
    /// # Panics
    ///
    /// Panics if `keep` and the alleles differ in length.
    pub fn retain_alleles(&mut self, keep: &[bool]) {
        assert_eq!(keep.len(), self.alleles.len(), "mask length must match alleles");
        let mut flags = keep.iter();
        self.alleles.retain(|_| flags.next().copied().unwrap_or(false));
        self.recalculate_statistics();
    }

    /// Mask of alleles whose sequence equals (`exact`) or contains `sequence`.
    pub fn allele_sequence(&self, sequence: &str, exact: bool) -> Vec<bool> {
        self.alleles
            .iter()
            .map(|allele| {
                if exact {
                    allele.sequence == sequence
                } else {
                    allele.sequence.contains(sequence)
                }
            })
            .collect()
    }

    /// Mask of alleles that differ from the reference sequence.
    pub fn is_not_reference(&self) -> Vec<bool> {
        self.allele_sequence(&self.position.sequence, true)
            .into_iter()
            .map(|is_reference| !is_reference)
            .collect()
    }

    /// Number of alleles equal to the reference sequence.
    pub fn n_reference(&self) -> usize {
        self.alleles
            .iter()
            .filter(|allele| allele.sequence == self.position.sequence)
            .count()
    }

    /// Render in the track format, resolving the chromosome name.
    pub fn display<'a>(&'a self, chromosomes: &'a ChromosomeList) -> EntryDisplay<'a> {
        EntryDisplay {
            entry: self,
            chromosomes,
        }
    }
}

/// Track-format rendering of a [`TrackEntry`].
#[derive(Debug)]
pub struct EntryDisplay<'a> {
    entry: &'a TrackEntry,
    chromosomes: &'a ChromosomeList,
}

impl fmt::Display for EntryDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = &self.entry.position;
        let chromosome = position.chromosome_name(self.chromosomes).unwrap_or(".");
        write!(
            f,
            "{}\t{}\t{}\t{}",
            chromosome, position.coordinate, position.sequence, self.entry.statistics
        )?;
        for allele in &self.entry.alleles {
            write!(f, "\n{allele}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allele(sequence: &str, depth: u64, quality: u64, sample: &str) -> Allele {
        Allele::new(sequence, depth, quality, [sample, "forward"])
    }

    #[test]
    fn position_ordering_ignores_reference() {
        let a = Position::new(0, 10, "a");
        let b = Position::new(0, 10, "C");
        let c = Position::new(1, 1, "A");
        assert_eq!(a, b);
        assert!(a < c);
        assert_eq!(a.sequence, "A");
    }

    #[test]
    fn position_parses_both_layouts() {
        let mut chromosomes = ChromosomeList::new();
        let colon = Position::parse("chr2:15:g", &mut chromosomes).unwrap();
        let tab = Position::parse("chr1\t7\tT\t1\t1\t20", &mut chromosomes).unwrap();
        assert_eq!(colon.chromosome, 0);
        assert_eq!(colon.sequence, "G");
        assert_eq!(tab.chromosome, 1);
        assert_eq!(tab.coordinate, 7);
        assert!(Position::parse("chr1", &mut chromosomes).is_none());
    }

    #[test]
    fn allele_attributes_follow_tags() {
        let a = allele("g", 1, 20, "X");
        assert_eq!(a.attribute(0), Some("G"));
        assert_eq!(a.sample(), Some("X"));
        assert_eq!(a.strand(), Some("forward"));
        assert_eq!(a.attribute(3), None);
    }

    #[test]
    fn allele_ordering_uses_sequence_then_tags() {
        let short = Allele::new("A", 1, 1, ["X"]);
        let long = Allele::new("A", 9, 9, ["X", "forward"]);
        let other = Allele::new("C", 1, 1, Vec::<String>::new());
        assert!(short < long);
        assert!(long < other);
        assert_eq!(Allele::new("A", 1, 1, ["X"]), Allele::new("a", 5, 5, ["X"]));
    }

    #[test]
    fn statistics_follow_alleles() {
        let mut entry = TrackEntry::new(Position::new(0, 1, "T"));
        entry.add_allele(allele("G", 1, 20, "A"));
        entry.add_allele(allele("T", 3, 30, "A"));
        assert_eq!(
            entry.statistics(),
            Statistics {
                number_of_alleles: 2,
                depth: 4,
                quality: 50
            }
        );

        let mut other = TrackEntry::new(Position::new(0, 1, "T"));
        other.add_allele(allele("C", 2, 5, "B"));
        entry.merge(other);
        assert_eq!(entry.statistics().number_of_alleles, 3);
        assert_eq!(entry.statistics().depth, 6);

        entry.retain_alleles(&[false, true, true]);
        assert_eq!(entry.statistics().quality, 35);
        assert_eq!(entry.n_reference(), 1);
        assert_eq!(entry.is_not_reference(), vec![false, true]);
    }

    #[test]
    fn statistics_saturate_on_huge_counts() {
        let entry = TrackEntry::with_alleles(
            Position::new(0, 1, "T"),
            vec![allele("G", u64::MAX, 1, "A"), allele("T", 5, u64::MAX, "A")],
        );
        let statistics = entry.statistics();
        assert_eq!(statistics.depth, u64::MAX);
        assert_eq!(statistics.quality, u64::MAX);
    }

    #[test]
    fn allele_sequence_matches_exactly_or_by_substring() {
        let entry = TrackEntry::with_alleles(
            Position::new(0, 1, "T"),
            vec![allele("TA", 1, 1, "A"), allele("T", 1, 1, "A")],
        );
        assert_eq!(entry.allele_sequence("T", true), vec![false, true]);
        assert_eq!(entry.allele_sequence("T", false), vec![true, true]);
    }

    #[test]
    fn renders_track_format() {
        let mut chromosomes = ChromosomeList::new();
        let position = Position::interned(&mut chromosomes, "chr1", 20000, "T");
        let entry = TrackEntry::with_alleles(position, vec![allele("G", 1, 20, "A")]);
        assert_eq!(
            entry.display(&chromosomes).to_string(),
            "chr1\t20000\tT\t1\t1\t20\n\tG\t1\t20\tA, forward"
        );
    }
}
