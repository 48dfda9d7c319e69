//! Per-allele, per-sample quality and depth totals for one entry.

use std::collections::{BTreeMap, BTreeSet};

use crate::aggregate::{aggregate, AggregateTree, Attribute, Counter};
use crate::track::TrackEntry;

/// Extra totals restricted to alleles whose `attribute` equals `equals`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryCriterion {
    /// Attribute compared against `equals`.
    pub attribute: Attribute,
    /// Value an allele must carry to be counted.
    pub equals: String,
    /// Label of the restricted quality total.
    pub quality_label: String,
    /// Label of the restricted depth total.
    pub depth_label: String,
}

/// Totals of one allele sequence within one sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleSummary {
    /// Summed quality.
    pub quality: u64,
    /// Summed depth.
    pub depth: u64,
    /// Restricted totals keyed by criterion label.
    pub labelled: BTreeMap<String, u64>,
}

/// Summaries keyed by allele sequence, then sample.
pub type EntrySummary = BTreeMap<String, BTreeMap<String, SampleSummary>>;

/// Summarizes entries per sample and allele sequence.
#[derive(Debug, Clone, Default)]
pub struct SummarizeEntries {
    criteria: Vec<SummaryCriterion>,
}

impl SummarizeEntries {
    /// Summarizer reporting unrestricted totals only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also report totals over alleles whose `attribute` equals `equals`.
    pub fn add_criterion(
        &mut self,
        attribute: Attribute,
        equals: impl Into<String>,
        quality_label: impl Into<String>,
        depth_label: impl Into<String>,
    ) -> &mut Self {
        self.criteria.push(SummaryCriterion {
            attribute,
            equals: equals.into(),
            quality_label: quality_label.into(),
            depth_label: depth_label.into(),
        });
        self
    }

    /// Configured criteria.
    pub fn criteria(&self) -> &[SummaryCriterion] {
        &self.criteria
    }

    /// Summarize `entry`.
    ///
    /// Every sample gets a summary for every sequence seen at the position;
    /// sequences a sample did not report get zero totals and no labelled
    /// values.
    pub fn summarize(&self, entry: &TrackEntry) -> EntrySummary {
        let sequences: BTreeSet<&str> = entry
            .alleles()
            .iter()
            .map(|allele| allele.sequence.as_str())
            .collect();
        let totals = aggregate(entry, &[Attribute::SAMPLE, Attribute::ALLELE]);

        let mut restricted: BTreeMap<Attribute, AggregateTree<Counter>> = BTreeMap::new();
        for criterion in &self.criteria {
            restricted.entry(criterion.attribute).or_insert_with(|| {
                aggregate(
                    entry,
                    &[Attribute::SAMPLE, Attribute::ALLELE, criterion.attribute],
                )
            });
        }

        let mut summary = EntrySummary::new();
        let no_prefix: [&str; 0] = [];
        for sample in totals.children(&no_prefix) {
            for &sequence in &sequences {
                let mut values = SampleSummary::default();
                if let Some(counter) = totals.get(&[sample, sequence]) {
                    values.quality = counter.quality;
                    values.depth = counter.depth;
                    for criterion in &self.criteria {
                        let matched = restricted
                            .get(&criterion.attribute)
                            .and_then(|tree| tree.get(&[sample, sequence, criterion.equals.as_str()]))
                            .copied()
                            .unwrap_or_default();
                        values
                            .labelled
                            .insert(criterion.quality_label.clone(), matched.quality);
                        values
                            .labelled
                            .insert(criterion.depth_label.clone(), matched.depth);
                    }
                }
                summary
                    .entry(sequence.to_string())
                    .or_default()
                    .insert(sample.to_string(), values);
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{Allele, Position};

    fn entry() -> TrackEntry {
        TrackEntry::with_alleles(
            Position::new(0, 1, "T"),
            vec![
                Allele::new("G", 1, 20, ["X", "forward"]),
                Allele::new("G", 3, 20, ["X", "reverse"]),
                Allele::new("T", 10, 20, ["X", "forward"]),
                Allele::new("G", 20, 200, ["Y", "forward"]),
            ],
        )
    }

    #[test]
    fn totals_per_sample_and_sequence() {
        let summary = SummarizeEntries::new().summarize(&entry());
        assert_eq!(summary["T"]["X"].quality, 20);
        assert_eq!(summary["T"]["X"].depth, 10);
        assert_eq!(summary["G"]["X"].quality, 40);
        assert_eq!(summary["G"]["X"].depth, 4);
        assert_eq!(summary["G"]["Y"].quality, 200);
        assert_eq!(summary["G"]["Y"].depth, 20);
        assert_eq!(summary["T"]["Y"], SampleSummary::default());
    }

    #[test]
    fn criteria_restrict_totals() {
        let mut summarize = SummarizeEntries::new();
        summarize.add_criterion(Attribute::STRAND, "forward", "quality_f", "depth_f");
        let summary = summarize.summarize(&entry());

        let gx = &summary["G"]["X"];
        assert_eq!(gx.quality, 40);
        assert_eq!(gx.labelled["quality_f"], 20);
        assert_eq!(gx.depth, 4);
        assert_eq!(gx.labelled["depth_f"], 1);

        let tx = &summary["T"]["X"];
        assert_eq!(tx.labelled["quality_f"], 20);
        assert_eq!(tx.labelled["depth_f"], 10);

        let gy = &summary["G"]["Y"];
        assert_eq!(gy.labelled["quality_f"], 200);
        assert_eq!(gy.labelled["depth_f"], 20);

        assert!(summary["T"]["Y"].labelled.is_empty());
    }
}
