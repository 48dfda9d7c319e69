use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::aggregate::{aggregate, AggregateTree, Attribute, Counter, Field};
use crate::filters::{EntryFilter, RangeCheck};
use crate::track::{TrackEntry, TrackError};

/// Per-sample voting filter on alternate alleles.
///
/// An alternate allele is removed only when every sample reporting it fails
/// a value check (on its raw per-sample counter) or a frequency check (on
/// the counter divided by the sample's total at the position). A missing or
/// zero sample total fails the frequency check, and so does an allele
/// without a sample tag.
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    value_filters: BTreeMap<Field, RangeCheck>,
    frequency_filters: BTreeMap<Field, RangeCheck>,
    /// Remove alternate alleles containing the unknown base.
    pub remove_n_alleles: bool,
    /// Drop entries left with reference alleles only.
    pub remove_all_reference: bool,
}

impl SampleFilter {
    /// Filter without any checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update an absolute check on `field`.
    pub fn add_value_filter(
        &mut self,
        field: Field,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<&mut Self, TrackError> {
        upsert(&mut self.value_filters, field, lower, upper)?;
        Ok(self)
    }

    /// Add or update a frequency check on `field`.
    pub fn add_frequency_filter(
        &mut self,
        field: Field,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<&mut Self, TrackError> {
        upsert(&mut self.frequency_filters, field, lower, upper)?;
        Ok(self)
    }

    /// Configured absolute checks.
    pub fn value_filters(&self) -> &BTreeMap<Field, RangeCheck> {
        &self.value_filters
    }

    /// Configured frequency checks.
    pub fn frequency_filters(&self) -> &BTreeMap<Field, RangeCheck> {
        &self.frequency_filters
    }

    /// Number of active checks, counting each flag as one.
    pub fn n_filters_defined(&self) -> usize {
        self.value_filters.len()
            + self.frequency_filters.len()
            + usize::from(self.remove_n_alleles)
            + usize::from(self.remove_all_reference)
    }

    /// Apply the filter; `None` means the entry is to be dropped.
    pub fn filter(&self, entry: TrackEntry) -> Option<TrackEntry> {
        let reference = entry.position.sequence.clone();
        let mut removed: BTreeSet<String> = BTreeSet::new();

        if self.remove_n_alleles {
            removed.extend(
                entry
                    .alleles()
                    .iter()
                    .filter(|allele| allele.sequence != reference && allele.has_unknown_base())
                    .map(|allele| allele.sequence.clone()),
            );
        }

        if !self.value_filters.is_empty() || !self.frequency_filters.is_empty() {
            let per_allele = aggregate(&entry, &[Attribute::ALLELE, Attribute::SAMPLE]);
            let per_sample = (!self.frequency_filters.is_empty())
                .then(|| aggregate(&entry, &[Attribute::SAMPLE]));

            // untagged alleles carry no sample and count as a failed vote
            let alternates: BTreeSet<&str> = entry
                .alleles()
                .iter()
                .map(|allele| allele.sequence.as_str())
                .filter(|&sequence| sequence != reference)
                .collect();
            for sequence in alternates {
                let rejected_everywhere = per_allele
                    .descendants(&[sequence])
                    .all(|(rest, counter)| self.disqualifies(&rest[0], counter, per_sample.as_ref()));
                if rejected_everywhere {
                    removed.insert(sequence.to_string());
                }
            }
        }

        let position = entry.position.clone();
        let kept: Vec<_> = entry
            .into_alleles()
            .into_iter()
            .filter(|allele| !removed.contains(&allele.sequence))
            .collect();
        let filtered = TrackEntry::with_alleles(position, kept);

        if self.remove_all_reference && filtered.n_reference() == filtered.alleles().len() {
            return None;
        }
        Some(filtered)
    }

    fn disqualifies(
        &self,
        sample: &str,
        counter: &Counter,
        per_sample: Option<&AggregateTree<Counter>>,
    ) -> bool {
        let value_failed = self
            .value_filters
            .iter()
            .any(|(&field, check)| !check.accepts(counter.get(field) as f64));
        if value_failed {
            return true;
        }

        self.frequency_filters.iter().any(|(&field, check)| {
            let total = per_sample
                .and_then(|tree| tree.get(&[sample]))
                .map_or(0, |total| total.get(field));
            total == 0 || !check.accepts(counter.get(field) as f64 / total as f64)
        })
    }
}

fn upsert(
    checks: &mut BTreeMap<Field, RangeCheck>,
    field: Field,
    lower: Option<f64>,
    upper: Option<f64>,
) -> Result<(), TrackError> {
    if lower.is_none() && upper.is_none() {
        return Err(TrackError::InvalidConfiguration(format!(
            "a {field:?} filter needs a lower or an upper bound"
        )));
    }
    checks.entry(field).or_default().update(lower, upper);
    Ok(())
}

impl EntryFilter for SampleFilter {
    fn apply(&self, entry: TrackEntry) -> Option<TrackEntry> {
        self.filter(entry)
    }
}

impl fmt::Display for SampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleFilter(")?;
        for (field, check) in &self.value_filters {
            write!(f, "value {field:?} {check} ")?;
        }
        for (field, check) in &self.frequency_filters {
            write!(f, "frequency {field:?} {check} ")?;
        }
        write!(
            f,
            "remove_n={} remove_all_reference={})",
            self.remove_n_alleles, self.remove_all_reference
        )
    }
}
