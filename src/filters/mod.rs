//! Entry-level filters applied to a merged track stream.

mod range;
mod sample;

use std::fmt;

use crate::track::{TrackEntry, TrackError};

pub use range::RangeCheck;
pub use sample::SampleFilter;

/// Transform applied to one entry; `None` drops the entry.
pub trait EntryFilter {
    /// Filter or rewrite `entry`.
    fn apply(&self, entry: TrackEntry) -> Option<TrackEntry>;
}

impl<F> EntryFilter for F
where
    F: Fn(TrackEntry) -> Option<TrackEntry>,
{
    fn apply(&self, entry: TrackEntry) -> Option<TrackEntry> {
        self(entry)
    }
}

/// Run every entry of `source` through `filters` in order.
///
/// An entry is dropped as soon as one filter drops it, and entries left
/// without alleles are never forwarded. Errors from `source` pass through.
pub fn apply_filters<I>(source: I, filters: Vec<Box<dyn EntryFilter>>) -> FilteredEntries<I>
where
    I: Iterator<Item = Result<TrackEntry, TrackError>>,
{
    FilteredEntries { source, filters }
}

/// Iterator returned by [`apply_filters`].
pub struct FilteredEntries<I> {
    source: I,
    filters: Vec<Box<dyn EntryFilter>>,
}

impl<I> FilteredEntries<I> {
    fn run(&self, entry: TrackEntry) -> Option<TrackEntry> {
        self.filters
            .iter()
            .try_fold(entry, |entry, filter| filter.apply(entry))
    }
}

impl<I> Iterator for FilteredEntries<I>
where
    I: Iterator<Item = Result<TrackEntry, TrackError>>,
{
    type Item = Result<TrackEntry, TrackError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.source.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            if let Some(entry) = self.run(entry) {
                if entry.statistics().number_of_alleles > 0 {
                    return Some(Ok(entry));
                }
            }
        }
    }
}

impl<I> fmt::Debug for FilteredEntries<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredEntries")
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}
