//! # Streaming merge and aggregation of variant tracks
//!
//! This library merges per-sample variant tracks (sorted streams of allele
//! observations per genome position) into one position-ordered stream,
//! aggregates the observations by allele, sample and strand, and filters
//! alternate alleles on absolute and relative thresholds.
//!
//! ## Pipeline
//!
//! 1. **Read**: [`TrackReader`] parses one sorted track stream
//! 2. **Merge**: [`TrackParser`] merges any number of sources window by
//!    window, coalescing entries that share a position
//! 3. **Filter**: [`apply_filters`] runs entries through [`SampleFilter`] and
//!    other [`EntryFilter`]s
//! 4. **Aggregate**: [`aggregate`], [`divide`] and [`zip`] build counter
//!    trees; [`SummarizeEntries`] reports per-sample totals
//!
//! ## Usage Example
//!
//! ```no_run
//! use naivetrack::{apply_filters, EntryFilter, Field, SampleFilter, TrackParser};
//!
//! let mut parser: TrackParser = TrackParser::new();
//! parser.register_path("sample_a.var")?;
//! parser.register_path("sample_b.var")?;
//! parser.set_maximum_chromosome_size(Some(250_000_000));
//!
//! let mut filter = SampleFilter::new();
//! filter.add_frequency_filter(Field::Quality, Some(0.1), None)?;
//! let filters: Vec<Box<dyn EntryFilter>> = vec![Box::new(filter)];
//!
//! for entry in apply_filters(parser, filters) {
//!     let entry = entry?;
//!     println!("{} alleles at {}", entry.alleles().len(), entry.position.coordinate);
//! }
//! # Ok::<(), naivetrack::TrackError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod track;      // Data model, single-source reader, merge engine
pub mod aggregate;  // Counter trees and their algebra
pub mod filters;    // Range checks and the per-sample voting filter
pub mod summarize;  // Per-sample allele totals

// Re-exports for convenience
pub use track::{
    Allele, BufferedTrackReader, ChromosomeList, MergeConfig, Position, Statistics, TrackEntry,
    TrackError, TrackParser, TrackReader,
};
pub use aggregate::{aggregate, divide, zip, AggregateTree, Attribute, Counter, Field};
pub use filters::{apply_filters, EntryFilter, FilteredEntries, RangeCheck, SampleFilter};
pub use summarize::{EntrySummary, SampleSummary, SummarizeEntries};
